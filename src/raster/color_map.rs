//! Height-keyed color ramps used to synthesize base land cover color.

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// Piecewise-linear map from elevation (meters) to RGB in `[0, 1]`.
///
/// Sampling brackets the height with the first key strictly above it.
/// Heights outside the key range extrapolate along the first or last
/// segment, so components may leave `[0, 1]`; callers clamp.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<(f32, [f32; 3])>", into = "Vec<(f32, [f32; 3])>")]
pub struct HeightColorMap {
    keys: Vec<(f32, [f32; 3])>,
}

impl HeightColorMap {
    /// Create a map from unsorted keys. A repeated height keeps its last color.
    pub fn new(mut keys: Vec<(f32, [f32; 3])>) -> Self {
        keys.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut unique: Vec<(f32, [f32; 3])> = Vec::with_capacity(keys.len());
        for key in keys {
            match unique.last_mut() {
                Some(last) if last.0 == key.0 => *last = key,
                _ => unique.push(key),
            }
        }
        Self { keys: unique }
    }

    /// Land colors, sea level to high alpine snow.
    pub fn default_upper() -> Self {
        Self::new(vec![
            (0.0, [0.647, 0.482, 0.224]),
            (300.0, [0.710, 0.647, 0.388]),
            (600.0, [0.741, 0.741, 0.482]),
            (1200.0, [0.290, 0.612, 0.290]),
            (2000.0, [0.482, 0.741, 0.322]),
            (2500.0, [0.647, 0.809, 0.518]),
            (3000.0, [1.0, 1.0, 1.0]),
            (9000.0, [1.0, 1.0, 1.0]),
        ])
    }

    /// Ocean colors, abyss to shoreline.
    pub fn default_lower() -> Self {
        Self::new(vec![(-11000.0, [0.0, 0.0, 0.0]), (0.0, [0.0, 0.3, 0.6])])
    }

    /// Insert or replace the color at `height`.
    pub fn set(&mut self, height: f32, color: [f32; 3]) {
        match self.keys.binary_search_by(|k| k.0.total_cmp(&height)) {
            Ok(i) => self.keys[i].1 = color,
            Err(i) => self.keys.insert(i, (height, color)),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Color at `height`. Needs at least two keys.
    pub fn color(&self, height: f32) -> Result<[f32; 3]> {
        let n = self.keys.len();
        if n < 2 {
            return Err(Error::DegenerateColorMap(n));
        }

        let upper = self.keys.partition_point(|k| k.0 <= height);
        let hi = upper.clamp(1, n - 1);
        let (h1, c1) = self.keys[hi - 1];
        let (h2, c2) = self.keys[hi];

        let t = (height - h1) / (h2 - h1);
        Ok([
            c1[0] + (c2[0] - c1[0]) * t,
            c1[1] + (c2[1] - c1[1]) * t,
            c1[2] + (c2[2] - c1[2]) * t,
        ])
    }
}

impl From<Vec<(f32, [f32; 3])>> for HeightColorMap {
    fn from(keys: Vec<(f32, [f32; 3])>) -> Self {
        Self::new(keys)
    }
}

impl From<HeightColorMap> for Vec<(f32, [f32; 3])> {
    fn from(map: HeightColorMap) -> Self {
        map.keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-4)
    }

    #[test]
    fn test_interpolates_between_keys() {
        let map = HeightColorMap::new(vec![(0.0, [0.0, 0.0, 0.0]), (100.0, [1.0, 0.5, 0.0])]);
        assert!(close(map.color(50.0).unwrap(), [0.5, 0.25, 0.0]));
    }

    #[test]
    fn test_exact_key_uses_following_segment() {
        let map = HeightColorMap::default_upper();
        assert!(close(map.color(300.0).unwrap(), [0.710, 0.647, 0.388]));
    }

    #[test]
    fn test_extrapolates_outside_range() {
        let map = HeightColorMap::new(vec![(0.0, [0.0, 0.0, 0.0]), (10.0, [0.1, 0.1, 0.1])]);
        assert!(close(map.color(20.0).unwrap(), [0.2, 0.2, 0.2]));
        assert!(close(map.color(-10.0).unwrap(), [-0.1, -0.1, -0.1]));
    }

    #[test]
    fn test_degenerate_map() {
        let map = HeightColorMap::new(vec![(0.0, [1.0, 1.0, 1.0])]);
        assert!(matches!(map.color(0.0), Err(Error::DegenerateColorMap(1))));
        assert!(HeightColorMap::default().color(0.0).is_err());
    }

    #[test]
    fn test_repeated_heights_collapse() {
        let map = HeightColorMap::new(vec![(0.0, [0.0, 0.0, 0.0]), (10.0, [1.0, 1.0, 1.0]), (0.0, [0.5, 0.5, 0.5])]);
        assert_eq!(map.len(), 2);
        assert!(close(map.color(0.0).unwrap(), [0.5, 0.5, 0.5]));
        assert!(map.color(5.0).unwrap().iter().all(|c| c.is_finite()));

        let single: HeightColorMap = serde_json::from_str("[[3.0,[1,1,1]],[3.0,[0,0,0]]]").unwrap();
        assert!(matches!(single.color(3.0), Err(Error::DegenerateColorMap(1))));
    }

    #[test]
    fn test_set_replaces_existing_key() {
        let mut map = HeightColorMap::default_lower();
        map.set(0.0, [1.0, 1.0, 1.0]);
        map.set(-500.0, [0.5, 0.5, 0.5]);
        assert_eq!(map.len(), 3);
        assert!(close(map.color(0.0).unwrap(), [1.0, 1.0, 1.0]));
    }

    #[test]
    fn test_serde_as_key_list() {
        let map = HeightColorMap::default_lower();
        let json = serde_json::to_string(&map).unwrap();
        assert!(json.starts_with("[["));
        let back: HeightColorMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }
}

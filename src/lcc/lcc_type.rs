//! Land cover class definitions.

use serde::{Deserialize, Serialize};

/// Index of the water class; its filtered image doubles as the water mask.
pub const WATER_INDEX: u32 = 11;

/// Base-color key selecting water pixels.
pub const WATER_RGB: [u8; 3] = [110, 130, 177];

/// Classes below this index are urban: snapped headings, unit scale, shallow embedding.
pub const URBAN_INDEX_LIMIT: u32 = 30;

/// A constrained parameter with a falloff sharpness.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
    #[serde(default = "default_sharpness")]
    pub sharpness: f32,
}

fn default_sharpness() -> f32 {
    1.0
}

impl ParamRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max, sharpness: default_sharpness() }
    }
}

/// A placeable model and its base scale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelRef {
    pub name: String,
    #[serde(default = "default_scale")]
    pub scale: f32,
}

fn default_scale() -> f32 {
    1.0
}

impl ModelRef {
    pub fn new(name: impl Into<String>, scale: f32) -> Self {
        Self { name: name.into(), scale }
    }
}

/// One land cover class: how to find it in the base color raster, where it
/// may grow and what to place there.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LccType {
    pub index: u32,
    pub name: String,
    /// Exact base-color key of this class.
    pub rgb: [u8; 3],
    /// Degrees.
    #[serde(default = "default_slope")]
    pub slope: ParamRange,
    /// Meters.
    #[serde(default = "default_elevation")]
    pub elevation: ParamRange,
    #[serde(default = "default_relative_elevation")]
    pub relative_elevation: ParamRange,
    /// Preferred facing in degrees.
    #[serde(default)]
    pub aspect: f32,
    #[serde(default)]
    pub models: Vec<ModelRef>,
}

fn default_slope() -> ParamRange {
    ParamRange::new(0.0, 90.0)
}

fn default_elevation() -> ParamRange {
    ParamRange::new(0.0, 2550.0)
}

fn default_relative_elevation() -> ParamRange {
    ParamRange::new(0.0, 255.0)
}

impl LccType {
    /// Class with unconstrained slope/elevation and no models.
    pub fn new(index: u32, name: impl Into<String>, rgb: [u8; 3]) -> Self {
        Self {
            index,
            name: name.into(),
            rgb,
            slope: default_slope(),
            elevation: default_elevation(),
            relative_elevation: default_relative_elevation(),
            aspect: 0.0,
            models: Vec::new(),
        }
    }

    pub fn with_slope(mut self, min: f32, max: f32) -> Self {
        self.slope = ParamRange::new(min, max);
        self
    }

    pub fn with_elevation(mut self, min: f32, max: f32) -> Self {
        self.elevation = ParamRange::new(min, max);
        self
    }

    pub fn with_aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }

    pub fn with_model(mut self, name: impl Into<String>, scale: f32) -> Self {
        self.models.push(ModelRef::new(name, scale));
        self
    }

    pub fn is_urban(&self) -> bool {
        self.index < URBAN_INDEX_LIMIT
    }

    pub fn is_water(&self) -> bool {
        self.index == WATER_INDEX
    }

    /// Vertical offset that embeds a placed object's base into the ground.
    pub fn ground_offset(&self) -> f32 {
        if self.is_urban() { -0.1 } else { -0.75 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urban_classification() {
        assert!(LccType::new(21, "residential", [255, 0, 0]).is_urban());
        assert!(!LccType::new(41, "deciduous", [0, 128, 0]).is_urban());
        assert!(!LccType::new(30, "barren", [1, 1, 1]).is_urban());
        assert_eq!(LccType::new(22, "commercial", [1, 1, 1]).ground_offset(), -0.1);
        assert_eq!(LccType::new(42, "evergreen", [1, 1, 1]).ground_offset(), -0.75);
    }

    #[test]
    fn test_minimal_json() {
        let json = r#"{ "index": 42, "name": "evergreen", "rgb": [56, 129, 78],
                        "models": [{ "name": "pine.osg" }] }"#;
        let lcc: LccType = serde_json::from_str(json).unwrap();
        assert_eq!(lcc.slope, ParamRange::new(0.0, 90.0));
        assert_eq!(lcc.models[0].scale, 1.0);
        assert_eq!(lcc.aspect, 0.0);
    }

    #[test]
    fn test_builder() {
        let lcc = LccType::new(5, "test", [200, 0, 0])
            .with_slope(0.0, 45.0)
            .with_elevation(0.0, 1000.0)
            .with_aspect(180.0)
            .with_model("tree", 2.0);
        assert_eq!(lcc.slope.max, 45.0);
        assert_eq!(lcc.models.len(), 1);
    }
}

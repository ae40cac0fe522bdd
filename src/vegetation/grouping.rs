//! Spatial grouping of placed instances.
//!
//! Instances land in a square grid of buckets covering the tile. Each bucket
//! is an [`LodGroup`] that scopes collision checks and becomes a leaf of the
//! quadtree handed to the renderer. Empty buckets and empty branches are
//! pruned when the tree is built.

use std::fs;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::model::BoundingSphere;
use crate::core::{Result, TileId};

/// One placed model instance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlacedInstance {
    /// World position of the model origin.
    pub position: Vec3,
    /// Rotation about Z in radians.
    pub yaw: f32,
    pub scale: Vec3,
    pub lcc_index: u32,
    /// Index into the class's model list.
    pub model_index: usize,
    /// Owning bucket in the tile's grid.
    pub bucket: usize,
    /// Age class: 0 young, 1 mid, 2 old.
    pub age: u8,
    /// World-space bounds.
    pub bounds: BoundingSphere,
    /// Near and far visible distance.
    pub visible_range: (f32, f32),
}

/// A bucket's worth of instances with a shared visible range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LodGroup {
    pub name: String,
    pub range: (f32, f32),
    instances: Vec<PlacedInstance>,
}

impl LodGroup {
    pub fn new(name: impl Into<String>, range: (f32, f32)) -> Self {
        Self {
            name: name.into(),
            range,
            instances: Vec::new(),
        }
    }

    pub fn instances(&self) -> &[PlacedInstance] {
        &self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Whether `candidate` conflicts with anything already in the group.
    ///
    /// Urban candidates conflict on any bounding-sphere overlap. Everything
    /// else only conflicts when another instance's center lies within a
    /// quarter of the candidate's radius.
    pub fn collides(&self, candidate: &BoundingSphere, urban: bool) -> bool {
        if urban {
            self.instances.iter().any(|other| other.bounds.intersects(candidate))
        } else {
            let min_distance = candidate.radius / 4.0;
            let min_sq = min_distance * min_distance;
            self.instances
                .iter()
                .any(|other| (other.bounds.center - candidate.center).length_squared() < min_sq)
        }
    }

    /// Insert unless it collides. Returns whether the instance was kept.
    pub fn try_insert(&mut self, instance: PlacedInstance, urban: bool) -> bool {
        if self.collides(&instance.bounds, urban) {
            return false;
        }
        self.instances.push(instance);
        true
    }
}

/// Square grid of [`LodGroup`] buckets over one tile.
#[derive(Clone, Debug)]
pub struct BucketGrid {
    resolution: u32,
    buckets: Vec<LodGroup>,
    count: usize,
}

impl BucketGrid {
    /// `resolution` buckets per side, each visible over `[0, load_distance]`.
    /// The side is rounded up to a power of two so the grid folds into a quadtree.
    pub fn new(resolution: u32, load_distance: f32) -> Self {
        let requested = resolution.max(1);
        let resolution = requested.next_power_of_two();
        if resolution != requested {
            log::warn!("Bucket resolution {} rounded up to {}", requested, resolution);
        }
        let count = (resolution * resolution) as usize;
        let buckets = (0..count)
            .map(|i| LodGroup::new(format!("leaf[{}]", i), (0.0, load_distance)))
            .collect();
        Self { resolution, buckets, count: 0 }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Bucket owning pixel `(x, y)` of a `width` x `height` raster.
    pub fn bucket_of(&self, x: u32, y: u32, width: u32, height: u32) -> usize {
        let n = self.resolution as u64;
        let bx = (x as u64 * n / width.max(1) as u64).min(n - 1);
        let by = (y as u64 * n / height.max(1) as u64).min(n - 1);
        (by * n + bx) as usize
    }

    pub fn bucket(&self, index: usize) -> &LodGroup {
        &self.buckets[index]
    }

    /// Insert into the instance's own bucket unless it collides there.
    pub fn try_insert(&mut self, instance: PlacedInstance, urban: bool) -> bool {
        let kept = self.buckets[instance.bucket].try_insert(instance, urban);
        if kept {
            self.count += 1;
        }
        kept
    }

    pub fn instance_count(&self) -> usize {
        self.count
    }

    /// Child counts of the non-empty buckets.
    pub fn stats(&self) -> GroupStats {
        GroupStats::from_sizes(self.buckets.iter().map(LodGroup::len).filter(|n| *n > 0))
    }

    /// Fold the grid into a pruned quadtree under a root named `root_name`.
    ///
    /// Each level halves the grid side; a node at `(x, y)` owns the four
    /// cells `(2x + dx, 2y + dy)` of the level below it.
    pub fn into_tree(self, root_name: impl Into<String>) -> GroupNode {
        let mut res = self.resolution as usize;
        let mut level: Vec<Option<GroupNode>> = self
            .buckets
            .into_iter()
            .map(|group| (!group.is_empty()).then_some(GroupNode::Lod(group)))
            .collect();

        while res > 2 {
            let half = res / 2;
            let mut next = Vec::with_capacity(half * half);
            for y in 0..half {
                for x in 0..half {
                    let mut children = Vec::new();
                    for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                        let i = (2 * y + dy) * res + 2 * x + dx;
                        if let Some(child) = level[i].take() {
                            children.push(child);
                        }
                    }
                    let name = format!("quad{}[{}]", half, y * half + x);
                    next.push((!children.is_empty()).then(|| GroupNode::Group { name, children }));
                }
            }
            level = next;
            res = half;
        }

        GroupNode::Group {
            name: root_name.into(),
            children: level.into_iter().flatten().collect(),
        }
    }
}

/// Node of the spatial grouping hierarchy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupNode {
    Group { name: String, children: Vec<GroupNode> },
    Lod(LodGroup),
}

impl GroupNode {
    pub fn name(&self) -> &str {
        match self {
            GroupNode::Group { name, .. } => name,
            GroupNode::Lod(group) => &group.name,
        }
    }

    pub fn instance_count(&self) -> usize {
        match self {
            GroupNode::Group { children, .. } => children.iter().map(GroupNode::instance_count).sum(),
            GroupNode::Lod(group) => group.len(),
        }
    }

    /// Depth-first walk over the leaf groups.
    pub fn for_each_lod<'a>(&'a self, f: &mut impl FnMut(&'a LodGroup)) {
        match self {
            GroupNode::Group { children, .. } => children.iter().for_each(|c| c.for_each_lod(f)),
            GroupNode::Lod(group) => f(group),
        }
    }

    pub fn instances(&self) -> Vec<&PlacedInstance> {
        let mut out = Vec::new();
        self.for_each_lod(&mut |group| out.extend(group.instances()));
        out
    }
}

/// Children-per-group statistics over non-empty groups.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub group_count: usize,
    pub min_children: usize,
    pub max_children: usize,
    pub average_children: f32,
}

impl GroupStats {
    fn from_sizes(sizes: impl Iterator<Item = usize>) -> Self {
        let mut stats = GroupStats::default();
        let mut total = 0usize;
        for n in sizes {
            if stats.group_count == 0 {
                stats.min_children = n;
            }
            stats.group_count += 1;
            stats.min_children = stats.min_children.min(n);
            stats.max_children = stats.max_children.max(n);
            total += n;
        }
        if stats.group_count > 0 {
            stats.average_children = total as f32 / stats.group_count as f32;
        }
        stats
    }
}

/// Placement counters for one tile.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlacementStats {
    /// Instances kept per class index, in placement order.
    pub placed: Vec<(u32, usize)>,
    /// Candidates dropped by the collision test.
    pub rejected: usize,
    /// Whether the per-tile instance cap stopped placement.
    pub capped: bool,
    pub groups: GroupStats,
}

/// Vegetation of one tile, ready for a renderer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VegetationScene {
    pub tile: TileId,
    pub root: GroupNode,
    pub stats: PlacementStats,
}

impl VegetationScene {
    pub fn instance_count(&self) -> usize {
        self.root.instance_count()
    }

    pub fn instances(&self) -> Vec<&PlacedInstance> {
        self.root.instances()
    }

    pub fn save_sync(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    pub fn load_sync(path: &Path) -> Result<Self> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }
}

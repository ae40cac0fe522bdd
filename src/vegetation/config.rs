//! Placement settings.

use serde::{Deserialize, Serialize};

use crate::core::WGS84_SEMI_MAJOR_AXIS;

/// Geographic origin of the world coordinate frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TerrainOrigin {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters; world z is shifted down by this amount.
    pub elevation: f64,
}

/// Configuration for [`VegetationDecorator`](super::VegetationDecorator).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VegetationConfig {
    /// Seed for the per-tile RNG. Zero seeds from entropy.
    pub seed: u64,
    /// Draws per pixel for the best aspect band.
    pub max_looks: u32,
    /// Cap on placed instances per tile.
    pub max_instances_per_tile: usize,
    /// Far end of every leaf group's visible range.
    pub load_distance: f32,
    /// Base visible distance of a single instance.
    pub vege_distance: f32,
    pub detail_multiplier: f32,
    /// Side of the collision bucket grid; a power of two.
    pub bucket_resolution: u32,
    pub semi_major_axis: f64,
    pub origin: TerrainOrigin,
}

impl Default for VegetationConfig {
    fn default() -> Self {
        Self {
            seed: 27,
            max_looks: 1,
            max_instances_per_tile: 5_000_000,
            load_distance: 10_000.0,
            vege_distance: 2.0,
            detail_multiplier: 2.0,
            bucket_resolution: 128,
            semi_major_axis: WGS84_SEMI_MAJOR_AXIS,
            origin: TerrainOrigin::default(),
        }
    }
}

impl VegetationConfig {
    /// Visible distance of one instance, `vege_distance * detail_multiplier` within `[1, 20]`.
    pub fn instance_distance(&self) -> f32 {
        (self.vege_distance * self.detail_multiplier).clamp(1.0, 20.0)
    }

    /// Meters per degree along the equator.
    pub fn meters_per_degree(&self) -> f64 {
        1.0_f64.to_radians() * self.semi_major_axis
    }
}

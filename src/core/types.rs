//! Core type aliases and re-exports

pub use glam::{Quat, Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Standard Result type for the crate
pub type Result<T> = std::result::Result<T, crate::core::error::Error>;

/// Equatorial radius of the WGS84 ellipsoid in meters.
pub const WGS84_SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// Identity of a one-degree terrain tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId {
    pub latitude: i32,
    pub longitude: i32,
}

impl TileId {
    pub fn new(latitude: i32, longitude: i32) -> Self {
        Self { latitude, longitude }
    }

    /// Cell name used to key cache files, e.g. `lat.36_lon.-118`.
    pub fn cell_name(&self) -> String {
        format!("lat.{}_lon.{}", self.latitude, self.longitude)
    }
}

impl std::fmt::Display for TileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.cell_name())
    }
}

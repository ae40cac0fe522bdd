//! Vegetation placement: turns per-class probability images into model
//! instances grouped into a spatial hierarchy for culling.

pub mod config;
pub mod decorator;
pub mod grouping;
pub mod looks;
pub mod model;

pub use config::{TerrainOrigin, VegetationConfig};
pub use decorator::VegetationDecorator;
pub use grouping::{BucketGrid, GroupNode, GroupStats, LodGroup, PlacedInstance, PlacementStats, VegetationScene};
pub use looks::{AspectBand, accepts_vegetation, num_looks, veg_age};
pub use model::{BoundingSphere, LIBRARY_INDEX_FILE, ModelAsset, ModelLibrary, ModelLoader};

//! Landcover - land cover classification analysis and vegetation placement
//! for paged geospatial terrain.
//!
//! [`lcc::LccAnalyzer`] turns a tile's heightfield and classified base color
//! raster into one cached probability image per land cover class.
//! [`vegetation::VegetationDecorator`] samples those images to place model
//! instances and groups them into a quadtree for culling.

pub mod core;
pub mod raster;
pub mod lcc;
pub mod vegetation;
pub mod config;

pub use config::LandCoverConfig;

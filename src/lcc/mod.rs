//! Land cover classification: per-class probability images derived from a
//! classified base color raster and the tile's terrain.
//!
//! For every class the analyzer selects the class's pixels from the base
//! color raster, smooths the selection into a probability image, removes
//! water, and scores the result against the class's elevation and slope
//! limits. Every intermediate raster is cached per tile; the combined image
//! of a class gates the whole chain.

pub mod analyzer;
pub mod cache;
pub mod combine;
pub mod config;
pub mod context;
pub mod histogram;
pub mod lcc_type;

pub use analyzer::{LccAnalyzer, TileAnalysis, TypeOutcome, TypeStatus};
pub use cache::{CacheLayout, CachePolicy};
pub use combine::{CombinedPixel, count_sentinels, make_combined_image};
pub use config::AnalyzerConfig;
pub use context::TileContext;
pub use histogram::LccHistogram;
pub use lcc_type::{LccType, ModelRef, ParamRange, URBAN_INDEX_LIMIT, WATER_INDEX, WATER_RGB};

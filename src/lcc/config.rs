//! Analyzer settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::cache::CachePolicy;
use crate::raster::HeightColorMap;

/// Configuration for [`LccAnalyzer`](super::LccAnalyzer).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Directory holding every tile's cached rasters.
    pub cache_root: PathBuf,
    /// The analysis only runs through the disk cache; disabling it is an error.
    pub caching_enabled: bool,
    /// Extension of cached rasters, with the leading dot.
    pub image_extension: String,
    /// Upper bound on cached raster sides; base color rasters are this size.
    pub max_texture_size: u32,
    /// Multiplier applied to relative elevation before biasing around 128.
    pub relative_elevation_scale: f32,
    pub cache_policy: CachePolicy,
    /// Base color ramp above sea level.
    pub upper_color_map: HeightColorMap,
    /// Base color ramp at and below sea level.
    pub lower_color_map: HeightColorMap,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from("cache"),
            caching_enabled: true,
            image_extension: ".jpg".to_string(),
            max_texture_size: 1024,
            relative_elevation_scale: 1024.0,
            cache_policy: CachePolicy::NeverInvalidate,
            upper_color_map: HeightColorMap::default_upper(),
            lower_color_map: HeightColorMap::default_lower(),
        }
    }
}

impl AnalyzerConfig {
    /// Defaults rooted at `cache_root`.
    pub fn with_cache_root(cache_root: impl Into<PathBuf>) -> Self {
        Self { cache_root: cache_root.into(), ..Self::default() }
    }
}

//! Error types for land cover analysis and vegetation placement

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No LCC types registered")]
    NoLccTypes,

    #[error("No geospecific base images registered")]
    NoGeospecificImages,

    #[error("Caching is disabled; the LCC pipeline has no in-memory path")]
    CachingDisabled,

    #[error("Required cache file missing: {0}")]
    MissingCacheFile(PathBuf),

    #[error("Source and mask image must be of the same dimensions (image {image:?}, mask {mask:?})")]
    DimensionMismatch {
        image: (u32, u32),
        mask: (u32, u32),
    },

    #[error("Height color map must have at least two entries, found {0}")]
    DegenerateColorMap(usize),

    #[error("Geotransform is not invertible (determinant is zero)")]
    DegenerateGeoTransform,

    #[error("Height field must be at least 2x2, got {columns}x{rows}")]
    InvalidHeightField { columns: u32, rows: u32 },

    #[error("Invalid raster format: {0}")]
    InvalidRasterFormat(String),

    #[error("Failed to load model '{name}': {reason}")]
    ModelLoad { name: String, reason: String },

    #[error("Tile {0} appears more than once in a batch")]
    DuplicateTile(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True for failures scoped to a single (tile, type) pair.
    ///
    /// These are reported per type and do not abort the rest of the tile.
    pub fn is_type_scoped(&self) -> bool {
        matches!(self, Error::DimensionMismatch { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_is_type_scoped() {
        let err = Error::DimensionMismatch { image: (64, 64), mask: (32, 32) };
        assert!(err.is_type_scoped());
        assert!(!Error::CachingDisabled.is_type_scoped());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::DegenerateColorMap(1);
        assert!(err.to_string().contains("at least two"));

        let err = Error::MissingCacheFile(PathBuf::from("cache/x.png"));
        assert!(err.to_string().contains("cache/x.png"));
    }
}

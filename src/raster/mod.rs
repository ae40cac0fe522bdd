//! Raster primitives: heightfields, color ramps, georeferenced imagery and
//! the derived/filtered images the land cover analysis is built from.

pub mod buffer;
pub mod color_map;
pub mod derive;
pub mod filter;
pub mod geo;
pub mod heightfield;

pub use buffer::{Gray16Image, ensure_valid_size, load_rgb, save_image};
pub use color_map::HeightColorMap;
pub use derive::{
    make_base_color, make_base_lcc_color, make_height_map_image, make_relative_elevation_image,
    make_slope_aspect_image,
};
pub use filter::{SelectionCounts, apply_mask, make_filtered_image, make_lcc_image};
pub use geo::{GeoPixels, GeoTransform, GeospecificImage};
pub use heightfield::{HeightField, HeightQuery, TileTerrain};

//! Per-tile raster state shared by every class analyzed on that tile.

use std::path::Path;

use image::RgbImage;

use super::cache::CacheLayout;
use super::config::AnalyzerConfig;
use crate::core::{Result, TileId};
use crate::raster::{
    Gray16Image, HeightField, ensure_valid_size, load_rgb, make_height_map_image,
    make_relative_elevation_image, make_slope_aspect_image, save_image,
};

/// Terrain rasters borrowed from a [`TileContext`].
pub struct TerrainRasters<'a> {
    pub height_map: &'a Gray16Image,
    pub slope: &'a RgbImage,
    pub relative_elevation: &'a RgbImage,
}

/// Derived rasters of one tile, each produced at most once and reused by
/// every class. Construct one per tile; [`reset`](Self::reset) drops the
/// rasters without touching the disk cache.
///
/// After [`refresh`](Self::refresh) the cached files of derived rasters are
/// ignored and rewritten. The base color is only rebuilt when asked to,
/// since it may be supplied rather than derived.
pub struct TileContext {
    tile: TileId,
    layout: CacheLayout,
    refresh: bool,
    refresh_base: bool,
    base_color: Option<RgbImage>,
    water_mask: Option<RgbImage>,
    height_map: Option<Gray16Image>,
    slope: Option<RgbImage>,
    relative_elevation: Option<RgbImage>,
}

/// Read `path` if present and `reuse` holds, otherwise build with `make` and write it.
fn load_or_make(
    path: &Path,
    reuse: bool,
    max_size: u32,
    make: impl FnOnce() -> Result<RgbImage>,
) -> Result<RgbImage> {
    if reuse && path.exists() {
        log::debug!("Reading cached {}", path.display());
        return Ok(ensure_valid_size(load_rgb(path)?, max_size));
    }
    let img = ensure_valid_size(make()?, max_size);
    save_image(&img, path)?;
    Ok(img)
}

impl TileContext {
    pub fn new(tile: TileId, layout: CacheLayout) -> Self {
        Self {
            tile,
            layout,
            refresh: false,
            refresh_base: false,
            base_color: None,
            water_mask: None,
            height_map: None,
            slope: None,
            relative_elevation: None,
        }
    }

    pub fn tile(&self) -> TileId {
        self.tile
    }

    pub fn layout(&self) -> &CacheLayout {
        &self.layout
    }

    /// Drop every raster held for this tile.
    pub fn reset(&mut self) {
        self.base_color = None;
        self.water_mask = None;
        self.height_map = None;
        self.slope = None;
        self.relative_elevation = None;
    }

    /// Drop the rasters held so far and rebuild derived ones instead of
    /// reading their cache files. `rebuild_base` extends this to the base color.
    pub fn refresh(&mut self, rebuild_base: bool) {
        self.reset();
        self.refresh = true;
        self.refresh_base = rebuild_base;
    }

    /// Whether cached derived rasters are being ignored.
    pub fn is_refreshing(&self) -> bool {
        self.refresh
    }

    /// Whether a base color raster is in memory or on disk.
    pub fn has_base_color(&self) -> bool {
        self.base_color.is_some() || self.layout.base_color().exists()
    }

    /// Base color raster, read from the cache or built with `make`.
    pub fn base_color(
        &mut self,
        config: &AnalyzerConfig,
        make: impl FnOnce() -> Result<RgbImage>,
    ) -> Result<&RgbImage> {
        let img = match self.base_color.take() {
            Some(img) => img,
            None => {
                log::info!("Preparing base land cover color for {}", self.tile);
                load_or_make(&self.layout.base_color(), !self.refresh_base, config.max_texture_size, make)?
            }
        };
        Ok(self.base_color.insert(img))
    }

    /// Water mask, read from the cache or built from the base color with `make`.
    pub fn water_mask(
        &mut self,
        config: &AnalyzerConfig,
        make_base: impl FnOnce() -> Result<RgbImage>,
        make_mask: impl FnOnce(&RgbImage) -> RgbImage,
    ) -> Result<&RgbImage> {
        let mask = match self.water_mask.take() {
            Some(mask) => mask,
            None => {
                let path = self.layout.water_mask();
                if !self.refresh && path.exists() {
                    log::debug!("Reading cached water mask {}", path.display());
                    load_rgb(&path)?
                } else {
                    let mask = make_mask(self.base_color(config, make_base)?);
                    save_image(&mask, &path)?;
                    mask
                }
            }
        };
        Ok(self.water_mask.insert(mask))
    }

    /// Normalized heights, slope/aspect and relative elevation of `hf`.
    /// Slope and relative elevation go through the disk cache.
    pub fn terrain_rasters(&mut self, hf: &HeightField, config: &AnalyzerConfig) -> Result<TerrainRasters<'_>> {
        let max = config.max_texture_size;
        let reuse = !self.refresh;

        let height_map = match self.height_map.take() {
            Some(h) => h,
            None => make_height_map_image(hf),
        };
        let slope = match self.slope.take() {
            Some(s) => s,
            None => load_or_make(&self.layout.slope(), reuse, max, || Ok(make_slope_aspect_image(hf, max)))?,
        };
        let relative_elevation = match self.relative_elevation.take() {
            Some(r) => r,
            None => load_or_make(&self.layout.relative_elevation(), reuse, max, || {
                Ok(make_relative_elevation_image(hf, config.relative_elevation_scale, max))
            })?,
        };

        Ok(TerrainRasters {
            height_map: self.height_map.insert(height_map),
            slope: self.slope.insert(slope),
            relative_elevation: self.relative_elevation.insert(relative_elevation),
        })
    }

    /// Slope/aspect raster only.
    pub fn slope(&mut self, hf: &HeightField, config: &AnalyzerConfig) -> Result<&RgbImage> {
        Ok(self.terrain_rasters(hf, config)?.slope)
    }
}

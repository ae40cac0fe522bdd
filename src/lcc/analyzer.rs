//! Per-tile land cover analysis: class selection, smoothing, water masking
//! and terrain scoring, cached per (tile, class).

use image::RgbImage;

use super::cache::{CacheLayout, CachePolicy, CacheStamp, Fnv1a};
use super::combine::make_combined_image;
use super::config::AnalyzerConfig;
use super::context::TileContext;
use super::lcc_type::{LccType, WATER_RGB};
use crate::core::{Error, Result, TileId};
use crate::raster::filter::SELECTED;
use crate::raster::{
    GeospecificImage, HeightField, SelectionCounts, apply_mask, ensure_valid_size, load_rgb,
    make_base_lcc_color, make_filtered_image, make_lcc_image, save_image,
};

/// What happened to one class on one tile.
#[derive(Debug)]
pub enum TypeStatus {
    /// A valid combined image was already cached.
    Cached,
    /// The combined image was built and written.
    Computed { selection: Option<SelectionCounts> },
    /// The class failed; other classes were still processed.
    Failed(Error),
}

#[derive(Debug)]
pub struct TypeOutcome {
    pub index: u32,
    pub status: TypeStatus,
}

/// Report of [`LccAnalyzer::analyze`] for one tile.
#[derive(Debug)]
pub struct TileAnalysis {
    pub tile: TileId,
    pub outcomes: Vec<TypeOutcome>,
}

impl TileAnalysis {
    pub fn outcome(&self, index: u32) -> Option<&TypeStatus> {
        self.outcomes.iter().find(|o| o.index == index).map(|o| &o.status)
    }

    pub fn failures(&self) -> impl Iterator<Item = &TypeOutcome> {
        self.outcomes.iter().filter(|o| matches!(o.status, TypeStatus::Failed(_)))
    }

    pub fn cached_count(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o.status, TypeStatus::Cached)).count()
    }

    pub fn computed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o.status, TypeStatus::Computed { .. })).count()
    }
}

/// Produces one combined probability image per (tile, class).
pub struct LccAnalyzer {
    config: AnalyzerConfig,
    types: Vec<LccType>,
    geospecific: Vec<GeospecificImage>,
}

impl LccAnalyzer {
    pub fn new(config: AnalyzerConfig, types: Vec<LccType>) -> Self {
        Self { config, types, geospecific: Vec::new() }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn types(&self) -> &[LccType] {
        &self.types
    }

    pub fn add_type(&mut self, lcc: LccType) {
        self.types.push(lcc);
    }

    pub fn add_geospecific_image(&mut self, image: GeospecificImage) {
        self.geospecific.push(image);
    }

    pub fn geospecific_images(&self) -> &[GeospecificImage] {
        &self.geospecific
    }

    /// Cache layout of `tile`; fails when caching is disabled.
    pub fn layout(&self, tile: TileId) -> Result<CacheLayout> {
        if !self.config.caching_enabled {
            return Err(Error::CachingDisabled);
        }
        Ok(CacheLayout::new(&self.config.cache_root, tile, self.config.image_extension.clone()))
    }

    /// Fresh per-tile context.
    pub fn context(&self, tile: TileId) -> Result<TileContext> {
        Ok(TileContext::new(tile, self.layout(tile)?))
    }

    /// Analyze every class on `tile` with a fresh context.
    pub fn analyze_tile(&self, hf: &HeightField, tile: TileId) -> Result<TileAnalysis> {
        let mut ctx = self.context(tile)?;
        self.analyze(&mut ctx, hf)
    }

    /// Analyze every class on the context's tile.
    ///
    /// Classes whose combined image is valid under the cache policy are
    /// skipped without touching any other raster. Per-class failures such
    /// as mismatched mask sizes are reported in the result; IO failures
    /// abort the tile.
    pub fn analyze(&self, ctx: &mut TileContext, hf: &HeightField) -> Result<TileAnalysis> {
        if self.types.is_empty() {
            return Err(Error::NoLccTypes);
        }

        let layout = ctx.layout().clone();
        let pending: Vec<bool> = self
            .types
            .iter()
            .map(|lcc| {
                let hash = self.inputs_hash(hf, lcc);
                !self.config.cache_policy.is_valid(&layout.combined(lcc.index), &layout.stamp(lcc.index), hash)
            })
            .collect();

        let any_pending = pending.iter().any(|p| *p);
        if any_pending && self.config.cache_policy != CachePolicy::NeverInvalidate {
            log::debug!("Rebuilding derived rasters of {}", ctx.tile());
            ctx.refresh(!self.geospecific.is_empty());
        }

        if any_pending && !ctx.has_base_color() && self.geospecific.is_empty() {
            return Err(Error::NoGeospecificImages);
        }

        let mut outcomes = Vec::with_capacity(self.types.len());
        for (lcc, pending) in self.types.iter().zip(pending) {
            let status = if !pending {
                log::info!("Probability map for class {} on {} is cached", lcc.index, ctx.tile());
                TypeStatus::Cached
            } else {
                match self.build_combined(ctx, hf, lcc) {
                    Ok(selection) => TypeStatus::Computed { selection },
                    Err(e) if e.is_type_scoped() => {
                        log::warn!("Class {} on {} failed: {}", lcc.index, ctx.tile(), e);
                        TypeStatus::Failed(e)
                    }
                    Err(e) => return Err(e),
                }
            };
            outcomes.push(TypeOutcome { index: lcc.index, status });
        }

        Ok(TileAnalysis { tile: ctx.tile(), outcomes })
    }

    /// Cached combined image of class `index`.
    pub fn load_combined(&self, ctx: &TileContext, index: u32) -> Result<RgbImage> {
        let path = ctx.layout().combined(index);
        if !path.exists() {
            return Err(Error::MissingCacheFile(path));
        }
        load_rgb(&path)
    }

    fn make_base_color(&self, hf: &HeightField, tile: TileId) -> Result<RgbImage> {
        if self.geospecific.is_empty() {
            return Err(Error::NoGeospecificImages);
        }
        make_base_lcc_color(
            hf,
            tile,
            self.config.max_texture_size,
            &self.config.upper_color_map,
            &self.config.lower_color_map,
            &self.geospecific,
        )
    }

    /// Smoothed and water-masked class image, read from the cache when present
    /// unless the context is refreshing.
    fn filter_image(
        &self,
        ctx: &mut TileContext,
        hf: &HeightField,
        lcc: &LccType,
    ) -> Result<(RgbImage, Option<SelectionCounts>)> {
        let layout = ctx.layout().clone();
        let filter_path = layout.filter(lcc.index);
        let reuse = !ctx.is_refreshing();
        if reuse && filter_path.exists() {
            log::debug!("Reading cached filter {}", filter_path.display());
            return Ok((load_rgb(&filter_path)?, None));
        }

        let tile = ctx.tile();
        let config = &self.config;
        let make_base = || self.make_base_color(hf, tile);
        let make_water = |base: &RgbImage| make_filtered_image(&make_lcc_image(base, WATER_RGB).0, SELECTED);

        if lcc.is_water() {
            let mask = ctx.water_mask(config, make_base, make_water)?.clone();
            return Ok((mask, None));
        }

        let lcc_path = layout.lcc_image(lcc.index);
        let (selector, selection) = if reuse && lcc_path.exists() {
            (load_rgb(&lcc_path)?, None)
        } else {
            let (img, counts) = make_lcc_image(ctx.base_color(config, make_base)?, lcc.rgb);
            log::info!("Class {} '{}': hits = {}, misses = {}", lcc.index, lcc.name, counts.hits, counts.misses);
            save_image(&img, &lcc_path)?;
            (img, Some(counts))
        };

        log::info!("Smoothing class {} on {}", lcc.index, tile);
        let filtered = make_filtered_image(&selector, SELECTED);
        let mask = ctx.water_mask(config, || self.make_base_color(hf, tile), make_water)?;
        let masked = ensure_valid_size(apply_mask(&filtered, mask)?, config.max_texture_size);
        save_image(&masked, &filter_path)?;

        Ok((masked, selection))
    }

    fn build_combined(
        &self,
        ctx: &mut TileContext,
        hf: &HeightField,
        lcc: &LccType,
    ) -> Result<Option<SelectionCounts>> {
        let (filter, selection) = self.filter_image(ctx, hf, lcc)?;

        let tile = ctx.tile();
        let layout = ctx.layout().clone();
        let terrain = ctx.terrain_rasters(hf, &self.config)?;
        log::info!("Making probability map for class {} on {}", lcc.index, tile);

        let combined = ensure_valid_size(
            make_combined_image(lcc, &filter, terrain.height_map, terrain.slope, terrain.relative_elevation),
            self.config.max_texture_size,
        );
        save_image(&combined, &layout.combined(lcc.index))?;
        CacheStamp::new(self.inputs_hash(hf, lcc)).save_sync(&layout.stamp(lcc.index))?;

        Ok(selection)
    }

    /// Hash of everything a class's combined image depends on.
    pub fn inputs_hash(&self, hf: &HeightField, lcc: &LccType) -> u64 {
        let mut h = Fnv1a::default();
        h.write(&hf.columns().to_le_bytes());
        h.write(&hf.rows().to_le_bytes());
        h.write_f32s(&[hf.x_interval(), hf.y_interval()]);
        h.write_f32s(hf.samples());
        h.write(&serde_json::to_vec(lcc).unwrap_or_default());
        h.write(self.config.image_extension.as_bytes());
        h.write(&self.config.max_texture_size.to_le_bytes());
        h.write(&self.config.relative_elevation_scale.to_le_bytes());
        h.write(&serde_json::to_vec(&self.config.upper_color_map).unwrap_or_default());
        h.write(&serde_json::to_vec(&self.config.lower_color_map).unwrap_or_default());
        h.write(&(self.geospecific.len() as u32).to_le_bytes());
        h.finish()
    }
}

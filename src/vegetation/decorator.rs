//! Stochastic placement of model instances over per-class probability images.

use std::collections::{HashMap, HashSet};
use std::f32::consts::TAU;

use glam::Vec3;
use image::RgbImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use super::config::VegetationConfig;
use super::grouping::{BucketGrid, PlacedInstance, PlacementStats, VegetationScene};
use super::looks::{AspectBand, accepts_vegetation, num_looks, veg_age};
use super::model::{ModelAsset, ModelLoader};
use crate::core::{Error, Result, TileId};
use crate::lcc::{LccAnalyzer, LccType, TileContext, TypeStatus};
use crate::raster::buffer::map_pixel;
use crate::raster::{HeightField, HeightQuery, TileTerrain};

/// A class's loaded model with its configured base scale.
struct Placeable<'a> {
    index: usize,
    asset: &'a ModelAsset,
    scale: f32,
}

/// Places vegetation on tiles using the probability images of an [`LccAnalyzer`].
///
/// Models are resolved once through a [`ModelLoader`] and cached for the
/// decorator's lifetime; a model that fails to load is skipped.
pub struct VegetationDecorator {
    config: VegetationConfig,
    analyzer: LccAnalyzer,
    /// Resolved models by name; `None` records a failed load.
    assets: HashMap<String, Option<ModelAsset>>,
}

impl VegetationDecorator {
    pub fn new(config: VegetationConfig, analyzer: LccAnalyzer) -> Self {
        Self {
            config,
            analyzer,
            assets: HashMap::new(),
        }
    }

    pub fn config(&self) -> &VegetationConfig {
        &self.config
    }

    pub fn analyzer(&self) -> &LccAnalyzer {
        &self.analyzer
    }

    pub fn analyzer_mut(&mut self) -> &mut LccAnalyzer {
        &mut self.analyzer
    }

    /// Classes in the order they are placed: reverse declaration order.
    pub fn placement_order(&self) -> impl Iterator<Item = &LccType> {
        self.analyzer.types().iter().rev()
    }

    /// Load every model not tried yet. Returns the number of usable models.
    pub fn resolve_models(&mut self, loader: &dyn ModelLoader) -> usize {
        for lcc in self.analyzer.types() {
            for model in &lcc.models {
                if self.assets.contains_key(&model.name) {
                    continue;
                }
                let asset = match loader.load(&model.name) {
                    Ok(asset) => Some(asset),
                    Err(e) => {
                        log::error!("Skipping model '{}' of class {}: {}", model.name, lcc.index, e);
                        None
                    }
                };
                self.assets.insert(model.name.clone(), asset);
            }
        }
        self.assets.values().filter(|a| a.is_some()).count()
    }

    fn placeables<'a>(&'a self, lcc: &LccType) -> Vec<Placeable<'a>> {
        lcc.models
            .iter()
            .enumerate()
            .filter_map(|(index, model)| {
                let asset = self.assets.get(&model.name)?.as_ref()?;
                Some(Placeable { index, asset, scale: model.scale })
            })
            .collect()
    }

    /// World position of the south-west corner of `tile`.
    pub fn cell_origin(&self, tile: TileId) -> Vec3 {
        let a = self.config.semi_major_axis;
        let origin = &self.config.origin;
        let x = (tile.longitude as f64 - origin.longitude.floor()).to_radians() * a;
        let y = (tile.latitude as f64 - origin.latitude.floor()).to_radians() * a;
        Vec3::new(x as f32, y as f32, -origin.elevation as f32)
    }

    /// World width of one pixel of a `image_width` wide probability image.
    pub fn cell_size(&self, image_width: u32) -> f32 {
        (self.config.meters_per_degree() / image_width.max(1) as f64) as f32
    }

    /// Terrain query spanning `tile` for `hf`.
    pub fn tile_terrain<'a>(&self, tile: TileId, hf: &'a HeightField) -> TileTerrain<'a> {
        TileTerrain::new(hf, self.cell_origin(tile), self.config.meters_per_degree() as f32)
    }

    fn rng(&self) -> StdRng {
        match self.config.seed {
            0 => StdRng::from_entropy(),
            seed => StdRng::seed_from_u64(seed),
        }
    }

    /// Analyze `tile` and place vegetation on it.
    pub fn decorate_tile(
        &mut self,
        tile: TileId,
        hf: &HeightField,
        terrain: &dyn HeightQuery,
        loader: &dyn ModelLoader,
    ) -> Result<VegetationScene> {
        self.resolve_models(loader);
        let mut ctx = self.analyzer.context(tile)?;
        self.place(&mut ctx, hf, terrain)
    }

    /// Decorate several tiles in parallel, one context and RNG per tile.
    ///
    /// Fails up front when a tile appears twice; otherwise returns each
    /// tile's own result.
    pub fn decorate_tiles(
        &mut self,
        tiles: &[(TileId, &HeightField)],
        loader: &dyn ModelLoader,
    ) -> Result<Vec<(TileId, Result<VegetationScene>)>> {
        let mut seen = HashSet::new();
        for (tile, _) in tiles {
            if !seen.insert(*tile) {
                return Err(Error::DuplicateTile(tile.to_string()));
            }
        }

        self.resolve_models(loader);
        let start = std::time::Instant::now();
        let this = &*self;
        let results: Vec<_> = tiles
            .par_iter()
            .map(|&(tile, hf)| {
                let terrain = this.tile_terrain(tile, hf);
                let scene = this.analyzer.context(tile).and_then(|mut ctx| this.place(&mut ctx, hf, &terrain));
                (tile, scene)
            })
            .collect();

        log::info!("Decorated {} tiles in {:.1}s", results.len(), start.elapsed().as_secs_f64());
        Ok(results)
    }

    /// Run the analysis on `ctx`'s tile, then place every class with loaded models.
    pub fn place(&self, ctx: &mut TileContext, hf: &HeightField, terrain: &dyn HeightQuery) -> Result<VegetationScene> {
        let tile = ctx.tile();
        let analysis = self.analyzer.analyze(ctx, hf)?;
        let slope = ctx.slope(hf, self.analyzer.config())?.clone();

        let mut rng = self.rng();
        let mut grid = BucketGrid::new(self.config.bucket_resolution, self.config.load_distance);
        let mut stats = PlacementStats::default();
        let origin = self.cell_origin(tile);

        for lcc in self.placement_order() {
            let models = self.placeables(lcc);
            if models.is_empty() {
                log::debug!("Class {} has no loaded models", lcc.index);
                continue;
            }
            if let Some(TypeStatus::Failed(e)) = analysis.outcome(lcc.index) {
                log::warn!("Not placing class {} on {}: {}", lcc.index, tile, e);
                continue;
            }

            let combined = self.analyzer.load_combined(ctx, lcc.index)?;
            let before = grid.instance_count();
            let pass = TypePass {
                lcc,
                models: &models,
                combined: &combined,
                slope: &slope,
                origin,
                terrain,
            };
            self.place_type(&pass, &mut grid, &mut rng, &mut stats);

            let placed = grid.instance_count() - before;
            log::info!("Placed {} instances of class {} '{}' on {}", placed, lcc.index, lcc.name, tile);
            stats.placed.push((lcc.index, placed));
            if stats.capped {
                log::warn!("Instance cap {} reached on {}", self.config.max_instances_per_tile, tile);
                break;
            }
        }

        stats.groups = grid.stats();
        log::info!(
            "{}: {} groups, children min {} max {} avg {:.1}",
            tile,
            stats.groups.group_count,
            stats.groups.min_children,
            stats.groups.max_children,
            stats.groups.average_children
        );

        Ok(VegetationScene {
            tile,
            root: grid.into_tree(tile.cell_name()),
            stats,
        })
    }

    fn place_type(&self, pass: &TypePass<'_>, grid: &mut BucketGrid, rng: &mut StdRng, stats: &mut PlacementStats) {
        let lcc = pass.lcc;
        let (width, height) = pass.combined.dimensions();
        let cell = self.cell_size(width);
        let urban = lcc.is_urban();
        let visible_range = (0.0, self.config.instance_distance());

        for y in 0..height {
            for x in 0..width {
                let pixel = pass.combined.get_pixel(x, y).0;
                let (sx, sy) = map_pixel(x, y, (width, height), pass.slope.dimensions());
                let slope_pixel = pass.slope.get_pixel(sx, sy).0;
                let looks = num_looks(pixel, slope_pixel, lcc.aspect, self.config.max_looks, lcc.slope.max);

                for _ in 0..looks {
                    let limit = (255.0 * rng.r#gen::<f32>()) as u8;
                    if !accepts_vegetation(pixel, limit) {
                        continue;
                    }
                    if grid.instance_count() >= self.config.max_instances_per_tile {
                        stats.capped = true;
                        return;
                    }

                    let rx = rng.r#gen::<f32>() - 0.5;
                    let ry = rng.r#gen::<f32>() - 0.5;
                    let mut rh = rng.r#gen::<f32>();
                    let rs = rng.r#gen::<f32>() * 0.5;
                    let pick = ((rng.r#gen::<f32>() * pass.models.len() as f32) as usize).min(pass.models.len() - 1);
                    let aspect = slope_pixel[2] as f32 / 255.0 * 360.0;
                    let age = veg_age(AspectBand::classify(aspect, lcc.aspect), rng.r#gen());

                    let model = &pass.models[pick];
                    let scale = if urban {
                        rh = (rh * 4.0).floor() / 4.0;
                        Vec3::ONE
                    } else {
                        let s = model.scale;
                        Vec3::new(1.5 * s + rs, 1.5 * s + rs, s + rs)
                    };
                    let yaw = TAU * rh;

                    let wx = pass.origin.x + (x as f32 + 0.5 + rx * 0.95) * cell;
                    let wy = pass.origin.y + (y as f32 + 0.5 + ry * 0.95) * cell;
                    let wz = pass.terrain.height_at(wx, wy) + lcc.ground_offset();
                    let position = Vec3::new(wx, wy, wz);

                    let bucket = grid.bucket_of(x, y, width, height);
                    let instance = PlacedInstance {
                        position,
                        yaw,
                        scale,
                        lcc_index: lcc.index,
                        model_index: model.index,
                        bucket,
                        age,
                        bounds: model.asset.bounds.transformed(position, yaw, scale),
                        visible_range,
                    };
                    if !grid.try_insert(instance, urban) {
                        stats.rejected += 1;
                    }
                }
            }
        }
    }
}

/// Inputs for placing one class on one tile.
struct TypePass<'a> {
    lcc: &'a LccType,
    models: &'a [Placeable<'a>],
    combined: &'a RgbImage,
    slope: &'a RgbImage,
    origin: Vec3,
    terrain: &'a dyn HeightQuery,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lcc::AnalyzerConfig;
    use crate::raster::save_image;
    use crate::vegetation::model::ModelLibrary;
    use image::Rgb;
    use std::path::Path;

    const RED: [u8; 3] = [200, 0, 0];
    const BLUE: [u8; 3] = [0, 0, 200];

    fn analyzer(dir: &Path, types: Vec<LccType>) -> LccAnalyzer {
        let config = AnalyzerConfig {
            image_extension: ".png".into(),
            max_texture_size: 64,
            ..AnalyzerConfig::with_cache_root(dir)
        };
        LccAnalyzer::new(config, types)
    }

    fn library() -> ModelLibrary {
        let mut lib = ModelLibrary::new();
        lib.insert("tree", [0.0, 0.0, 2.0], 2.0);
        lib.insert("house", [0.0, 0.0, 1.0], 1.0);
        lib
    }

    /// Left half red, right half blue.
    fn paint_base(analyzer: &LccAnalyzer, tile: TileId) {
        let base = RgbImage::from_fn(64, 64, |x, _| if x < 32 { Rgb(RED) } else { Rgb(BLUE) });
        save_image(&base, &analyzer.layout(tile).unwrap().base_color()).unwrap();
    }

    fn forest() -> LccType {
        LccType::new(41, "forest", RED).with_elevation(0.0, 1000.0).with_model("tree", 1.0)
    }

    fn decorator(dir: &Path, types: Vec<LccType>, seed: u64) -> VegetationDecorator {
        let config = VegetationConfig { seed, max_looks: 2, bucket_resolution: 16, ..Default::default() };
        VegetationDecorator::new(config, analyzer(dir, types))
    }

    #[test]
    fn test_placement_order_is_reversed() {
        let dir = tempfile::tempdir().unwrap();
        let types = vec![LccType::new(1, "a", RED), LccType::new(2, "b", BLUE), LccType::new(3, "c", RED)];
        let decorator = decorator(dir.path(), types, 1);
        let order: Vec<u32> = decorator.placement_order().map(|t| t.index).collect();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[test]
    fn test_missing_models_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let lcc = forest().with_model("missing", 1.0);
        let mut decorator = decorator(dir.path(), vec![lcc], 1);
        assert_eq!(decorator.resolve_models(&library()), 1);
        let lcc = &decorator.analyzer().types()[0];
        let models = decorator.placeables(lcc);
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].index, 0);
    }

    #[test]
    fn test_cell_origin() {
        let dir = tempfile::tempdir().unwrap();
        let mut decorator = decorator(dir.path(), vec![forest()], 1);
        decorator.config.origin.latitude = 36.5;
        decorator.config.origin.longitude = -118.5;
        decorator.config.origin.elevation = 100.0;
        let origin = decorator.cell_origin(TileId::new(36, -118));
        let per_degree = decorator.config.meters_per_degree() as f32;
        assert!((origin.x - per_degree).abs() < 1.0);
        assert!(origin.y.abs() < 1e-3);
        assert_eq!(origin.z, -100.0);
        assert!((decorator.cell_size(64) - per_degree / 64.0).abs() < 1e-2);
    }

    #[test]
    fn test_places_only_on_selected_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let mut decorator = decorator(dir.path(), vec![forest()], 42);
        let tile = TileId::new(0, 0);
        paint_base(decorator.analyzer(), tile);
        let hf = HeightField::flat(64, 64, 30.0, 100.0).unwrap();
        let terrain = decorator.tile_terrain(tile, &hf);

        let scene = decorator.decorate_tile(tile, &hf, &terrain, &library()).unwrap();
        assert!(scene.instance_count() > 0);
        assert_eq!(scene.stats.placed, vec![(41, scene.instance_count())]);

        // Smoothing bleeds at most two pixels past the class boundary at x = 32
        let limit = decorator.cell_size(64) * 34.0;
        for inst in scene.instances() {
            assert!(inst.position.x < limit, "instance east of the class boundary: {:?}", inst.position);
            assert!((inst.position.z - 99.25).abs() < 1e-3);
            assert_eq!(inst.visible_range, (0.0, 4.0));
            assert!(inst.age <= 2);
            // Non-urban scale jitter keeps x and y equal and above the base scale
            assert_eq!(inst.scale.x, inst.scale.y);
            assert!(inst.scale.z >= 1.0 && inst.scale.z < 1.5);
        }
    }

    #[test]
    fn test_urban_instances_snap_heading() {
        let dir = tempfile::tempdir().unwrap();
        let houses = LccType::new(21, "town", RED).with_model("house", 1.0);
        let mut decorator = decorator(dir.path(), vec![houses], 7);
        let tile = TileId::new(0, 0);
        paint_base(decorator.analyzer(), tile);
        let hf = HeightField::flat(64, 64, 30.0, 0.0).unwrap();
        let terrain = decorator.tile_terrain(tile, &hf);

        let scene = decorator.decorate_tile(tile, &hf, &terrain, &library()).unwrap();
        assert!(scene.instance_count() > 0);
        for inst in scene.instances() {
            let quarter = inst.yaw / (TAU / 4.0);
            assert!((quarter - quarter.round()).abs() < 1e-4);
            assert_eq!(inst.scale, Vec3::ONE);
            assert!((inst.position.z + 0.1).abs() < 1e-4);
        }
    }

    #[test]
    fn test_same_seed_same_scene() {
        let hf = HeightField::flat(64, 64, 30.0, 100.0).unwrap();
        let tile = TileId::new(0, 0);
        let mut scenes = Vec::new();
        for _ in 0..2 {
            let dir = tempfile::tempdir().unwrap();
            let mut decorator = decorator(dir.path(), vec![forest()], 42);
            paint_base(decorator.analyzer(), tile);
            let terrain = decorator.tile_terrain(tile, &hf);
            scenes.push(decorator.decorate_tile(tile, &hf, &terrain, &library()).unwrap());
        }
        assert_eq!(scenes[0], scenes[1]);
    }

    #[test]
    fn test_instance_cap() {
        let dir = tempfile::tempdir().unwrap();
        let mut decorator = decorator(dir.path(), vec![forest()], 3);
        decorator.config.max_instances_per_tile = 10;
        let tile = TileId::new(0, 0);
        paint_base(decorator.analyzer(), tile);
        let hf = HeightField::flat(64, 64, 30.0, 100.0).unwrap();
        let terrain = decorator.tile_terrain(tile, &hf);
        let scene = decorator.decorate_tile(tile, &hf, &terrain, &library()).unwrap();
        assert_eq!(scene.instance_count(), 10);
        assert!(scene.stats.capped);
    }

    #[test]
    fn test_class_without_models_places_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let bare = LccType::new(41, "bare", RED).with_model("missing", 1.0);
        let mut decorator = decorator(dir.path(), vec![bare], 3);
        let tile = TileId::new(0, 0);
        paint_base(decorator.analyzer(), tile);
        let hf = HeightField::flat(64, 64, 30.0, 100.0).unwrap();
        let terrain = decorator.tile_terrain(tile, &hf);
        let scene = decorator.decorate_tile(tile, &hf, &terrain, &library()).unwrap();
        assert_eq!(scene.instance_count(), 0);
        assert!(scene.stats.placed.is_empty());
    }

    #[test]
    fn test_decorate_tiles_rejects_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let mut decorator = decorator(dir.path(), vec![forest()], 3);
        let hf = HeightField::flat(16, 16, 30.0, 100.0).unwrap();
        let tile = TileId::new(1, 1);
        let result = decorator.decorate_tiles(&[(tile, &hf), (tile, &hf)], &library());
        assert!(matches!(result, Err(Error::DuplicateTile(name)) if name == "lat.1_lon.1"));
    }

    #[test]
    fn test_decorate_tiles_in_parallel() {
        let dir = tempfile::tempdir().unwrap();
        let mut decorator = decorator(dir.path(), vec![forest()], 9);
        let tiles = [TileId::new(0, 0), TileId::new(0, 1), TileId::new(1, 0)];
        for tile in tiles {
            paint_base(decorator.analyzer(), tile);
        }
        let hf = HeightField::flat(64, 64, 30.0, 100.0).unwrap();
        let input: Vec<_> = tiles.iter().map(|t| (*t, &hf)).collect();

        let results = decorator.decorate_tiles(&input, &library()).unwrap();
        assert_eq!(results.len(), 3);
        let counts: Vec<usize> = results.iter().map(|(_, r)| r.as_ref().unwrap().instance_count()).collect();
        // Same seed and same inputs on every tile
        assert!(counts.iter().all(|c| *c == counts[0] && *c > 0));
        assert_eq!(results[1].0, TileId::new(0, 1));
    }
}

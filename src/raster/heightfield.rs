//! Dense elevation grids and world-space height queries.

use std::path::Path;

use glam::Vec3;
use noise::{Fbm, MultiFractal, NoiseFn, Perlin};

use crate::core::{Error, Result};

/// Row-major grid of elevation samples in meters.
///
/// Column index runs along X (longitude), row index along Y (latitude).
#[derive(Clone, Debug)]
pub struct HeightField {
    columns: u32,
    rows: u32,
    x_interval: f32,
    y_interval: f32,
    heights: Vec<f32>,
}

impl HeightField {
    /// Create a heightfield from row-major samples.
    pub fn new(columns: u32, rows: u32, x_interval: f32, y_interval: f32, heights: Vec<f32>) -> Result<Self> {
        if columns < 2 || rows < 2 {
            return Err(Error::InvalidHeightField { columns, rows });
        }
        if heights.len() != (columns as usize) * (rows as usize) {
            return Err(Error::Config(format!(
                "heightfield {}x{} needs {} samples, got {}",
                columns, rows, columns as usize * rows as usize, heights.len()
            )));
        }
        Ok(Self { columns, rows, x_interval, y_interval, heights })
    }

    /// Create a heightfield with every sample set to `height`.
    pub fn flat(columns: u32, rows: u32, interval: f32, height: f32) -> Result<Self> {
        let len = columns as usize * rows as usize;
        Self::new(columns, rows, interval, interval, vec![height; len])
    }

    /// Build a heightfield by evaluating `f(column, row)` at every sample.
    pub fn from_fn(
        columns: u32,
        rows: u32,
        x_interval: f32,
        y_interval: f32,
        mut f: impl FnMut(u32, u32) -> f32,
    ) -> Result<Self> {
        let mut heights = Vec::with_capacity(columns as usize * rows as usize);
        for r in 0..rows {
            for c in 0..columns {
                heights.push(f(c, r));
            }
        }
        Self::new(columns, rows, x_interval, y_interval, heights)
    }

    /// Fractal noise terrain, mapped to `[0, height_scale]` meters.
    pub fn from_noise(columns: u32, rows: u32, interval: f32, seed: u32, height_scale: f32) -> Result<Self> {
        let noise = Fbm::<Perlin>::new(seed)
            .set_octaves(5)
            .set_persistence(0.5)
            .set_lacunarity(2.0);
        let scale = (columns.max(rows) as f64) / 4.0;

        Self::from_fn(columns, rows, interval, interval, |c, r| {
            let n = noise.get([c as f64 / scale, r as f64 / scale]);
            (((n + 1.0) / 2.0) * height_scale as f64) as f32
        })
    }

    /// Load a 16-bit grayscale raster as elevations: `value * vertical_scale + offset`.
    pub fn load_png16(path: &Path, interval: f32, vertical_scale: f32, offset: f32) -> Result<Self> {
        let img = image::open(path)?.to_luma16();
        let (columns, rows) = img.dimensions();
        let heights = img.pixels().map(|p| p.0[0] as f32 * vertical_scale + offset).collect();
        Self::new(columns, rows, interval, interval, heights)
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Sample spacing along X.
    pub fn x_interval(&self) -> f32 {
        self.x_interval
    }

    /// Sample spacing along Y.
    pub fn y_interval(&self) -> f32 {
        self.y_interval
    }

    /// Height at a grid sample. Out-of-range indices are clamped to the edge.
    pub fn height(&self, column: i64, row: i64) -> f32 {
        let c = column.clamp(0, self.columns as i64 - 1) as usize;
        let r = row.clamp(0, self.rows as i64 - 1) as usize;
        self.heights[r * self.columns as usize + c]
    }

    /// Bilinear height at fractional grid coordinates `(s, t)`.
    pub fn interpolated_height(&self, s: f64, t: f64) -> f32 {
        let s = s.clamp(0.0, (self.columns - 1) as f64);
        let t = t.clamp(0.0, (self.rows - 1) as f64);

        let fx = s.floor() as i64;
        let fy = t.floor() as i64;
        let cx = s.ceil() as i64;
        let cy = t.ceil() as i64;

        let v1 = self.height(fx, fy) as f64;
        let v2 = self.height(cx, fy) as f64;
        let v3 = self.height(fx, cy) as f64;
        let v4 = self.height(cx, cy) as f64;

        let v12 = v1 + (v2 - v1) * (s - fx as f64);
        let v34 = v3 + (v4 - v3) * (s - fx as f64);
        (v12 + (v34 - v12) * (t - fy as f64)) as f32
    }

    /// Minimum and maximum sample.
    pub fn height_range(&self) -> (f32, f32) {
        let min = self.heights.iter().copied().fold(f32::INFINITY, f32::min);
        let max = self.heights.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        (min, max)
    }

    /// Raw samples, row-major.
    pub fn samples(&self) -> &[f32] {
        &self.heights
    }
}

/// World-space terrain height lookup used when placing objects.
pub trait HeightQuery: Send + Sync {
    /// Terrain height at world `(x, y)`.
    fn height_at(&self, x: f32, y: f32) -> f32;
}

/// A heightfield stretched over one tile's world-space footprint.
pub struct TileTerrain<'a> {
    heightfield: &'a HeightField,
    origin: Vec3,
    extent: f32,
}

impl<'a> TileTerrain<'a> {
    /// `origin` is the world position of the tile's south-west corner
    /// (its z is added to every height); `extent` is the tile width in meters.
    pub fn new(heightfield: &'a HeightField, origin: Vec3, extent: f32) -> Self {
        Self { heightfield, origin, extent }
    }
}

impl HeightQuery for TileTerrain<'_> {
    fn height_at(&self, x: f32, y: f32) -> f32 {
        let hf = self.heightfield;
        let s = ((x - self.origin.x) / self.extent) as f64 * (hf.columns() - 1) as f64;
        let t = ((y - self.origin.y) / self.extent) as f64 * (hf.rows() - 1) as f64;
        hf.interpolated_height(s, t) + self.origin.z
    }
}

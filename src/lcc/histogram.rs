//! Hit/miss histograms of a raster against a class selector image.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use image::RgbImage;

use crate::core::{Error, Result};

/// Number of bins; with a bin size of 5 they span the byte range.
pub const HISTOGRAM_BINS: usize = 51;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LccHistogram {
    pub hits: u64,
    pub misses: u64,
    pub hit_bins: [u64; HISTOGRAM_BINS],
    pub miss_bins: [u64; HISTOGRAM_BINS],
}

impl LccHistogram {
    /// Bin the first channel of `image` by `bin_size`, split on whether the
    /// selector pixel is black (a hit). Values past the last bin land in it.
    pub fn compute(selector: &RgbImage, image: &RgbImage, bin_size: u32) -> Result<Self> {
        if bin_size == 0 {
            return Err(Error::Config("histogram bin size must be positive".into()));
        }
        if selector.dimensions() != image.dimensions() {
            return Err(Error::DimensionMismatch { image: image.dimensions(), mask: selector.dimensions() });
        }

        let mut h = Self {
            hits: 0,
            misses: 0,
            hit_bins: [0; HISTOGRAM_BINS],
            miss_bins: [0; HISTOGRAM_BINS],
        };
        for (s, p) in selector.pixels().zip(image.pixels()) {
            let bin = ((p.0[0] as u32 / bin_size) as usize).min(HISTOGRAM_BINS - 1);
            if s.0[0] == 0 {
                h.hits += 1;
                h.hit_bins[bin] += 1;
            } else {
                h.misses += 1;
                h.miss_bins[bin] += 1;
            }
        }
        Ok(h)
    }

    /// CSV body: title line, totals line, header, one row per bin.
    pub fn to_csv(&self, title: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", title);
        let _ = writeln!(out, "hits = {}, misses = {}", self.hits, self.misses);
        let _ = writeln!(out, "bin#, hitbin, missbin");
        for i in 0..HISTOGRAM_BINS {
            let _ = writeln!(out, "{}, {}, {}", i, self.hit_bins[i], self.miss_bins[i]);
        }
        out
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_csv(&path.display().to_string()))?;
        log::info!("Wrote histogram {} (hits = {}, misses = {})", path.display(), self.hits, self.misses);
        Ok(())
    }
}

//! Georeferenced land cover imagery.

use std::fs;
use std::path::Path;

use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// Affine pixel-to-geographic transform.
///
/// `lon = g0 + g1 * px + g2 * py`, `lat = g3 + g4 * px + g5 * py`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// North-up transform with the top-left corner at `(west, north)`.
    pub fn north_up(west: f64, north: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self([west, pixel_width, 0.0, north, 0.0, -pixel_height])
    }

    /// Parse a six-line world file (`A D B E C F`, pixel-center origin).
    pub fn from_world_file(text: &str) -> Result<Self> {
        let values: Vec<f64> = text
            .split_whitespace()
            .map(|v| v.parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Config(format!("bad world file value: {}", e)))?;
        let &[a, d, b, e, c, f] = values.as_slice() else {
            return Err(Error::Config(format!("world file needs 6 values, got {}", values.len())));
        };
        Ok(Self([c - a / 2.0 - b / 2.0, a, b, f - d / 2.0 - e / 2.0, d, e]))
    }

    /// Geographic `(lon, lat)` of pixel coordinates.
    pub fn apply(&self, px: f64, py: f64) -> (f64, f64) {
        let g = &self.0;
        (g[0] + g[1] * px + g[2] * py, g[3] + g[4] * px + g[5] * py)
    }

    /// Transform from geographic `(lon, lat)` back to pixel coordinates.
    pub fn inverse(&self) -> Result<GeoTransform> {
        let g = &self.0;
        let d = g[1] * g[5] - g[2] * g[4];
        if d == 0.0 || !d.is_finite() {
            return Err(Error::DegenerateGeoTransform);
        }
        Ok(Self([
            (g[2] * g[3] - g[5] * g[0]) / d,
            g[5] / d,
            -g[2] / d,
            (g[4] * g[0] - g[1] * g[3]) / d,
            -g[4] / d,
            g[1] / d,
        ]))
    }
}

/// Pixel storage of a geospecific image.
#[derive(Clone, Debug)]
pub enum GeoPixels {
    /// Single channel; multiplies the synthesized color.
    Luminance(GrayImage),
    /// Replaces the synthesized color.
    Rgb(RgbImage),
}

impl GeoPixels {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            GeoPixels::Luminance(img) => img.dimensions(),
            GeoPixels::Rgb(img) => img.dimensions(),
        }
    }
}

/// An image with a known geographic footprint and its integer-degree bounds.
#[derive(Clone, Debug)]
pub struct GeospecificImage {
    pub pixels: GeoPixels,
    pub transform: GeoTransform,
    pub inverse: GeoTransform,
    pub min_latitude: i32,
    pub max_latitude: i32,
    pub min_longitude: i32,
    pub max_longitude: i32,
}

impl GeospecificImage {
    pub fn new(pixels: GeoPixels, transform: GeoTransform) -> Result<Self> {
        let inverse = transform.inverse()?;
        let (w, h) = pixels.dimensions();
        let g = &transform.0;

        Ok(Self {
            min_longitude: g[0].floor() as i32,
            max_longitude: (g[0] + g[1] * w as f64).ceil() as i32,
            max_latitude: g[3].ceil() as i32,
            min_latitude: (g[3] + g[5] * h as f64).floor() as i32,
            pixels,
            transform,
            inverse,
        })
    }

    /// Load an image file with an explicit transform. Single channel
    /// images stay luminance, everything else becomes RGB.
    pub fn load(path: &Path, transform: GeoTransform) -> Result<Self> {
        let img = image::open(path)?;
        let pixels = match img.color() {
            image::ColorType::L8 | image::ColorType::L16 => GeoPixels::Luminance(img.to_luma8()),
            _ => GeoPixels::Rgb(img.to_rgb8()),
        };
        log::info!("Loaded geospecific image {} ({}x{})", path.display(), img.width(), img.height());
        Self::new(pixels, transform)
    }

    /// Load an image whose transform lives in a `.wld` sidecar, or the
    /// extension-specific variant (`.jgw`, `.pgw`, `.tfw`).
    pub fn load_with_world_file(path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_ascii_lowercase();
        let short = match ext.as_str() {
            "jpg" | "jpeg" => Some("jgw"),
            "png" => Some("pgw"),
            "tif" | "tiff" => Some("tfw"),
            _ => None,
        };
        let candidates = short.into_iter().chain(std::iter::once("wld"));

        for sidecar in candidates.map(|e| path.with_extension(e)) {
            if sidecar.exists() {
                let transform = GeoTransform::from_world_file(&fs::read_to_string(&sidecar)?)?;
                return Self::load(path, transform);
            }
        }
        Err(Error::Config(format!("no world file next to {}", path.display())))
    }

    /// Whether the integer-degree tile at `(latitude, longitude)` falls in the bounds.
    pub fn covers(&self, latitude: i32, longitude: i32) -> bool {
        latitude >= self.min_latitude
            && latitude <= self.max_latitude
            && longitude >= self.min_longitude
            && longitude <= self.max_longitude
    }

    /// Apply this image's pixel at `(lon, lat)` to `color`.
    ///
    /// Luminance multiplies, RGB replaces. Positions whose surrounding
    /// pixels fall outside the image leave `color` untouched.
    pub fn blend(&self, lon: f64, lat: f64, color: &mut [f32; 3]) {
        let (x, y) = self.inverse.apply(lon, lat);
        let (w, h) = self.pixels.dimensions();

        if x.floor() < 0.0 || y.floor() < 0.0 || x.ceil() >= w as f64 || y.ceil() >= h as f64 {
            return;
        }
        let (ix, iy) = (x as u32, y as u32);

        match &self.pixels {
            GeoPixels::Luminance(img) => {
                let l = img.get_pixel(ix, iy).0[0] as f32 / 255.0;
                color.iter_mut().for_each(|c| *c *= l);
            }
            GeoPixels::Rgb(img) => {
                let p = img.get_pixel(ix, iy).0;
                *color = [p[0] as f32 / 255.0, p[1] as f32 / 255.0, p[2] as f32 / 255.0];
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_round_trips() {
        let t = GeoTransform([-120.0, 0.01, 0.002, 40.0, 0.001, -0.01]);
        let inv = t.inverse().unwrap();
        let (lon, lat) = t.apply(37.0, 81.0);
        let (px, py) = inv.apply(lon, lat);
        assert!((px - 37.0).abs() < 1e-6);
        assert!((py - 81.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_transform() {
        let t = GeoTransform([0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(matches!(t.inverse(), Err(Error::DegenerateGeoTransform)));
    }

    #[test]
    fn test_bounds() {
        let img = GeospecificImage::new(
            GeoPixels::Rgb(RgbImage::new(100, 100)),
            GeoTransform::north_up(-117.5, 33.5, 0.01, 0.01),
        )
        .unwrap();
        assert_eq!((img.min_longitude, img.max_longitude), (-118, -116));
        assert_eq!((img.min_latitude, img.max_latitude), (32, 34));
        assert!(img.covers(33, -117));
        assert!(!img.covers(35, -117));
    }

    #[test]
    fn test_world_file() {
        let t = GeoTransform::from_world_file("0.5\n0\n0\n-0.5\n10.25\n20.75\n").unwrap();
        assert_eq!(t.0, [10.0, 0.5, 0.0, 21.0, 0.0, -0.5]);
        assert!(GeoTransform::from_world_file("1 2 3").is_err());
    }

    #[test]
    fn test_blend_luminance_and_rgb() {
        let t = GeoTransform::north_up(0.0, 1.0, 0.25, 0.25);
        let lum = GeospecificImage::new(GeoPixels::Luminance(GrayImage::from_pixel(4, 4, image::Luma([51]))), t).unwrap();
        let rgb = GeospecificImage::new(GeoPixels::Rgb(RgbImage::from_pixel(4, 4, image::Rgb([255, 0, 0]))), t).unwrap();

        let mut color = [1.0, 0.5, 0.0];
        lum.blend(0.3, 0.6, &mut color);
        assert!((color[0] - 0.2).abs() < 1e-6 && (color[1] - 0.1).abs() < 1e-6);

        rgb.blend(0.3, 0.6, &mut color);
        assert_eq!(color, [1.0, 0.0, 0.0]);

        // Outside the footprint
        let mut untouched = [0.5, 0.5, 0.5];
        rgb.blend(5.0, 5.0, &mut untouched);
        assert_eq!(untouched, [0.5, 0.5, 0.5]);
    }
}

//! Rasters derived from a heightfield: slope/aspect, relative elevation,
//! normalized heights and height-colored base maps.

use image::{Luma, Rgb, RgbImage};

use super::buffer::{Gray16Image, ensure_valid_size, nearest_power_of_two};
use super::color_map::HeightColorMap;
use super::geo::GeospecificImage;
use super::heightfield::HeightField;
use crate::core::{Result, TileId};

#[inline]
fn to_byte(v: f32) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

/// Slope in degrees `[0, 90]` and aspect in degrees `[0, 360)` at an interior sample.
pub fn slope_aspect(hf: &HeightField, x: i64, y: i64) -> (f32, f32) {
    let h = |dx: i64, dy: i64| hf.height(x + dx, y + dy);

    let b = (h(1, 1) + 2.0 * h(1, 0) + h(1, -1) - h(-1, 1) - 2.0 * h(-1, 0) - h(-1, -1))
        / (8.0 * hf.x_interval());
    let c = (h(-1, 1) + 2.0 * h(0, 1) + h(1, 1) - h(-1, -1) - 2.0 * h(0, -1) - h(1, -1))
        / (8.0 * hf.y_interval());

    let slope = (b * b + c * c).sqrt().atan().to_degrees();
    let mut aspect = (b / c).atan().to_degrees();

    if slope == 0.0 {
        aspect = 0.0;
    } else if c > 0.0 {
        aspect += 180.0;
    } else if c < 0.0 && b > 0.0 {
        aspect += 360.0;
    }
    (slope, aspect)
}

/// Slope/aspect raster: channel 1 holds `slope / 90 * 255`, channel 2
/// holds `aspect / 360 * 255`, channel 0 is zero. The outer ring of
/// samples stays zero. The result is resized to power-of-two sides no
/// larger than `max_size`.
pub fn make_slope_aspect_image(hf: &HeightField, max_size: u32) -> RgbImage {
    let (w, h) = (hf.columns(), hf.rows());
    let mut img = RgbImage::new(w, h);

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let (slope, aspect) = slope_aspect(hf, x as i64, y as i64);
            img.put_pixel(
                x,
                y,
                Rgb([0, to_byte(slope / 90.0 * 255.0), to_byte(aspect / 360.0 * 255.0)]),
            );
        }
    }

    ensure_valid_size(img, max_size)
}

/// Relative elevation raster: `clamp(scale * (h - mean of 8 neighbours) + 128)`
/// on all channels. Covers interior samples only, then resized to
/// power-of-two sides no larger than `max_size`.
pub fn make_relative_elevation_image(hf: &HeightField, scale: f32, max_size: u32) -> RgbImage {
    let (w, h) = (hf.columns().saturating_sub(2).max(1), hf.rows().saturating_sub(2).max(1));

    let img = RgbImage::from_fn(w, h, |ix, iy| {
        let (x, y) = (ix as i64 + 1, iy as i64 + 1);
        let mut sum = 0.0;
        for (dx, dy) in [(-1, 0), (-1, -1), (-1, 1), (1, 0), (1, -1), (1, 1), (0, -1), (0, 1)] {
            sum += hf.height(x + dx, y + dy);
        }
        let relative = hf.height(x, y) - sum / 8.0;
        let v = to_byte(relative * scale + 128.0);
        Rgb([v, v, v])
    });

    ensure_valid_size(img, max_size)
}

/// 16-bit normalized heights, `(h - min) / max * 65535`.
///
/// A non-positive maximum leaves every sample at zero.
pub fn make_height_map_image(hf: &HeightField) -> Gray16Image {
    let (min, max) = hf.height_range();

    Gray16Image::from_fn(hf.columns(), hf.rows(), |x, y| {
        let h = hf.height(x as i64, y as i64);
        let v = if max > 0.0 { (h - min) / max * 65535.0 } else { 0.0 };
        Luma([v.clamp(0.0, 65535.0) as u16])
    })
}

fn ramp_color(height: f32, upper: &HeightColorMap, lower: &HeightColorMap) -> Result<[f32; 3]> {
    if height > 0.0 { upper.color(height) } else { lower.color(height) }
}

/// Height-colored map of the heightfield at power-of-two resolution,
/// with optional gamma correction (`c^(1/gamma)`).
pub fn make_base_color(
    hf: &HeightField,
    upper: &HeightColorMap,
    lower: &HeightColorMap,
    gamma: f32,
) -> Result<RgbImage> {
    let width = nearest_power_of_two(hf.columns());
    let height = nearest_power_of_two(hf.rows());
    let s_step = hf.columns() as f64 / width as f64;
    let t_step = hf.rows() as f64 / height as f64;

    let mut img = RgbImage::new(width, height);
    for y in 0..height {
        let t = t_step * (y as f64 + 0.5);
        for x in 0..width {
            let s = s_step * (x as f64 + 0.5);
            let mut color = ramp_color(hf.interpolated_height(s, t), upper, lower)?;
            if gamma != 1.0 {
                color.iter_mut().for_each(|c| *c = c.powf(1.0 / gamma));
            }
            img.put_pixel(x, y, Rgb(color.map(|c| to_byte(c * 255.0))));
        }
    }
    Ok(img)
}

/// Land cover color for a one-degree tile: the height-colored map with
/// every covering geospecific image applied in order (last one wins).
///
/// The output is `size x size`; pixel `(x, y)` samples latitude
/// `tile.latitude + (y + 0.5) / size` and the matching heightfield position.
pub fn make_base_lcc_color(
    hf: &HeightField,
    tile: TileId,
    size: u32,
    upper: &HeightColorMap,
    lower: &HeightColorMap,
    images: &[GeospecificImage],
) -> Result<RgbImage> {
    let covering: Vec<&GeospecificImage> =
        images.iter().filter(|g| g.covers(tile.latitude, tile.longitude)).collect();
    log::debug!("{} geospecific images cover {}", covering.len(), tile);

    let step = 1.0 / size as f64;
    let s_step = (hf.columns() - 1) as f64 / size as f64;
    let t_step = (hf.rows() - 1) as f64 / size as f64;

    let mut img = RgbImage::new(size, size);
    for y in 0..size {
        let lat = tile.latitude as f64 + step * (y as f64 + 0.5);
        let t = t_step * (y as f64 + 0.5);
        for x in 0..size {
            let lon = tile.longitude as f64 + step * (x as f64 + 0.5);
            let s = s_step * (x as f64 + 0.5);

            let mut color = ramp_color(hf.interpolated_height(s, t), upper, lower)?;
            for geo in &covering {
                geo.blend(lon, lat, &mut color);
            }
            img.put_pixel(x, y, Rgb(color.map(|c| to_byte(c * 255.0))));
        }
    }
    Ok(img)
}

//! Scoring of filtered class images against terrain constraints.

use image::{Rgb, RgbImage};

use super::lcc_type::LccType;
use crate::raster::Gray16Image;
use crate::raster::buffer::map_pixel;

/// Debug color of pixels below the class's minimum elevation.
pub const BELOW_ELEVATION_RGB: [u8; 3] = [0, 0, 255];
/// Debug color of pixels above the class's maximum elevation.
pub const ABOVE_ELEVATION_RGB: [u8; 3] = [0, 255, 0];
/// Debug color of pixels steeper than the class allows.
pub const TOO_STEEP_RGB: [u8; 3] = [0, 128, 255];

const BELOW_ELEVATION: f32 = 999.0;
const ABOVE_ELEVATION: f32 = 998.0;
const TOO_STEEP: f32 = 997.0;

/// Interpretation of one combined-image pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombinedPixel {
    /// 0 is most likely, 255 never.
    Probability(u8),
    BelowElevation,
    AboveElevation,
    TooSteep,
}

impl CombinedPixel {
    pub fn classify(rgb: [u8; 3]) -> Self {
        match rgb {
            BELOW_ELEVATION_RGB => CombinedPixel::BelowElevation,
            ABOVE_ELEVATION_RGB => CombinedPixel::AboveElevation,
            TOO_STEEP_RGB => CombinedPixel::TooSteep,
            [_, g, _] => CombinedPixel::Probability(g),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        !matches!(self, CombinedPixel::Probability(_))
    }
}

/// Per-class combined probability image.
///
/// Starts from the filtered class probability; where it is not white the
/// pixel is checked against the class limits in order (below elevation,
/// above elevation, too steep), later failures overwriting earlier ones.
/// Surviving pixels are biased by relative elevation
/// (`1.5 * (relel - 128)`) and slope (`slope / max_slope * 100`). Heights
/// are the normalized heightmap scaled to a byte and compared against the
/// class elevation limits divided by 10.
///
/// Terrain rasters are sampled at the proportionally mapped pixel, so they
/// may have any resolution.
pub fn make_combined_image(
    lcc: &LccType,
    filter: &RgbImage,
    height_map: &Gray16Image,
    slope: &RgbImage,
    relative_elevation: &RgbImage,
) -> RgbImage {
    let max_height = (lcc.elevation.max / 10.0) as i32 as f32;
    let min_height = (lcc.elevation.min / 10.0) as i32 as f32;
    let max_slope = ((lcc.slope.max / 90.0) * 255.0) as i32 as f32;

    let dims = filter.dimensions();
    log::debug!(
        "Combining class {} at {}x{} (heights {}x{})",
        lcc.index,
        dims.0,
        dims.1,
        height_map.width(),
        height_map.height()
    );

    RgbImage::from_fn(dims.0, dims.1, |x, y| {
        let (hx, hy) = map_pixel(x, y, dims, height_map.dimensions());
        let (sx, sy) = map_pixel(x, y, dims, slope.dimensions());
        let (rx, ry) = map_pixel(x, y, dims, relative_elevation.dimensions());

        let height_value = height_map.get_pixel(hx, hy).0[0] as f32 / 65535.0 * 255.0;
        let slope_value = slope.get_pixel(sx, sy).0[1] as f32;
        let relel_value = relative_elevation.get_pixel(rx, ry).0[0] as f32;

        let mut value = filter.get_pixel(x, y).0[0] as f32;

        if value <= 254.0 {
            if height_value < min_height {
                value = BELOW_ELEVATION;
            }
            if height_value > max_height {
                value = ABOVE_ELEVATION;
            }
            if slope_value > max_slope {
                value = TOO_STEEP;
            }

            if value <= 254.0 {
                value += 1.5 * (relel_value - 128.0);
                if max_slope > 0.0 {
                    value += slope_value / max_slope * 100.0;
                }
            }
        }

        if value == BELOW_ELEVATION {
            Rgb(BELOW_ELEVATION_RGB)
        } else if value == ABOVE_ELEVATION {
            Rgb(ABOVE_ELEVATION_RGB)
        } else if value == TOO_STEEP {
            Rgb(TOO_STEEP_RGB)
        } else {
            let v = value.clamp(0.0, 255.0) as u8;
            Rgb([v, v, v])
        }
    })
}

/// Number of sentinel pixels in a combined image.
pub fn count_sentinels(img: &RgbImage) -> usize {
    img.pixels().filter(|p| CombinedPixel::classify(p.0).is_sentinel()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn lcc() -> LccType {
        // Heights in (0, 100) normalized bytes, slope byte <= 127
        LccType::new(5, "test", [200, 0, 0]).with_elevation(0.0, 1000.0).with_slope(0.0, 45.0)
    }

    fn uniform(w: u32, v: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(w, w, Rgb(v))
    }

    fn heights(w: u32, v: u16) -> Gray16Image {
        Gray16Image::from_pixel(w, w, Luma([v]))
    }

    #[test]
    fn test_passes_through_probability() {
        let out = make_combined_image(
            &lcc(),
            &uniform(8, [40, 40, 40]),
            &heights(8, 10000),
            &uniform(8, [0, 0, 0]),
            &uniform(8, [128, 128, 128]),
        );
        assert!(out.pixels().all(|p| p.0 == [40, 40, 40]));
        assert_eq!(count_sentinels(&out), 0);
    }

    #[test]
    fn test_white_is_never_constrained() {
        let out = make_combined_image(
            &lcc(),
            &uniform(4, [255, 255, 255]),
            &heights(4, 65535),
            &uniform(4, [0, 255, 0]),
            &uniform(4, [128, 128, 128]),
        );
        assert!(out.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn test_above_max_elevation() {
        // 65535 -> 255 > 100
        let out = make_combined_image(
            &lcc(),
            &uniform(4, [0, 0, 0]),
            &heights(4, 65535),
            &uniform(4, [0, 10, 0]),
            &uniform(4, [255, 255, 255]),
        );
        assert!(out.pixels().all(|p| p.0 == ABOVE_ELEVATION_RGB));
    }

    #[test]
    fn test_below_min_elevation() {
        let high = LccType::new(5, "alpine", [1, 2, 3]).with_elevation(500.0, 2000.0);
        let out = make_combined_image(
            &high,
            &uniform(4, [0, 0, 0]),
            &heights(4, 0),
            &uniform(4, [0, 0, 0]),
            &uniform(4, [128, 128, 128]),
        );
        assert!(out.pixels().all(|p| CombinedPixel::classify(p.0) == CombinedPixel::BelowElevation));
    }

    #[test]
    fn test_slope_overrides_elevation() {
        let out = make_combined_image(
            &lcc(),
            &uniform(4, [0, 0, 0]),
            &heights(4, 65535),
            &uniform(4, [0, 200, 0]),
            &uniform(4, [128, 128, 128]),
        );
        assert!(out.pixels().all(|p| p.0 == TOO_STEEP_RGB));
    }

    #[test]
    fn test_relative_elevation_and_slope_bias() {
        // 40 + 1.5 * (138 - 128) + 50 / 127 * 100 = 94.37
        let out = make_combined_image(
            &lcc(),
            &uniform(4, [40, 40, 40]),
            &heights(4, 10000),
            &uniform(4, [0, 50, 0]),
            &uniform(4, [138, 138, 138]),
        );
        assert_eq!(out.get_pixel(0, 0).0, [94, 94, 94]);

        // Lower ground is favored: 40 - 1.5 * 28 clamps to 0
        let out = make_combined_image(
            &lcc(),
            &uniform(4, [40, 40, 40]),
            &heights(4, 10000),
            &uniform(4, [0, 0, 0]),
            &uniform(4, [100, 100, 100]),
        );
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0]);
    }

    #[test]
    fn test_terrain_rasters_are_resampled() {
        let mut slope = uniform(2, [0, 0, 0]);
        slope.put_pixel(1, 1, Rgb([0, 250, 0]));
        let out = make_combined_image(
            &lcc(),
            &uniform(8, [10, 10, 10]),
            &heights(4, 1000),
            &slope,
            &uniform(6, [128, 128, 128]),
        );
        assert_eq!(out.get_pixel(1, 1).0, [10, 10, 10]);
        assert_eq!(out.get_pixel(6, 6).0, TOO_STEEP_RGB);
        assert_eq!(count_sentinels(&out), 16);
    }
}

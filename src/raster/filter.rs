//! Class selection, neighbourhood smoothing and masking of 8-bit RGB rasters.

use image::{Rgb, RgbImage};

use crate::core::{Error, Result};

/// Pure black, the color [`make_lcc_image`] paints selected pixels.
pub const SELECTED: [u8; 3] = [0, 0, 0];

/// Pixels within this many samples of an edge are scored without neighbours.
const FILTER_BORDER: i64 = 3;

const HIT_WEIGHT: f32 = 50.0;
const NEIGHBOR_WEIGHT: f32 = 6.82;
const DIAGONAL_WEIGHT: f32 = 3.41;
const SECOND_RING_WEIGHT: f32 = 2.27;

/// Counts returned by [`make_lcc_image`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SelectionCounts {
    pub hits: u64,
    pub misses: u64,
}

/// Class selector image: pixels exactly equal to `rgb` become black,
/// everything else white.
pub fn make_lcc_image(src: &RgbImage, rgb: [u8; 3]) -> (RgbImage, SelectionCounts) {
    let mut counts = SelectionCounts::default();
    let img = RgbImage::from_fn(src.width(), src.height(), |x, y| {
        if src.get_pixel(x, y).0 == rgb {
            counts.hits += 1;
            Rgb(SELECTED)
        } else {
            counts.misses += 1;
            Rgb([255, 255, 255])
        }
    });
    log::debug!("Selector {:?}: hits = {}, misses = {}", rgb, counts.hits, counts.misses);
    (img, counts)
}

/// Smoothed probability image from a selector image.
///
/// A selected pixel scores 50, each selected 4-neighbour 6.82, each
/// selected diagonal 3.41 and each selected pixel two steps away along an
/// axis 2.27 (100 when the whole neighbourhood is selected). Pixels near
/// the edge score 100 when selected and 0 otherwise. The output byte is
/// `|score / 100 * 255 - 255|` on every channel, so 0 is most likely.
pub fn make_filtered_image(src: &RgbImage, selected: [u8; 3]) -> RgbImage {
    let (w, h) = (src.width() as i64, src.height() as i64);
    let hit = |x: i64, y: i64| -> bool { src.get_pixel(x as u32, y as u32).0 == selected };
    let count = |x: i64, y: i64, offsets: &[(i64, i64)]| -> f32 {
        offsets.iter().filter(|(dx, dy)| hit(x + dx, y + dy)).count() as f32
    };

    RgbImage::from_fn(src.width(), src.height(), |px, py| {
        let (x, y) = (px as i64, py as i64);
        let on_border =
            y < FILTER_BORDER || x < FILTER_BORDER || y > h - FILTER_BORDER || x > w - FILTER_BORDER;

        let value = if on_border {
            if hit(x, y) { 100.0 } else { 0.0 }
        } else {
            let own = if hit(x, y) { HIT_WEIGHT } else { 0.0 };
            own + NEIGHBOR_WEIGHT * count(x, y, &[(0, -1), (0, 1), (-1, 0), (1, 0)])
                + DIAGONAL_WEIGHT * count(x, y, &[(-1, -1), (-1, 1), (1, -1), (1, 1)])
                + SECOND_RING_WEIGHT * count(x, y, &[(-2, 0), (2, 0), (0, -2), (0, 2)])
        };

        let v = (value as f64 / 100.0 * 255.0 - 255.0).abs().min(255.0) as u8;
        Rgb([v, v, v])
    })
}

/// Keep `src` where the mask's first channel is above 225, paint 255 elsewhere.
pub fn apply_mask(src: &RgbImage, mask: &RgbImage) -> Result<RgbImage> {
    if src.dimensions() != mask.dimensions() {
        return Err(Error::DimensionMismatch { image: src.dimensions(), mask: mask.dimensions() });
    }

    Ok(RgbImage::from_fn(src.width(), src.height(), |x, y| {
        let v = if mask.get_pixel(x, y).0[0] > 225 { src.get_pixel(x, y).0[0] } else { 255 };
        Rgb([v, v, v])
    }))
}

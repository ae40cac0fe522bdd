//! Raster aliases, file IO and power-of-two resizing.

use std::fs;
use std::path::Path;

use image::{ImageBuffer, Luma, Pixel, RgbImage};

use crate::core::Result;

/// 16-bit single channel raster (normalized heights).
pub type Gray16Image = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Load any supported image file as 8-bit RGB.
pub fn load_rgb(path: &Path) -> Result<RgbImage> {
    Ok(image::open(path)?.to_rgb8())
}

/// Write an image, creating parent directories. Format follows the extension.
pub fn save_image<P>(img: &ImageBuffer<P, Vec<P::Subpixel>>, path: &Path) -> Result<()>
where
    P: Pixel + image::PixelWithColorType,
    [P::Subpixel]: image::EncodableLayout,
{
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    img.save(path)?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}

/// Nearest power of two, rounding at the geometric midpoint (80 -> 64, 96 -> 128).
pub fn nearest_power_of_two(n: u32) -> u32 {
    if n <= 1 || n.is_power_of_two() {
        return n.max(1);
    }
    let p2 = (n as f64).log2();
    1u32 << ((p2 + 0.5).floor() as u32)
}

/// Nearest-neighbour resample to `width x height`.
pub fn resize_nearest<P: Pixel>(
    img: &ImageBuffer<P, Vec<P::Subpixel>>,
    width: u32,
    height: u32,
) -> ImageBuffer<P, Vec<P::Subpixel>> {
    let (sw, sh) = img.dimensions();
    ImageBuffer::from_fn(width, height, |x, y| {
        let sx = (x as u64 * sw as u64 / width as u64) as u32;
        let sy = (y as u64 * sh as u64 / height as u64) as u32;
        *img.get_pixel(sx.min(sw - 1), sy.min(sh - 1))
    })
}

/// Resize so both sides are powers of two no larger than `max_size`.
/// Returns the input unchanged when it already qualifies.
pub fn ensure_valid_size<P: Pixel>(
    img: ImageBuffer<P, Vec<P::Subpixel>>,
    max_size: u32,
) -> ImageBuffer<P, Vec<P::Subpixel>> {
    let (w, h) = img.dimensions();
    let nw = nearest_power_of_two(w).min(max_size.max(1));
    let nh = nearest_power_of_two(h).min(max_size.max(1));
    if (nw, nh) == (w, h) {
        return img;
    }
    log::debug!("Resizing {}x{} raster to {}x{}", w, h, nw, nh);
    resize_nearest(&img, nw, nh)
}

/// Map a pixel of a `from`-sized raster to the proportional pixel of a `to`-sized one.
#[inline]
pub fn map_pixel(x: u32, y: u32, from: (u32, u32), to: (u32, u32)) -> (u32, u32) {
    let mx = (x as u64 * to.0 as u64 / from.0.max(1) as u64) as u32;
    let my = (y as u64 * to.1 as u64 / from.1.max(1) as u64) as u32;
    (mx.min(to.0.saturating_sub(1)), my.min(to.1.saturating_sub(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_nearest_power_of_two() {
        assert_eq!(nearest_power_of_two(64), 64);
        assert_eq!(nearest_power_of_two(80), 64);
        assert_eq!(nearest_power_of_two(96), 128);
        assert_eq!(nearest_power_of_two(1000), 1024);
        assert_eq!(nearest_power_of_two(0), 1);
    }

    #[test]
    fn test_ensure_valid_size_clamps_to_max() {
        let img = RgbImage::new(80, 300);
        let out = ensure_valid_size(img, 128);
        assert_eq!(out.dimensions(), (64, 128));
    }

    #[test]
    fn test_resize_nearest_picks_source_pixels() {
        let img = RgbImage::from_fn(4, 4, |x, _| Rgb([x as u8 * 10, 0, 0]));
        let out = resize_nearest(&img, 2, 2);
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(1, 1).0[0], 20);
    }

    #[test]
    fn test_map_pixel() {
        assert_eq!(map_pixel(63, 63, (64, 64), (128, 128)), (126, 126));
        assert_eq!(map_pixel(127, 0, (128, 128), (64, 32)), (63, 0));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.png");
        let img = RgbImage::from_pixel(3, 2, Rgb([1, 2, 3]));
        save_image(&img, &path).unwrap();
        let back = load_rgb(&path).unwrap();
        assert_eq!(back, img);
    }
}

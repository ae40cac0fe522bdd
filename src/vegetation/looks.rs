//! Per-pixel sampling rules: how many draws a pixel gets and whether a draw succeeds.

/// How well a pixel's facing matches a class's preferred aspect.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AspectBand {
    Good,
    Neutral,
    Bad,
}

impl AspectBand {
    /// Band of `aspect` (degrees) against `preferred` (degrees), without wrap-around.
    pub fn classify(aspect: f32, preferred: f32) -> Self {
        let diff = (preferred - aspect).abs();
        if diff <= 45.0 || diff >= 315.0 {
            AspectBand::Good
        } else if diff >= 135.0 {
            AspectBand::Bad
        } else {
            AspectBand::Neutral
        }
    }

    /// Aspect band of a slope/aspect pixel. Ground flatter than half the
    /// class's maximum slope is always neutral.
    pub fn of_slope_pixel(slope_pixel: [u8; 3], preferred: f32, max_slope_degrees: f32) -> Self {
        let aspect = slope_pixel[2] as f32 / 255.0 * 360.0;
        let max_slope = max_slope_degrees / 90.0 * 255.0;
        if (slope_pixel[1] as f32) > max_slope / 2.0 {
            Self::classify(aspect, preferred)
        } else {
            AspectBand::Neutral
        }
    }

    /// Draws granted to a pixel in this band.
    pub fn looks(&self, max_looks: u32) -> u32 {
        match self {
            AspectBand::Good => max_looks,
            AspectBand::Neutral => (max_looks as f32 / 1.5).ceil() as u32,
            AspectBand::Bad => (max_looks as f32 / 2.0).ceil() as u32,
        }
    }
}

/// Number of placement draws for a combined-image pixel. Pure white pixels get none.
pub fn num_looks(
    combined_pixel: [u8; 3],
    slope_pixel: [u8; 3],
    preferred_aspect: f32,
    max_looks: u32,
    max_slope_degrees: f32,
) -> u32 {
    if combined_pixel == [255, 255, 255] {
        return 0;
    }
    AspectBand::of_slope_pixel(slope_pixel, preferred_aspect, max_slope_degrees).looks(max_looks)
}

/// One placement draw: green and blue must agree within 15 and green must
/// not exceed `limit`. Sentinel colors never pass.
#[inline]
pub fn accepts_vegetation(combined_pixel: [u8; 3], limit: u8) -> bool {
    let [_, g, b] = combined_pixel;
    g.abs_diff(b) < 15 && g <= limit
}

/// Age class (0 young, 1 mid, 2 old) from a uniform draw in `[0, 1)`,
/// biased toward old growth on well-facing ground.
pub fn veg_age(band: AspectBand, draw: f32) -> u8 {
    match band {
        AspectBand::Bad => {
            if draw < 0.5 {
                0
            } else if draw < 0.8 {
                1
            } else {
                2
            }
        }
        AspectBand::Neutral => {
            if draw < 0.33 {
                0
            } else if draw < 0.66 {
                1
            } else {
                2
            }
        }
        AspectBand::Good => {
            if draw < 0.5 {
                2
            } else if draw < 0.8 {
                1
            } else {
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_white_pixel_has_no_looks() {
        assert_eq!(num_looks([255, 255, 255], [0, 255, 0], 0.0, 4, 45.0), 0);
        assert_eq!(num_looks([254, 254, 254], [0, 0, 0], 0.0, 4, 45.0), 3);
    }

    #[test]
    fn test_flat_ground_is_neutral() {
        // Aspect 180 against preferred 0 would be bad, but slope is below half max
        assert_eq!(AspectBand::of_slope_pixel([0, 10, 128], 0.0, 45.0), AspectBand::Neutral);
    }

    #[test]
    fn test_aspect_bands_on_steep_ground() {
        // Slope byte 100 > 127.5 / 2
        assert_eq!(AspectBand::of_slope_pixel([0, 100, 128], 180.0, 45.0), AspectBand::Good);
        assert_eq!(AspectBand::of_slope_pixel([0, 100, 0], 180.0, 45.0), AspectBand::Bad);
        assert_eq!(AspectBand::of_slope_pixel([0, 100, 64], 180.0, 45.0), AspectBand::Neutral);
        assert_eq!(AspectBand::classify(350.0, 10.0), AspectBand::Good);
    }

    #[test]
    fn test_look_counts() {
        assert_eq!(AspectBand::Good.looks(3), 3);
        assert_eq!(AspectBand::Neutral.looks(3), 2);
        assert_eq!(AspectBand::Bad.looks(3), 2);
        assert_eq!(AspectBand::Neutral.looks(1), 1);
        assert_eq!(AspectBand::Bad.looks(1), 1);
    }

    #[test]
    fn test_sentinels_never_accepted() {
        for limit in [0u8, 128, 254, 255] {
            assert!(!accepts_vegetation([0, 0, 255], limit));
            assert!(!accepts_vegetation([0, 255, 0], limit));
            assert!(!accepts_vegetation([0, 128, 255], limit));
        }
    }

    #[test]
    fn test_white_never_accepted_by_draws() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..10_000 {
            let limit = (255.0 * rng.r#gen::<f32>()) as u8;
            assert!(!accepts_vegetation([255, 255, 255], limit));
        }
    }

    #[test]
    fn test_acceptance_rate_tracks_green() {
        let mut rng = StdRng::seed_from_u64(99);
        let n = 200_000;
        for g in [0u8, 64, 128, 200] {
            let accepted = (0..n)
                .filter(|_| accepts_vegetation([g, g, g], (255.0 * rng.r#gen::<f32>()) as u8))
                .count();
            let rate = accepted as f64 / n as f64;
            let expected = (255.0 - g as f64) / 255.0;
            assert!((rate - expected).abs() < 0.01, "g={} rate={} expected={}", g, rate, expected);
        }
    }

    #[test]
    fn test_veg_age_bias() {
        assert_eq!(veg_age(AspectBand::Good, 0.1), 2);
        assert_eq!(veg_age(AspectBand::Good, 0.9), 0);
        assert_eq!(veg_age(AspectBand::Bad, 0.1), 0);
        assert_eq!(veg_age(AspectBand::Bad, 0.7), 1);
        assert_eq!(veg_age(AspectBand::Neutral, 0.5), 1);
        assert_eq!(veg_age(AspectBand::Neutral, 0.99), 2);
    }
}

//! Hue–saturation histograms, the second stage of the duplicate filter.
//!
//! The fingerprint stage is a cheap, coarse rejection; this stage is the
//! fine-grained confirmation. Two images that survive the Hamming gate are
//! compared by the correlation of their normalized 2D hue–saturation
//! histograms. Value (brightness) is ignored so minor exposure differences
//! do not break a match.

use image::DynamicImage;

pub const HUE_BINS: usize = 50;
pub const SAT_BINS: usize = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct HueSatHistogram {
    bins: Vec<f64>,
}

impl HueSatHistogram {
    /// Build the normalized histogram of an image. Bin mass sums to 1 for
    /// any non-empty image.
    pub fn of_image(image: &DynamicImage) -> Self {
        let rgb = image.to_rgb8();
        let mut bins = vec![0.0f64; HUE_BINS * SAT_BINS];
        let mut pixels = 0usize;

        for pixel in rgb.pixels() {
            let r = pixel.0[0] as f64 / 255.0;
            let g = pixel.0[1] as f64 / 255.0;
            let b = pixel.0[2] as f64 / 255.0;
            let (hue, sat) = hue_saturation(r, g, b);

            let h_bin = ((hue / 360.0) * HUE_BINS as f64).min(HUE_BINS as f64 - 1.0) as usize;
            let s_bin = (sat * SAT_BINS as f64).min(SAT_BINS as f64 - 1.0) as usize;
            bins[h_bin * SAT_BINS + s_bin] += 1.0;
            pixels += 1;
        }

        if pixels > 0 {
            let total = pixels as f64;
            for bin in &mut bins {
                *bin /= total;
            }
        }

        Self { bins }
    }

    /// Correlation-based similarity in [0, 1]; 1 means identical
    /// distributions. Negative Pearson correlation is clamped to 0.
    pub fn similarity(&self, other: &HueSatHistogram) -> f64 {
        correlation(&self.bins, &other.bins).max(0.0)
    }

    #[cfg(test)]
    pub(crate) fn from_raw(bins: Vec<f64>) -> Self {
        Self { bins }
    }
}

/// Pearson correlation coefficient of two equal-length bin vectors.
///
/// Degenerate inputs (zero variance on either side) compare as 1.0 when the
/// vectors are equal and 0.0 otherwise.
fn correlation(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len() as f64;
    if a.is_empty() {
        return 0.0;
    }

    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut num = 0.0;
    let mut den_a = 0.0;
    let mut den_b = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        num += dx * dy;
        den_a += dx * dx;
        den_b += dy * dy;
    }

    let den = (den_a * den_b).sqrt();
    if den < f64::EPSILON {
        return if a == b { 1.0 } else { 0.0 };
    }
    num / den
}

fn hue_saturation(r: f64, g: f64, b: f64) -> (f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let sat = if max > 0.0 { delta / max } else { 0.0 };

    let hue = if delta == 0.0 {
        0.0
    } else if (max - r).abs() < f64::EPSILON {
        60.0 * (((g - b) / delta) % 6.0)
    } else if (max - g).abs() < f64::EPSILON {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let hue = if hue < 0.0 { hue + 360.0 } else { hue };

    (hue, sat)
}

//! Canny edge detection: separable Gaussian blur, auto-levels, Sobel
//! gradient, Otsu threshold, non-maximum suppression, hysteresis linking.
//!
//! Grounded in the vendored `imageproc`-style Canny in the example pack
//! (Gaussian blur -> Sobel -> NMS -> hysteresis BFS) and the Otsu
//! implementation style from `leptonica-rs`'s `compute_otsu_threshold`
//! (single histogram pass, running background/foreground sums).

use crate::image::{GradientMap, GrayBuffer, Image};
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Tunable parameters for one Canny invocation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EdgeExtractorParams {
    /// Gaussian blur radius `r`, used to build the separable kernel.
    pub gaussian_radius: f32,
}

impl Default for EdgeExtractorParams {
    fn default() -> Self {
        Self {
            gaussian_radius: 2.0,
        }
    }
}

/// Owns the scratch buffers reused across frames by the Canny pipeline.
///
/// Per the concurrency model, the per-frame pipeline is single-threaded and
/// its intermediate buffers are owned by the pipeline object and reused
/// across frames rather than reallocated every call.
#[derive(Default)]
pub struct EdgeExtractor {
    blur_h: GrayBuffer,
    blurred: GrayBuffer,
    leveled: GrayBuffer,
    gradients: GradientMap,
    labels: Vec<u8>, // 0 = dropped, 1 = weak, 2 = strong
}

const WEAK: u8 = 1;
const STRONG: u8 = 2;

impl EdgeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the full four-stage pipeline. `input` must be a greyscale-origin
    /// `Image` (R == G == B == luma); only channel 0 is consulted.
    ///
    /// Returns an `Image` whose channel 0 (and, to preserve the three-channel
    /// invariant, channels 1 and 2) is 255 on retained edge pixels and 0
    /// elsewhere.
    pub fn extract(&mut self, input: &Image, params: &EdgeExtractorParams) -> Image {
        let w = input.width();
        let h = input.height();
        let gray = input.channel0_planar();

        self.blur_h.resize_like(w, h);
        self.blurred.resize_like(w, h);
        self.leveled.resize_like(w, h);
        self.gradients.resize_like(w, h);
        self.labels.clear();
        self.labels.resize(w * h, 0);

        let radius = params.gaussian_radius;
        let aperture = gaussian_blur_separable(&gray, radius, &mut self.blur_h, &mut self.blurred);
        auto_levels(&self.blurred, aperture, &mut self.leveled);
        sobel_gradients(&self.leveled, &mut self.gradients);

        let histogram = normalized_histogram(&self.leveled);
        let high = otsu_threshold(&histogram) as f32;
        let low = high / 2.0;

        non_maximum_suppression(&self.gradients, high, low, &mut self.labels);
        hysteresis_link(w, h, &mut self.labels);

        let mut out = GrayBuffer::zeros(w, h);
        for (i, &label) in self.labels.iter().enumerate() {
            out.data[i] = if label == STRONG { 255 } else { 0 };
        }
        Image::from_channel0(&out)
    }
}

/// Build the 1-D Gaussian kernel of width `2*floor(r)+3` described in
/// Stage A, normalized to sum to 1.
fn gaussian_kernel(radius: f32) -> Vec<f32> {
    let r_floor = radius.floor();
    let width = (2.0 * r_floor + 3.0) as i32;
    let half = width / 2;
    let sigma = radius / 3.0;
    let denom = 2.0 * sigma * sigma;

    let edge_value = if denom > 0.0 {
        (-(radius * radius) / denom).exp()
    } else {
        0.0
    };

    let mut kernel: Vec<f32> = (-half..=half)
        .map(|x| {
            let g = if denom > 0.0 {
                (-((x * x) as f32) / denom).exp()
            } else if x == 0 {
                1.0
            } else {
                0.0
            };
            (g - edge_value).max(0.0)
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    if sum > 0.0 {
        for v in &mut kernel {
            *v /= sum;
        }
    }
    kernel
}

/// Stage A. Returns the aperture loss (`floor(r) + 1`): pixels within this
/// many pixels of any border are left at zero.
fn gaussian_blur_separable(
    src: &GrayBuffer,
    radius: f32,
    scratch_h: &mut GrayBuffer,
    out: &mut GrayBuffer,
) -> usize {
    let kernel = gaussian_kernel(radius);
    let half = (kernel.len() / 2) as i64;
    let aperture = radius.floor() as usize + 1;
    let (w, h) = (src.width, src.height);

    scratch_h.resize_like(w, h);
    out.resize_like(w, h);

    // Horizontal pass.
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, &coeff) in kernel.iter().enumerate() {
                let sx = x as i64 + (k as i64 - half);
                acc += coeff * src.get(sx, y as i64) as f32;
            }
            scratch_h.set(x, y, acc.clamp(0.0, 255.0) as u8);
        }
    }

    // Vertical pass.
    for y in 0..h {
        for x in 0..w {
            let mut acc = 0.0f32;
            for (k, &coeff) in kernel.iter().enumerate() {
                let sy = y as i64 + (k as i64 - half);
                acc += coeff * scratch_h.get(x as i64, sy) as f32;
            }
            out.set(x, y, acc.clamp(0.0, 255.0) as u8);
        }
    }

    // Leave the aperture border at zero (documented aperture loss).
    zero_border(out, aperture);
    aperture
}

fn zero_border(buf: &mut GrayBuffer, aperture: usize) {
    let (w, h) = (buf.width, buf.height);
    for y in 0..h {
        for x in 0..w {
            if x < aperture || y < aperture || x + aperture >= w || y + aperture >= h {
                buf.set(x, y, 0);
            }
        }
    }
}

/// Stage B. Auto-levels with 10% clipping on each tail, restricted to the
/// valid-aperture rectangle for computing the range.
fn auto_levels(src: &GrayBuffer, aperture: usize, out: &mut GrayBuffer) {
    let (w, h) = (src.width, src.height);
    out.resize_like(w, h);

    let mut lo = 255u8;
    let mut hi = 0u8;
    for y in aperture..h.saturating_sub(aperture) {
        for x in aperture..w.saturating_sub(aperture) {
            let v = src.get(x as i64, y as i64);
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }

    let delta = (hi as f32 - lo as f32) / 255.0 - 0.2;
    if delta <= 0.0 {
        out.data.copy_from_slice(&src.data);
        return;
    }

    for (i, &v) in src.data.iter().enumerate() {
        let mapped = (v as f32 - lo as f32) / delta;
        out.data[i] = mapped.clamp(0.0, 255.0) as u8;
    }
}

/// Stage C. Standard 3x3 Sobel masks; border pixels keep `(0, 0)`.
fn sobel_gradients(src: &GrayBuffer, out: &mut GradientMap) {
    let (w, h) = (src.width, src.height);
    out.resize_like(w, h);

    if w < 3 || h < 3 {
        return;
    }

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let tl = src.get(x as i64 - 1, y as i64 - 1) as f32;
            let t = src.get(x as i64, y as i64 - 1) as f32;
            let tr = src.get(x as i64 + 1, y as i64 - 1) as f32;
            let l = src.get(x as i64 - 1, y as i64) as f32;
            let r = src.get(x as i64 + 1, y as i64) as f32;
            let bl = src.get(x as i64 - 1, y as i64 + 1) as f32;
            let b = src.get(x as i64, y as i64 + 1) as f32;
            let br = src.get(x as i64 + 1, y as i64 + 1) as f32;

            let gx = (tr + 2.0 * r + br) - (tl + 2.0 * l + bl);
            let gy = (bl + 2.0 * b + br) - (tl + 2.0 * t + tr);

            out.set(x, y, (gx.hypot(gy), gy.atan2(gx)));
        }
    }
}

/// Normalized 256-bin histogram (bins sum to 1).
fn normalized_histogram(src: &GrayBuffer) -> [f32; 256] {
    let mut hist = [0u32; 256];
    for &v in &src.data {
        hist[v as usize] += 1;
    }
    let total = src.data.len().max(1) as f32;
    let mut normalized = [0.0f32; 256];
    for (i, &count) in hist.iter().enumerate() {
        normalized[i] = count as f32 / total;
    }
    normalized
}

/// Otsu's threshold via the cumulative-sum between-class-variance
/// formulation. Ties are broken by averaging all tying bin indices.
fn otsu_threshold(histogram: &[f32; 256]) -> u8 {
    let total_mean: f32 = histogram
        .iter()
        .enumerate()
        .map(|(i, &p)| i as f32 * p)
        .sum();

    let mut weight_bg = 0.0f32;
    let mut sum_bg = 0.0f32;
    let mut best_variance = -1.0f32;
    let mut tying: Vec<usize> = Vec::new();

    for t in 0..256 {
        weight_bg += histogram[t];
        sum_bg += t as f32 * histogram[t];

        let weight_fg = 1.0 - weight_bg;
        if weight_bg <= 0.0 || weight_fg <= 0.0 {
            continue;
        }

        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (total_mean - sum_bg) / weight_fg;
        let variance = weight_bg * weight_fg * (mean_bg - mean_fg).powi(2);

        if variance > best_variance + 1e-9 {
            best_variance = variance;
            tying.clear();
            tying.push(t);
        } else if (variance - best_variance).abs() <= 1e-9 {
            tying.push(t);
        }
    }

    if tying.is_empty() {
        return 0;
    }
    let sum: usize = tying.iter().sum();
    (sum / tying.len()) as u8
}

/// Stage D, NMS half. Classifies gradient direction into one of four
/// 45°-wide buckets and compares magnitude against the two neighbors along
/// the perpendicular-to-edge axis for that bucket.
fn non_maximum_suppression(gradients: &GradientMap, high: f32, low: f32, labels: &mut [u8]) {
    let (w, h) = (gradients.width, gradients.height);
    if w < 3 || h < 3 {
        return;
    }

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let (mag, angle) = gradients.get(x, y);
            let wrapped = if angle < 0.0 { angle + PI } else { angle };
            let bucket = ((wrapped / (PI / 4.0)).round() as i64).rem_euclid(4);

            let (n1, n2) = match bucket {
                0 => ((x as i64 - 1, y as i64), (x as i64 + 1, y as i64)),
                1 => ((x as i64 + 1, y as i64 + 1), (x as i64 - 1, y as i64 - 1)),
                2 => ((x as i64, y as i64 - 1), (x as i64, y as i64 + 1)),
                _ => ((x as i64 - 1, y as i64 + 1), (x as i64 + 1, y as i64 - 1)),
            };

            let mag_at = |px: i64, py: i64| -> f32 {
                if px < 0 || py < 0 || px as usize >= w || py as usize >= h {
                    0.0
                } else {
                    gradients.get(px as usize, py as usize).0
                }
            };

            let is_max = mag >= mag_at(n1.0, n1.1) && mag >= mag_at(n2.0, n2.1);
            let idx = y * w + x;
            labels[idx] = if !is_max {
                0
            } else if mag >= high {
                STRONG
            } else if mag >= low {
                WEAK
            } else {
                0
            };
        }
    }
}

/// Stage D, hysteresis half: flood-fill 8-neighborhood from STRONG seeds,
/// promoting WEAK pixels to STRONG, then demote all remaining WEAK to 0.
fn hysteresis_link(w: usize, h: usize, labels: &mut [u8]) {
    let mut stack: Vec<(usize, usize)> = Vec::new();
    for y in 0..h {
        for x in 0..w {
            if labels[y * w + x] == STRONG {
                stack.push((x, y));
            }
        }
    }

    while let Some((x, y)) = stack.pop() {
        for dy in -1i64..=1 {
            for dx in -1i64..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let nx = x as i64 + dx;
                let ny = y as i64 + dy;
                if nx < 0 || ny < 0 || nx as usize >= w || ny as usize >= h {
                    continue;
                }
                let idx = ny as usize * w + nx as usize;
                if labels[idx] == WEAK {
                    labels[idx] = STRONG;
                    stack.push((nx as usize, ny as usize));
                }
            }
        }
    }

    for label in labels.iter_mut() {
        if *label == WEAK {
            *label = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_image(w: usize, h: usize, v: u8) -> Image {
        Image::from_channel0(&GrayBuffer::new(w, h, vec![v; w * h]))
    }

    fn half_split_image(w: usize, h: usize) -> Image {
        let mut data = vec![0u8; w * h];
        for y in 0..h {
            for x in 0..w {
                if x >= w / 2 {
                    data[y * w + x] = 255;
                }
            }
        }
        Image::from_channel0(&GrayBuffer::new(w, h, data))
    }

    #[test]
    fn uniform_image_yields_all_zero_edges() {
        let img = solid_image(40, 40, 128);
        let mut extractor = EdgeExtractor::new();
        let out = extractor.extract(&img, &EdgeExtractorParams::default());
        assert!(out.data().iter().all(|&v| v == 0));
    }

    #[test]
    fn sharp_edge_is_detected() {
        let img = half_split_image(40, 40);
        let mut extractor = EdgeExtractor::new();
        let out = extractor.extract(&img, &EdgeExtractorParams::default());
        assert!(out.data().iter().any(|&v| v == 255));
    }

    #[test]
    fn canny_output_dimensions_match_input() {
        let img = half_split_image(33, 21);
        let mut extractor = EdgeExtractor::new();
        let out = extractor.extract(&img, &EdgeExtractorParams::default());
        assert_eq!(out.width(), 33);
        assert_eq!(out.height(), 21);
    }

    #[test]
    fn rerunning_canny_on_binary_edges_is_a_subset() {
        let img = half_split_image(50, 50);
        let mut extractor = EdgeExtractor::new();
        let first = extractor.extract(&img, &EdgeExtractorParams::default());
        let second = extractor.extract(&first, &EdgeExtractorParams::default());
        for (a, b) in first.data().iter().zip(second.data().iter()) {
            if *b != 0 {
                assert_ne!(*a, 0, "second pass introduced a pixel absent from the first");
            }
        }
    }

    #[test]
    fn otsu_ties_average_tying_indices() {
        // A perfectly bimodal histogram with two equally-sized clusters
        // produces a tie band; the chosen threshold must be the mean of
        // the tying indices (here the midpoint of the flat valley).
        let mut hist = [0.0f32; 256];
        for v in hist.iter_mut().take(50) {
            *v = 1.0 / 100.0;
        }
        for v in hist[200..250].iter_mut() {
            *v = 1.0 / 100.0;
        }
        let t = otsu_threshold(&hist);
        assert!(t > 50 && t < 200);
    }
}

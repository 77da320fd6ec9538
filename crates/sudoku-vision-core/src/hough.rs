//! The Hough accumulator and its sliding-window peak finder.
//!
//! Votes are collected into a dense `(theta, rho)` grid sized `W_h x H_h`
//! with `W_h` fixed at 360 one-degree bins spanning the full `[0, 2π)`
//! circle (this pipeline's lines are signed-ρ, so unlike a mod-π chessboard
//! accumulator the full circle is needed) and `H_h = min(width, height)` of
//! the input image. Counters are `u16` and saturate rather than wrap.

use crate::geometry::Line;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

pub const THETA_BINS: usize = 360;

/// Peak-finder tuning. A candidate bin must be a strict maximum within a
/// `(2*window_radius+1)`-wide square neighborhood, carry at least
/// `min_votes`, and sit at least `border` bins away from the ρ edges of the
/// accumulator (ρ bins near the border are unreliable: the admissible
/// angle range narrows as ρ approaches ±ρ_max).
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct HoughPeakParams {
    pub window_radius: usize,
    pub min_votes: u16,
    pub rho_border: usize,
}

impl Default for HoughPeakParams {
    fn default() -> Self {
        Self {
            window_radius: 5,
            min_votes: 200,
            rho_border: 10,
        }
    }
}

/// The `(theta, rho)` vote grid for one frame.
pub struct HoughAccumulator {
    rho_bins: usize,
    rho_max: f32,
    counts: Vec<u16>,
    cos_table: [f32; THETA_BINS],
    sin_table: [f32; THETA_BINS],
}

impl HoughAccumulator {
    /// Allocate (or, on a reused instance, resize) the accumulator for an
    /// image of the given size, and zero its counters.
    pub fn new(image_width: usize, image_height: usize) -> Self {
        let rho_bins = image_width.min(image_height).max(1);
        let rho_max = ((image_width * image_width + image_height * image_height) as f32).sqrt();

        let mut cos_table = [0.0f32; THETA_BINS];
        let mut sin_table = [0.0f32; THETA_BINS];
        for (t, (c, s)) in cos_table.iter_mut().zip(sin_table.iter_mut()).enumerate() {
            let theta = t as f32 * 2.0 * PI / THETA_BINS as f32;
            *c = theta.cos();
            *s = theta.sin();
        }

        Self {
            rho_bins,
            rho_max,
            counts: vec![0u16; THETA_BINS * rho_bins],
            cos_table,
            sin_table,
        }
    }

    /// Reset vote counts to zero without reallocating, sized to `(width,
    /// height)`. Reallocates only when the size actually changed, matching
    /// the per-frame scratch-buffer reuse convention.
    pub fn reset(&mut self, image_width: usize, image_height: usize) {
        let rho_bins = image_width.min(image_height).max(1);
        if rho_bins != self.rho_bins {
            *self = Self::new(image_width, image_height);
            return;
        }
        self.rho_max = ((image_width * image_width + image_height * image_height) as f32).sqrt();
        self.counts.iter_mut().for_each(|c| *c = 0);
    }

    fn rho_to_bin(&self, rho: f32) -> Option<usize> {
        let bin_width = 2.0 * self.rho_max / self.rho_bins as f32;
        if bin_width <= 0.0 {
            return None;
        }
        let idx = ((rho + self.rho_max) / bin_width).floor();
        if idx < 0.0 || idx as usize >= self.rho_bins {
            None
        } else {
            Some(idx as usize)
        }
    }

    fn bin_to_rho(&self, rho_bin: usize) -> f32 {
        let bin_width = 2.0 * self.rho_max / self.rho_bins as f32;
        -self.rho_max + (rho_bin as f32 + 0.5) * bin_width
    }

    #[inline]
    fn at(&self, theta_bin: usize, rho_bin: usize) -> u16 {
        self.counts[theta_bin * self.rho_bins + rho_bin]
    }

    /// Cast one vote per `(theta_bin, x, y)` for every edge pixel (non-zero
    /// in channel 0) of `edges`.
    pub fn accumulate(&mut self, edges: &crate::image::GrayBuffer) {
        for y in 0..edges.height {
            for x in 0..edges.width {
                if edges.get(x as i64, y as i64) == 0 {
                    continue;
                }
                for theta_bin in 0..THETA_BINS {
                    let rho = x as f32 * self.cos_table[theta_bin] + y as f32 * self.sin_table[theta_bin];
                    if let Some(rho_bin) = self.rho_to_bin(rho) {
                        let idx = theta_bin * self.rho_bins + rho_bin;
                        self.counts[idx] = self.counts[idx].saturating_add(1);
                    }
                }
            }
        }
    }

    /// Sliding-window peak detection: a bin is a peak iff it strictly
    /// exceeds every other bin in its `window_radius` neighborhood (theta
    /// wraps around the circle; rho does not), clears `min_votes`, and is
    /// at least `rho_border` bins from either rho edge.
    pub fn find_peaks(&self, params: &HoughPeakParams) -> Vec<Line> {
        let mut peaks = Vec::new();
        let r = params.window_radius as i64;

        for theta_bin in 0..THETA_BINS {
            for rho_bin in params.rho_border..self.rho_bins.saturating_sub(params.rho_border) {
                let votes = self.at(theta_bin, rho_bin);
                if votes < params.min_votes {
                    continue;
                }

                let mut is_peak = true;
                'window: for dt in -r..=r {
                    let tb = (theta_bin as i64 + dt).rem_euclid(THETA_BINS as i64) as usize;
                    for dr in -r..=r {
                        if dt == 0 && dr == 0 {
                            continue;
                        }
                        let rb = rho_bin as i64 + dr;
                        if rb < 0 || rb as usize >= self.rho_bins {
                            continue;
                        }
                        if self.at(tb, rb as usize) > votes {
                            is_peak = false;
                            break 'window;
                        }
                    }
                }

                if is_peak {
                    let theta = theta_bin as f32 * 2.0 * PI / THETA_BINS as f32;
                    let rho = self.bin_to_rho(rho_bin);
                    peaks.push(Line::new(theta, rho));
                }
            }
        }

        peaks
    }
}

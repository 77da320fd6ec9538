//! Binary thresholding preprocessor: local 3x3 mean/variance adaptive
//! thresholding against a whole-tile brightness floor, followed by an
//! edge-pixel shuffle that perturbs the boundary between foreground and
//! background to regularize the training set against the jittery edges a
//! real camera crop produces.

use rand::Rng;
use sudoku_vision_core::GrayBuffer;

/// Fixed `a` multiplier used at inference time (no randomized augmentation).
pub const INFERENCE_A: f32 = 2.0;

fn clamped_get(src: &GrayBuffer, x: i64, y: i64) -> u8 {
    let max_x = src.width as i64 - 1;
    let max_y = src.height as i64 - 1;
    src.get(x.clamp(0, max_x), y.clamp(0, max_y))
}

/// Adaptive local threshold: a pixel is foreground (255) when it clears
/// *both* a local-contrast bar (`center > a * local_std_dev`) and a
/// whole-tile brightness floor (`center > 0.95 * tile_mean`), so a locally
/// noisy but globally dark patch doesn't get promoted to foreground. Out of
/// bounds neighbors are clamped to the nearest edge pixel rather than
/// zero-padded, since zero-padding would pull the border's local mean down
/// and bias the threshold there.
///
/// `a` is [`INFERENCE_A`] at inference time, and sampled uniformly from
/// `[2.0, 4.0]` per training sample to diversify the training set.
pub fn adaptive_threshold(src: &GrayBuffer, a: f32) -> GrayBuffer {
    let (w, h) = (src.width, src.height);
    let mut out = GrayBuffer::zeros(w, h);

    let tile_count = (w * h) as f32;
    let tile_mean = src.data.iter().map(|&v| v as f32).sum::<f32>() / tile_count;

    for y in 0..h {
        for x in 0..w {
            let mut sum = 0.0f32;
            let mut sum_sq = 0.0f32;
            let mut count = 0.0f32;
            for dy in -1i64..=1 {
                for dx in -1i64..=1 {
                    let v = clamped_get(src, x as i64 + dx, y as i64 + dy) as f32;
                    sum += v;
                    sum_sq += v * v;
                    count += 1.0;
                }
            }
            let local_mean = sum / count;
            let variance = (sum_sq / count - local_mean * local_mean).max(0.0);
            let local_std_dev = variance.sqrt();

            let center = src.get(x as i64, y as i64) as f32;
            let is_fg = center > a * local_std_dev && center > 0.95 * tile_mean;
            out.set(x, y, if is_fg { 255 } else { 0 });
        }
    }

    out
}

/// Laplacian response at `(x, y)`: `up + down + left + right - 4 * center`,
/// using replicate-clamped neighbors so the border isn't spuriously flagged
/// as an edge by a zero-padded drop-off.
fn laplacian(binary: &GrayBuffer, x: i64, y: i64) -> i32 {
    let center = clamped_get(binary, x, y) as i32;
    let up = clamped_get(binary, x, y - 1) as i32;
    let down = clamped_get(binary, x, y + 1) as i32;
    let left = clamped_get(binary, x - 1, y) as i32;
    let right = clamped_get(binary, x + 1, y) as i32;
    up + down + left + right - 4 * center
}

/// Perturb the foreground/background boundary: a pixel is on the edge when
/// its Laplacian response is non-zero. With probability `1.0 - v`, an edge
/// pixel's value is copied onto a uniformly chosen diagonal neighbor and the
/// original pixel is inverted, so the classifier doesn't overfit to a single
/// exact edge shape. `v` is drawn per training sample from `[0.95, 0.99]`.
pub fn shuffle_edge_pixels(binary: &GrayBuffer, v: f32, rng: &mut impl Rng) -> GrayBuffer {
    let (w, h) = (binary.width, binary.height);
    let mut out = binary.clone();

    const DIAGONALS: [(i64, i64); 4] = [(-1, -1), (1, -1), (-1, 1), (1, 1)];

    for y in 0..h {
        for x in 0..w {
            if laplacian(binary, x as i64, y as i64) == 0 {
                continue;
            }
            if rng.gen::<f32>() >= 1.0 - v {
                continue;
            }

            let value = binary.get(x as i64, y as i64);
            let (dx, dy) = DIAGONALS[rng.gen_range(0..DIAGONALS.len())];
            let nx = (x as i64 + dx).clamp(0, w as i64 - 1) as usize;
            let ny = (y as i64 + dy).clamp(0, h as i64 - 1) as usize;

            out.set(nx, ny, value);
            out.set(x, y, if value == 0 { 255 } else { 0 });
        }
    }

    out
}

/// Flatten a binary `GrayBuffer` into the `[0.0, 1.0]` network input vector.
pub fn to_input_vector(binary: &GrayBuffer) -> Vec<f32> {
    binary.data.iter().map(|&v| if v != 0 { 1.0 } else { 0.0 }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn uniform_black_patch_is_background() {
        // A flat-zero tile has zero local std dev everywhere, so the only
        // thing keeping it out of the foreground is `center > 0`.
        let src = GrayBuffer::new(5, 5, vec![0; 25]);
        let bin = adaptive_threshold(&src, INFERENCE_A);
        assert!(bin.data.iter().all(|&v| v == 0));
    }

    #[test]
    fn bright_spot_on_dark_background_is_foreground() {
        let mut data = vec![10u8; 25];
        data[12] = 250; // center pixel of a 5x5
        let src = GrayBuffer::new(5, 5, data);
        let bin = adaptive_threshold(&src, INFERENCE_A);
        assert_eq!(bin.get(2, 2), 255);
    }

    #[test]
    fn shuffle_never_touches_interior_far_from_any_edge() {
        let mut data = vec![0u8; 100];
        for y in 0..10 {
            for x in 0..10 {
                if (2..8).contains(&x) && (2..8).contains(&y) {
                    data[y * 10 + x] = 255;
                }
            }
        }
        let bin = GrayBuffer::new(10, 10, data);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        // v = 0.0 maximizes the flip probability (1 - v), still only edges move.
        let shuffled = shuffle_edge_pixels(&bin, 0.0, &mut rng);
        // Pixel (4,4) is deep in the foreground interior, far from any edge.
        assert_eq!(shuffled.get(4, 4), 255);
    }

    #[test]
    fn edge_pixel_copies_to_a_diagonal_neighbor_and_inverts() {
        let mut data = vec![0u8; 100];
        for y in 0..10 {
            for x in 0..10 {
                if (2..8).contains(&x) && (2..8).contains(&y) {
                    data[y * 10 + x] = 255;
                }
            }
        }
        let bin = GrayBuffer::new(10, 10, data);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let shuffled = shuffle_edge_pixels(&bin, 0.0, &mut rng);
        // The boundary corner (2,2) sits on the edge and must always flip
        // at v = 0.0, since the flip probability there is 1.0.
        assert_eq!(shuffled.get(2, 2), 0);
    }

    #[test]
    fn to_input_vector_maps_binary_values() {
        let buf = GrayBuffer::new(2, 1, vec![0, 255]);
        assert_eq!(to_input_vector(&buf), vec![0.0, 1.0]);
    }
}

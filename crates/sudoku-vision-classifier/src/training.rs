//! Synthetic training data generation and the training loop.
//!
//! Actually rasterizing a digit glyph (choice of font, anti-aliasing,
//! rendering backend) is outside this crate's scope — it's supplied by a
//! [`GlyphSource`] collaborator. This module owns the part that is this
//! pipeline's concern: deterministic seeded jitter across many synthetic
//! samples per digit, turning each rendered glyph into a thresholded
//! network input paired with a label, and driving backprop to convergence.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sudoku_vision_core::GrayBuffer;

use crate::network::Network;
use crate::threshold::{adaptive_threshold, shuffle_edge_pixels, to_input_vector};

/// Glyph raster width/height fed to the classifier. 0 (blank cell) through
/// 9 are all rendered at this size.
pub const GLYPH_WIDTH: usize = 16;
pub const GLYPH_HEIGHT: usize = 16;
pub const OUTPUT_CLASSES: usize = 10;

/// Fixed learning rate for backprop.
pub const LEARNING_RATE: f32 = 0.005;
/// Training never runs past this many epochs even if the loss hasn't
/// bottomed out.
pub const MAX_EPOCHS: usize = 1500;
/// The artifact is persisted at least this often regardless of convergence.
pub const PERSIST_EVERY_EPOCHS: usize = 25;
/// Training stops early once an epoch's summed absolute output delta drops
/// below this.
pub const PERSIST_DELTA_THRESHOLD: f32 = 1.0;

/// Hidden layer width for a network reading `input_size`-wide glyphs: half
/// the input size, rounded down.
pub fn hidden_layer_size(input_size: usize) -> usize {
    input_size / 2
}

/// Renders one jittered instance of a digit (or blank, for digit 0) as a
/// `GLYPH_WIDTH x GLYPH_HEIGHT` greyscale glyph. An external collaborator:
/// this crate has no font rasterizer of its own.
pub trait GlyphSource {
    fn render_digit(&mut self, digit: u8, rng: &mut dyn RngCore) -> GrayBuffer;
}

fn one_hot(digit: u8) -> [f32; OUTPUT_CLASSES] {
    let mut t = [0.0f32; OUTPUT_CLASSES];
    t[digit as usize] = 1.0;
    t
}

/// One labeled training example: a thresholded, flattened glyph, its label,
/// and the one-hot target vector derived from that label.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingSample {
    pub input: Vec<f32>,
    pub label: u8,
    pub target: [f32; OUTPUT_CLASSES],
}

impl TrainingSample {
    pub fn new(input: Vec<f32>, label: u8) -> Self {
        Self {
            input,
            label,
            target: one_hot(label),
        }
    }
}

/// Generate a deterministic synthetic training set: `samples_per_digit`
/// jittered renders of each digit 0-9 (0 meaning a blank cell), binary
/// thresholded and edge-shuffled exactly as a live camera frame's cell crop
/// would be — except the thresholding knobs (`a` and the edge-shuffle
/// survival rate `v`) are randomized per sample rather than fixed, so the
/// network sees a spread of binarization outcomes instead of one.
pub fn generate_training_set(
    source: &mut impl GlyphSource,
    seed: u64,
    samples_per_digit: usize,
) -> Vec<TrainingSample> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut samples = Vec::with_capacity(samples_per_digit * OUTPUT_CLASSES);

    for digit in 0..OUTPUT_CLASSES as u8 {
        for _ in 0..samples_per_digit {
            let glyph = source.render_digit(digit, &mut rng);
            let a = rng.gen_range(2.0f32..4.0);
            let binary = adaptive_threshold(&glyph, a);
            let v = rng.gen_range(0.95f32..0.99);
            let shuffled = shuffle_edge_pixels(&binary, v, &mut rng);
            samples.push(TrainingSample::new(to_input_vector(&shuffled), digit));
        }
    }

    samples
}

/// Run backprop over `samples` for up to [`MAX_EPOCHS`] epochs at
/// [`LEARNING_RATE`]. `persist` is called with the current network every
/// [`PERSIST_EVERY_EPOCHS`] epochs, and training stops as soon as an epoch's
/// summed absolute output delta drops below [`PERSIST_DELTA_THRESHOLD`] (a
/// final persist call is made for that epoch before returning).
pub fn train(net: &mut Network, samples: &[TrainingSample], mut persist: impl FnMut(&Network)) {
    for epoch in 0..MAX_EPOCHS {
        let mut summed_delta = 0.0f32;
        for sample in samples {
            summed_delta += net.train_sample(&sample.input, &sample.target, LEARNING_RATE);
        }

        let due_for_periodic_persist = (epoch + 1) % PERSIST_EVERY_EPOCHS == 0;
        let converged = summed_delta < PERSIST_DELTA_THRESHOLD;

        if due_for_periodic_persist || converged {
            persist(net);
        }
        if converged {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    /// A deterministic stand-in glyph source for tests: digit `d` renders
    /// as a `d`-sized bright square in the top-left corner, jittered by
    /// a single extra random pixel so the rng is actually exercised.
    struct SquareGlyphs;

    impl GlyphSource for SquareGlyphs {
        fn render_digit(&mut self, digit: u8, rng: &mut dyn RngCore) -> GrayBuffer {
            let mut data = vec![10u8; GLYPH_WIDTH * GLYPH_HEIGHT];
            for y in 0..(digit as usize).min(GLYPH_HEIGHT) {
                for x in 0..(digit as usize).min(GLYPH_WIDTH) {
                    data[y * GLYPH_WIDTH + x] = 240;
                }
            }
            let jitter_idx = rng.gen_range(0..data.len());
            data[jitter_idx] = data[jitter_idx].saturating_add(1);
            GrayBuffer::new(GLYPH_WIDTH, GLYPH_HEIGHT, data)
        }
    }

    #[test]
    fn generates_expected_sample_count() {
        let mut source = SquareGlyphs;
        let samples = generate_training_set(&mut source, 1, 3);
        assert_eq!(samples.len(), 3 * OUTPUT_CLASSES);
    }

    #[test]
    fn each_sample_has_a_one_hot_target_matching_its_label() {
        let mut source = SquareGlyphs;
        let samples = generate_training_set(&mut source, 2, 1);
        for sample in &samples {
            let ones = sample.target.iter().filter(|&&v| v == 1.0).count();
            assert_eq!(ones, 1);
            assert_eq!(sample.target[sample.label as usize], 1.0);
            assert_eq!(sample.input.len(), GLYPH_WIDTH * GLYPH_HEIGHT);
        }
    }

    #[test]
    fn same_seed_is_deterministic() {
        let mut a = SquareGlyphs;
        let mut b = SquareGlyphs;
        let samples_a = generate_training_set(&mut a, 99, 2);
        let samples_b = generate_training_set(&mut b, 99, 2);
        for (x, y) in samples_a.iter().zip(samples_b.iter()) {
            assert_eq!(x.input, y.input);
        }
    }

    #[test]
    fn hidden_layer_size_halves_and_rounds_down() {
        assert_eq!(hidden_layer_size(256), 128);
        assert_eq!(hidden_layer_size(9), 4);
    }

    #[test]
    fn train_persists_periodically_and_on_convergence() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut net = Network::random(&[3, 4, 2], &mut rng);
        let samples = vec![
            TrainingSample::new(vec![0.2, 0.8, 0.5], 1),
            TrainingSample::new(vec![0.9, 0.1, 0.4], 0),
        ];

        let mut persist_count = 0;
        train(&mut net, &samples, |_| persist_count += 1);
        assert!(persist_count > 0, "train should persist at least once");
    }
}

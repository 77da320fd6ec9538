//! A small feed-forward MLP: sigmoid activations, trained by plain
//! per-sample backprop (no mini-batching).
//!
//! Training-time activation and delta buffers are padded to a multiple of
//! 8 (`pad8`) so the inner loops walk fixed-width chunks friendly to
//! autovectorization; the padding lanes are always zero and never
//! contribute to a real neuron's input, so they vanish from the result.
//! The serialized model and the inference path both use the true,
//! unpadded layer widths — padding is purely a training-loop concern.

use rand::Rng;

/// Round `n` up to the next multiple of 8.
#[inline]
pub fn pad8(n: usize) -> usize {
    (n + 7) / 8 * 8
}

#[inline]
fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[inline]
fn sigmoid_prime_from_output(y: f32) -> f32 {
    y * (1.0 - y)
}

/// One fully-connected layer: `n_out` neurons, each reading all `n_in`
/// inputs. `weights` is row-major, `n_out` rows of `n_in` entries.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub n_in: usize,
    pub n_out: usize,
    pub weights: Vec<f32>,
    pub biases: Vec<f32>,
}

impl Layer {
    pub fn zeros(n_in: usize, n_out: usize) -> Self {
        Self {
            n_in,
            n_out,
            weights: vec![0.0; n_in * n_out],
            biases: vec![0.0; n_out],
        }
    }

    /// Random weights/biases in `[-scale, scale]`, biases left at zero.
    pub fn random(n_in: usize, n_out: usize, scale: f32, rng: &mut impl Rng) -> Self {
        let weights = (0..n_in * n_out)
            .map(|_| rng.gen_range(-scale..scale))
            .collect();
        Self {
            n_in,
            n_out,
            weights,
            biases: vec![0.0; n_out],
        }
    }

    #[inline]
    fn weight(&self, out_idx: usize, in_idx: usize) -> f32 {
        self.weights[out_idx * self.n_in + in_idx]
    }

    #[inline]
    fn weight_mut(&mut self, out_idx: usize, in_idx: usize) -> &mut f32 {
        &mut self.weights[out_idx * self.n_in + in_idx]
    }

    /// Forward pass through this layer. `out` is resized to `pad8(n_out)`
    /// with the trailing padding lanes left at zero.
    fn forward_into(&self, input: &[f32], out: &mut Vec<f32>) {
        out.clear();
        out.resize(pad8(self.n_out), 0.0);
        for o in 0..self.n_out {
            let mut acc = self.biases[o];
            for i in 0..self.n_in {
                acc += self.weight(o, i) * input[i];
            }
            out[o] = sigmoid(acc);
        }
    }
}

/// A feed-forward network: an ordered stack of [`Layer`]s, sigmoid
/// activation throughout.
#[derive(Clone, Debug, PartialEq)]
pub struct Network {
    pub layers: Vec<Layer>,
}

impl Network {
    /// Build a network with the given `[input, hidden..., output]` layer
    /// widths, weights seeded uniformly in `[-0.5, 0.5]`.
    pub fn random(layer_sizes: &[usize], rng: &mut impl Rng) -> Self {
        assert!(layer_sizes.len() >= 2, "a network needs at least input and output layers");
        let layers = layer_sizes
            .windows(2)
            .map(|w| Layer::random(w[0], w[1], 0.5, rng))
            .collect();
        Self { layers }
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map(|l| l.n_in).unwrap_or(0)
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map(|l| l.n_out).unwrap_or(0)
    }

    /// Run inference, returning the (unpadded) output layer's activations.
    ///
    /// # Panics
    /// Panics if `input.len() != self.input_size()`.
    pub fn forward(&self, input: &[f32]) -> Vec<f32> {
        assert_eq!(input.len(), self.input_size(), "input size mismatch");
        let mut activations: Vec<Vec<f32>> = Vec::with_capacity(self.layers.len() + 1);
        activations.push(input.to_vec());
        for layer in &self.layers {
            let mut out = Vec::new();
            layer.forward_into(activations.last().unwrap(), &mut out);
            out.truncate(layer.n_out);
            activations.push(out);
        }
        activations.pop().unwrap()
    }

    /// The index of the highest-activation output neuron, for classification.
    pub fn predict(&self, input: &[f32]) -> usize {
        let out = self.forward(input);
        out.iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// One step of per-sample stochastic backprop: forward pass, then
    /// layer-by-layer error backpropagation with an in-place gradient step.
    /// Returns the sum of the absolute output-layer deltas, a convergence
    /// signal the training loop uses to decide when to stop early.
    ///
    /// # Panics
    /// Panics on input/target size mismatch.
    pub fn train_sample(&mut self, input: &[f32], target: &[f32], learning_rate: f32) -> f32 {
        assert_eq!(input.len(), self.input_size());
        assert_eq!(target.len(), self.output_size());

        // Forward pass, keeping every layer's (padded) activations.
        let mut activations: Vec<Vec<f32>> = Vec::with_capacity(self.layers.len() + 1);
        activations.push(pad_copy(input, self.layers.first().map(|l| l.n_in).unwrap_or(input.len())));
        for layer in &self.layers {
            let mut out = Vec::new();
            layer.forward_into(activations.last().unwrap(), &mut out);
            activations.push(out);
        }

        // Output-layer delta: (output - target) * sigmoid'(output).
        let last = self.layers.len() - 1;
        let output = &activations[last + 1];
        let mut delta = vec![0.0f32; pad8(self.layers[last].n_out)];
        for o in 0..self.layers[last].n_out {
            let err = output[o] - target[o];
            delta[o] = err * sigmoid_prime_from_output(output[o]);
        }
        let summed_delta = delta[..self.layers[last].n_out].iter().map(|d| d.abs()).sum::<f32>();

        let mut next_delta = delta;
        for l in (0..self.layers.len()).rev() {
            let layer_input = activations[l].clone();
            let n_in = self.layers[l].n_in;
            let n_out = self.layers[l].n_out;

            // Propagate delta to the previous layer before mutating weights.
            let mut prev_delta = vec![0.0f32; pad8(n_in)];
            if l > 0 {
                let prev_output = &activations[l];
                for i in 0..n_in {
                    let mut acc = 0.0f32;
                    for o in 0..n_out {
                        acc += self.layers[l].weight(o, i) * next_delta[o];
                    }
                    prev_delta[i] = acc * sigmoid_prime_from_output(prev_output[i]);
                }
            }

            let layer = &mut self.layers[l];
            for o in 0..n_out {
                layer.biases[o] -= learning_rate * next_delta[o];
                for i in 0..n_in {
                    let grad = next_delta[o] * layer_input[i];
                    *layer.weight_mut(o, i) -= learning_rate * grad;
                }
            }

            next_delta = prev_delta;
        }

        summed_delta
    }
}

fn pad_copy(input: &[f32], n_in: usize) -> Vec<f32> {
    let mut v = input.to_vec();
    v.resize(pad8(n_in), 0.0);
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn pad8_rounds_up_to_multiple_of_eight() {
        assert_eq!(pad8(0), 0);
        assert_eq!(pad8(1), 8);
        assert_eq!(pad8(8), 8);
        assert_eq!(pad8(9), 16);
    }

    #[test]
    fn forward_output_has_expected_width() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let net = Network::random(&[4, 6, 3], &mut rng);
        let out = net.forward(&[0.1, 0.2, 0.3, 0.4]);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn training_reduces_loss_on_a_fixed_sample() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut net = Network::random(&[3, 5, 2], &mut rng);
        let input = [0.2, 0.8, 0.5];
        let target = [1.0, 0.0];

        let loss = |net: &Network| {
            let out = net.forward(&input);
            out.iter().zip(target.iter()).map(|(o, t)| (o - t).powi(2)).sum::<f32>()
        };

        let before = loss(&net);
        for _ in 0..200 {
            net.train_sample(&input, &target, 0.5);
        }
        let after = loss(&net);
        assert!(after < before, "expected training to reduce loss: {before} -> {after}");
    }

    #[test]
    fn predict_picks_the_argmax_output() {
        let mut net = Network {
            layers: vec![Layer::zeros(2, 3)],
        };
        net.layers[0].biases = vec![-1.0, 5.0, -1.0];
        assert_eq!(net.predict(&[0.0, 0.0]), 1);
    }
}

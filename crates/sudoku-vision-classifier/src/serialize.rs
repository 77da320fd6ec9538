//! The persisted training artifact format (`training.bin.dat`).
//!
//! Layout, all integers little-endian, no header and no magic:
//!
//! ```text
//! u32         N_train
//! N_train x   training sample:
//!               u32        label
//!               u32        input_len
//!               f32[len]   input
//! u32         N_test (always 0 — this pipeline never persists a held-out set)
//! u32         N_layers
//! N_layers x  layer:
//!               u32         N_neurons
//!               N_neurons x neuron:
//!                 u32        N_weights (= n_in + 1)
//!                 f32[n_in]  weights
//!                 f32        bias (the last of the N_weights entries)
//! u32         N_choices
//! u8[N_choices]  choices (the label alphabet, e.g. digits 0-9)
//! ```

use std::io::{self, Read, Write};

use crate::error::ClassifierError;
use crate::network::{Layer, Network};
use crate::training::TrainingSample;

pub fn write_training_artifact<W: Write>(
    w: &mut W,
    samples: &[TrainingSample],
    net: &Network,
    choices: &[u8],
) -> io::Result<()> {
    w.write_all(&(samples.len() as u32).to_le_bytes())?;
    for sample in samples {
        w.write_all(&(sample.label as u32).to_le_bytes())?;
        w.write_all(&(sample.input.len() as u32).to_le_bytes())?;
        for v in &sample.input {
            w.write_all(&v.to_le_bytes())?;
        }
    }

    w.write_all(&0u32.to_le_bytes())?; // N_test

    w.write_all(&(net.layers.len() as u32).to_le_bytes())?;
    for layer in &net.layers {
        w.write_all(&(layer.n_out as u32).to_le_bytes())?;
        for o in 0..layer.n_out {
            w.write_all(&((layer.n_in + 1) as u32).to_le_bytes())?;
            for i in 0..layer.n_in {
                w.write_all(&layer.weights[o * layer.n_in + i].to_le_bytes())?;
            }
            w.write_all(&layer.biases[o].to_le_bytes())?;
        }
    }

    w.write_all(&(choices.len() as u32).to_le_bytes())?;
    w.write_all(choices)?;

    Ok(())
}

pub fn read_training_artifact<R: Read>(
    r: &mut R,
) -> Result<(Vec<TrainingSample>, Network, Vec<u8>), ClassifierError> {
    let n_train = read_u32(r)? as usize;
    let mut samples = Vec::with_capacity(n_train);
    for _ in 0..n_train {
        let label = read_u32(r)? as u8;
        let input_len = read_u32(r)? as usize;
        let mut input = Vec::with_capacity(input_len);
        for _ in 0..input_len {
            input.push(read_f32(r)?);
        }
        samples.push(TrainingSample::new(input, label));
    }

    let _n_test = read_u32(r)?; // always 0, reserved

    let n_layers = read_u32(r)? as usize;
    let mut layers = Vec::with_capacity(n_layers);
    for layer_idx in 0..n_layers {
        let n_neurons = read_u32(r)? as usize;
        let mut n_in = 0usize;
        let mut weights = Vec::new();
        let mut biases = Vec::with_capacity(n_neurons);

        for neuron_idx in 0..n_neurons {
            let n_weights = read_u32(r)? as usize;
            if n_weights == 0 {
                return Err(ClassifierError::MalformedLayer {
                    layer: layer_idx,
                    neuron: neuron_idx,
                    found: n_weights,
                    expected: n_in + 1,
                });
            }
            let this_n_in = n_weights - 1;
            if neuron_idx == 0 {
                n_in = this_n_in;
            } else if this_n_in != n_in {
                return Err(ClassifierError::MalformedLayer {
                    layer: layer_idx,
                    neuron: neuron_idx,
                    found: n_weights,
                    expected: n_in + 1,
                });
            }

            for _ in 0..this_n_in {
                weights.push(read_f32(r)?);
            }
            biases.push(read_f32(r)?);
        }

        layers.push(Layer {
            n_in,
            n_out: n_neurons,
            weights,
            biases,
        });
    }

    let n_choices = read_u32(r)? as usize;
    let mut choices = vec![0u8; n_choices];
    read_exact_or_truncated(r, &mut choices)?;

    Ok((samples, Network { layers }, choices))
}

fn read_exact_or_truncated<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<(), ClassifierError> {
    r.read_exact(buf).map_err(|e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            ClassifierError::Truncated
        } else {
            ClassifierError::Io(e)
        }
    })
}

fn read_u32<R: Read>(r: &mut R) -> Result<u32, ClassifierError> {
    let mut buf = [0u8; 4];
    read_exact_or_truncated(r, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_f32<R: Read>(r: &mut R) -> Result<f32, ClassifierError> {
    let mut buf = [0u8; 4];
    read_exact_or_truncated(r, &mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

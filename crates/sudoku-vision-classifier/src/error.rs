use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("I/O error reading or writing a training artifact")]
    Io(#[from] std::io::Error),

    #[error("training artifact is truncated")]
    Truncated,

    #[error("layer {layer} neuron {neuron} has {found} weights, expected {expected}")]
    MalformedLayer { layer: usize, neuron: usize, found: usize, expected: usize },
}

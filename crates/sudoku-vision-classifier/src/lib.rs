//! The digit classifier: a small backprop-trained MLP, its binary
//! thresholding preprocessor, synthetic training data generation, and the
//! on-disk model format.

pub mod error;
pub mod network;
pub mod serialize;
pub mod threshold;
pub mod training;

pub use error::ClassifierError;
pub use network::{pad8, Layer, Network};
pub use serialize::{read_training_artifact, write_training_artifact};
pub use threshold::{adaptive_threshold, shuffle_edge_pixels, to_input_vector, INFERENCE_A};
pub use training::{
    generate_training_set, hidden_layer_size, train, GlyphSource, TrainingSample, GLYPH_HEIGHT, GLYPH_WIDTH,
    LEARNING_RATE, MAX_EPOCHS, OUTPUT_CLASSES, PERSIST_DELTA_THRESHOLD, PERSIST_EVERY_EPOCHS,
};

//! AR Sudoku vision/reasoning core.
//!
//! Given an RGB camera frame, find a 9x9 Sudoku grid, read its printed
//! digits, solve it, and hand back the grid's corner coordinates plus the
//! solved digits. Display and camera capture are out of scope for this
//! crate — see [`collaborators`] for the seams where callers plug those in.

pub mod collaborators;
pub mod error;
pub mod pipeline;

pub use collaborators::{Camera, Renderer};
pub use error::PipelineError;
pub use pipeline::{FrameOutcome, Pipeline, PipelineConfig};

pub use sudoku_vision_classifier as classifier;
pub use sudoku_vision_core as core;
pub use sudoku_vision_solver as solver;

//! Structural error type for this crate.
//!
//! Per the error-handling design, collaborator/contract failures that a
//! caller can reasonably branch on are `thiserror`-derived variants here.
//! Transient per-frame "nothing found this frame" outcomes (no grid located,
//! no Hough peaks above threshold) are represented as `Option`/`bool`
//! sentinels on the relevant functions, not as errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("image dimensions {width}x{height} are too small for this operation (need at least {min_width}x{min_height})")]
    ImageTooSmall {
        width: usize,
        height: usize,
        min_width: usize,
        min_height: usize,
    },

    #[error("homography estimation requires at least 4 point correspondences, got {got}")]
    InsufficientCorrespondences { got: usize },

    #[error("homography is not invertible")]
    SingularHomography,
}

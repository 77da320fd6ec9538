//! The seams where this crate hands off to things it deliberately does not
//! own: getting a frame onto the wire, and putting pixels on a screen.
//! Both are passed in by the caller as trait objects rather than held as
//! ambient state, so [`crate::pipeline::Pipeline`] stays a plain,
//! synchronous, single-threaded-per-frame value with no knowledge of any
//! particular camera or display backend.

use nalgebra::Point2;
use sudoku_vision_core::Image;

/// Supplies camera frames. `capture_frame` returning `None` means "no frame
/// available this tick" (e.g. the camera is still warming up), a transient
/// condition rather than an error.
pub trait Camera {
    fn capture_frame(&mut self) -> Option<Image>;
}

/// Receives the pipeline's per-frame findings for display. Called at most
/// once per processed frame; implementations decide how (or whether) to
/// draw an overlay.
pub trait Renderer {
    fn render_overlay(&mut self, frame: &Image, corners: [Point2<f32>; 4], digits: [u8; 81]);
}

//! Geometry and vision primitives for the AR Sudoku pipeline.
//!
//! This crate owns everything upstream of "here are the puzzle's corners":
//! the image types, the Canny edge extractor, the Hough accumulator and
//! peak finder, the puzzle-grid finder, and the homography helpers used to
//! rectify a found grid into a square crop for the classifier.

pub mod edge_extractor;
pub mod error;
pub mod geometry;
pub mod homography;
pub mod hough;
pub mod image;
pub mod logger;
pub mod puzzle_finder;

pub use edge_extractor::{EdgeExtractor, EdgeExtractorParams};
pub use error::CoreError;
pub use geometry::{difference_theta, intersect_lines, mean_theta, wrap_2pi, Line, LineCluster};
pub use homography::{estimate_homography_rect_to_img, homography_from_4pt, warp_perspective_gray, Homography};
pub use hough::{HoughAccumulator, HoughPeakParams, THETA_BINS};
pub use image::{sample_bilinear, sample_bilinear_u8, GradientMap, GrayBuffer, Image};
pub use puzzle_finder::{PuzzleFinderParams, PuzzleFinderResult, GRID_LINE_COUNT};

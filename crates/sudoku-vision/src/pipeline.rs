//! `Pipeline`: wires the core geometry stages, the classifier, and the
//! cached solver into the single `process_frame` entry point a caller
//! drives once per camera frame.
//!
//! Per the concurrency model, everything in here runs on the caller's
//! thread except the solver's own background DFS search; `process_frame`
//! never blocks waiting on that search; it reports whatever the cache
//! already knows and lets the caller poll again next frame.

use log::debug;
use nalgebra::{Matrix3, Point2};
use serde::{Deserialize, Serialize};

use sudoku_vision_classifier::{threshold, Network};
use sudoku_vision_core::{
    homography::{homography_from_4pt, Homography},
    puzzle_finder, EdgeExtractor, EdgeExtractorParams, HoughAccumulator, HoughPeakParams, Image,
    PuzzleFinderParams,
};
use sudoku_vision_solver::{CachedPuzzleSolver, Game, SolveOutcome};

/// Tunables for every stage of one `process_frame` call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub edge_params: EdgeExtractorParams,
    pub hough_peak_params: HoughPeakParams,
    pub puzzle_finder_params: PuzzleFinderParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            edge_params: EdgeExtractorParams::default(),
            hough_peak_params: HoughPeakParams::default(),
            puzzle_finder_params: PuzzleFinderParams::default(),
        }
    }
}

/// What one frame yielded: the grid's corners, the digits the classifier
/// read off of it (0 = blank cell), and, if the cache already has a
/// solution ready, the solved board.
#[derive(Clone, Copy, Debug)]
pub struct FrameOutcome {
    pub corners: [Point2<f32>; 4],
    pub digits: [u8; 81],
    pub solution: Option<[u8; 81]>,
}

/// Owns every piece of reused per-frame state: the edge extractor's
/// scratch buffers, the Hough accumulator (sized lazily on first frame),
/// the trained classifier, and the solution cache.
pub struct Pipeline {
    config: PipelineConfig,
    edge_extractor: EdgeExtractor,
    hough: Option<HoughAccumulator>,
    classifier: Network,
    solver: CachedPuzzleSolver,
}

impl Pipeline {
    pub fn new(classifier: Network, config: PipelineConfig) -> Self {
        Self {
            config,
            edge_extractor: EdgeExtractor::new(),
            hough: None,
            classifier,
            solver: CachedPuzzleSolver::new(),
        }
    }

    /// Run edge extraction, Hough voting, grid finding, digit
    /// classification, and a (possibly cached) solve on one frame.
    ///
    /// Returns `None` when no grid was found this frame — a routine,
    /// expected outcome for most frames of a live feed, not an error.
    pub fn process_frame(&mut self, frame: &Image) -> Option<FrameOutcome> {
        let edges = self.edge_extractor.extract(frame, &self.config.edge_params);
        let edge_gray = edges.channel0_planar();

        let acc = self
            .hough
            .get_or_insert_with(|| HoughAccumulator::new(frame.width(), frame.height()));
        acc.reset(frame.width(), frame.height());
        acc.accumulate(&edge_gray);

        let peaks = acc.find_peaks(&self.config.hough_peak_params);
        debug!("hough peak finder produced {} candidate lines", peaks.len());

        let found = puzzle_finder::find(&peaks, &self.config.puzzle_finder_params)?;
        debug!("grid located at corners {:?}", found.corners);

        let digits = self.classify_cells(frame, &found.corners);

        let solution = match self.solver.submit(Game::from_array(digits)) {
            SolveOutcome::Cached(solved) => Some(solved.to_array()),
            SolveOutcome::Pending | SolveOutcome::Unsolvable => self.poll_solution(),
        };

        Some(FrameOutcome {
            corners: found.corners,
            digits,
            solution,
        })
    }

    /// Non-blocking poll of an in-flight background solve started by a
    /// previous frame, for callers that want to check again without
    /// submitting a new frame's digits.
    pub fn poll_solution(&mut self) -> Option<[u8; 81]> {
        match self.solver.poll() {
            Some(SolveOutcome::Cached(solved)) => Some(solved.to_array()),
            _ => None,
        }
    }

    fn classify_cells(&self, frame: &Image, corners: &[Point2<f32>; 4]) -> [u8; 81] {
        let gray = frame.channel0_planar();
        let glyph_w = sudoku_vision_classifier::GLYPH_WIDTH;
        let glyph_h = sudoku_vision_classifier::GLYPH_HEIGHT;

        let rect_corners = [
            Point2::new(0.0f32, 0.0),
            Point2::new(9.0, 0.0),
            Point2::new(9.0, 9.0),
            Point2::new(0.0, 9.0),
        ];

        let mut digits = [0u8; 81];
        let Some(grid_to_image) = homography_from_4pt(&rect_corners, corners) else {
            return digits;
        };

        for row in 0..9 {
            for col in 0..9 {
                let cell_to_glyph = Matrix3::<f64>::new(
                    1.0 / glyph_w as f64,
                    0.0,
                    col as f64,
                    0.0,
                    1.0 / glyph_h as f64,
                    row as f64,
                    0.0,
                    0.0,
                    1.0,
                );
                let glyph_to_image = Homography::new(grid_to_image.h * cell_to_glyph);

                let crop = sudoku_vision_core::homography::warp_perspective_gray(
                    &gray,
                    glyph_to_image,
                    glyph_w,
                    glyph_h,
                );
                let binary = threshold::adaptive_threshold(&crop, threshold::INFERENCE_A);
                let input = threshold::to_input_vector(&binary);
                let digit = self.classifier.predict(&input) as u8;
                digits[row * 9 + col] = digit;
            }
        }

        digits
    }
}

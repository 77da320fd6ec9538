//! Groups Hough peaks into the two perpendicular 10-line clusters that make
//! up a 9x9 Sudoku grid's boundary lines, and extracts the four outer
//! corners from them.
//!
//! Clustering is wrap-safe angular clustering built directly on
//! [`crate::geometry`]'s `difference_theta`/`mean_theta`; corner extraction
//! is Hesse-form line intersection of the two extreme lines from each
//! cluster.

use crate::geometry::{difference_theta, intersect_lines, mean_theta, Line, LineCluster};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// How many grid lines a fully-visible 9x9 puzzle presents per axis
/// (9 cells need 10 boundary lines).
pub const GRID_LINE_COUNT: usize = 10;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PuzzleFinderParams {
    /// Maximum angular distance between a line and its cluster's running
    /// mean for the line to join that cluster.
    pub tau_theta: f32,
    /// Tolerance, in radians, around the expected right angle (π/2) when
    /// pairing two clusters as the grid's perpendicular axes.
    pub tau_perp: f32,
    /// Maximum fractional deviation of any rho gap from the mean rho gap
    /// within a retained 10-line cluster.
    pub rho_uniformity_fraction: f32,
}

impl Default for PuzzleFinderParams {
    fn default() -> Self {
        Self {
            tau_theta: 0.08,
            tau_perp: 0.08,
            rho_uniformity_fraction: 0.20,
        }
    }
}

/// The inspectable intermediate and final state of one `find` call, kept
/// around for debugging/visualization collaborators.
pub struct PuzzleFinderResult {
    pub corners: [Point2<f32>; 4],
    pub cluster_a: LineCluster,
    pub cluster_b: LineCluster,
}

/// Greedy wrap-safe angular clustering: a line joins the first existing
/// cluster whose running circular mean is within `tau_theta`, else starts
/// a new cluster.
pub fn cluster_lines(lines: &[Line], tau_theta: f32) -> Vec<LineCluster> {
    let mut clusters: Vec<Vec<Line>> = Vec::new();

    'lines: for &line in lines {
        for cluster in clusters.iter_mut() {
            let thetas: Vec<f32> = cluster.iter().map(|l| l.theta).collect();
            let mean = mean_theta(&thetas);
            if difference_theta(line.theta, mean) <= tau_theta {
                cluster.push(line);
                continue 'lines;
            }
        }
        clusters.push(vec![line]);
    }

    clusters.into_iter().map(LineCluster::new).collect()
}

/// Score a (sorted-by-rho) window of `count` lines by how far its rho gaps
/// deviate from uniform, for picking the best 10-line subset out of a
/// cluster that collected more than 10 candidates.
fn uniformity_score(window: &[Line]) -> f32 {
    let gaps: Vec<f32> = window.windows(2).map(|w| w[1].rho - w[0].rho).collect();
    if gaps.is_empty() {
        return f32::INFINITY;
    }
    let mean_gap = gaps.iter().sum::<f32>() / gaps.len() as f32;
    if mean_gap <= 0.0 {
        return f32::INFINITY;
    }
    gaps.iter().map(|&g| ((g - mean_gap) / mean_gap).powi(2)).sum()
}

/// Pick the best uniformly-spaced 10-line subset from a cluster, if one
/// exists within `rho_uniformity_fraction`.
fn retain_uniform_grid_lines(cluster: LineCluster, fraction: f32) -> Option<LineCluster> {
    let sorted = cluster.sorted_by_rho();
    if sorted.len() < GRID_LINE_COUNT {
        return None;
    }

    let mut best: Option<(f32, Vec<Line>)> = None;
    for window in sorted.windows(GRID_LINE_COUNT) {
        let score = uniformity_score(window);
        if best.as_ref().map(|(s, _)| score < *s).unwrap_or(true) {
            best = Some((score, window.to_vec()));
        }
    }

    let (_, lines) = best?;
    let gaps: Vec<f32> = lines.windows(2).map(|w| w[1].rho - w[0].rho).collect();
    let mean_gap = gaps.iter().sum::<f32>() / gaps.len() as f32;
    if mean_gap <= 0.0 {
        return None;
    }
    let within_tolerance = gaps
        .iter()
        .all(|&g| (g - mean_gap).abs() <= fraction * mean_gap);

    if within_tolerance {
        Some(LineCluster::new(lines))
    } else {
        None
    }
}

/// Order four points into a consistent cycle (by angle around their
/// centroid), rotated so the point closest to the image origin comes
/// first — a stable, deterministic corner ordering for callers that don't
/// care which corner is "first" but do need a consistent winding.
fn canonical_order(mut points: [Point2<f32>; 4]) -> [Point2<f32>; 4] {
    let cx = points.iter().map(|p| p.x).sum::<f32>() / 4.0;
    let cy = points.iter().map(|p| p.y).sum::<f32>() / 4.0;
    points.sort_by(|a, b| {
        let angle_a = (a.y - cy).atan2(a.x - cx);
        let angle_b = (b.y - cy).atan2(b.x - cx);
        angle_a.partial_cmp(&angle_b).unwrap_or(std::cmp::Ordering::Equal)
    });

    let start = points
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (a.x + a.y)
                .partial_cmp(&(b.x + b.y))
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0);

    let mut out = [Point2::origin(); 4];
    for i in 0..4 {
        out[i] = points[(start + i) % 4];
    }
    out
}

/// Locate a Sudoku grid's four outer corners among the Hough peaks of one
/// frame.
///
/// Returns `None` when fewer than two perpendicular 10-line clusters can be
/// formed — a transient per-frame "no grid visible" outcome, not an error.
pub fn find(lines: &[Line], params: &PuzzleFinderParams) -> Option<PuzzleFinderResult> {
    let clusters = cluster_lines(lines, params.tau_theta);

    let candidates: Vec<LineCluster> = clusters
        .into_iter()
        .filter_map(|c| retain_uniform_grid_lines(c, params.rho_uniformity_fraction))
        .collect();

    for i in 0..candidates.len() {
        for j in (i + 1)..candidates.len() {
            let a = &candidates[i];
            let b = &candidates[j];
            let diff = difference_theta(a.mean_theta(), b.mean_theta());
            if (diff - PI / 2.0).abs() <= params.tau_perp {
                if let Some(result) = build_result(a, b) {
                    return Some(result);
                }
            }
        }
    }

    None
}

fn build_result(a: &LineCluster, b: &LineCluster) -> Option<PuzzleFinderResult> {
    let a_sorted = a.sorted_by_rho();
    let b_sorted = b.sorted_by_rho();

    let a_lo = a_sorted.first()?;
    let a_hi = a_sorted.last()?;
    let b_lo = b_sorted.first()?;
    let b_hi = b_sorted.last()?;

    let p0 = intersect_lines(a_lo, b_lo)?;
    let p1 = intersect_lines(a_lo, b_hi)?;
    let p2 = intersect_lines(a_hi, b_hi)?;
    let p3 = intersect_lines(a_hi, b_lo)?;

    Some(PuzzleFinderResult {
        corners: canonical_order([p0, p1, p2, p3]),
        cluster_a: a.clone(),
        cluster_b: b.clone(),
    })
}

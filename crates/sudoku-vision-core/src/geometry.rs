//! Lines in Hesse normal form, wrap-safe angular statistics, and line
//! intersection — the shared vocabulary between the Hough peak finder and
//! the puzzle finder.
//!
//! The circular-mean / angular-distance helpers here play the same role as
//! the teacher's `orientation_clustering.rs`, generalized from a mod-π
//! undirected axis (chessboard orientation) to this crate's mod-2π signed-ρ
//! line convention.

use nalgebra::Point2;
use std::f32::consts::PI;

/// A line in Hesse normal form: `x cos θ + y sin θ = ρ`.
///
/// Invariant: `rho >= 0.0` and `theta` is wrapped into `[0, 2π)`. A line
/// built with negative ρ is re-expressed by adding π to θ and negating ρ,
/// per the data model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line {
    pub theta: f32,
    pub rho: f32,
}

impl Line {
    pub fn new(theta: f32, rho: f32) -> Self {
        let (theta, rho) = normalize_theta_rho(theta, rho);
        Self { theta, rho }
    }
}

/// Wrap `theta` into `[0, 2π)`, flipping sign of `rho` and adding π to
/// `theta` whenever `rho` would otherwise be negative.
fn normalize_theta_rho(mut theta: f32, mut rho: f32) -> (f32, f32) {
    if rho < 0.0 {
        rho = -rho;
        theta += PI;
    }
    theta = wrap_2pi(theta);
    (theta, rho)
}

/// Wrap an angle into `[0, 2π)`.
#[inline]
pub fn wrap_2pi(theta: f32) -> f32 {
    let two_pi = 2.0 * PI;
    let mut t = theta % two_pi;
    if t < 0.0 {
        t += two_pi;
    }
    t
}

/// The shorter angular distance between two angles on the `[0, 2π)` circle.
///
/// `difference_theta(a, b) == difference_theta(b, a)`, `difference_theta(a,
/// a) == 0`, and the result is always in `[0, π]`.
pub fn difference_theta(a: f32, b: f32) -> f32 {
    let a = wrap_2pi(a);
    let b = wrap_2pi(b);
    let direct = (a - b).abs();
    let wrapped = a.min(b) + 2.0 * PI - a.max(b);
    direct.min(wrapped)
}

/// The wrap-safe circular mean of a set of angles in `[0, 2π)`.
///
/// When the set straddles the 2π/0 wrap point (detected as `max - min >=
/// 4π/3`), every angle below π is shifted up by 2π before averaging, and
/// the result is wrapped back into `[0, 2π)`. Otherwise this is a plain
/// arithmetic mean.
///
/// # Panics
/// Panics if `thetas` is empty — callers always hold a non-empty cluster.
pub fn mean_theta(thetas: &[f32]) -> f32 {
    assert!(!thetas.is_empty(), "mean_theta of an empty set");

    let min = thetas.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = thetas.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

    let straddles = (max - min) >= (4.0 * PI / 3.0);

    let sum: f32 = if straddles {
        thetas
            .iter()
            .map(|&t| if t < PI { t + 2.0 * PI } else { t })
            .sum()
    } else {
        thetas.iter().sum()
    };

    wrap_2pi(sum / thetas.len() as f32)
}

/// An ordered, non-empty set of `Line`s whose θ values cluster around a
/// shared circular mean within an angular window.
#[derive(Clone, Debug)]
pub struct LineCluster {
    pub lines: Vec<Line>,
}

impl LineCluster {
    /// Build a cluster. Panics on an empty slice — a cluster is always
    /// non-empty by the data model's invariant.
    pub fn new(lines: Vec<Line>) -> Self {
        assert!(!lines.is_empty(), "LineCluster must be non-empty");
        Self { lines }
    }

    pub fn mean_theta(&self) -> f32 {
        let thetas: Vec<f32> = self.lines.iter().map(|l| l.theta).collect();
        mean_theta(&thetas)
    }

    /// The largest angular distance from any member to the cluster mean.
    pub fn spread(&self) -> f32 {
        let mean = self.mean_theta();
        self.lines
            .iter()
            .map(|l| difference_theta(mean, l.theta))
            .fold(0.0f32, f32::max)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Lines sorted by ascending ρ.
    pub fn sorted_by_rho(&self) -> Vec<Line> {
        let mut lines = self.lines.clone();
        lines.sort_by(|a, b| a.rho.partial_cmp(&b.rho).unwrap_or(std::cmp::Ordering::Equal));
        lines
    }
}

/// Intersect two lines in Hesse normal form.
///
/// Returns `None` (parallel) iff `sin(θ2 - θ1) == 0`.
pub fn intersect_lines(a: &Line, b: &Line) -> Option<Point2<f32>> {
    let denom = (b.theta - a.theta).sin();
    if denom == 0.0 {
        return None;
    }
    let x = (a.rho * b.theta.sin() - b.rho * a.theta.sin()) / denom;
    let y = (a.rho * b.theta.cos() - b.rho * a.theta.cos()) / -denom;
    Some(Point2::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn line_normalizes_negative_rho() {
        let l = Line::new(0.0, -5.0);
        assert_abs_diff_eq!(l.theta, PI, epsilon = 1e-6);
        assert_abs_diff_eq!(l.rho, 5.0, epsilon = 1e-6);
        assert!(l.rho >= 0.0);
    }

    #[test]
    fn difference_theta_is_symmetric_and_zero_on_self() {
        assert_abs_diff_eq!(difference_theta(0.1, 6.18), difference_theta(6.18, 0.1));
        assert_abs_diff_eq!(difference_theta(1.0, 1.0), 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(difference_theta(0.1, 6.18), 0.203, epsilon = 1e-3);
    }

    #[test]
    fn difference_theta_near_wrap_point_goes_to_zero() {
        let d = difference_theta(0.0, 2.0 * PI - 1e-4);
        assert!(d < 1e-3);
    }

    #[test]
    fn mean_theta_plain_average_without_wrap() {
        let m = mean_theta(&[0.1, 0.2, 0.3]);
        assert_abs_diff_eq!(m, 0.2, epsilon = 1e-5);
    }

    #[test]
    fn mean_theta_handles_straddling_set() {
        // {6.2, 0.1} straddles the 2π/0 wrap (max - min = 6.1 >= 4π/3).
        // The true shortest-arc midpoint sits just above 0, not at the
        // naive (non-wrap-safe) average of 3.15.
        let m = mean_theta(&[6.2, 0.1]);
        assert!(m < 0.1, "expected mean near the wrap point, got {m}");
        assert!((m - 3.15).abs() > 1.0, "must not equal the naive average");
    }

    #[test]
    fn cluster_mean_bounds_every_member() {
        let lines = vec![Line::new(0.78, 1.0), Line::new(0.80, 1.0), Line::new(0.82, 1.0)];
        let cluster = LineCluster::new(lines);
        let mean = cluster.mean_theta();
        for l in &cluster.lines {
            assert!(difference_theta(mean, l.theta) <= cluster.spread() + 1e-6);
        }
    }

    #[test]
    fn intersect_orthogonal_lines() {
        let a = Line::new(0.0, 5.0);
        let b = Line::new(std::f32::consts::FRAC_PI_2, 7.0);
        let p = intersect_lines(&a, &b).expect("not parallel");
        assert_abs_diff_eq!(p.x, 5.0, epsilon = 1e-4);
        assert_abs_diff_eq!(p.y, 7.0, epsilon = 1e-4);
    }

    #[test]
    fn parallel_lines_have_no_intersection() {
        let a = Line::new(0.3, 1.0);
        let b = Line::new(0.3, 4.0);
        assert!(intersect_lines(&a, &b).is_none());
    }
}

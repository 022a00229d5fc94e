//! # Path
//!
//! This module generates the waypoint sequences followed by the tracking controller. All paths are
//! plain point lists in pixel space, consumed by index and regenerated wholesale.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

// ---------------------------------------------------------------------------
// TYPES
// ---------------------------------------------------------------------------

/// A position in pixel space.
pub type Point2D = Point2<f64>;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The shape of the path driven when returning to the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPathKind {
    /// A single densified line from the current position to the origin.
    OneWay,

    /// A two edge loop, out to the origin and back to the start position.
    ClosedLoop,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ResetPathKind {
    fn default() -> Self {
        ResetPathKind::OneWay
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Densify the closed polygon through `points`.
///
/// Every edge `(p[i], p[(i + 1) % n])` contributes `segments_per_edge` points at ratios
/// `j / segments_per_edge` for `j` in `0..segments_per_edge`, so the result always has
/// `n * segments_per_edge` points and starts at `points[0]`. Fewer than two points, or zero
/// segments, give an empty path.
pub fn generate(points: &[Point2D], segments_per_edge: usize) -> Vec<Point2D> {
    let n = points.len();

    if n < 2 || segments_per_edge == 0 {
        return Vec::new();
    }

    let mut path = Vec::with_capacity(n * segments_per_edge);

    for i in 0..n {
        let start = points[i];
        let end = points[(i + 1) % n];

        for j in 0..segments_per_edge {
            let ratio = j as f64 / segments_per_edge as f64;
            path.push(start + (end - start) * ratio);
        }
    }

    path
}

/// Produces a direct path between the two points, made of `segments + 1` evenly spaced points
/// including both ends.
///
/// With zero segments the path is just the destination.
pub fn direct(from: Point2D, to: Point2D, segments: usize) -> Vec<Point2D> {
    if segments == 0 {
        return vec![to];
    }

    (0..=segments)
        .map(|j| from + (to - from) * (j as f64 / segments as f64))
        .collect()
}

/// Build the path used to return from `from` to `origin`.
pub fn reset_path(
    from: Point2D,
    origin: Point2D,
    kind: ResetPathKind,
    segments: usize,
) -> Vec<Point2D> {
    match kind {
        ResetPathKind::OneWay => direct(from, origin, segments),
        ResetPathKind::ClosedLoop => generate(&[from, origin], segments),
    }
}

/// Sort points clockwise about their centroid, by descending angle `atan2(dy, dx)`.
pub fn sort_clockwise(points: &[Point2D]) -> Vec<Point2D> {
    if points.is_empty() {
        return Vec::new();
    }

    let n = points.len() as f64;
    let (sum_x, sum_y) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let centre = Point2D::new(sum_x / n, sum_y / n);

    let angle = |p: &Point2D| (p.y - centre.y).atan2(p.x - centre.x);

    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| angle(b).partial_cmp(&angle(a)).unwrap_or(Ordering::Equal));
    sorted
}

/// Sort the vertices clockwise and repeat the first one at the end.
///
/// At least three vertices are needed to form a polygon, fewer give an empty result.
pub fn close_polygon(vertices: &[Point2D]) -> Vec<Point2D> {
    if vertices.len() < 3 {
        return Vec::new();
    }

    let mut polygon = sort_clockwise(vertices);
    polygon.push(polygon[0]);
    polygon
}

/// Euclidean distance between two points in pixels.
pub fn distance(a: &Point2D, b: &Point2D) -> f64 {
    nalgebra::distance(a, b)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

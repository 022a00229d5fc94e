//! Weighted sliding filter for spot detections

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;
use std::collections::VecDeque;

use crate::path::Point2D;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Default weights, newest sample first.
pub const DEFAULT_FILTER_WEIGHTS: [f64; 4] = [0.95, 0.05, 0.0, 0.0];

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the [`SlidingFilter`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    /// Enable filtering of spot detections.
    pub enabled: bool,

    /// Weights applied to the window, newest sample first. The window is as long as this list.
    pub weights: Vec<f64>,
}

/// A weighted moving average over the last few spot positions.
///
/// The window is primed with the first sample so the output starts at the first detection rather
/// than being pulled towards zero.
#[derive(Debug, Clone)]
pub struct SlidingFilter {
    weights: Vec<f64>,
    window: VecDeque<Point2D>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            enabled: false,
            weights: DEFAULT_FILTER_WEIGHTS.to_vec(),
        }
    }
}

impl Default for SlidingFilter {
    fn default() -> Self {
        Self::new(&DEFAULT_FILTER_WEIGHTS)
    }
}

impl SlidingFilter {
    /// Create a new filter with the given weights, newest sample first.
    ///
    /// An empty weight list gives a filter which passes samples through.
    pub fn new(weights: &[f64]) -> Self {
        let weights = if weights.is_empty() {
            vec![1.0]
        } else {
            weights.to_vec()
        };

        Self {
            window: VecDeque::with_capacity(weights.len()),
            weights,
        }
    }

    /// Add a sample and return the filtered position.
    pub fn push(&mut self, sample: Point2D) -> Point2D {
        if self.window.is_empty() {
            self.window.resize(self.weights.len(), sample);
        } else {
            self.window.pop_back();
            self.window.push_front(sample);
        }

        let (x, y) = self
            .window
            .iter()
            .zip(self.weights.iter())
            .fold((0.0, 0.0), |(x, y), (p, w)| (x + p.x * w, y + p.y * w));

        Point2D::new(x, y)
    }

    /// Forget all previous samples.
    pub fn clear(&mut self) {
        self.window.clear();
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn assert_near(a: Point2D, b: Point2D) {
        assert!(nalgebra::distance(&a, &b) < 1e-9, "{} != {}", a, b);
    }

    #[test]
    fn test_primed_with_first_sample() {
        let mut filter = SlidingFilter::default();
        assert_near(filter.push(Point2D::new(100.0, 40.0)), Point2D::new(100.0, 40.0));
    }

    #[test]
    fn test_weights_newest_first() {
        let mut filter = SlidingFilter::new(&[0.5, 0.25, 0.25]);

        filter.push(Point2D::new(0.0, 0.0));
        filter.push(Point2D::new(4.0, 8.0));
        let out = filter.push(Point2D::new(8.0, 0.0));

        // 0.5 * 8 + 0.25 * 4 + 0.25 * 0 = 5
        assert_eq!(out, Point2D::new(5.0, 2.0));
    }

    #[test]
    fn test_clear_and_passthrough() {
        let mut filter = SlidingFilter::new(&[]);
        assert_eq!(filter.push(Point2D::new(3.0, 3.0)), Point2D::new(3.0, 3.0));
        assert_eq!(filter.push(Point2D::new(7.0, 1.0)), Point2D::new(7.0, 1.0));

        let mut filter = SlidingFilter::default();
        filter.push(Point2D::new(0.0, 0.0));
        filter.clear();
        assert_near(filter.push(Point2D::new(10.0, 10.0)), Point2D::new(10.0, 10.0));
    }
}

//! Calibration points captured from commands

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use super::{TrackCtrlError, MAX_BORDER_POINTS};
use crate::path::Point2D;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The origin and border points saved by the operator.
///
/// Border points are append-only, once full further points are rejected.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CalibrationSet {
    origin: Option<Point2D>,
    border: Vec<Point2D>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CalibrationSet {
    /// The saved origin, if any.
    pub fn origin(&self) -> Option<Point2D> {
        self.origin
    }

    /// Save the origin, replacing any previous one.
    pub fn set_origin(&mut self, point: Point2D) {
        self.origin = Some(point);
    }

    /// The saved border points in the order they were captured.
    pub fn border(&self) -> &[Point2D] {
        &self.border
    }

    /// True if no more border points can be added.
    pub fn is_full(&self) -> bool {
        self.border.len() >= MAX_BORDER_POINTS
    }

    /// Append a border point, returning the new number of points.
    pub fn add_border(&mut self, point: Point2D) -> Result<usize, TrackCtrlError> {
        if self.is_full() {
            return Err(TrackCtrlError::BorderFull(self.border.len()));
        }

        self.border.push(point);
        Ok(self.border.len())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_border_fills_then_rejects() {
        let mut calib = CalibrationSet::default();

        for i in 0..MAX_BORDER_POINTS {
            assert_eq!(
                calib.add_border(Point2D::new(i as f64, 0.0)).unwrap(),
                i + 1
            );
        }
        assert!(calib.is_full());

        match calib.add_border(Point2D::new(9.0, 9.0)) {
            Err(TrackCtrlError::BorderFull(4)) => (),
            r => panic!("Expected BorderFull(4), got {:?}", r),
        }
        assert_eq!(calib.border().len(), 4);
        assert_eq!(calib.border()[3], Point2D::new(3.0, 0.0));
    }

    #[test]
    fn test_origin_replaced() {
        let mut calib = CalibrationSet::default();
        assert_eq!(calib.origin(), None);

        calib.set_origin(Point2D::new(1.0, 2.0));
        calib.set_origin(Point2D::new(3.0, 4.0));
        assert_eq!(calib.origin(), Some(Point2D::new(3.0, 4.0)));
    }
}

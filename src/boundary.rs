// src/boundary.rs
//
// The virtual counting line. A boundary is one axis-aligned line across
// the frame; an object counts when its centroid moves over the line in
// the conveyor's direction of travel (left-to-right for a vertical line,
// top-to-bottom for a horizontal one).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryAxis {
    /// Line at a fixed x; crossings compare centroid x.
    Vertical,
    /// Line at a fixed y; crossings compare centroid y.
    Horizontal,
}

impl BoundaryAxis {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vertical => "VERTICAL",
            Self::Horizontal => "HORIZONTAL",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Boundary {
    pub axis: BoundaryAxis,
    /// Line position in pixels along the compared axis.
    pub position: f32,
}

impl Boundary {
    /// Place the line at `offset_factor` of the relevant frame dimension,
    /// the way the line is calibrated against the camera's view of the belt.
    pub fn from_frame(axis: BoundaryAxis, offset_factor: f32, width: u32, height: u32) -> Self {
        let position = match axis {
            BoundaryAxis::Vertical => width as f32 * offset_factor,
            BoundaryAxis::Horizontal => height as f32 * offset_factor,
        };
        Self { axis, position }
    }

    /// The centroid coordinate this boundary compares against.
    pub fn coordinate_of(&self, cx: f32, cy: f32) -> f32 {
        match self.axis {
            BoundaryAxis::Vertical => cx,
            BoundaryAxis::Horizontal => cy,
        }
    }
}

/// True iff the step from `prev` to `curr` moved over the line in the
/// counting direction: `prev < boundary <= curr`. No motion is never a
/// crossing, and neither is travel against the belt direction. Total over
/// all inputs, NaN included (comparisons with NaN are false).
pub fn has_crossed(prev: f32, curr: f32, boundary: f32) -> bool {
    prev < boundary && boundary <= curr
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_crossing_fires() {
        assert!(has_crossed(80.0, 120.0, 100.0));
    }

    #[test]
    fn test_reverse_crossing_ignored() {
        assert!(!has_crossed(120.0, 80.0, 100.0));
    }

    #[test]
    fn test_no_motion_is_not_a_crossing() {
        assert!(!has_crossed(100.0, 100.0, 100.0));
        assert!(!has_crossed(80.0, 80.0, 100.0));
    }

    #[test]
    fn test_landing_exactly_on_line_counts() {
        assert!(has_crossed(99.0, 100.0, 100.0));
    }

    #[test]
    fn test_starting_on_line_does_not_recount() {
        // An object sitting on the line last frame already counted (or never
        // will); moving further right must not fire.
        assert!(!has_crossed(100.0, 120.0, 100.0));
    }

    #[test]
    fn test_nan_inputs_are_false() {
        assert!(!has_crossed(f32::NAN, 120.0, 100.0));
        assert!(!has_crossed(80.0, f32::NAN, 100.0));
    }

    #[test]
    fn test_boundary_from_frame() {
        let b = Boundary::from_frame(BoundaryAxis::Vertical, 0.5, 1000, 720);
        assert_eq!(b.position, 500.0);
        assert_eq!(b.coordinate_of(410.0, 300.0), 410.0);

        let b = Boundary::from_frame(BoundaryAxis::Horizontal, 0.7, 1000, 720);
        assert!((b.position - 504.0).abs() < 1e-3);
        assert_eq!(b.coordinate_of(410.0, 300.0), 300.0);
    }
}

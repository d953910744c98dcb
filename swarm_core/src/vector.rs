//! 2D vector vocabulary shared by every pipeline stage.

use nalgebra::{Rotation2, Vector2};

/// Position or force vector in model units.
pub type Vec2 = Vector2<f64>;

/// Positions are quantized to multiples of this after every integration step.
pub const SNAP_GRID: f64 = 1e-9;

/// Reciprocal of [`SNAP_GRID`]; multiplying then dividing by an exact
/// power of ten keeps the snapped value on the decimal grid.
const SNAP_SCALE: f64 = 1e9;

/// Rotates `v` counter-clockwise by `angle` radians.
pub fn rotate(v: &Vec2, angle: f64) -> Vec2 {
    Rotation2::new(angle) * v
}

/// Rounds one coordinate to the nearest grid multiple (ties to even).
pub fn snap_coordinate(value: f64) -> f64 {
    (value * SNAP_SCALE).round_ties_even() / SNAP_SCALE
}

/// Snaps both coordinates of `v`.
pub fn snap(v: &Vec2) -> Vec2 {
    Vec2::new(snap_coordinate(v.x), snap_coordinate(v.y))
}

/// Midpoint of two points.
pub fn midpoint(a: &Vec2, b: &Vec2) -> Vec2 {
    (a + b) * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_rotate_quarter_turn() {
        let v = rotate(&Vec2::new(1.0, 0.0), FRAC_PI_2);
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(v.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_snap_rounds_to_grid() {
        assert_eq!(snap_coordinate(0.123_456_789_4), 0.123_456_789);
        assert_eq!(snap_coordinate(-2.000_000_000_6), -2.000_000_001);
        assert_eq!(snap_coordinate(5.0), 5.0);
    }

    #[test]
    fn test_midpoint() {
        let m = midpoint(&Vec2::new(0.0, 1.0), &Vec2::new(1.0, 0.0));
        assert_eq!(m, Vec2::new(0.5, 0.5));
    }
}

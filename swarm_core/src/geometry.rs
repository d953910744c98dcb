//! Geometry cache: pairwise displacement, distance and polar angle.
//!
//! For every ordered pair `(i, j)`:
//! - `displacement(i, j) = pos[j] - pos[i]` (from `i` toward `j`)
//! - `distance(i, j) = |displacement(i, j)|`
//! - `angle(i, j)` = polar angle of `j` as seen from `i`, in `(-π, π]`
//!
//! Only the lower triangle is computed. The upper triangle is derived by
//! negation, copy and a ±π offset, so the pair invariants hold bit-exactly.

use crate::vector::Vec2;
use nalgebra::DMatrix;
use std::f64::consts::PI;

/// Pairwise geometry of a swarm at one instant.
#[derive(Debug, Clone)]
pub struct GeometryCache {
    dx: DMatrix<f64>,
    dy: DMatrix<f64>,
    distance: DMatrix<f64>,
    angle: DMatrix<f64>,
}

impl GeometryCache {
    /// Creates an all-zero cache for `n` agents.
    pub fn new(n: usize) -> Self {
        Self {
            dx: DMatrix::zeros(n, n),
            dy: DMatrix::zeros(n, n),
            distance: DMatrix::zeros(n, n),
            angle: DMatrix::zeros(n, n),
        }
    }

    /// Builds a cache from positions.
    pub fn from_positions(positions: &[Vec2]) -> Self {
        let mut cache = Self::new(positions.len());
        cache.update(positions);
        cache
    }

    /// Number of agents covered.
    pub fn len(&self) -> usize {
        self.distance.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Recomputes every entry from `positions`. O(n²).
    pub fn update(&mut self, positions: &[Vec2]) {
        let n = positions.len();
        if self.len() != n {
            *self = Self::new(n);
        }

        for i in 0..n {
            self.dx[(i, i)] = 0.0;
            self.dy[(i, i)] = 0.0;
            self.distance[(i, i)] = 0.0;
            self.angle[(i, i)] = 0.0;

            for j in 0..i {
                let dx = positions[j].x - positions[i].x;
                let dy = positions[j].y - positions[i].y;
                self.dx[(i, j)] = dx;
                self.dx[(j, i)] = -dx;
                self.dy[(i, j)] = dy;
                self.dy[(j, i)] = -dy;

                let d = dx.hypot(dy);
                self.distance[(i, j)] = d;
                self.distance[(j, i)] = d;

                let theta = canonical_angle(dy.atan2(dx));
                self.angle[(i, j)] = theta;
                self.angle[(j, i)] = reverse_angle(theta);
            }
        }
    }

    pub fn dx(&self, i: usize, j: usize) -> f64 {
        self.dx[(i, j)]
    }

    pub fn dy(&self, i: usize, j: usize) -> f64 {
        self.dy[(i, j)]
    }

    /// Displacement from `i` toward `j`.
    pub fn displacement(&self, i: usize, j: usize) -> Vec2 {
        Vec2::new(self.dx[(i, j)], self.dy[(i, j)])
    }

    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distance[(i, j)]
    }

    /// Polar angle of `j` as seen from `i`.
    pub fn angle(&self, i: usize, j: usize) -> f64 {
        self.angle[(i, j)]
    }

    /// Full distance matrix.
    pub fn distances(&self) -> &DMatrix<f64> {
        &self.distance
    }

    /// Full angle matrix.
    pub fn angles(&self) -> &DMatrix<f64> {
        &self.angle
    }
}

/// Maps `-π` (produced by `atan2` for a `-0.0` y-component) onto `π`.
fn canonical_angle(theta: f64) -> f64 {
    if theta <= -PI {
        PI
    } else {
        theta
    }
}

/// The opposite direction of `theta`, staying inside `(-π, π]`.
pub fn reverse_angle(theta: f64) -> f64 {
    if theta > 0.0 {
        theta - PI
    } else {
        theta + PI
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn square() -> Vec<Vec2> {
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 1.0),
        ]
    }

    #[test]
    fn test_diagonal_is_zero() {
        let cache = GeometryCache::from_positions(&square());
        for i in 0..4 {
            assert_eq!(cache.distance(i, i), 0.0);
            assert_eq!(cache.angle(i, i), 0.0);
            assert_eq!(cache.displacement(i, i), Vec2::zeros());
        }
    }

    #[test]
    fn test_displacement_points_toward_other() {
        let cache = GeometryCache::from_positions(&square());
        assert_eq!(cache.displacement(0, 2), Vec2::new(1.0, 1.0));
        assert_eq!(cache.displacement(2, 0), Vec2::new(-1.0, -1.0));
        assert_relative_eq!(cache.distance(0, 2), 2.0_f64.sqrt());
    }

    #[test]
    fn test_pair_symmetry_is_exact() {
        let positions = vec![
            Vec2::new(0.3, -1.7),
            Vec2::new(2.2, 0.1),
            Vec2::new(-4.0, 3.3),
        ];
        let cache = GeometryCache::from_positions(&positions);
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(cache.distance(i, j), cache.distance(j, i));
                assert_eq!(cache.dx(i, j), -cache.dx(j, i));
                assert_eq!(cache.dy(i, j), -cache.dy(j, i));
            }
        }
    }

    #[test]
    fn test_angles_from_corner() {
        let cache = GeometryCache::from_positions(&square());
        assert_relative_eq!(cache.angle(0, 1), 0.0);
        assert_relative_eq!(cache.angle(0, 2), FRAC_PI_4);
        assert_relative_eq!(cache.angle(0, 3), FRAC_PI_2);
        // Seen from (1,0), agent 0 lies straight west
        assert_relative_eq!(cache.angle(1, 0), PI);
    }

    #[test]
    fn test_angle_reciprocity() {
        let positions = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(-3.0, 0.0),
            Vec2::new(0.5, -2.0),
            Vec2::new(-1.0, -1.0),
        ];
        let cache = GeometryCache::from_positions(&positions);
        for i in 0..4 {
            for j in 0..4 {
                if i == j {
                    continue;
                }
                let a = cache.angle(i, j);
                let b = cache.angle(j, i);
                assert!(a > -PI && a <= PI);
                assert_relative_eq!((a - b).abs(), PI, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_negative_zero_maps_to_pi() {
        // dy = -0.0 with dx < 0 makes atan2 return -π
        assert_eq!(canonical_angle((-0.0_f64).atan2(-1.0)), PI);
        assert_eq!(reverse_angle(PI), 0.0);
        assert_eq!(reverse_angle(0.0), PI);
        assert_eq!(reverse_angle(-FRAC_PI_2), FRAC_PI_2);
    }

    #[test]
    fn test_update_resizes() {
        let mut cache = GeometryCache::new(2);
        cache.update(&square());
        assert_eq!(cache.len(), 4);
        assert_eq!(cache.distances().ncols(), 4);
        cache.update(&[]);
        assert!(cache.is_empty());
    }
}

//! Integrator: the only writer of agent positions.

use crate::forces::AgentForces;
use crate::vector::{snap, Vec2};

/// Adds each resultant to its position and snaps the result to the
/// 1e-9 grid.
pub fn apply(positions: &mut [Vec2], forces: &[AgentForces]) {
    debug_assert_eq!(positions.len(), forces.len());
    for (position, force) in positions.iter_mut().zip(forces) {
        *position = snap(&(*position + force.resultant));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::SNAP_GRID;

    fn with_resultant(resultant: Vec2) -> AgentForces {
        AgentForces {
            resultant,
            ..AgentForces::zero()
        }
    }

    #[test]
    fn test_apply_adds_resultant() {
        let mut positions = vec![Vec2::new(1.0, 2.0), Vec2::new(-1.0, 0.5)];
        let forces = vec![
            with_resultant(Vec2::new(0.25, -0.5)),
            with_resultant(Vec2::zeros()),
        ];
        apply(&mut positions, &forces);
        assert_eq!(positions[0], Vec2::new(1.25, 1.5));
        assert_eq!(positions[1], Vec2::new(-1.0, 0.5));
    }

    #[test]
    fn test_apply_quantizes() {
        let mut positions = vec![Vec2::new(0.1, 0.2)];
        let forces = vec![with_resultant(Vec2::new(1e-12, 0.333_333_333_333))];
        apply(&mut positions, &forces);

        for coord in [positions[0].x, positions[0].y] {
            let scaled = coord / SNAP_GRID;
            assert!((scaled - scaled.round()).abs() < 1e-6, "{coord} not on grid");
        }
        assert_eq!(positions[0].x, 0.1);
        assert_eq!(positions[0].y, 0.533_333_333);
    }
}

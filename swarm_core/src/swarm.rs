//! SwarmState - the swarm and its per-step working data.
//!
//! A step is split in two so a caller can inspect a tentative step before
//! committing it:
//! - [`SwarmState::compute_step`]: geometry → neighbours → perimeter → forces
//!   (positions untouched)
//! - [`SwarmState::apply_step`]: integrate the computed resultants

use crate::error::SwarmError;
use crate::forces::{AgentForces, ForceComposer};
use crate::geometry::GeometryCache;
use crate::integrator;
use crate::params::SwarmParams;
use crate::perimeter::{self, GapPolicy, NeighborGraph, PerimeterInfo};
use crate::vector::Vec2;

use nalgebra::DMatrix;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Random initial placement.
///
/// Agent 0 sits on `anchor`; every other agent is uniform in the square
/// `anchor ± half_width`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub count: usize,
    pub half_width: f64,
    pub anchor: Vec2,
    /// `None` derives a seed from the system clock
    pub seed: Option<u64>,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            count: 50,
            half_width: 10.0,
            anchor: Vec2::zeros(),
            seed: None,
        }
    }
}

/// Seed derived from the wall clock, for unseeded placements.
pub fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Checks a step speed for [`SwarmState::compute_step`].
pub fn check_step_speed(step_speed: f64) -> Result<f64, SwarmError> {
    if step_speed.is_finite() && step_speed >= 0.0 {
        Ok(step_speed)
    } else {
        Err(SwarmError::StepSpeed(step_speed))
    }
}

/// The swarm: positions, parameters and the working data of the last
/// computed step.
#[derive(Debug, Clone)]
pub struct SwarmState {
    params: SwarmParams,
    positions: Vec<Vec2>,
    /// Per-agent cohesion radius overrides; `None` uses the global radius
    radius_overrides: Vec<Option<f64>>,

    geometry: GeometryCache,
    graph: NeighborGraph,
    perimeter: Vec<PerimeterInfo>,
    repulsors: DMatrix<bool>,
    repulsion_counts: Vec<usize>,
    forces: Vec<AgentForces>,

    steps_applied: u64,
    seed: Option<u64>,
}

impl SwarmState {
    /// Creates a swarm at explicit positions.
    pub fn from_positions(positions: Vec<Vec2>, params: SwarmParams) -> Result<Self, SwarmError> {
        params.validate()?;
        if let Some((index, p)) = positions
            .iter()
            .enumerate()
            .find(|(_, p)| !(p.x.is_finite() && p.y.is_finite()))
        {
            return Err(SwarmError::NonFinitePosition {
                index,
                x: p.x,
                y: p.y,
            });
        }
        let n = positions.len();
        Ok(Self {
            radius_overrides: vec![None; n],
            params,
            positions,
            geometry: GeometryCache::new(n),
            graph: NeighborGraph::new(n),
            perimeter: vec![PerimeterInfo::interior(); n],
            repulsors: DMatrix::from_element(n, n, false),
            repulsion_counts: vec![0; n],
            forces: vec![AgentForces::zero(); n],
            steps_applied: 0,
            seed: None,
        })
    }

    /// Creates a swarm from parallel coordinate lists.
    pub fn from_coordinates(xs: &[f64], ys: &[f64], params: SwarmParams) -> Result<Self, SwarmError> {
        if xs.len() != ys.len() {
            return Err(SwarmError::LengthMismatch {
                xs: xs.len(),
                ys: ys.len(),
            });
        }
        let positions = xs.iter().zip(ys).map(|(&x, &y)| Vec2::new(x, y)).collect();
        Self::from_positions(positions, params)
    }

    /// Creates a randomly placed swarm.
    pub fn random(placement: &Placement, params: SwarmParams) -> Result<Self, SwarmError> {
        if !placement.half_width.is_finite() || placement.half_width < 0.0 {
            return Err(SwarmError::InvalidPlacement(format!(
                "half width must be finite and >= 0, got {}",
                placement.half_width
            )));
        }

        let seed = placement.seed.unwrap_or_else(clock_seed);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let spread = Uniform::new(-1.0, 1.0);

        let mut positions = Vec::with_capacity(placement.count);
        if placement.count > 0 {
            positions.push(placement.anchor);
        }
        for _ in 1..placement.count {
            let offset = Vec2::new(spread.sample(&mut rng), spread.sample(&mut rng));
            positions.push(placement.anchor + offset * placement.half_width);
        }

        let mut state = Self::from_positions(positions, params)?;
        state.seed = Some(seed);
        Ok(state)
    }

    // -------------------------------------------------------------------------
    // Stepping
    // -------------------------------------------------------------------------

    /// Computes the next step for `step_speed` without moving any agent.
    ///
    /// `step_speed` must pass [`check_step_speed`], and parameters changed
    /// through [`params_mut`](Self::params_mut) must still validate; both
    /// are asserted in debug builds.
    pub fn compute_step(&mut self, step_speed: f64) {
        debug_assert!(check_step_speed(step_speed).is_ok(), "bad step speed {step_speed}");
        debug_assert!(self.params.validate().is_ok(), "parameters no longer validate");
        let n = self.positions.len();

        self.geometry.update(&self.positions);
        let radii: Vec<f64> = (0..n).map(|i| self.cohesion_radius(i)).collect();
        self.graph.update(&self.geometry, &radii);

        let policy = GapPolicy {
            weight: self.params.gap_weight,
            fill_on_reflex: self.params.gap_fill_on_reflex,
        };
        self.perimeter = perimeter::classify(&self.geometry, &self.graph, &self.positions, &policy);

        if self.repulsors.nrows() != n {
            self.repulsors = DMatrix::from_element(n, n, false);
        }
        self.forces.resize(n, AgentForces::zero());
        self.repulsion_counts.resize(n, 0);

        let composer = ForceComposer::new(
            &self.params,
            &self.geometry,
            &self.graph,
            &self.perimeter,
            &self.positions,
        );
        for i in 0..n {
            let composed = composer.compose(i, step_speed);
            self.forces[i] = composed.forces;
            self.repulsion_counts[i] = composed.repulsors;
            for j in 0..n {
                self.repulsors[(i, j)] = composer.is_repulsor(i, j);
            }
        }
    }

    /// Moves every agent by its computed resultant.
    pub fn apply_step(&mut self) {
        integrator::apply(&mut self.positions, &self.forces);
        self.steps_applied += 1;
    }

    /// Computes and applies one step at the configured step speed.
    pub fn step(&mut self) {
        self.compute_step(self.params.step_speed);
        self.apply_step();
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position(&self, i: usize) -> Vec2 {
        self.positions[i]
    }

    pub fn positions(&self) -> &[Vec2] {
        &self.positions
    }

    /// Perimeter flag from the last computed step (false before any).
    pub fn on_perimeter(&self, i: usize) -> bool {
        self.perimeter[i].on_perimeter
    }

    pub fn perimeter_flags(&self) -> impl Iterator<Item = bool> + '_ {
        self.perimeter.iter().map(|p| p.on_perimeter)
    }

    pub fn perimeter_count(&self) -> usize {
        self.perimeter_flags().filter(|&p| p).count()
    }

    pub fn cohesion_neighbor_count(&self, i: usize) -> usize {
        self.graph.count(i)
    }

    pub fn repulsion_neighbor_count(&self, i: usize) -> usize {
        self.repulsion_counts[i]
    }

    /// True if `j` was a cohesion neighbour of `i` in the last computed step.
    pub fn is_cohesion_neighbor(&self, i: usize, j: usize) -> bool {
        self.graph.is_neighbor(i, j)
    }

    /// True if `j` repelled `i` in the last computed step.
    pub fn is_repulsor(&self, i: usize, j: usize) -> bool {
        self.repulsors[(i, j)]
    }

    pub fn forces(&self, i: usize) -> &AgentForces {
        &self.forces[i]
    }

    pub fn geometry(&self) -> &GeometryCache {
        &self.geometry
    }

    pub fn params(&self) -> &SwarmParams {
        &self.params
    }

    /// Mutable parameters; takes effect from the next `compute_step`.
    ///
    /// Unchecked; prefer [`set_params`](Self::set_params).
    pub fn params_mut(&mut self) -> &mut SwarmParams {
        &mut self.params
    }

    /// Replaces the parameters after validating them.
    pub fn set_params(&mut self, params: SwarmParams) -> Result<(), SwarmError> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn goal(&self) -> Vec2 {
        self.params.goal
    }

    pub fn set_goal(&mut self, goal: Vec2) {
        self.params.goal = goal;
    }

    /// Effective cohesion radius of agent `i`.
    pub fn cohesion_radius(&self, i: usize) -> f64 {
        self.radius_overrides[i].unwrap_or(self.params.cohesion_radius)
    }

    /// Overrides the cohesion radius of a single agent.
    pub fn set_cohesion_radius(&mut self, i: usize, radius: f64) -> Result<(), SwarmError> {
        if i >= self.len() {
            return Err(SwarmError::AgentIndex {
                index: i,
                len: self.len(),
            });
        }
        if !radius.is_finite() || radius < 0.0 {
            return Err(crate::error::ParamError::invalid(format!(
                "cohesion radius must be finite and >= 0, got {radius}"
            ))
            .into());
        }
        self.radius_overrides[i] = Some(radius);
        Ok(())
    }

    /// Number of committed steps.
    pub fn steps_applied(&self) -> u64 {
        self.steps_applied
    }

    /// Seed used for random placement, if any.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Mean position.
    pub fn centroid(&self) -> Vec2 {
        if self.positions.is_empty() {
            return Vec2::zeros();
        }
        self.positions.iter().sum::<Vec2>() / self.positions.len() as f64
    }

    /// Serializable per-agent view of the last computed step.
    pub fn snapshot(&self) -> SwarmSnapshot {
        let agents = (0..self.len())
            .map(|i| AgentRecord {
                index: i,
                x: self.positions[i].x,
                y: self.positions[i].y,
                on_perimeter: self.on_perimeter(i),
                cohesion_neighbors: self.cohesion_neighbor_count(i),
                repulsion_neighbors: self.repulsion_neighbor_count(i),
                forces: self.forces[i],
            })
            .collect();
        SwarmSnapshot {
            step: self.steps_applied,
            agents,
        }
    }
}

/// One agent in a [`SwarmSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub on_perimeter: bool,
    pub cohesion_neighbors: usize,
    pub repulsion_neighbors: usize,
    pub forces: AgentForces,
}

/// Full per-agent state after a given number of committed steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwarmSnapshot {
    pub step: u64,
    pub agents: Vec<AgentRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParamError;
    use crate::params::PerimeterPair;
    use approx::assert_relative_eq;

    fn unit_square() -> SwarmState {
        let params = SwarmParams {
            cohesion_radius: 2.0,
            ..Default::default()
        };
        SwarmState::from_coordinates(&[0.0, 1.0, 1.0, 0.0], &[0.0, 0.0, 1.0, 1.0], params).unwrap()
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = SwarmState::from_coordinates(&[0.0, 1.0], &[0.0], SwarmParams::default())
            .unwrap_err();
        assert_eq!(err, SwarmError::LengthMismatch { xs: 2, ys: 1 });
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = SwarmParams {
            step_speed: -1.0,
            ..Default::default()
        };
        let err = SwarmState::from_positions(vec![Vec2::zeros()], params).unwrap_err();
        assert!(matches!(err, SwarmError::Params(_)));
    }

    #[test]
    fn test_non_finite_positions_rejected() {
        let err = SwarmState::from_coordinates(&[0.0, f64::INFINITY], &[0.0, 0.0], SwarmParams::default())
            .unwrap_err();
        assert!(matches!(err, SwarmError::NonFinitePosition { index: 1, .. }));

        let err = SwarmState::from_positions(vec![Vec2::new(f64::NAN, 1.0)], SwarmParams::default())
            .unwrap_err();
        assert!(matches!(err, SwarmError::NonFinitePosition { index: 0, .. }));
    }

    #[test]
    fn test_non_finite_goal_rejected() {
        let params = SwarmParams::from_pairs([("goalX", "NaN"), ("kd", "1.0"), ("gain", "0.1")]).unwrap();
        let err = SwarmState::from_coordinates(&[0.0], &[0.0], params).unwrap_err();
        assert!(matches!(err, SwarmError::Params(ParamError::Invalid(_))));
    }

    #[test]
    fn test_check_step_speed() {
        assert_eq!(check_step_speed(0.25), Ok(0.25));
        assert_eq!(check_step_speed(0.0), Ok(0.0));
        assert_eq!(check_step_speed(-0.1), Err(SwarmError::StepSpeed(-0.1)));
        assert!(check_step_speed(f64::NAN).is_err());
        assert!(check_step_speed(f64::INFINITY).is_err());
    }

    #[test]
    fn test_set_params_validates() {
        let mut swarm = unit_square();
        let mut params = swarm.params().clone();
        params.cohesion_radius = -1.0;
        assert!(matches!(swarm.set_params(params), Err(SwarmError::Params(_))));
        assert_eq!(swarm.params().cohesion_radius, 2.0);

        let mut params = swarm.params().clone();
        params.cohesion_radius = 0.5;
        swarm.set_params(params).unwrap();
        swarm.compute_step(0.05);
        assert_eq!(swarm.cohesion_neighbor_count(0), 0);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "parameters no longer validate")]
    fn test_invalid_params_mut_caught_in_debug() {
        let mut swarm = unit_square();
        swarm.params_mut().cohesion_radius = -1.0;
        swarm.compute_step(0.05);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "bad step speed")]
    fn test_negative_step_speed_caught_in_debug() {
        let mut swarm = unit_square();
        swarm.compute_step(-0.05);
    }

    #[test]
    fn test_compute_does_not_move() {
        let mut swarm = unit_square();
        let before = swarm.positions().to_vec();
        swarm.compute_step(0.05);

        assert_eq!(swarm.positions(), &before[..]);
        assert_eq!(swarm.steps_applied(), 0);
        assert_eq!(swarm.perimeter_count(), 4);
        for i in 0..4 {
            assert_eq!(swarm.cohesion_neighbor_count(i), 3);
            assert_relative_eq!(swarm.forces(i).resultant.norm(), 0.05, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_apply_moves_and_counts() {
        let mut swarm = unit_square();
        swarm.step();

        assert_eq!(swarm.steps_applied(), 1);
        // Repulsion (radius 3) outweighs cohesion: the square grows about
        // its fixed centre
        let c = swarm.centroid();
        assert_relative_eq!(c.x, 0.5, epsilon = 1e-9);
        assert_relative_eq!(c.y, 0.5, epsilon = 1e-9);
        assert!(swarm.position(0).x < 0.0 && swarm.position(0).y < 0.0);
        assert!(swarm.position(2).x > 1.0 && swarm.position(2).y > 1.0);
    }

    #[test]
    fn test_repulsor_relation() {
        let mut swarm = unit_square();
        swarm.compute_step(0.05);
        // Default repulsion radius 3.0 covers the whole square
        assert!(swarm.is_repulsor(0, 2));
        assert!(!swarm.is_repulsor(0, 0));
        assert_eq!(swarm.repulsion_neighbor_count(0), 3);
        assert!(swarm.is_cohesion_neighbor(0, 2));
    }

    #[test]
    fn test_random_placement_deterministic() {
        let placement = Placement {
            count: 20,
            half_width: 5.0,
            anchor: Vec2::new(3.0, -2.0),
            seed: Some(42),
        };
        let a = SwarmState::random(&placement, SwarmParams::default()).unwrap();
        let b = SwarmState::random(&placement, SwarmParams::default()).unwrap();

        assert_eq!(a.positions(), b.positions());
        assert_eq!(a.seed(), Some(42));
        assert_eq!(a.position(0), Vec2::new(3.0, -2.0));
        for p in a.positions() {
            assert!((p.x - 3.0).abs() <= 5.0);
            assert!((p.y + 2.0).abs() <= 5.0);
        }
    }

    #[test]
    fn test_random_placement_unseeded_records_seed() {
        let placement = Placement {
            count: 3,
            ..Default::default()
        };
        let swarm = SwarmState::random(&placement, SwarmParams::default()).unwrap();
        assert_eq!(swarm.len(), 3);
        assert!(swarm.seed().is_some());
    }

    #[test]
    fn test_random_placement_rejects_bad_width() {
        let placement = Placement {
            half_width: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            SwarmState::random(&placement, SwarmParams::default()),
            Err(SwarmError::InvalidPlacement(_))
        ));
    }

    #[test]
    fn test_empty_swarm_steps() {
        let mut swarm = SwarmState::from_positions(Vec::new(), SwarmParams::default()).unwrap();
        swarm.step();
        assert!(swarm.is_empty());
        assert_eq!(swarm.centroid(), Vec2::zeros());
        assert_eq!(swarm.steps_applied(), 1);
    }

    #[test]
    fn test_adversarial_guard_through_state() {
        let params = SwarmParams {
            direction_weight: PerimeterPair::uniform(0.0),
            adversarial_weight: PerimeterPair::uniform(3.0),
            adversarial_angle: PerimeterPair::uniform(0.7),
            goal: Vec2::new(50.0, 50.0),
            ..Default::default()
        };
        let mut swarm = SwarmState::from_coordinates(&[0.0, 1.0], &[0.0, 0.0], params).unwrap();
        swarm.compute_step(0.05);
        for i in 0..2 {
            assert_eq!(swarm.forces(i).adversarial, Vec2::zeros());
        }
    }

    #[test]
    fn test_per_agent_cohesion_radius() {
        let mut swarm = unit_square();
        swarm.set_cohesion_radius(0, 0.5).unwrap();
        swarm.compute_step(0.05);

        assert_eq!(swarm.cohesion_radius(0), 0.5);
        assert_eq!(swarm.cohesion_neighbor_count(0), 0);
        assert_eq!(swarm.cohesion_neighbor_count(1), 3);

        assert!(matches!(
            swarm.set_cohesion_radius(9, 1.0),
            Err(SwarmError::AgentIndex { index: 9, len: 4 })
        ));
        assert!(swarm.set_cohesion_radius(0, -1.0).is_err());
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut swarm = unit_square();
        swarm.compute_step(0.05);
        let snapshot = swarm.snapshot();

        assert_eq!(snapshot.step, 0);
        assert_eq!(snapshot.agents.len(), 4);
        assert!(snapshot.agents.iter().all(|a| a.on_perimeter));
        assert_eq!(snapshot.agents[2].x, 1.0);
        assert_eq!(snapshot.agents[2].cohesion_neighbors, 3);
    }
}

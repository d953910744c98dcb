//! Force composer.
//!
//! Per agent, over a frozen geometry snapshot:
//! - **cohesion**: mean of weighted displacements toward cohesion neighbours
//! - **repulsion**: mean of a falloff law over agents inside the repulsion radius
//! - **direction**: weighted pull toward the goal
//! - **adversarial**: unit direction rotated by a fixed angle, then weighted
//! - **gap**: taken from the perimeter classifier
//!
//! The sum is either normalised to the step speed (with a dead zone) or
//! multiplied by a fixed gain.

use crate::geometry::GeometryCache;
use crate::params::{RepulsionMode, SwarmParams};
use crate::perimeter::{NeighborGraph, PerimeterInfo};
use crate::vector::{rotate, Vec2};
use serde::{Deserialize, Serialize};

/// Force components of one agent for one step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentForces {
    pub cohesion: Vec2,
    pub repulsion: Vec2,
    pub direction: Vec2,
    pub adversarial: Vec2,
    pub gap: Vec2,
    /// Normalised (or gain-scaled) sum; this is what the integrator applies
    pub resultant: Vec2,
}

impl AgentForces {
    pub fn zero() -> Self {
        Self {
            cohesion: Vec2::zeros(),
            repulsion: Vec2::zeros(),
            direction: Vec2::zeros(),
            adversarial: Vec2::zeros(),
            gap: Vec2::zeros(),
            resultant: Vec2::zeros(),
        }
    }
}

impl Default for AgentForces {
    fn default() -> Self {
        Self::zero()
    }
}

impl RepulsionMode {
    /// Repulsive contribution of one neighbour.
    ///
    /// `toward` points from the agent to the neighbour and has length
    /// `distance`. Coincident agents (`distance == 0`) have no direction and
    /// contribute nothing.
    pub fn contribution(
        &self,
        exp_rate: f64,
        radius: f64,
        distance: f64,
        toward: &Vec2,
        weight: f64,
    ) -> Vec2 {
        if distance == 0.0 {
            return Vec2::zeros();
        }
        match self {
            // Negative inside the radius, zero exactly at it
            RepulsionMode::Linear => toward * ((1.0 - radius / distance) * weight),
            RepulsionMode::Quadratic => {
                toward / distance * (-(radius / (distance * distance)) * weight)
            }
            RepulsionMode::Exponential => {
                toward / distance * (-radius * (-distance * exp_rate).exp() * weight)
            }
        }
    }
}

/// Applies the normalisation-or-gain policy to a raw resultant.
///
/// Without a gain, magnitudes at or below `stability_factor × step_speed`
/// become zero and everything else is scaled to exactly `step_speed`.
pub fn normalize(raw: &Vec2, step_speed: f64, stability_factor: f64, fixed_gain: Option<f64>) -> Vec2 {
    if let Some(gain) = fixed_gain {
        return raw * gain;
    }

    let magnitude = raw.norm();
    let threshold = stability_factor * step_speed;
    if magnitude > threshold && magnitude > 0.0 {
        raw * (step_speed / magnitude)
    } else {
        Vec2::zeros()
    }
}

/// Output of [`ForceComposer::compose`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Composed {
    pub forces: AgentForces,
    /// Number of agents inside this agent's repulsion radius
    pub repulsors: usize,
}

/// Read-only view over one step's inputs.
pub struct ForceComposer<'a> {
    params: &'a SwarmParams,
    geometry: &'a GeometryCache,
    graph: &'a NeighborGraph,
    perimeter: &'a [PerimeterInfo],
    positions: &'a [Vec2],
}

impl<'a> ForceComposer<'a> {
    pub fn new(
        params: &'a SwarmParams,
        geometry: &'a GeometryCache,
        graph: &'a NeighborGraph,
        perimeter: &'a [PerimeterInfo],
        positions: &'a [Vec2],
    ) -> Self {
        Self {
            params,
            geometry,
            graph,
            perimeter,
            positions,
        }
    }

    fn on_perimeter(&self, i: usize) -> bool {
        self.perimeter[i].on_perimeter
    }

    /// Mean of weighted displacements toward cohesion neighbours.
    pub fn cohesion(&self, i: usize) -> Vec2 {
        let count = self.graph.count(i);
        if count == 0 {
            return Vec2::zeros();
        }
        let pi = self.on_perimeter(i);
        let sum = self
            .graph
            .neighbors(i)
            .fold(Vec2::zeros(), |acc, j| {
                let weight = self.params.cohesion_weight.get(pi, self.on_perimeter(j));
                acc + self.geometry.displacement(i, j) * weight
            });
        sum / count as f64
    }

    /// Repulsion radius `i` applies to `j`.
    fn repulsion_radius(&self, i: usize, j: usize) -> f64 {
        self.params
            .repulsion_radius
            .get(self.on_perimeter(i), self.on_perimeter(j))
    }

    /// True if `j` is inside the repulsion radius `i` applies to it.
    ///
    /// The lookup is (i's status, j's status), so `is_repulsor(i, j)` and
    /// `is_repulsor(j, i)` may differ.
    pub fn is_repulsor(&self, i: usize, j: usize) -> bool {
        j != i && self.geometry.distance(i, j) <= self.repulsion_radius(i, j)
    }

    /// Mean repulsion and the number of repulsors.
    pub fn repulsion(&self, i: usize) -> (Vec2, usize) {
        let pi = self.on_perimeter(i);
        let mut sum = Vec2::zeros();
        let mut count = 0usize;

        for j in 0..self.positions.len() {
            if !self.is_repulsor(i, j) {
                continue;
            }
            count += 1;
            let pj = self.on_perimeter(j);
            sum += self.params.repulsion_mode.contribution(
                self.params.exp_rate,
                self.params.repulsion_radius.get(pi, pj),
                self.geometry.distance(i, j),
                &self.geometry.displacement(i, j),
                self.params.repulsion_weight.get(pi, pj),
            );
        }

        if count > 0 {
            (sum / count as f64, count)
        } else {
            (sum, 0)
        }
    }

    /// Weighted pull toward the goal.
    pub fn direction(&self, i: usize) -> Vec2 {
        let weight = self.params.direction_weight.get(self.on_perimeter(i));
        (self.params.goal - self.positions[i]) * weight
    }

    /// Deviation from the straight line to the goal. Zero when `direction`
    /// is zero.
    pub fn adversarial(&self, i: usize, direction: &Vec2) -> Vec2 {
        let magnitude = direction.norm();
        if magnitude == 0.0 {
            return Vec2::zeros();
        }
        let pi = self.on_perimeter(i);
        let unit = direction / magnitude;
        rotate(&unit, self.params.adversarial_angle.get(pi)) * self.params.adversarial_weight.get(pi)
    }

    /// Raw (un-normalised) sum of all components.
    ///
    /// With `perimeter_directed`, interior agents ignore the goal terms.
    pub fn raw_resultant(&self, i: usize, forces: &AgentForces) -> Vec2 {
        let local = forces.cohesion + forces.repulsion + forces.gap;
        if !self.params.perimeter_directed || self.on_perimeter(i) {
            local + forces.direction + forces.adversarial
        } else {
            local
        }
    }

    /// Every component for agent `i`, with the resultant normalised for
    /// `step_speed`.
    pub fn compose(&self, i: usize, step_speed: f64) -> Composed {
        let (repulsion, repulsors) = self.repulsion(i);
        let direction = self.direction(i);
        let mut forces = AgentForces {
            cohesion: self.cohesion(i),
            repulsion,
            direction,
            adversarial: self.adversarial(i, &direction),
            gap: self.perimeter[i].gap,
            resultant: Vec2::zeros(),
        };

        let raw = self.raw_resultant(i, &forces);
        forces.resultant = normalize(
            &raw,
            step_speed,
            self.params.stability_factor,
            self.params.fixed_gain,
        );

        Composed { forces, repulsors }
    }
}

//! Named reference swarms.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use swarm_core::{
    PerimeterMatrix, PerimeterPair, Placement, SwarmError, SwarmParams, SwarmState, Vec2,
};

/// Side of the square lattice scenario
const LATTICE_SIDE: usize = 7;

/// Jitter applied to lattice sites
const LATTICE_JITTER: f64 = 0.02;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// Three agents, every one on the perimeter
    Triangle,

    /// Unit square; perimeter by reflex angle
    Square,

    /// 7×7 jittered grid with a 5×5 interior
    Lattice,

    /// 40 agents scattered at random, no goal
    RandomCloud,

    /// 30 agents heading for a distant goal with gap filling
    GoalSeek,

    /// Goal seeking with perimeter agents deviating from the goal heading
    Adversarial,

    /// Only perimeter agents feel the goal
    PerimeterDirected,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Triangle,
            ScenarioId::Square,
            ScenarioId::Lattice,
            ScenarioId::RandomCloud,
            ScenarioId::GoalSeek,
            ScenarioId::Adversarial,
            ScenarioId::PerimeterDirected,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Triangle => "triangle",
            ScenarioId::Square => "square",
            ScenarioId::Lattice => "lattice",
            ScenarioId::RandomCloud => "random_cloud",
            ScenarioId::GoalSeek => "goal_seek",
            ScenarioId::Adversarial => "adversarial",
            ScenarioId::PerimeterDirected => "perimeter_directed",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Triangle => "3 agents in an equilateral triangle, all on the perimeter",
            ScenarioId::Square => "Unit square, every corner sees a reflex gap",
            ScenarioId::Lattice => "7x7 jittered grid: 24 boundary agents enclose 25 interior ones",
            ScenarioId::RandomCloud => "40 agents uniform in a 10x10 box, cohesion and repulsion only",
            ScenarioId::GoalSeek => "30 agents drive toward (20, 20) with gap filling",
            ScenarioId::Adversarial => "Goal seeking; perimeter agents veer 0.6 rad off the heading",
            ScenarioId::PerimeterDirected => "Goal force applied to perimeter agents only",
        }
    }

    /// Suggested step limit.
    pub fn default_steps(&self) -> u64 {
        match self {
            ScenarioId::Triangle | ScenarioId::Square => 200,
            ScenarioId::Lattice | ScenarioId::RandomCloud => 500,
            ScenarioId::GoalSeek | ScenarioId::Adversarial | ScenarioId::PerimeterDirected => 1000,
        }
    }

    /// Builds the initial swarm. `seed` drives every random placement.
    pub fn build(&self, seed: u64) -> Result<SwarmState, SwarmError> {
        match self {
            ScenarioId::Triangle => {
                let h = 3f64.sqrt() / 2.0;
                SwarmState::from_coordinates(&[0.0, 1.0, 0.5], &[0.0, 0.0, h], small_params())
            }
            ScenarioId::Square => SwarmState::from_coordinates(
                &[0.0, 1.0, 1.0, 0.0],
                &[0.0, 0.0, 1.0, 1.0],
                small_params(),
            ),
            ScenarioId::Lattice => lattice(seed),
            ScenarioId::RandomCloud => {
                let placement = Placement {
                    count: 40,
                    half_width: 5.0,
                    anchor: Vec2::zeros(),
                    seed: Some(seed),
                };
                SwarmState::random(&placement, cloud_params())
            }
            ScenarioId::GoalSeek => SwarmState::random(&seeker_placement(seed), seeker_params()),
            ScenarioId::Adversarial => {
                let params = SwarmParams {
                    adversarial_weight: PerimeterPair {
                        interior: 0.0,
                        perimeter: 0.5,
                    },
                    adversarial_angle: PerimeterPair {
                        interior: 0.0,
                        perimeter: 0.6,
                    },
                    ..seeker_params()
                };
                SwarmState::random(&seeker_placement(seed), params)
            }
            ScenarioId::PerimeterDirected => {
                let params = SwarmParams {
                    perimeter_directed: true,
                    direction_weight: PerimeterPair::uniform(1.0),
                    ..seeker_params()
                };
                SwarmState::random(&seeker_placement(seed), params)
            }
        }
    }
}

fn small_params() -> SwarmParams {
    SwarmParams {
        cohesion_radius: 2.0,
        repulsion_radius: PerimeterMatrix::uniform(1.0),
        ..Default::default()
    }
}

fn cloud_params() -> SwarmParams {
    SwarmParams {
        cohesion_radius: 3.0,
        repulsion_radius: PerimeterMatrix::uniform(1.5),
        ..Default::default()
    }
}

fn seeker_placement(seed: u64) -> Placement {
    Placement {
        count: 30,
        half_width: 4.0,
        anchor: Vec2::zeros(),
        seed: Some(seed),
    }
}

fn seeker_params() -> SwarmParams {
    SwarmParams {
        direction_weight: PerimeterPair::uniform(0.5),
        gap_weight: 0.3,
        goal: Vec2::new(20.0, 20.0),
        ..cloud_params()
    }
}

fn lattice(seed: u64) -> Result<SwarmState, SwarmError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let jitter = Normal::new(0.0, LATTICE_JITTER)
        .map_err(|e| SwarmError::InvalidPlacement(e.to_string()))?;

    let mut positions = Vec::with_capacity(LATTICE_SIDE * LATTICE_SIDE);
    for row in 0..LATTICE_SIDE {
        for col in 0..LATTICE_SIDE {
            let site = Vec2::new(col as f64, row as f64);
            positions.push(site + Vec2::new(jitter.sample(&mut rng), jitter.sample(&mut rng)));
        }
    }

    let params = SwarmParams {
        cohesion_radius: 1.8,
        repulsion_radius: PerimeterMatrix::uniform(1.0),
        ..Default::default()
    };
    SwarmState::from_positions(positions, params)
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "triangle" => Ok(ScenarioId::Triangle),
            "square" => Ok(ScenarioId::Square),
            "lattice" | "grid" => Ok(ScenarioId::Lattice),
            "random_cloud" | "randomcloud" | "cloud" => Ok(ScenarioId::RandomCloud),
            "goal_seek" | "goalseek" => Ok(ScenarioId::GoalSeek),
            "adversarial" | "adv" => Ok(ScenarioId::Adversarial),
            "perimeter_directed" | "perimeterdirected" | "perim_coord" => {
                Ok(ScenarioId::PerimeterDirected)
            }
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for id in ScenarioId::all() {
            assert_eq!(id.name().parse::<ScenarioId>(), Ok(id));
            assert_eq!(id.to_string(), id.name());
        }
        assert!("nope".parse::<ScenarioId>().is_err());
    }

    #[test]
    fn test_build_is_seeded() {
        for id in ScenarioId::all() {
            let a = id.build(11).unwrap();
            let b = id.build(11).unwrap();
            assert_eq!(a.positions(), b.positions(), "{id}");
        }
    }

    #[test]
    fn test_lattice_interior() {
        let mut swarm = ScenarioId::Lattice.build(3).unwrap();
        swarm.compute_step(0.05);

        assert_eq!(swarm.len(), 49);
        assert_eq!(swarm.perimeter_count(), 24);
        // Centre site (3, 3)
        assert!(!swarm.on_perimeter(24));
        assert_eq!(swarm.cohesion_neighbor_count(24), 8);
    }
}

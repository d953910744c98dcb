//! Swarm runner - steps a swarm until it settles or a step limit is hit.

use crate::exporter::{SimEvent, SimExport, SimFrame};

use swarm_core::{check_step_speed, SwarmError, SwarmState, Vec2};
use tracing::{debug, info};

/// Results from a run.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Scenario or swarm file the run started from
    pub label: String,

    /// Placement seed, if the swarm was placed randomly
    pub seed: Option<u64>,

    /// Steps committed
    pub steps: u64,

    /// Whether every resultant fell to the settle threshold before the
    /// step limit
    pub settled: bool,

    /// Perimeter agents in the final configuration
    pub final_perimeter_count: usize,

    pub centroid: Vec2,

    /// Mean distance from each agent to the goal
    pub mean_goal_distance: f64,

    /// Metrics collected during the run
    pub metrics: RunMetrics,
}

/// Metrics collected while stepping.
#[derive(Debug, Clone, Default)]
pub struct RunMetrics {
    /// Largest single-step move of any agent
    pub max_step_displacement: f64,

    /// Sum of every agent's step lengths
    pub total_path_length: f64,

    pub perimeter_count_min: usize,
    pub perimeter_count_max: usize,
}

impl RunMetrics {
    fn observe_perimeter(&mut self, count: usize, first: bool) {
        if first {
            self.perimeter_count_min = count;
            self.perimeter_count_max = count;
        } else {
            self.perimeter_count_min = self.perimeter_count_min.min(count);
            self.perimeter_count_max = self.perimeter_count_max.max(count);
        }
    }
}

/// Drives a [`SwarmState`] through repeated compute/apply steps.
pub struct SwarmRunner {
    label: String,
    state: SwarmState,

    /// Maximum committed steps
    max_steps: u64,

    /// Step speed override; `None` uses the swarm's parameter
    step_speed: Option<f64>,

    /// Capture a frame every this many steps (0 disables export frames)
    export_interval: u64,

    /// A step whose resultants are all at or below this ends the run
    settle_threshold: f64,
}

impl SwarmRunner {
    /// Creates a new runner.
    pub fn new(label: &str, state: SwarmState) -> Self {
        Self {
            label: label.to_string(),
            state,
            max_steps: 1000,
            step_speed: None,
            export_interval: 10,
            settle_threshold: 0.0,
        }
    }

    /// Sets the step limit.
    pub fn with_max_steps(mut self, steps: u64) -> Self {
        self.max_steps = steps;
        self
    }

    /// Overrides the step speed. Negative or non-finite speeds are rejected.
    pub fn with_step_speed(mut self, speed: f64) -> Result<Self, SwarmError> {
        self.step_speed = Some(check_step_speed(speed)?);
        Ok(self)
    }

    /// Sets the frame export interval.
    pub fn with_export_interval(mut self, interval: u64) -> Self {
        self.export_interval = interval;
        self
    }

    /// Sets the settle threshold.
    pub fn with_settle_threshold(mut self, threshold: f64) -> Self {
        self.settle_threshold = threshold;
        self
    }

    pub fn state(&self) -> &SwarmState {
        &self.state
    }

    /// Consumes the runner, returning the swarm.
    pub fn into_state(self) -> SwarmState {
        self.state
    }

    /// Runs without exporting frames.
    pub fn run(&mut self) -> RunResult {
        self.drive(None)
    }

    /// Runs, capturing frames into `export`.
    pub fn run_with_export(&mut self, export: &mut SimExport) -> RunResult {
        self.drive(Some(export))
    }

    fn drive(&mut self, mut export: Option<&mut SimExport>) -> RunResult {
        let speed = self.step_speed.unwrap_or(self.state.params().step_speed);
        info!(
            "Starting run: {} ({} agents, speed={}, max_steps={})",
            self.label,
            self.state.len(),
            speed,
            self.max_steps
        );

        let mut metrics = RunMetrics::default();
        let mut settled = false;

        for step in 0..self.max_steps {
            self.state.compute_step(speed);
            metrics.observe_perimeter(self.state.perimeter_count(), step == 0);

            if let Some(export) = export.as_deref_mut() {
                if self.export_interval > 0 && step % self.export_interval == 0 {
                    export.add_frame(SimFrame::capture(&self.state));
                }
            }

            let moves: Vec<f64> = (0..self.state.len())
                .map(|i| self.state.forces(i).resultant.norm())
                .collect();
            if moves.iter().all(|&m| m <= self.settle_threshold) {
                settled = true;
                info!("  Settled after {} steps", self.state.steps_applied());
                if let Some(export) = export.as_deref_mut() {
                    let frame = SimFrame::capture(&self.state).with_event(SimEvent::info(format!(
                        "settled after {} steps",
                        self.state.steps_applied()
                    )));
                    export.add_frame(frame);
                }
                break;
            }

            let longest = moves.iter().copied().fold(0.0, f64::max);
            metrics.max_step_displacement = metrics.max_step_displacement.max(longest);
            metrics.total_path_length += moves.iter().sum::<f64>();

            self.state.apply_step();

            if self.export_interval > 0 && (step + 1) % self.export_interval == 0 {
                debug!(
                    "  step={} | perimeter={} | max_move={:.3e}",
                    step + 1,
                    self.state.perimeter_count(),
                    longest
                );
            }
        }

        // Refresh the working data so it describes the final positions
        self.state.compute_step(speed);
        if self.max_steps == 0 {
            metrics.observe_perimeter(self.state.perimeter_count(), true);
        }

        let goal = self.state.goal();
        let mean_goal_distance = if self.state.is_empty() {
            0.0
        } else {
            self.state
                .positions()
                .iter()
                .map(|p| (p - goal).norm())
                .sum::<f64>()
                / self.state.len() as f64
        };

        let result = RunResult {
            label: self.label.clone(),
            seed: self.state.seed(),
            steps: self.state.steps_applied(),
            settled,
            final_perimeter_count: self.state.perimeter_count(),
            centroid: self.state.centroid(),
            mean_goal_distance,
            metrics,
        };

        if let Some(export) = export {
            if !settled {
                export.add_frame(SimFrame::capture(&self.state));
            }
            export.finalize(result.steps, settled);
        }

        info!(
            "✓ {} complete: {} steps, {} on perimeter, mean goal distance {:.3}",
            result.label, result.steps, result.final_perimeter_count, result.mean_goal_distance
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use swarm_core::SwarmParams;

    fn pair(params: SwarmParams) -> SwarmState {
        SwarmState::from_coordinates(&[0.0, 1.0], &[0.0, 0.0], params).unwrap()
    }

    #[test]
    fn test_runs_to_step_limit() {
        let mut runner = SwarmRunner::new("pair", pair(SwarmParams::default())).with_max_steps(5);
        let result = runner.run();

        assert_eq!(result.steps, 5);
        assert!(!result.settled);
        assert_eq!(result.final_perimeter_count, 2);
        // Each agent moves exactly one step speed per step
        assert_relative_eq!(result.metrics.max_step_displacement, 0.05, epsilon = 1e-12);
        assert_relative_eq!(result.metrics.total_path_length, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_pair_settles_at_balance() {
        // Cohesion d and repulsion d - 3 cancel at d = 1.5; the dead zone
        // covers |2d - 3| <= 0.1
        let params = SwarmParams {
            stability_factor: 2.0,
            ..Default::default()
        };
        let mut runner = SwarmRunner::new("pair", pair(params)).with_max_steps(100);
        let result = runner.run();

        assert!(result.settled);
        assert_eq!(result.steps, 5);
        let d = (runner.state().position(1) - runner.state().position(0)).norm();
        assert_relative_eq!(d, 1.5, epsilon = 0.1);
    }

    #[test]
    fn test_dead_zone_settles_immediately() {
        let params = SwarmParams {
            stability_factor: f64::INFINITY,
            ..Default::default()
        };
        let mut runner = SwarmRunner::new("frozen", pair(params)).with_max_steps(100);
        let result = runner.run();

        assert!(result.settled);
        assert_eq!(result.steps, 0);
        assert_eq!(result.metrics.total_path_length, 0.0);
    }

    #[test]
    fn test_speed_override() {
        let mut runner = SwarmRunner::new("pair", pair(SwarmParams::default()))
            .with_max_steps(1)
            .with_step_speed(0.25)
            .unwrap();
        let result = runner.run();
        assert_relative_eq!(result.metrics.max_step_displacement, 0.25, epsilon = 1e-12);
        assert_relative_eq!(runner.state().position(0).x, -0.25, epsilon = 1e-9);
    }

    #[test]
    fn test_bad_speed_override_rejected() {
        for speed in [-0.05, f64::NAN, f64::INFINITY] {
            let result = SwarmRunner::new("pair", pair(SwarmParams::default())).with_step_speed(speed);
            assert!(matches!(result, Err(SwarmError::StepSpeed(_))), "{speed} accepted");
        }
    }

    #[test]
    fn test_export_frames() {
        let mut export = SimExport::new("pair", None, Vec2::zeros());
        let mut runner = SwarmRunner::new("pair", pair(SwarmParams::default()))
            .with_max_steps(10)
            .with_step_speed(0.01)
            .unwrap()
            .with_export_interval(4);
        let result = runner.run_with_export(&mut export);

        // Steps 0, 4 and 8 plus the final frame
        let steps: Vec<u64> = export.frames.iter().map(|f| f.step).collect();
        assert_eq!(steps, vec![0, 4, 8, 10]);
        assert_eq!(export.steps, result.steps);
        assert!(!export.settled);
    }

    #[test]
    fn test_goal_distance() {
        let params = SwarmParams {
            goal: Vec2::new(0.5, 3.0),
            ..Default::default()
        };
        let result = SwarmRunner::new("pair", pair(params)).with_max_steps(0).run();

        assert_eq!(result.steps, 0);
        assert_relative_eq!(result.mean_goal_distance, (0.25f64 + 9.0).sqrt());
        assert_relative_eq!(result.centroid.x, 0.5);
        assert_eq!(result.metrics.perimeter_count_min, 2);
    }
}

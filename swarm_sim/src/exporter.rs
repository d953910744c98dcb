//! JSON exporter for offline plotting.
//!
//! Exports sampled swarm frames as JSON so runs can be replayed or plotted
//! outside the simulator.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use swarm_core::{SwarmState, Vec2};

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Committed steps when the frame was captured
    pub step: u64,

    /// Agent positions and perimeter flags
    pub agents: Vec<AgentPosition>,

    pub perimeter_count: usize,

    /// Events (settling, parameter changes, etc.)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SimEvent>,
}

impl SimFrame {
    /// Captures the current state. Perimeter flags are from the last
    /// computed step.
    pub fn capture(state: &SwarmState) -> Self {
        let agents = state
            .positions()
            .iter()
            .zip(state.perimeter_flags())
            .enumerate()
            .map(|(id, (p, on_perimeter))| AgentPosition::new(id, *p, on_perimeter))
            .collect();
        Self {
            step: state.steps_applied(),
            agents,
            perimeter_count: state.perimeter_count(),
            events: Vec::new(),
        }
    }

    pub fn with_event(mut self, event: SimEvent) -> Self {
        self.events.push(event);
        self
    }
}

/// Position of an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPosition {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub on_perimeter: bool,
}

impl AgentPosition {
    pub fn new(id: usize, pos: Vec2, on_perimeter: bool) -> Self {
        Self {
            id,
            x: pos.x,
            y: pos.y,
            on_perimeter,
        }
    }
}

/// Simulation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEvent {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl SimEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: Some("info".to_string()),
        }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario or swarm file name
    pub scenario: String,

    /// Placement seed, if the swarm was placed randomly
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    pub goal: [f64; 2],

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Steps committed over the whole run
    pub steps: u64,

    /// True if the run stopped because every resultant fell below the
    /// settle threshold
    pub settled: bool,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: Option<u64>, goal: Vec2) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            goal: [goal.x, goal.y],
            frames: Vec::new(),
            steps: 0,
            settled: false,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.steps = frame.step;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, steps: u64, settled: bool) {
        self.steps = steps;
        self.settled = settled;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

//! Swarm simulator: swarm files, named scenarios and a batch driver around
//! [`swarm_core`].
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐     ┌─────────────────┐
//! │ persist        │     │ scenarios       │
//! │ (.txt / .json) │     │ (seeded builds) │
//! └───────┬────────┘     └────────┬────────┘
//!         └───────────┬───────────┘
//!                     ▼
//!              ┌─────────────┐      ┌──────────────┐
//!              │ SwarmRunner │─────►│ SimExport    │
//!              │ compute ▸   │      │ (JSON frames)│
//!              │ apply loop  │      └──────────────┘
//!              └──────┬──────┘
//!                     ▼
//!        RunResult + persist::save_swarm / dump_state
//! ```
//!
//! # Usage
//!
//! ```
//! use swarm_sim::{ScenarioId, SwarmRunner};
//!
//! let swarm = ScenarioId::Triangle.build(42).unwrap();
//! let result = SwarmRunner::new("triangle", swarm).with_max_steps(20).run();
//! assert_eq!(result.final_perimeter_count, 3);
//! ```

pub mod exporter;
pub mod persist;
pub mod runner;
pub mod scenarios;

pub use exporter::{AgentPosition, SimEvent, SimExport, SimFrame};
pub use persist::PersistError;
pub use runner::{RunMetrics, RunResult, SwarmRunner};
pub use scenarios::ScenarioId;

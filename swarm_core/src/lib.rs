//! Perimeter-aware swarm model.
//!
//! Point agents move under three combined behaviours (cohesion toward
//! neighbours, repulsion from close agents, motion toward a shared goal)
//! plus perimeter-only adjustments (gap filling, adversarial deviation).
//!
//! # Pipeline
//!
//! ```text
//!  positions ──► GeometryCache ──► NeighborGraph ──► perimeter::classify
//!                                                          │
//!                     ┌────────────────────────────────────┘
//!                     ▼
//!               ForceComposer ──► resultants ──► integrator::apply ──► positions
//!               (compute_step)                  (apply_step)
//! ```
//!
//! Every step reads one frozen geometry snapshot; only the integrator
//! writes positions, and it snaps them to a 1e-9 grid so runs from the
//! same state are bit-reproducible.
//!
//! # Usage
//!
//! ```
//! use swarm_core::{SwarmParams, SwarmState};
//!
//! let params = SwarmParams::from_pairs([("cb", "2.0"), ("speed", "0.05")]).unwrap();
//! let mut swarm = SwarmState::from_coordinates(
//!     &[0.0, 1.0, 1.0, 0.0],
//!     &[0.0, 0.0, 1.0, 1.0],
//!     params,
//! ).unwrap();
//!
//! swarm.compute_step(0.05);
//! assert!(swarm.on_perimeter(0));
//! swarm.apply_step();
//! ```

pub mod error;
pub mod forces;
pub mod geometry;
pub mod integrator;
pub mod params;
pub mod perimeter;
pub mod swarm;
pub mod vector;

// Re-export key types for convenience
pub use error::{ParamError, SwarmError};
pub use forces::{AgentForces, ForceComposer};
pub use geometry::GeometryCache;
pub use params::{PerimeterMatrix, PerimeterPair, RepulsionMode, SwarmParams};
pub use perimeter::{GapPolicy, NeighborGraph, PerimeterInfo};
pub use swarm::{check_step_speed, AgentRecord, Placement, SwarmSnapshot, SwarmState};
pub use vector::Vec2;

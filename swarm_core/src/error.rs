//! Error types for parameter ingestion and swarm construction.
//!
//! Stepping itself never fails: once a `SwarmState` exists, every
//! `compute_step` / `apply_step` is total arithmetic over validated state.

use thiserror::Error;

/// Errors produced while reading or validating a parameter set.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    /// A scalar (or one element of a vector value) is not a decimal number
    #[error("Parameter `{key}`: cannot parse `{value}` as a number")]
    Number { key: String, value: String },

    /// A vector/matrix value has the wrong number of elements
    #[error("Parameter `{key}`: expected {expected} values, found {found}")]
    Arity {
        key: String,
        expected: &'static str,
        found: usize,
    },

    /// A boolean value is neither `true` nor `false`
    #[error("Parameter `{key}`: expected `true` or `false`, found `{value}`")]
    Boolean { key: String, value: String },

    /// Values parsed but describe an unusable model
    #[error("Invalid parameters: {0}")]
    Invalid(String),
}

impl ParamError {
    /// Creates a number error.
    pub fn number(key: &str, value: &str) -> Self {
        Self::Number {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    /// Creates an invalid-parameters error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Errors produced while constructing or reconfiguring a swarm.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SwarmError {
    /// x and y coordinate lists differ in length
    #[error("Coordinate count mismatch: {xs} x-values but {ys} y-values")]
    LengthMismatch { xs: usize, ys: usize },

    /// Agent index outside `0..len`
    #[error("Agent index {index} out of range for swarm of {len}")]
    AgentIndex { index: usize, len: usize },

    /// A coordinate is NaN or infinite
    #[error("Agent {index} has a non-finite position ({x}, {y})")]
    NonFinitePosition { index: usize, x: f64, y: f64 },

    /// Step speed is negative or not finite
    #[error("Step speed must be finite and >= 0, got {0}")]
    StepSpeed(f64),

    /// Random placement request cannot be honoured
    #[error("Invalid placement: {0}")]
    InvalidPlacement(String),

    /// Parameter set rejected
    #[error(transparent)]
    Params(#[from] ParamError),
}

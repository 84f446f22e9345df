//! Unified error types for the BALDES workspace
//!
//! This module provides a common error type [`BaldesError`] that can
//! represent failures from any part of the system. Component-specific
//! error types convert into `BaldesError` at API boundaries.
//!
//! # Example
//!
//! ```ignore
//! use baldes_core::{BaldesError, BaldesResult};
//!
//! fn price(instance: &RoutingInstance) -> BaldesResult<Vec<Path>> {
//!     let graph = build_graph(instance)?;
//!     graph.solve(&q_star)
//! }
//! ```

use thiserror::Error;

/// Unified error type for all BALDES operations.
///
/// Feasibility and dominance failures never surface as errors; they are
/// absorbed inside the extension and dominance engines. Only structural
/// failures (malformed instances, exhausted pools, out-of-range bucket
/// indices) reach this type.
#[derive(Error, Debug)]
pub enum BaldesError {
    /// Instance/model construction errors
    #[error("Model error: {0}")]
    Model(String),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Labeling engine errors (pool exhaustion, bucket overflow)
    #[error("Solver error: {0}")]
    Solver(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using BaldesError.
pub type BaldesResult<T> = Result<T, BaldesError>;

// Conversion from anyhow::Error
impl From<anyhow::Error> for BaldesError {
    fn from(err: anyhow::Error) -> Self {
        BaldesError::Other(err.to_string())
    }
}

// Conversion from string-like types for convenience
impl From<String> for BaldesError {
    fn from(s: String) -> Self {
        BaldesError::Other(s)
    }
}

impl From<&str> for BaldesError {
    fn from(s: &str) -> Self {
        BaldesError::Other(s.to_string())
    }
}

// JSON parsing errors (test fixtures, dumps)
impl From<serde_json::Error> for BaldesError {
    fn from(err: serde_json::Error) -> Self {
        BaldesError::Model(err.to_string())
    }
}

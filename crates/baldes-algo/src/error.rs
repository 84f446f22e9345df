//! Engine-internal error type.
//!
//! Feasibility and dominance failures are absorbed inside the extension
//! and dominance engines and never become errors. Only structural
//! failures surface here, and they convert to
//! [`baldes_core::BaldesError::Solver`] at the public boundary.

use baldes_core::BaldesError;
use thiserror::Error;

/// Structural failures inside the labeling engine.
#[derive(Debug, Error)]
pub enum SolverError {
    /// A resource vector mapped outside the bucket grid of its node
    #[error("Resource vector {1:?} maps outside the bucket grid of node {0}")]
    BucketOutOfBounds(usize, Vec<f64>),

    /// The label pool hit its configured capacity
    #[error("Label pool exhausted after {0} labels (limit {1})")]
    PoolExhausted(usize, usize),

    /// A resource vector had the wrong dimension
    #[error("Resource vector has {0} entries, engine is dimensioned for {1}")]
    ResourceDimension(usize, usize),

    /// Cut dual vector shape mismatch
    #[error("Cut dual vector has {0} entries, {1} cuts are active")]
    CutDualLength(usize, usize),

    /// The engine was asked to run before `setup()`
    #[error("Engine not set up: call setup() before {0}")]
    NotSetUp(&'static str),
}

impl From<SolverError> for BaldesError {
    fn from(err: SolverError) -> Self {
        BaldesError::Solver(err.to_string())
    }
}

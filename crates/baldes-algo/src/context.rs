//! Read-only view shared by both labeling directions.
//!
//! Everything in here is immutable for the duration of one labeling
//! phase; the stage controller mutates the underlying data only between
//! phases. Both parallel direction tasks borrow the same context.

use std::sync::atomic::AtomicBool;

use baldes_core::RoutingInstance;

use crate::cuts::CutStorage;
use crate::ng::NgMemory;
use crate::options::BucketOptions;
use crate::stage::Stage;

/// Reduced-cost tolerance: anything above `-TOL_ZERO` counts as zero.
pub const TOL_ZERO: f64 = 1e-6;

/// Shared read-only state of one labeling phase.
pub(crate) struct SearchContext<'a> {
    pub instance: &'a RoutingInstance,
    pub options: &'a BucketOptions,
    pub ng: &'a NgMemory,
    pub cuts: &'a CutStorage,
    /// `fixed_arcs[u][v]` forbids the job arc `(u → v)`
    pub fixed_arcs: &'a [Vec<bool>],
    pub stage: Stage,
    /// Full labeling ignores the `q_star` split (used by fixing)
    pub full: bool,
    pub q_star: &'a [f64],
    /// Cooperative cancellation, checked between SCCs
    pub abort: &'a AtomicBool,
}

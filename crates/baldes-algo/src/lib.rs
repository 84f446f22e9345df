//! # baldes-algo: Bucket-Graph Labeling for VRPTW Pricing
//!
//! This crate implements the pricing subproblem of a column-generation
//! solver for the VRPTW: the Resource-Constrained Elementary Shortest
//! Path Problem, solved with a bidirectional bucket-graph labeling
//! algorithm.
//!
//! ## The engine
//!
//! [`BucketGraph`] is the entry point. Per instance it partitions each
//! node's resource box into buckets, lifts the job arcs onto the bucket
//! grid and layers the result into SCCs; per pricing call it runs the
//! forward and backward labeling passes in parallel, concatenates the
//! surviving labels across midpoint arcs and returns the best
//! negative-reduced-cost columns.
//!
//! | Stage | Adds |
//! |-------|------|
//! | 1 | relaxed ng-memories, fast bound |
//! | 2 | tight ng-memories |
//! | 3 | heuristic arc fixing |
//! | 4 | exact bucket-arc elimination + jump arcs |
//! | Enumerate | exact, all labels kept |
//!
//! `solve` escalates through the stages on its own whenever a stage
//! prices no column; `phase_one` … `phase_four` run a single stage for
//! debugging and step-wise integration.
//!
//! ## Example
//!
//! ```ignore
//! use baldes_algo::BucketGraph;
//!
//! let mut graph = BucketGraph::new(instance, 20.0);
//! graph.setup()?;
//! graph.set_duals(&duals)?;
//! let columns = graph.solve(&q_star)?;
//! for path in &columns {
//!     println!("{:?} at {}", path.vertices, path.reduced_cost);
//! }
//! ```
//!
//! ## Concurrency
//!
//! The forward and backward passes share no mutable state and run as
//! two `rayon`-joined tasks; concatenation is single-threaded; the
//! fixing engine's bulk loops use per-task accumulators merged at the
//! end. The engine checks a cooperative abort flag between SCCs.

pub mod arcs;
pub mod arena;
pub mod bucket;
pub mod cuts;
pub mod direction;
pub mod error;
pub mod graph;
pub mod label;
pub mod ng;
pub mod options;
pub mod stage;
pub mod stats;

mod context;
mod dominance;
mod extension;
mod fixing;
mod labeling;
mod merge;
mod scc;

#[cfg(test)]
pub(crate) mod test_support;

pub use arcs::{BucketArc, JumpArc};
pub use arena::{ArenaContext, RouteSet};
pub use bucket::{Bucket, DirectionState, Grid};
pub use cuts::{CutStorage, SrcCut};
pub use direction::Direction;
pub use error::SolverError;
pub use graph::BucketGraph;
pub use label::{Label, LabelId, LabelPool, SrcState};
pub use ng::NgMemory;
pub use options::BucketOptions;
pub use stage::{Stage, Status};
pub use stats::LabelingStats;

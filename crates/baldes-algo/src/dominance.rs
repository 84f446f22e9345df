//! The dominance engine.
//!
//! A label is kept only while no other label at the same vertex proves
//! it redundant: at least as cheap, componentwise no worse on resources,
//! no more restricted on future visits, and not behind on any SRC
//! counter it cannot pay for. The second rule extends the comparison
//! across all previously processed buckets of the same node with
//! componentwise smaller interval coordinates, which is the bucket
//! graph's key pruning.

use baldes_core::bitmap;

use crate::bucket::Bucket;
use crate::cuts::CutStorage;
use crate::direction::Direction;
use crate::label::{Label, LabelPool};
use crate::stage::Stage;

/// Whether `a` dominates `b`. Both labels must terminate at the same
/// vertex.
///
/// Under active SRC cuts the comparison charges `a` for every cut on
/// which its counter is ahead of `b`'s: `a` might wrap where `b` cannot,
/// so its cost advantage must prepay that penalty. Cuts with
/// non-negative duals fall back to requiring equal counters.
pub(crate) fn dominates(
    a: &Label,
    b: &Label,
    direction: Direction,
    stage: Stage,
    cuts: &CutStorage,
    tol: f64,
) -> bool {
    debug_assert_eq!(a.node_id, b.node_id);

    let mut cost_a = a.cost;
    if !cuts.is_empty() {
        for (k, cut) in cuts.cuts().iter().enumerate() {
            let counter_a = if a.src_state.len() > k { a.src_state.get(k) } else { 0 };
            let counter_b = if b.src_state.len() > k { b.src_state.get(k) } else { 0 };
            if counter_a == counter_b {
                continue;
            }
            if cut.dual < 0.0 {
                if counter_a > counter_b {
                    // prepay the wrap b can never be charged for
                    cost_a -= cut.dual;
                }
            } else {
                return false;
            }
        }
    }
    if cost_a > b.cost + tol {
        return false;
    }
    if !direction.resources_dominate(&a.resources, &b.resources, tol) {
        return false;
    }
    // a label that remembers more visits is more restricted and cannot
    // dominate a freer one
    if !bitmap::is_subset(&a.visited, &b.visited) {
        return false;
    }
    // enumeration keeps every distinct route alive
    if stage == Stage::Enumerate && a.visited != b.visited {
        return false;
    }
    true
}

/// Scan all previously processed buckets of the candidate's node whose
/// interval coords are componentwise `≤` the candidate bucket's, via the
/// transitive closure of Φ. Buckets whose cost bound already exceeds the
/// candidate's cost cannot contain a dominator and are skipped without
/// touching their labels.
#[allow(clippy::too_many_arguments)]
pub(crate) fn dominated_in_componentwise_smaller_buckets(
    candidate: &Label,
    bucket: usize,
    phi: &[Vec<usize>],
    c_bar: &[f64],
    buckets: &[Bucket],
    pool: &LabelPool,
    direction: Direction,
    stage: Stage,
    cuts: &CutStorage,
    tol: f64,
    dominance_checks: &mut u64,
) -> bool {
    let mut visited_buckets = bitmap::zeroed(buckets.len());
    let mut stack: Vec<usize> = phi[bucket].clone();
    while let Some(b) = stack.pop() {
        if bitmap::is_set(&visited_buckets, b) {
            continue;
        }
        bitmap::set(&mut visited_buckets, b);
        if c_bar[b] <= candidate.cost + tol {
            for &lid in &buckets[b].labels {
                *dominance_checks += 1;
                if dominates(pool.get(lid), candidate, direction, stage, cuts, tol) {
                    return true;
                }
            }
        }
        stack.extend(phi[b].iter().copied());
    }
    false
}

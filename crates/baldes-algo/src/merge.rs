//! Bidirectional concatenation.
//!
//! After both labeling passes join, every forward label is stitched to
//! compatible backward labels across a bridging job arc. The per-bucket
//! cost bounds `c̄` prune whole buckets before any label is touched; the
//! surviving pairs are checked for resource feasibility and ng-overlap,
//! priced (including SRC merge wraps) and deduplicated into the best-k
//! negative-reduced-cost columns.

use baldes_core::{bitmap, Path};
use tracing::{debug, trace};

use crate::arena::{ArenaContext, RouteSet};
use crate::bucket::DirectionState;
use crate::context::{SearchContext, TOL_ZERO};
use crate::extension::knapsack_completion_bound;
use crate::label::Label;
use crate::stage::Stage;

/// Result of one concatenation pass.
pub(crate) struct MergeOutcome {
    /// Negative-reduced-cost columns, ascending by reduced cost,
    /// truncated to `max_returned_paths`
    pub paths: Vec<Path>,
    /// Best (most negative) reduced cost seen, `+inf` when none
    pub best_cost: f64,
}

/// Concatenate forward and backward labels into complete columns.
pub(crate) fn concatenate(
    ctx: &SearchContext<'_>,
    fw: &DirectionState,
    bw: &DirectionState,
    arena: &ArenaContext,
) -> MergeOutcome {
    let end_depot = ctx.options.end_depot;
    let num_nodes = ctx.instance.num_nodes();

    // cheapest backward label per node, the per-arc completion bound
    let mut bw_best_by_node = arena.completion_bounds(num_nodes);
    for bucket in &bw.buckets {
        for &lid in &bucket.labels {
            let cost = bw.pool.get(lid).cost;
            if cost < bw_best_by_node[bucket.node_id] {
                bw_best_by_node[bucket.node_id] = cost;
            }
        }
    }
    let min_bw = bw_best_by_node
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);

    let mut seen = arena.route_set();
    let mut candidates: Vec<Path> = Vec::new();
    let mut best_cost = f64::INFINITY;

    for (b, bucket) in fw.buckets.iter().enumerate() {
        // a bucket whose bound cannot complete below zero holds nothing
        if fw.c_bar[b] + min_bw.min(0.0) > -TOL_ZERO {
            continue;
        }
        for &lid in &bucket.labels {
            let label_fw = fw.pool.get(lid);

            if label_fw.node_id == end_depot {
                // the forward pass already closed this column
                if label_fw.cost < -TOL_ZERO {
                    record(
                        label_fw.chain_vertices(&fw.pool),
                        label_fw.cost,
                        label_fw.real_cost,
                        &mut seen,
                        &mut candidates,
                        &mut best_cost,
                    );
                }
                continue;
            }

            // under full elementarity the visit bitmap is exact, so the
            // knapsack bound on collectible duals is a safe prune
            if ctx.stage == Stage::Enumerate {
                let bound = knapsack_completion_bound(ctx, label_fw, ctx.instance.capacity);
                if bound.is_finite() && label_fw.cost - bound > -TOL_ZERO {
                    continue;
                }
            }

            for arc in &ctx.instance.nodes[label_fw.node_id].arcs_out {
                if arc.fixed || ctx.fixed_arcs[arc.from][arc.to] {
                    continue;
                }
                let v = arc.to;
                if label_fw.cost + arc.cost_increment + bw_best_by_node[v] > -TOL_ZERO {
                    continue;
                }
                for bb in bw.buckets_of(v) {
                    if label_fw.cost + arc.cost_increment + bw.c_bar[bb] > -TOL_ZERO {
                        continue;
                    }
                    let bw_bucket = &bw.buckets[bb];
                    // every label in the cell sits below its upper
                    // corner; if even that cannot absorb the increments
                    // the whole cell is incompatible
                    let cell_feasible = label_fw
                        .resources
                        .iter()
                        .zip(arc.resource_increment.iter())
                        .zip(bw_bucket.ub.iter())
                        .all(|((&r, &inc), &ub)| r + inc <= ub + TOL_ZERO);
                    if !cell_feasible {
                        continue;
                    }
                    for &blid in &bw_bucket.labels {
                        let label_bw = bw.pool.get(blid);
                        if let Some((cost, real_cost)) =
                            try_merge(ctx, label_fw, label_bw, arc.cost_increment, &arc.resource_increment)
                        {
                            let mut vertices = label_fw.chain_vertices(&fw.pool);
                            let mut tail = label_bw.chain_vertices(&bw.pool);
                            tail.reverse();
                            vertices.extend(tail);
                            record(
                                vertices,
                                cost,
                                real_cost,
                                &mut seen,
                                &mut candidates,
                                &mut best_cost,
                            );
                        }
                    }
                }
            }
        }
    }

    candidates.sort_by(|a, b| a.reduced_cost.total_cmp(&b.reduced_cost));
    candidates.truncate(ctx.options.max_returned_paths);
    debug!(
        columns = candidates.len(),
        best_cost, "concatenation finished"
    );
    MergeOutcome {
        paths: candidates,
        best_cost,
    }
}

/// Price one forward/backward pair across a bridging arc. Returns the
/// merged reduced and real cost when the pair is feasible and improving.
fn try_merge(
    ctx: &SearchContext<'_>,
    label_fw: &Label,
    label_bw: &Label,
    arc_cost: f64,
    arc_increment: &[f64],
) -> Option<(f64, f64)> {
    // uniform feasibility: forward resources plus the bridge must fit
    // under the backward label's slack, every resource alike
    let feasible = label_fw
        .resources
        .iter()
        .zip(arc_increment.iter())
        .zip(label_bw.resources.iter())
        .all(|((&r, &inc), &slack)| r + inc <= slack + TOL_ZERO);
    if !feasible {
        return None;
    }
    // elementarity: the halves must not remember a common vertex
    if bitmap::intersects(&label_fw.visited, &label_bw.visited) {
        return None;
    }
    let mut cost = label_fw.cost + arc_cost + label_bw.cost;
    if !ctx.cuts.is_empty() {
        cost -= ctx.cuts.merge_carry(&label_fw.src_state, &label_bw.src_state);
    }
    if cost >= -TOL_ZERO {
        return None;
    }
    trace!(fw = label_fw.node_id, bw = label_bw.node_id, cost, "merge");
    Some((cost, label_fw.real_cost + arc_cost + label_bw.real_cost))
}

fn record(
    vertices: Vec<usize>,
    cost: f64,
    real_cost: f64,
    seen: &mut RouteSet<'_>,
    candidates: &mut Vec<Path>,
    best_cost: &mut f64,
) {
    if cost < *best_cost {
        *best_cost = cost;
    }
    if seen.insert(&vertices) {
        candidates.push(Path::new(vertices, cost, real_cost));
    }
}

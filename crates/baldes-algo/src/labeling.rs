//! The labeling loop.
//!
//! Per direction: seed the depot bucket, then process SCCs of the bucket
//! graph in topological order, sweeping each SCC to a fixed point. Every
//! non-extended label is expanded along its bucket arcs (and, from Stage
//! 3 on, jump arcs); candidates run the dominance gauntlet before they
//! are interned. When an SCC settles, the per-bucket cost bounds `c̄`
//! are final and later SCCs may read them.
//!
//! The forward and backward passes share no mutable state and run as two
//! parallel tasks joined before concatenation.

use std::sync::atomic::Ordering;

use baldes_core::bitmap;
use tracing::debug;

use crate::bucket::{Bucket, DirectionState};
use crate::context::{SearchContext, TOL_ZERO};
use crate::direction::Direction;
use crate::dominance::{dominated_in_componentwise_smaller_buckets, dominates};
use crate::error::SolverError;
use crate::extension::{extend, extend_jump};
use crate::label::{DirectionStats, Label, LabelId, LabelPool, SrcState};

/// Reset one direction and place its seed label: zeroed resources at the
/// start depot (forward) or the full resource box at the end depot
/// (backward), cost 0, only the depot bit visited.
pub(crate) fn initialize(
    ctx: &SearchContext<'_>,
    state: &mut DirectionState,
) -> Result<(), SolverError> {
    state.reset_labels();
    let seed_node = match state.direction {
        Direction::Forward => ctx.options.depot,
        Direction::Backward => ctx.options.end_depot,
    };
    let node = &ctx.instance.nodes[seed_node];
    let resources = state.direction.seed_resources(node);
    let bucket = state.bucket_number(seed_node, &resources)?;

    let mut visited = bitmap::zeroed(ctx.instance.num_nodes());
    bitmap::set(&mut visited, seed_node);
    let seed = Label {
        node_id: seed_node,
        resources,
        cost: 0.0,
        real_cost: 0.0,
        pred: None,
        visited,
        src_state: SrcState::zeroed(ctx.cuts.len()),
        path_len: 1,
        extended: false,
        direction: state.direction,
    };
    let id = state.pool.insert(seed)?;
    state.buckets[bucket].labels.push(id);
    state.c_bar[bucket] = 0.0;
    state.stats.labels_created += 1;
    Ok(())
}

/// Run one direction of the labeling algorithm to completion, filling
/// buckets and `c̄`. Assumes [`initialize`] ran on this state.
pub(crate) fn labeling_algorithm(
    ctx: &SearchContext<'_>,
    state: &mut DirectionState,
) -> Result<(), SolverError> {
    let DirectionState {
        direction,
        ref grid,
        ref mut buckets,
        ref bucket_arcs,
        ref jump_arcs,
        ref sccs,
        ref phi,
        ref mut c_bar,
        ref mut pool,
        ref mut stats,
        ..
    } = *state;

    for scc in sccs {
        if ctx.abort.load(Ordering::Relaxed) {
            debug!(direction = ?direction, "labeling aborted between SCCs");
            break;
        }
        // sweep the component until no bucket produced a new label
        loop {
            let mut changed = false;
            for &b in scc {
                let todo: Vec<LabelId> = buckets[b]
                    .labels
                    .iter()
                    .copied()
                    .filter(|&lid| !pool.get(lid).extended)
                    .collect();
                for lid in todo {
                    if pool.get(lid).extended {
                        // evicted by a dominator inserted this sweep
                        continue;
                    }
                    let label = pool.get(lid).clone();
                    pool.get_mut(lid).extended = true;
                    if !ctx.full && !direction.within_split(label.resources[0], ctx.q_star[0]) {
                        continue;
                    }
                    for arc in &bucket_arcs[b] {
                        let Some(candidate) = extend(ctx, direction, lid, &label, arc) else {
                            continue;
                        };
                        let target = grid.bucket_number(candidate.node_id, &candidate.resources)?;
                        if insert_candidate(
                            candidate, target, buckets, pool, c_bar, phi, ctx, direction, stats,
                        )? {
                            changed = true;
                        }
                    }
                    if ctx.stage.jump_arcs() {
                        for jump in &jump_arcs[b] {
                            let Some(candidate) =
                                extend_jump(direction, &label, &buckets[jump.to_bucket])
                            else {
                                continue;
                            };
                            let target =
                                grid.bucket_number(candidate.node_id, &candidate.resources)?;
                            if insert_candidate(
                                candidate, target, buckets, pool, c_bar, phi, ctx, direction,
                                stats,
                            )? {
                                changed = true;
                            }
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }
        // the component settled: finalize its cost bounds. Φ-predecessor
        // bounds fold in so c̄ is monotone along the grid of each node.
        for &b in scc {
            let mut best = c_bar[b];
            for &lid in &buckets[b].labels {
                best = best.min(pool.get(lid).cost);
            }
            for &p in &phi[b] {
                best = best.min(c_bar[p]);
            }
            c_bar[b] = best;
        }
    }

    debug!(
        direction = ?direction,
        labels = stats.labels_created,
        dominance_checks = stats.dominance_checks,
        "labeling pass finished"
    );
    Ok(())
}

/// Run forward and backward labeling as two parallel tasks with a join
/// barrier, the engine's only concurrency point.
pub(crate) fn run_labeling_algorithms(
    ctx: &SearchContext<'_>,
    fw: &mut DirectionState,
    bw: &mut DirectionState,
) -> Result<(), SolverError> {
    initialize(ctx, fw)?;
    initialize(ctx, bw)?;
    let (fw_result, bw_result) = rayon::join(
        || labeling_algorithm(ctx, fw),
        || labeling_algorithm(ctx, bw),
    );
    fw_result?;
    bw_result?;
    Ok(())
}

/// Dominance-check a candidate against its target bucket and the
/// componentwise-smaller buckets; on survival intern it and evict the
/// residents it dominates. Returns whether the candidate was kept.
#[allow(clippy::too_many_arguments)]
fn insert_candidate(
    candidate: Label,
    target: usize,
    buckets: &mut [Bucket],
    pool: &mut LabelPool,
    c_bar: &[f64],
    phi: &[Vec<usize>],
    ctx: &SearchContext<'_>,
    direction: Direction,
    stats: &mut DirectionStats,
) -> Result<bool, SolverError> {
    for &lid in &buckets[target].labels {
        stats.dominance_checks += 1;
        if dominates(pool.get(lid), &candidate, direction, ctx.stage, ctx.cuts, TOL_ZERO) {
            return Ok(false);
        }
    }
    if dominated_in_componentwise_smaller_buckets(
        &candidate,
        target,
        phi,
        c_bar,
        buckets,
        pool,
        direction,
        ctx.stage,
        ctx.cuts,
        TOL_ZERO,
        &mut stats.dominance_checks,
    ) {
        return Ok(false);
    }

    let mut i = 0;
    while i < buckets[target].labels.len() {
        let lid = buckets[target].labels[i];
        stats.dominance_checks += 1;
        if dominates(&candidate, pool.get(lid), direction, ctx.stage, ctx.cuts, TOL_ZERO) {
            buckets[target].labels.swap_remove(i);
            // evicted labels never extend again
            pool.get_mut(lid).extended = true;
        } else {
            i += 1;
        }
    }

    let id = pool.insert(candidate)?;
    buckets[target].labels.push(id);
    stats.labels_created += 1;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Stage;
    use crate::test_support::{search_context_parts, small_instance, with_layered_states, ContextParts};

    #[test]
    fn test_seed_bounds_are_zero() {
        let instance = small_instance();
        let ContextParts {
            options,
            ng,
            cuts,
            fixed,
            abort,
        } = search_context_parts(&instance);
        let q_star = vec![500.0, 5.0];
        with_layered_states(&instance, &fixed, |fw, bw| {
            let ctx = SearchContext {
                instance: &instance,
                options: &options,
                ng: &ng,
                cuts: &cuts,
                fixed_arcs: &fixed,
                stage: Stage::Two,
                full: true,
                q_star: &q_star,
                abort: &abort,
            };
            initialize(&ctx, fw).unwrap();
            initialize(&ctx, bw).unwrap();
            let fw_seed = fw.bucket_number(0, &instance.nodes[0].lb).unwrap();
            let bw_seed = bw
                .bucket_number(instance.end_depot(), &instance.nodes[instance.end_depot()].ub)
                .unwrap();
            assert_eq!(fw.c_bar[fw_seed], 0.0);
            assert_eq!(bw.c_bar[bw_seed], 0.0);
            assert_eq!(fw.pool.len(), 1);
            assert_eq!(bw.pool.len(), 1);
        });
    }

    #[test]
    fn test_labels_live_in_their_computed_bucket() {
        let instance = small_instance();
        let ContextParts {
            options,
            ng,
            cuts,
            fixed,
            abort,
        } = search_context_parts(&instance);
        let q_star = vec![1000.0, 10.0];
        with_layered_states(&instance, &fixed, |fw, bw| {
            let ctx = SearchContext {
                instance: &instance,
                options: &options,
                ng: &ng,
                cuts: &cuts,
                fixed_arcs: &fixed,
                stage: Stage::Two,
                full: true,
                q_star: &q_star,
                abort: &abort,
            };
            run_labeling_algorithms(&ctx, fw, bw).unwrap();
            for state in [&*fw, &*bw] {
                for (b, bucket) in state.buckets.iter().enumerate() {
                    for &lid in &bucket.labels {
                        let label = state.pool.get(lid);
                        let computed = state.bucket_number(label.node_id, &label.resources).unwrap();
                        assert_eq!(computed, b, "label sits in bucket {b}, maps to {computed}");
                    }
                }
            }
        });
    }

    #[test]
    fn test_no_dominated_pair_survives() {
        let instance = small_instance();
        let ContextParts {
            options,
            ng,
            cuts,
            fixed,
            abort,
        } = search_context_parts(&instance);
        let q_star = vec![1000.0, 10.0];
        with_layered_states(&instance, &fixed, |fw, bw| {
            let ctx = SearchContext {
                instance: &instance,
                options: &options,
                ng: &ng,
                cuts: &cuts,
                fixed_arcs: &fixed,
                stage: Stage::Two,
                full: true,
                q_star: &q_star,
                abort: &abort,
            };
            run_labeling_algorithms(&ctx, fw, bw).unwrap();
            for state in [&*fw, &*bw] {
                for bucket in &state.buckets {
                    for &a in &bucket.labels {
                        for &b in &bucket.labels {
                            if a == b {
                                continue;
                            }
                            assert!(
                                !dominates(
                                    state.pool.get(a),
                                    state.pool.get(b),
                                    state.direction,
                                    Stage::Two,
                                    &cuts,
                                    TOL_ZERO,
                                ),
                                "bucket holds a dominated pair"
                            );
                        }
                    }
                }
            }
        });
    }

    #[test]
    fn test_extension_monotone_forward() {
        let instance = small_instance();
        let ContextParts {
            options,
            ng,
            cuts,
            fixed,
            abort,
        } = search_context_parts(&instance);
        let q_star = vec![1000.0, 10.0];
        with_layered_states(&instance, &fixed, |fw, bw| {
            let ctx = SearchContext {
                instance: &instance,
                options: &options,
                ng: &ng,
                cuts: &cuts,
                fixed_arcs: &fixed,
                stage: Stage::Two,
                full: true,
                q_star: &q_star,
                abort: &abort,
            };
            run_labeling_algorithms(&ctx, fw, bw).unwrap();
            for label in fw.pool.iter() {
                if let Some(pred) = label.pred {
                    let parent = fw.pool.get(pred);
                    for (r, (&rl, &rp)) in
                        label.resources.iter().zip(parent.resources.iter()).enumerate()
                    {
                        assert!(
                            rl >= rp - 1e-9,
                            "resource {r} shrank along a forward extension"
                        );
                    }
                    assert_eq!(label.path_len, parent.path_len + 1);
                }
            }
        });
    }
}

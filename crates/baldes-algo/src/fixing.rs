//! The fixing engine.
//!
//! Stage 3 fixes job arcs heuristically: if even the cheapest forward
//! label into `u` and cheapest backward label out of `v` cannot close a
//! column within the optimality gap, the arc `(u → v)` is forbidden.
//! Stage 4 eliminates bucket arcs exactly with the per-bucket bounds,
//! then regenerates jump arcs so labels can still cross the holes the
//! elimination punched into each node's grid.
//!
//! All bulk loops use per-task local accumulators merged once at the
//! end; nothing is shared mid-flight.

use hashbrown::HashSet;
use rayon::prelude::*;
use tracing::debug;

use crate::arcs::JumpArc;
use crate::bucket::{DirectionState, Grid};
use crate::context::SearchContext;
use crate::label::Label;

/// Job arcs whose best-case completion exceeds the gap. The caller
/// applies the returned pairs to the fixed-arc mask.
///
/// Assumes both directions ran a full (un-split) labeling pass.
pub(crate) fn compute_heuristic_fixes(
    ctx: &SearchContext<'_>,
    fw: &DirectionState,
    bw: &DirectionState,
    gap: f64,
) -> Vec<(usize, usize)> {
    let num_nodes = ctx.instance.num_nodes();
    let fw_min = cheapest_label_per_node(fw, num_nodes);
    let bw_min = cheapest_label_per_node(bw, num_nodes);

    let fixes: Vec<(usize, usize)> = (0..num_nodes)
        .into_par_iter()
        .map(|u| {
            let mut local = Vec::new();
            let Some(label_fw) = fw_min[u] else {
                return local;
            };
            let duration = ctx.instance.nodes[u].duration;
            for v in 0..num_nodes {
                if v == u {
                    continue;
                }
                let Some(label_bw) = bw_min[v] else {
                    continue;
                };
                let travel = ctx.instance.cost(u, v);
                // a time-incompatible cheapest pair proves nothing about
                // the other pairs, so the arc is left alone
                if label_fw.resources[0] + travel + duration > label_bw.resources[0] {
                    continue;
                }
                if label_fw.cost + travel + duration + label_bw.cost > gap {
                    local.push((u, v));
                }
            }
            local
        })
        .reduce(Vec::new, |mut acc, mut chunk| {
            acc.append(&mut chunk);
            acc
        });

    debug!(fixes = fixes.len(), gap, "heuristic arc fixing computed");
    fixes
}

fn cheapest_label_per_node(state: &DirectionState, num_nodes: usize) -> Vec<Option<&Label>> {
    let mut best: Vec<Option<&Label>> = vec![None; num_nodes];
    for bucket in &state.buckets {
        for &lid in &bucket.labels {
            let label = state.pool.get(lid);
            if best[bucket.node_id].map_or(true, |current| label.cost < current.cost) {
                best[bucket.node_id] = Some(label);
            }
        }
    }
    best
}

/// Exact Stage-4 elimination: a bucket arc whose bound-through cost
/// exceeds the gap can never carry an optimal column. Eliminated arcs
/// are recorded in the direction's fixed-bucket mask. Returns how many
/// arcs were removed.
pub(crate) fn bucket_arc_elimination(
    state: &mut DirectionState,
    other_grid: &Grid,
    other_c_bar: &[f64],
    gap: f64,
) -> usize {
    let buckets = &state.buckets;
    let c_bar = &state.c_bar;
    let doomed: HashSet<(usize, usize)> = state
        .bucket_arcs
        .par_iter()
        .enumerate()
        .map(|(b, arcs)| {
            let mut local = Vec::new();
            for arc in arcs {
                let target = &buckets[arc.to_bucket];
                let midpoint: Vec<f64> = target
                    .lb
                    .iter()
                    .zip(target.ub.iter())
                    .map(|(&lo, &hi)| 0.5 * (lo + hi))
                    .collect();
                let Ok(opposite) = other_grid.bucket_number(target.node_id, &midpoint) else {
                    continue;
                };
                if c_bar[b] + arc.cost_increment + other_c_bar[opposite] > gap {
                    local.push((b, arc.to_bucket));
                }
            }
            local
        })
        .reduce(Vec::new, |mut acc, mut chunk| {
            acc.append(&mut chunk);
            acc
        })
        .into_iter()
        .collect();

    for (b, arcs) in state.bucket_arcs.iter_mut().enumerate() {
        arcs.retain(|arc| !doomed.contains(&(b, arc.to_bucket)));
    }
    let removed = doomed.len();
    state.fixed_buckets.extend(doomed);
    debug!(removed, gap, "bucket arcs eliminated");
    removed
}

/// Restore reachability across eliminated arcs: every bucket that lost
/// an outgoing arc gets a jump arc to the next interval of resource 0 at
/// the same node, so its labels can wait their way into cells whose own
/// arcs survived.
pub(crate) fn obtain_jump_bucket_arcs(state: &mut DirectionState) -> usize {
    let holed: HashSet<usize> = state.fixed_buckets.iter().map(|&(from, _)| from).collect();
    let mut added = 0;
    for b in holed {
        if state.jump_arcs[b].iter().any(|jump| jump.from_bucket == b) {
            continue;
        }
        let bucket = &state.buckets[b];
        let node_id = bucket.node_id;
        let dims = &state.grid.node_dims[node_id];
        if bucket.coords[0] + 1 >= dims[0] {
            continue;
        }
        let mut coords = bucket.coords.clone();
        coords[0] += 1;
        let target = state.grid.flat_index(node_id, &coords);
        state.jump_arcs[b].push(JumpArc {
            from_bucket: b,
            to_bucket: target,
        });
        added += 1;
    }
    debug!(added, "jump arcs generated");
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TOL_ZERO;
    use crate::labeling::run_labeling_algorithms;
    use crate::stage::Stage;
    use crate::test_support::{search_context_parts, small_instance, with_layered_states, ContextParts};

    #[test]
    fn test_heuristic_fixing_large_gap_fixes_nothing() {
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
            let fixes = compute_heuristic_fixes(&ctx, fw, bw, 1e12);
            assert!(fixes.is_empty());
        });
    }

    #[test]
    fn test_heuristic_fixing_zero_gap_fixes_positive_arcs() {
        let mut instance = small_instance();
        // no duals: every completion has positive cost
        instance.set_duals(&[0.0, 0.0, 0.0, 0.0]).unwrap();
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
            let fixes = compute_heuristic_fixes(&ctx, fw, bw, -TOL_ZERO);
            assert!(!fixes.is_empty());
        });
    }

    #[test]
    fn test_elimination_respects_gap_certificate() {
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
                stage: Stage::Four,
                full: true,
                q_star: &q_star,
                abort: &abort,
            };
            run_labeling_algorithms(&ctx, fw, bw).unwrap();
            let gap = 5.0;
            let bw_grid = bw.grid.clone();
            let bw_c_bar = bw.c_bar.clone();
            let before: Vec<(usize, usize, f64)> = fw
                .bucket_arcs
                .iter()
                .flat_map(|arcs| {
                    arcs.iter()
                        .map(|a| (a.from_bucket, a.to_bucket, a.cost_increment))
                })
                .collect();
            let removed = bucket_arc_elimination(fw, &bw_grid, &bw_c_bar, gap);
            // every eliminated arc carries a certificate above the gap
            for &(b, to, cost) in &before {
                if fw.fixed_buckets.contains(&(b, to)) {
                    let target = &fw.buckets[to];
                    let midpoint: Vec<f64> = target
                        .lb
                        .iter()
                        .zip(target.ub.iter())
                        .map(|(&lo, &hi)| 0.5 * (lo + hi))
                        .collect();
                    let opposite = bw_grid.bucket_number(target.node_id, &midpoint).unwrap();
                    assert!(
                        fw.c_bar[b] + cost + bw_c_bar[opposite] > gap,
                        "arc ({b} -> {to}) was eliminated without a certificate"
                    );
                }
            }
            assert_eq!(removed, fw.fixed_buckets.len());
        });
    }

    #[test]
    fn test_jump_arcs_bridge_holes() {
        let instance = small_instance();
        let ContextParts { fixed, .. } = search_context_parts(&instance);
        with_layered_states(&instance, &fixed, |fw, _bw| {
            // fabricate an elimination on a bucket with a later interval
            let b = fw
                .buckets
                .iter()
                .position(|bucket| bucket.coords[0] + 1 < fw.grid.node_dims[bucket.node_id][0])
                .expect("a bucket with a successor interval");
            fw.fixed_buckets.insert((b, b));
            let added = obtain_jump_bucket_arcs(fw);
            assert_eq!(added, 1);
            let jump = &fw.jump_arcs[b][0];
            assert_eq!(fw.buckets[jump.to_bucket].node_id, fw.buckets[b].node_id);
            assert_eq!(
                fw.buckets[jump.to_bucket].coords[0],
                fw.buckets[b].coords[0] + 1
            );
            // idempotent
            assert_eq!(obtain_jump_bucket_arcs(fw), 0);
        });
    }
}

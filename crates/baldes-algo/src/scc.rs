//! SCC layering of the bucket graph.
//!
//! Labeling must not read a bucket's cost bound `c̄` before every label
//! that can still reach the bucket has been created. Condensing the
//! bucket graph into strongly connected components (Tarjan) and
//! processing the components in topological order gives exactly that
//! guarantee; within a component the labeling loop sweeps to a fixed
//! point instead.
//!
//! The graph condensed here contains the bucket arcs plus the Φ edges
//! (componentwise-predecessor buckets of the same node), so buckets of
//! one node are always layered in resource order even when no bucket arc
//! connects them directly.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::bucket::DirectionState;

/// Recompute Φ: for each bucket, the same-node buckets whose interval
/// coords are one step smaller in exactly one resource.
pub fn compute_phi(state: &mut DirectionState) {
    let num_buckets = state.num_buckets();
    let mut phi = vec![Vec::new(); num_buckets];
    for b in 0..num_buckets {
        let bucket = &state.buckets[b];
        let dims = &state.grid.node_dims[bucket.node_id];
        let offset = state.grid.node_offset[bucket.node_id];
        for r in 0..bucket.coords.len() {
            if bucket.coords[r] == 0 {
                continue;
            }
            let mut coords = bucket.coords.clone();
            coords[r] -= 1;
            let mut index = 0usize;
            for (d, &k) in dims.iter().zip(coords.iter()) {
                index = index * d + k;
            }
            phi[b].push(offset + index);
        }
    }
    state.phi = phi;
}

/// Recompute the SCC layering from the current bucket arcs and Φ.
pub fn layer_sccs(state: &mut DirectionState) {
    let num_buckets = state.num_buckets();
    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(num_buckets, num_buckets * 4);
    let indices: Vec<NodeIndex> = (0..num_buckets).map(|b| graph.add_node(b)).collect();

    for arcs in &state.bucket_arcs {
        for arc in arcs {
            graph.add_edge(indices[arc.from_bucket], indices[arc.to_bucket], ());
        }
    }
    for (b, preds) in state.phi.iter().enumerate() {
        for &p in preds {
            graph.add_edge(indices[p], indices[b], ());
        }
    }

    // Tarjan emits components in reverse topological order
    let mut sccs: Vec<Vec<usize>> = tarjan_scc(&graph)
        .into_iter()
        .map(|component| {
            let mut ids: Vec<usize> = component.into_iter().map(|nx| graph[nx]).collect();
            ids.sort_unstable();
            ids
        })
        .collect();
    sccs.reverse();
    state.sccs = sccs;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arcs::generate_bucket_arcs;
    use crate::direction::Direction;
    use crate::test_support::small_instance;

    fn layered_state(direction: Direction) -> DirectionState {
        let instance = small_instance();
        let mut state = DirectionState::define(direction, &instance, &[25.0, 5.0], 1 << 16);
        let fixed = vec![vec![false; instance.num_nodes()]; instance.num_nodes()];
        generate_bucket_arcs(&mut state, &instance, &fixed).unwrap();
        compute_phi(&mut state);
        layer_sccs(&mut state);
        state
    }

    #[test]
    fn test_sccs_partition_buckets() {
        let state = layered_state(Direction::Forward);
        let mut seen = vec![false; state.num_buckets()];
        for scc in &state.sccs {
            for &b in scc {
                assert!(!seen[b], "bucket {b} in two components");
                seen[b] = true;
            }
        }
        assert!(seen.into_iter().all(|s| s));
    }

    #[test]
    fn test_topological_order_respects_arcs() {
        let state = layered_state(Direction::Forward);
        let mut position = vec![0usize; state.num_buckets()];
        for (p, scc) in state.sccs.iter().enumerate() {
            for &b in scc {
                position[b] = p;
            }
        }
        for arcs in &state.bucket_arcs {
            for arc in arcs {
                assert!(
                    position[arc.from_bucket] <= position[arc.to_bucket],
                    "arc {} -> {} goes backward in SCC order",
                    arc.from_bucket,
                    arc.to_bucket
                );
            }
        }
    }

    #[test]
    fn test_phi_points_to_smaller_coords() {
        let state = layered_state(Direction::Backward);
        for (b, preds) in state.phi.iter().enumerate() {
            for &p in preds {
                assert_eq!(state.buckets[p].node_id, state.buckets[b].node_id);
                let smaller = state.buckets[p]
                    .coords
                    .iter()
                    .zip(state.buckets[b].coords.iter())
                    .all(|(&cp, &cb)| cp <= cb);
                assert!(smaller);
                let total_p: usize = state.buckets[p].coords.iter().sum();
                let total_b: usize = state.buckets[b].coords.iter().sum();
                assert_eq!(total_p + 1, total_b);
            }
        }
    }
}

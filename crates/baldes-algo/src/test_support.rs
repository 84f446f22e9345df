//! Shared fixtures for in-crate tests.

use std::sync::atomic::AtomicBool;

use baldes_core::{Node, RoutingInstance};

use crate::arcs::generate_bucket_arcs;
use crate::bucket::DirectionState;
use crate::cuts::CutStorage;
use crate::direction::Direction;
use crate::ng::NgMemory;
use crate::options::BucketOptions;
use crate::scc::{compute_phi, layer_sccs};

/// Everything a `SearchContext` borrows, owned in one bundle so tests
/// can build contexts without a full engine.
pub(crate) struct ContextParts {
    pub options: BucketOptions,
    pub ng: NgMemory,
    pub cuts: CutStorage,
    pub fixed: Vec<Vec<bool>>,
    pub abort: AtomicBool,
}

/// Four unit-demand customers on a line at x = 1..4, both depots at the
/// origin, wide windows, capacity 10, service duration 10. Adjacency is
/// built.
pub(crate) fn small_instance() -> RoutingInstance {
    let n = 6;
    let mut nodes = Vec::with_capacity(n);
    for id in 0..n {
        let is_depot = id == 0 || id == n - 1;
        let x = if id == n - 1 { 0.0 } else { id as f64 };
        let demand = if is_depot { 0.0 } else { 1.0 };
        let duration = if is_depot { 0.0 } else { 10.0 };
        nodes.push(
            Node::new(
                id,
                vec![0.0, 0.0],
                vec![1000.0, 10.0],
                vec![0.0, demand],
                duration,
            )
            .at(x, 0.0),
        );
    }
    let matrix: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| nodes[i].distance_to(&nodes[j])).collect())
        .collect();
    let mut instance = RoutingInstance::new(nodes, matrix, 1000.0, 10.0).unwrap();
    instance.build_adjacency();
    instance
}

/// Context parts for `small_instance`-scale tests: full ng-memories, no
/// cuts, nothing fixed, chain cap wide enough for every route.
pub(crate) fn search_context_parts(instance: &RoutingInstance) -> ContextParts {
    let mut options = BucketOptions::default().resolved_for(instance.num_nodes());
    options.max_path_size = instance.num_nodes();
    ContextParts {
        options,
        ng: NgMemory::from_neighbors(&instance.nearest_neighbors(8)),
        cuts: CutStorage::default(),
        fixed: vec![vec![false; instance.num_nodes()]; instance.num_nodes()],
        abort: AtomicBool::new(false),
    }
}

/// Build both direction states with arcs, Φ and SCC layering and hand
/// them to the test body.
pub(crate) fn with_layered_states(
    instance: &RoutingInstance,
    fixed: &[Vec<bool>],
    body: impl FnOnce(&mut DirectionState, &mut DirectionState),
) {
    let widths = [25.0, 5.0];
    let mut fw = DirectionState::define(Direction::Forward, instance, &widths, 1 << 20);
    let mut bw = DirectionState::define(Direction::Backward, instance, &widths, 1 << 20);
    generate_bucket_arcs(&mut fw, instance, fixed).unwrap();
    generate_bucket_arcs(&mut bw, instance, fixed).unwrap();
    compute_phi(&mut fw);
    compute_phi(&mut bw);
    layer_sccs(&mut fw);
    layer_sccs(&mut bw);
    body(&mut fw, &mut bw);
}

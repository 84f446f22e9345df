//! Fixing-engine behavior through the public API.

use baldes_algo::{BucketGraph, BucketOptions, Status};
use baldes_core::{Node, RoutingInstance};

fn micro_instance() -> RoutingInstance {
    let n = 6;
    let mut nodes = Vec::with_capacity(n);
    for id in 0..n {
        let is_depot = id == 0 || id == n - 1;
        let x = if id == n - 1 { 0.0 } else { id as f64 };
        let (lb0, ub0) = match id {
            1 => (0.0, 40.0),
            2 => (50.0, 90.0),
            3 => (100.0, 140.0),
            4 => (150.0, 1000.0),
            _ => (0.0, 1000.0),
        };
        let demand = if is_depot { 0.0 } else { 1.0 };
        let duration = if is_depot { 0.0 } else { 10.0 };
        nodes.push(
            Node::new(
                id,
                vec![lb0, 0.0],
                vec![ub0, 10.0],
                vec![0.0, demand],
                duration,
            )
            .at(x, 0.0),
        );
    }
    let matrix: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| nodes[i].distance_to(&nodes[j])).collect())
        .collect();
    RoutingInstance::new(nodes, matrix, 1000.0, 10.0).unwrap()
}

fn micro_engine() -> BucketGraph {
    let options = BucketOptions {
        max_path_size: 6,
        ..BucketOptions::default()
    };
    let mut graph =
        BucketGraph::with_intervals_and_options(micro_instance(), vec![25.0, 5.0], options);
    graph.setup().unwrap();
    graph
}

const Q_STAR: [f64; 2] = [500.0, 5.0];

#[test]
fn test_no_bounds_means_no_fixing() {
    let mut graph = micro_engine();
    graph.set_duals(&[5.0, 5.0, 5.0, 5.0]).unwrap();
    // incumbent and relaxation unset: the gap is infinite
    let paths = graph.phase_three(&Q_STAR).unwrap();
    assert_eq!(graph.fixed_arc_count(), 0);
    assert!(!graph.gap().is_finite());
    assert_eq!(paths[0].vertices, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn test_tight_gap_fixes_arcs_but_keeps_the_optimum() {
    let mut graph = micro_engine();
    graph.set_duals(&[5.0, 5.0, 5.0, 5.0]).unwrap();
    graph.set_incumbent(90.2);
    graph.set_relaxation(90.0);
    let paths = graph.phase_three(&Q_STAR).unwrap();
    assert!((graph.gap() - 0.2).abs() < 1e-9);
    // poor arcs are forbidden, the best column survives them
    assert!(graph.fixed_arc_count() > 0);
    assert_eq!(paths[0].vertices, vec![0, 1, 2, 3, 4, 5]);
    assert!((paths[0].reduced_cost - (-12.0)).abs() < 1e-6);
}

#[test]
fn test_phase_four_elimination_keeps_the_optimum() {
    let mut graph = micro_engine();
    graph.set_duals(&[5.0, 5.0, 5.0, 5.0]).unwrap();
    graph.set_incumbent(90.2);
    graph.set_relaxation(90.0);
    let paths = graph.phase_four(&Q_STAR).unwrap();
    assert_eq!(paths[0].vertices, vec![0, 1, 2, 3, 4, 5]);
    assert!((paths[0].reduced_cost - (-12.0)).abs() < 1e-6);
    assert_eq!(graph.status(), Status::NotOptimal);
}

#[test]
fn test_reset_fixed_restores_the_graph() {
    let mut graph = micro_engine();
    graph.set_duals(&[5.0, 5.0, 5.0, 5.0]).unwrap();
    graph.set_incumbent(90.2);
    graph.set_relaxation(90.0);
    graph.phase_four(&Q_STAR).unwrap();
    graph.reset_fixed().unwrap();
    assert_eq!(graph.fixed_arc_count(), 0);
    assert_eq!(graph.eliminated_bucket_arcs(), (0, 0));
    // pricing works as if fixing never happened
    let paths = graph.phase_two(&Q_STAR).unwrap();
    assert_eq!(paths[0].vertices, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn test_fixing_is_latched_until_reset() {
    let mut graph = micro_engine();
    graph.set_duals(&[5.0, 5.0, 5.0, 5.0]).unwrap();
    graph.set_incumbent(90.2);
    graph.set_relaxation(90.0);
    graph.phase_four(&Q_STAR).unwrap();
    let first = graph.eliminated_bucket_arcs();
    // a second exact phase must not eliminate again from shrunken bounds
    graph.phase_four(&Q_STAR).unwrap();
    assert_eq!(graph.eliminated_bucket_arcs(), first);
}

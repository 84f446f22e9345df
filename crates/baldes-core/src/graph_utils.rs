use crate::instance::RoutingInstance;
use anyhow::{anyhow, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;

/// Summary statistics over the job-arc digraph.
#[derive(Debug)]
pub struct AdjacencyStats {
    pub node_count: usize,
    pub arc_count: usize,
    pub min_out_degree: usize,
    pub avg_out_degree: f64,
    pub max_out_degree: usize,
}

/// Computes degree statistics over the adjacency built by
/// [`RoutingInstance::build_adjacency`].
pub fn adjacency_stats(instance: &RoutingInstance) -> AdjacencyStats {
    let node_count = instance.num_nodes();
    let degrees: Vec<usize> = instance.nodes.iter().map(|n| n.arcs_out.len()).collect();
    let arc_count: usize = degrees.iter().sum();
    let min_out_degree = *degrees.iter().min().unwrap_or(&0);
    let max_out_degree = *degrees.iter().max().unwrap_or(&0);
    let avg_out_degree = if node_count == 0 {
        0.0
    } else {
        arc_count as f64 / node_count as f64
    };
    AdjacencyStats {
        node_count,
        arc_count,
        min_out_degree,
        avg_out_degree,
        max_out_degree,
    }
}

/// Verifies every customer lies on some depot-to-depot walk: reachable
/// from the start depot and able to reach the end depot. Customers that
/// fail this can never appear in a column, which almost always means the
/// instance data is wrong.
pub fn check_depot_connectivity(instance: &RoutingInstance) -> Result<()> {
    let n = instance.num_nodes();
    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(n, n * n / 2);
    let indices: Vec<NodeIndex> = (0..n).map(|id| graph.add_node(id)).collect();
    for node in &instance.nodes {
        for arc in &node.arcs_out {
            graph.add_edge(indices[arc.from], indices[arc.to], ());
        }
    }

    let mut from_start = vec![false; n];
    let mut bfs = Bfs::new(&graph, indices[0]);
    while let Some(nx) = bfs.next(&graph) {
        from_start[graph[nx]] = true;
    }

    // reach-the-end is reachability from the end depot over reversed arcs
    graph.reverse();
    let mut to_end = vec![false; n];
    let mut bfs = Bfs::new(&graph, indices[instance.end_depot()]);
    while let Some(nx) = bfs.next(&graph) {
        to_end[graph[nx]] = true;
    }

    let stranded: Vec<usize> = (1..n - 1)
        .filter(|&id| !from_start[id] || !to_end[id])
        .collect();
    if stranded.is_empty() {
        Ok(())
    } else {
        Err(anyhow!(
            "{} customer(s) lie on no depot-to-depot walk: {:?}",
            stranded.len(),
            stranded
        ))
    }
}

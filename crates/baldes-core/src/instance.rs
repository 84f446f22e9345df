//! Routing instance: node set, travel costs and global resource bounds.
//!
//! A [`RoutingInstance`] owns everything that stays immutable during a
//! pricing call: the node list, the distance matrix and the global
//! resource box. Adjacency construction lives here because which arcs
//! exist at all is a property of the data (windows and capacity), not of
//! the labeling engine that later traverses them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::node::{JobArc, Node};

/// Error type for instance construction and mutation.
#[derive(Debug, Error)]
pub enum InstanceError {
    /// The node list is too small to route anything
    #[error("Instance has {0} nodes, need at least 3 (two depots and a customer)")]
    TooFewNodes(usize),

    /// Distance matrix shape does not match the node count
    #[error("Distance matrix is {0}x{1}, expected {2}x{2}")]
    DistanceShape(usize, usize, usize),

    /// A node's resource dimension disagrees with the instance
    #[error("Node {0} has {1} resources, instance has {2}")]
    ResourceMismatch(usize, usize, usize),

    /// Dual vector length does not match the customer count
    #[error("Dual vector has {0} entries, expected {1} (one per customer)")]
    DualLength(usize, usize),
}

/// An immutable VRPTW-style routing instance.
///
/// Node 0 is the start depot, node `N−1` the end depot. The distance
/// matrix doubles as the travel-time matrix, the convention of the
/// Solomon benchmarks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingInstance {
    /// All nodes, indexed by id
    pub nodes: Vec<Node>,
    /// Travel cost/time between every ordered node pair
    pub distance_matrix: Vec<Vec<f64>>,
    /// Global horizon for resource 0 (time)
    pub time_horizon: f64,
    /// Vehicle capacity for resource 1; 0.0 when the instance is time-only
    pub capacity: f64,
    /// Number of resources every node is dimensioned for
    pub num_resources: usize,
}

impl RoutingInstance {
    /// Build an instance, validating shapes.
    pub fn new(
        nodes: Vec<Node>,
        distance_matrix: Vec<Vec<f64>>,
        time_horizon: f64,
        capacity: f64,
    ) -> Result<Self, InstanceError> {
        let n = nodes.len();
        if n < 3 {
            return Err(InstanceError::TooFewNodes(n));
        }
        if distance_matrix.len() != n || distance_matrix.iter().any(|row| row.len() != n) {
            let rows = distance_matrix.len();
            let cols = distance_matrix.first().map_or(0, |r| r.len());
            return Err(InstanceError::DistanceShape(rows, cols, n));
        }
        let num_resources = nodes[0].num_resources();
        for node in &nodes {
            if node.num_resources() != num_resources {
                return Err(InstanceError::ResourceMismatch(
                    node.id,
                    node.num_resources(),
                    num_resources,
                ));
            }
        }
        Ok(Self {
            nodes,
            distance_matrix,
            time_horizon,
            capacity,
            num_resources,
        })
    }

    /// Number of nodes including both depots.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of customers (nodes that are neither depot).
    #[inline]
    pub fn num_customers(&self) -> usize {
        self.nodes.len() - 2
    }

    /// Id of the end depot.
    #[inline]
    pub fn end_depot(&self) -> usize {
        self.nodes.len() - 1
    }

    /// Travel cost between nodes `i` and `j`.
    #[inline]
    pub fn cost(&self, i: usize, j: usize) -> f64 {
        self.distance_matrix[i][j]
    }

    /// Install per-customer duals. `duals[i]` is the dual of the covering
    /// constraint for customer `i + 1`; both depots keep dual 0.
    ///
    /// Values are stored exactly as supplied, in the master's natural
    /// sign: covering-row duals are non-negative in a minimization
    /// master, and each visit to a customer lowers a route's reduced
    /// cost by that customer's dual. A negative value is accepted but
    /// makes the customer repel every route.
    pub fn set_duals(&mut self, duals: &[f64]) -> Result<(), InstanceError> {
        if duals.len() != self.num_customers() {
            return Err(InstanceError::DualLength(duals.len(), self.num_customers()));
        }
        for (i, &dual) in duals.iter().enumerate() {
            self.nodes[i + 1].dual = dual;
        }
        Ok(())
    }

    /// Build the adjacency lists from the distance matrix.
    ///
    /// An arc `(u → v)` is created unless it can never appear on a
    /// feasible route: leaving the end depot, entering the start depot,
    /// the direct depot-to-depot hop, a window-infeasible pair
    /// (`u.lb[0] + duration(u) + travel(u,v) > v.ub[0]`) or a
    /// capacity-infeasible pair. The arc carries
    /// `ρ[0] = duration(u) + travel(u,v)` and `ρ[r] = demand_r(v)`.
    /// Arc lists end up sorted ascending by cost.
    pub fn build_adjacency(&mut self) {
        let n = self.num_nodes();
        let end = self.end_depot();
        for node in &mut self.nodes {
            node.arcs_out.clear();
            node.arcs_in.clear();
        }
        for u in 0..n {
            if u == end {
                continue;
            }
            for v in 0..n {
                if v == u || v == 0 {
                    continue;
                }
                if u == 0 && v == end {
                    continue;
                }
                let travel = self.distance_matrix[u][v];
                let from = &self.nodes[u];
                let to = &self.nodes[v];
                if from.lb[0] + from.duration + travel > to.ub[0] {
                    continue;
                }
                let mut capacity_ok = true;
                for r in 1..self.num_resources {
                    let bound = if r == 1 { self.capacity } else { to.ub[r] };
                    if from.demand[r] + to.demand[r] > bound {
                        capacity_ok = false;
                        break;
                    }
                }
                if !capacity_ok {
                    continue;
                }
                let mut resource_increment = vec![0.0; self.num_resources];
                resource_increment[0] = from.duration + travel;
                for r in 1..self.num_resources {
                    resource_increment[r] = to.demand[r];
                }
                let arc = JobArc {
                    from: u,
                    to: v,
                    resource_increment,
                    cost_increment: travel,
                    fixed: false,
                };
                self.nodes[u].arcs_out.push(arc.clone());
                self.nodes[v].arcs_in.push(arc);
            }
        }
        for node in &mut self.nodes {
            node.sort_arcs();
        }
    }

    /// For each node, the ids of its `n_ng` nearest customers (self
    /// excluded, depots excluded), ascending by distance.
    pub fn nearest_neighbors(&self, n_ng: usize) -> Vec<Vec<usize>> {
        let end = self.end_depot();
        self.nodes
            .iter()
            .map(|node| {
                let mut candidates: Vec<usize> = (1..end).filter(|&j| j != node.id).collect();
                candidates.sort_by(|&a, &b| {
                    self.distance_matrix[node.id][a].total_cmp(&self.distance_matrix[node.id][b])
                });
                candidates.truncate(n_ng);
                candidates
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_instance(n_customers: usize) -> RoutingInstance {
        // customers on a line at x = 1, 2, ..; depots at both ends
        let n = n_customers + 2;
        let mut nodes = Vec::with_capacity(n);
        for id in 0..n {
            let x = if id == n - 1 { 0.0 } else { id as f64 };
            let demand = if id == 0 || id == n - 1 { 0.0 } else { 1.0 };
            let duration = if id == 0 || id == n - 1 { 0.0 } else { 10.0 };
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
        RoutingInstance::new(nodes, matrix, 1000.0, 10.0).unwrap()
    }

    #[test]
    fn test_adjacency_excludes_depot_arcs() {
        let mut inst = line_instance(3);
        inst.build_adjacency();
        let end = inst.end_depot();
        assert!(inst.nodes[end].arcs_out.is_empty());
        assert!(inst.nodes[0].arcs_out.iter().all(|a| a.to != end && a.to != 0));
        assert!(inst.nodes[1].arcs_in.iter().all(|a| a.from != end));
    }

    #[test]
    fn test_adjacency_resource_increments() {
        let mut inst = line_instance(3);
        inst.build_adjacency();
        let arc = inst.nodes[1]
            .arcs_out
            .iter()
            .find(|a| a.to == 2)
            .expect("arc 1->2");
        // duration(1) + travel(1,2) = 10 + 1
        assert!((arc.resource_increment[0] - 11.0).abs() < 1e-9);
        // demand of the head
        assert!((arc.resource_increment[1] - 1.0).abs() < 1e-9);
        assert!((arc.cost_increment - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_infeasible_arc_skipped() {
        let mut inst = line_instance(3);
        // customer 3 closes before anyone can reach it from customer 1
        inst.nodes[3].ub[0] = 5.0;
        inst.build_adjacency();
        assert!(inst.nodes[1].arcs_out.iter().all(|a| a.to != 3));
    }

    #[test]
    fn test_set_duals() {
        let mut inst = line_instance(3);
        inst.set_duals(&[5.0, 6.0, 7.0]).unwrap();
        assert_eq!(inst.nodes[1].dual, 5.0);
        assert_eq!(inst.nodes[3].dual, 7.0);
        assert_eq!(inst.nodes[0].dual, 0.0);
        assert!(inst.set_duals(&[1.0]).is_err());
    }

    #[test]
    fn test_nearest_neighbors() {
        let inst = line_instance(4);
        let ng = inst.nearest_neighbors(2);
        // customer 2 sits between 1 and 3
        assert_eq!(ng[2], vec![1, 3]);
        // depots are never neighbors
        assert!(ng[1].iter().all(|&j| j != 0 && j != inst.end_depot()));
    }
}

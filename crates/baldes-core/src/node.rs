//! Vertex and arc model.
//!
//! A [`Node`] is a customer (or one of the two depots) with per-resource
//! demands and windows; a [`JobArc`] connects two nodes and carries the
//! additive resource increments consumed by traversing it. Resource 0 is
//! conventionally time, resource 1 capacity; further resources are
//! user-defined and monotone-increasing along any forward extension.

use serde::{Deserialize, Serialize};

/// A directed arc between two nodes.
///
/// `resource_increment[0]` is the source's service duration plus the
/// travel time to the target; `resource_increment[r]` for `r ≥ 1` is the
/// target's demand on resource `r`. The cost increment is the raw travel
/// cost, without any dual adjustment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobArc {
    /// Source node id
    pub from: usize,
    /// Target node id
    pub to: usize,
    /// Additive resource consumption along the arc
    pub resource_increment: Vec<f64>,
    /// Travel cost (no duals)
    pub cost_increment: f64,
    /// Forbidden by the caller (branching decisions etc.)
    pub fixed: bool,
}

/// A vertex of the routing graph.
///
/// Node 0 is the start depot and node `N−1` the end depot; both carry
/// zero demand and zero dual. The `dual` field is rewritten once per
/// pricing iteration and is the only mutable part of the model during
/// column generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Node identity; doubles as the index into the instance node list
    pub id: usize,
    /// X coordinate (0.0 when the instance has no geometry)
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Per-resource demand vector; `demand[0]` is unused (time has no demand)
    pub demand: Vec<f64>,
    /// Per-resource window lower bounds
    pub lb: Vec<f64>,
    /// Per-resource window upper bounds
    pub ub: Vec<f64>,
    /// Service duration at this node
    pub duration: f64,
    /// Dual value of the covering constraint, set each pricing
    /// iteration. Stored in the master's natural sign (non-negative for
    /// covering rows) and subtracted from the reduced cost on arrival.
    pub dual: f64,
    /// Outgoing arcs, sorted ascending by cost increment
    pub arcs_out: Vec<JobArc>,
    /// Incoming arcs (used by backward extension), sorted ascending by cost
    pub arcs_in: Vec<JobArc>,
}

impl Node {
    /// Create a node with the given windows and demands and no arcs.
    pub fn new(id: usize, lb: Vec<f64>, ub: Vec<f64>, demand: Vec<f64>, duration: f64) -> Self {
        debug_assert_eq!(lb.len(), ub.len());
        debug_assert_eq!(lb.len(), demand.len());
        Self {
            id,
            x: 0.0,
            y: 0.0,
            demand,
            lb,
            ub,
            duration,
            dual: 0.0,
            arcs_out: Vec::new(),
            arcs_in: Vec::new(),
        }
    }

    /// Place the node at coordinates `(x, y)`.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    /// Number of resources this node is dimensioned for.
    #[inline]
    pub fn num_resources(&self) -> usize {
        self.lb.len()
    }

    /// Euclidean distance to another node.
    pub fn distance_to(&self, other: &Node) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Sort both arc lists ascending by cost increment.
    ///
    /// Extension visits cheap arcs first so promising labels are created
    /// early and dominate later candidates sooner.
    pub fn sort_arcs(&mut self) {
        self.arcs_out
            .sort_by(|a, b| a.cost_increment.total_cmp(&b.cost_increment));
        self.arcs_in
            .sort_by(|a, b| a.cost_increment.total_cmp(&b.cost_increment));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arc(from: usize, to: usize, cost: f64) -> JobArc {
        JobArc {
            from,
            to,
            resource_increment: vec![cost, 1.0],
            cost_increment: cost,
            fixed: false,
        }
    }

    #[test]
    fn test_sort_arcs() {
        let mut node = Node::new(0, vec![0.0, 0.0], vec![100.0, 10.0], vec![0.0, 0.0], 0.0);
        node.arcs_out.push(arc(0, 1, 5.0));
        node.arcs_out.push(arc(0, 2, 1.0));
        node.arcs_out.push(arc(0, 3, 3.0));
        node.sort_arcs();
        let costs: Vec<f64> = node.arcs_out.iter().map(|a| a.cost_increment).collect();
        assert_eq!(costs, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn test_distance() {
        let a = Node::new(0, vec![0.0], vec![1.0], vec![0.0], 0.0).at(0.0, 0.0);
        let b = Node::new(1, vec![0.0], vec![1.0], vec![0.0], 0.0).at(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }
}

//! Directional resource semantics.
//!
//! Forward and backward labeling share all structure and differ only in
//! how resources combine, clamp and compare. The two-variant tag below
//! supplies those three operations; every use site matches on it behind
//! `#[inline]`, so the hot path pays a predictable branch rather than a
//! virtual call.

use baldes_core::Node;
use serde::{Deserialize, Serialize};

/// Labeling direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// From the start depot, resources non-decreasing
    Forward,
    /// From the end depot, resources non-increasing
    Backward,
}

impl Direction {
    /// Combine a resource value with an arc increment.
    #[inline]
    pub fn combine(self, r: f64, inc: f64) -> f64 {
        match self {
            Direction::Forward => r + inc,
            Direction::Backward => r - inc,
        }
    }

    /// Clamp a combined value into the target node's window from the
    /// permissive side (waiting is free), returning `None` when the hard
    /// side is violated.
    #[inline]
    pub fn clamp(self, r: f64, node: &Node, resource: usize) -> Option<f64> {
        match self {
            Direction::Forward => {
                let clamped = r.max(node.lb[resource]);
                (clamped <= node.ub[resource]).then_some(clamped)
            }
            Direction::Backward => {
                let clamped = r.min(node.ub[resource]);
                (clamped >= node.lb[resource]).then_some(clamped)
            }
        }
    }

    /// Componentwise resource dominance: in the forward direction a
    /// dominator must be no later/heavier, backward no earlier/lighter.
    #[inline]
    pub fn resources_dominate(self, a: &[f64], b: &[f64], tol: f64) -> bool {
        match self {
            Direction::Forward => a.iter().zip(b.iter()).all(|(&ra, &rb)| ra <= rb + tol),
            Direction::Backward => a.iter().zip(b.iter()).all(|(&ra, &rb)| ra >= rb - tol),
        }
    }

    /// Whether a label with resource-0 value `t` may still be extended
    /// under the bidirectional split point `q_star`.
    #[inline]
    pub fn within_split(self, t: f64, q_star: f64) -> bool {
        match self {
            Direction::Forward => t <= q_star,
            Direction::Backward => t >= q_star,
        }
    }

    /// Seed resources for this direction's depot label.
    pub fn seed_resources(self, node: &Node) -> Vec<f64> {
        match self {
            Direction::Forward => node.lb.clone(),
            Direction::Backward => node.ub.clone(),
        }
    }

    /// The opposite direction.
    #[inline]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }
}

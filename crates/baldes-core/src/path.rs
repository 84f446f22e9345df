//! Columns returned by the pricing engine.
//!
//! A [`Path`] is an ordered vertex sequence from the start depot to the
//! end depot together with its reduced cost (dual-adjusted) and its real
//! cost (raw travel cost). Paths are what the master problem receives.

use serde::{Deserialize, Serialize};

/// A depot-to-depot route with its costs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Visited vertex ids, start depot first, end depot last
    pub vertices: Vec<usize>,
    /// Reduced cost under the duals of the producing pricing iteration
    pub reduced_cost: f64,
    /// Raw travel cost, no dual adjustment
    pub real_cost: f64,
}

impl Path {
    /// Create a path.
    pub fn new(vertices: Vec<usize>, reduced_cost: f64, real_cost: f64) -> Self {
        Self {
            vertices,
            reduced_cost,
            real_cost,
        }
    }

    /// Number of arcs on the path.
    #[inline]
    pub fn num_arcs(&self) -> usize {
        self.vertices.len().saturating_sub(1)
    }

    /// Whether no vertex appears twice.
    pub fn is_elementary(&self) -> bool {
        let mut seen = std::collections::HashSet::with_capacity(self.vertices.len());
        self.vertices.iter().all(|v| seen.insert(*v))
    }

    /// Whether the path visits vertex `v`.
    #[inline]
    pub fn visits(&self, v: usize) -> bool {
        self.vertices.contains(&v)
    }

    /// Iterate the arcs `(u, v)` of the path.
    pub fn arcs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.vertices.windows(2).map(|w| (w[0], w[1]))
    }

    /// Find the first cycle `v … v` in the vertex sequence, returning the
    /// sub-slice bounds `(i, j)` with `vertices[i] == vertices[j]`.
    pub fn first_cycle(&self) -> Option<(usize, usize)> {
        let mut last_seen = std::collections::HashMap::new();
        for (idx, &v) in self.vertices.iter().enumerate() {
            if let Some(&prev) = last_seen.get(&v) {
                return Some((prev, idx));
            }
            last_seen.insert(v, idx);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elementary() {
        let p = Path::new(vec![0, 1, 2, 5], -3.0, 10.0);
        assert!(p.is_elementary());
        assert_eq!(p.num_arcs(), 3);
        let q = Path::new(vec![0, 1, 2, 1, 5], -3.0, 10.0);
        assert!(!q.is_elementary());
    }

    #[test]
    fn test_first_cycle() {
        let p = Path::new(vec![0, 1, 2, 5], -3.0, 10.0);
        assert_eq!(p.first_cycle(), None);
        let q = Path::new(vec![0, 3, 1, 2, 1, 5], -3.0, 10.0);
        assert_eq!(q.first_cycle(), Some((2, 4)));
    }

    #[test]
    fn test_arcs() {
        let p = Path::new(vec![0, 2, 5], -1.0, 4.0);
        let arcs: Vec<(usize, usize)> = p.arcs().collect();
        assert_eq!(arcs, vec![(0, 2), (2, 5)]);
    }
}

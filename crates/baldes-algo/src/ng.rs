//! ng-memories.
//!
//! Elementarity is enforced only with respect to a per-vertex
//! neighborhood: a label forgets it visited `w` as soon as it reaches a
//! vertex whose ng-memory does not contain `w`. Memories start as the
//! `n_ng` nearest neighbors of each vertex and grow when the master
//! solution exhibits cycles, which progressively tightens the relaxation
//! exactly where it leaks.

use baldes_core::{bitmap, Path};
use tracing::debug;

/// Per-vertex ng-memories as packed bitmaps.
#[derive(Debug, Clone)]
pub struct NgMemory {
    /// Tight masks: self plus the remembered neighborhood
    masks: Vec<Vec<u64>>,
    /// Relaxed masks: self only (Stage 1 forgets everything else)
    self_masks: Vec<Vec<u64>>,
    num_nodes: usize,
}

impl NgMemory {
    /// Build memories from nearest-neighbor lists (`self` is always a
    /// member of its own memory).
    pub fn from_neighbors(neighbors: &[Vec<usize>]) -> Self {
        let num_nodes = neighbors.len();
        let mut masks = Vec::with_capacity(num_nodes);
        let mut self_masks = Vec::with_capacity(num_nodes);
        for (v, adjacent) in neighbors.iter().enumerate() {
            let mut mask = bitmap::zeroed(num_nodes);
            bitmap::set(&mut mask, v);
            let mut self_mask = bitmap::zeroed(num_nodes);
            bitmap::set(&mut self_mask, v);
            for &w in adjacent {
                bitmap::set(&mut mask, w);
            }
            masks.push(mask);
            self_masks.push(self_mask);
        }
        Self {
            masks,
            self_masks,
            num_nodes,
        }
    }

    /// The memory mask of vertex `v`. Relaxed memories keep only the
    /// vertex itself.
    #[inline]
    pub fn mask(&self, v: usize, tight: bool) -> &[u64] {
        if tight {
            &self.masks[v]
        } else {
            &self.self_masks[v]
        }
    }

    /// Whether `w` is in the memory of `v`.
    #[inline]
    pub fn remembers(&self, v: usize, w: usize) -> bool {
        bitmap::is_set(&self.masks[v], w)
    }

    /// Current memory size of `v` (including itself).
    #[inline]
    pub fn size(&self, v: usize) -> usize {
        bitmap::count(&self.masks[v]) as usize
    }

    /// Insert `w` into the memory of `v`; returns whether it was new.
    pub fn add(&mut self, v: usize, w: usize) -> bool {
        if bitmap::is_set(&self.masks[v], w) {
            return false;
        }
        bitmap::set(&mut self.masks[v], w);
        true
    }

    /// Make a cycle `v → w₁ → … → w_k → v` infeasible by inserting its
    /// head into the memory of every interior vertex (the head must stay
    /// remembered along the whole cycle for the elementarity test to
    /// fire on re-entry). Aggressive mode additionally cross-registers
    /// the interior vertices, which also blocks sub-cycles.
    ///
    /// Memories at `eta_max` are left alone. Returns insertions made.
    pub fn forbid_cycle(&mut self, cycle: &[usize], aggressive: bool, eta_max: usize) -> usize {
        if cycle.len() < 3 {
            return 0;
        }
        let head = cycle[0];
        let interior = &cycle[1..cycle.len() - 1];
        let mut added = 0;
        for &w in interior {
            if self.size(w) < eta_max && self.add(w, head) {
                added += 1;
            }
        }
        if aggressive {
            for (i, &wi) in interior.iter().enumerate() {
                for &wj in &interior[i + 1..] {
                    if self.size(wj) < eta_max && self.add(wj, wi) {
                        added += 1;
                    }
                }
            }
        }
        added
    }

    /// Grow memories from a fractional master solution.
    ///
    /// For each of the first `n` paths whose primal value is fractional,
    /// the first cycle is located and forbidden, provided its interior is
    /// short enough: at most `eta1` vertices, or `eta2` when
    /// `aggressive`. `eta_max` caps every memory's size. Returns whether
    /// any memory changed.
    pub fn augment(
        &mut self,
        solution: &[f64],
        paths: &[Path],
        aggressive: bool,
        eta1: usize,
        eta2: usize,
        eta_max: usize,
        n: usize,
    ) -> bool {
        const FRAC_TOL: f64 = 1e-6;
        let limit = if aggressive { eta2 } else { eta1 };
        let mut added = 0;
        for (path, &value) in paths.iter().zip(solution.iter()).take(n) {
            if value <= FRAC_TOL || value >= 1.0 - FRAC_TOL {
                continue;
            }
            let Some((i, j)) = path.first_cycle() else {
                continue;
            };
            let cycle = &path.vertices[i..=j];
            if cycle.len() - 2 > limit {
                continue;
            }
            added += self.forbid_cycle(cycle, aggressive, eta_max);
        }
        if added > 0 {
            debug!(added, "ng-memories augmented");
        }
        added > 0
    }

    /// Number of vertices covered.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }
}

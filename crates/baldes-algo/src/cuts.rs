//! Limited-Memory Rank-1 (SRC) cut state.
//!
//! The engine treats a cut as opaque: a base set of vertices that feed a
//! counter modulo the cut's denominator, a memory set outside of which
//! the counter forgets itself, and a dual value subtracted from the
//! reduced cost each time the counter wraps. Separation happens outside
//! the engine; only coefficients and carries are consumed here.

use baldes_core::bitmap;

use crate::label::SrcState;

/// One active Limited-Memory Rank-1 cut.
#[derive(Debug, Clone)]
pub struct SrcCut {
    /// Vertices whose visit increments the counter (packed bitmap)
    pub base: Vec<u64>,
    /// Vertices across which the counter is remembered; leaving the
    /// memory resets the counter to zero
    pub memory: Vec<u64>,
    /// Counter increment per base-set visit
    pub numerator: u8,
    /// Counter modulus `p`
    pub denominator: u8,
    /// Dual value, non-positive for separated SRC cuts
    pub dual: f64,
}

impl SrcCut {
    /// A classic 3-row cut: numerator 1, denominator 2, memory equal to
    /// the base set plus the given memory vertices.
    pub fn three_row(n: usize, base_vertices: &[usize], memory_vertices: &[usize], dual: f64) -> Self {
        let mut base = bitmap::zeroed(n);
        for &v in base_vertices {
            bitmap::set(&mut base, v);
        }
        let mut memory = base.clone();
        for &v in memory_vertices {
            bitmap::set(&mut memory, v);
        }
        Self {
            base,
            memory,
            numerator: 1,
            denominator: 2,
            dual,
        }
    }
}

/// The set of active cuts plus a generation counter.
///
/// The generation bumps on every structural change (add/clear) and lets
/// the engine detect labels that were priced under a different cut set,
/// which is the trigger for `Status::Rollback`.
#[derive(Debug, Default)]
pub struct CutStorage {
    cuts: Vec<SrcCut>,
    generation: u64,
}

impl CutStorage {
    /// Number of active cuts.
    #[inline]
    pub fn len(&self) -> usize {
        self.cuts.len()
    }

    /// Whether no cuts are active.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cuts.is_empty()
    }

    /// Structural generation, bumped by every add/clear.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Borrow the active cuts.
    #[inline]
    pub fn cuts(&self) -> &[SrcCut] {
        &self.cuts
    }

    /// Add a cut.
    pub fn push(&mut self, cut: SrcCut) {
        self.cuts.push(cut);
        self.generation += 1;
    }

    /// Drop every cut (rollback).
    pub fn clear(&mut self) {
        if !self.cuts.is_empty() {
            self.cuts.clear();
            self.generation += 1;
        }
    }

    /// Re-price the duals in place between master iterations. The shape
    /// of the cut set is unchanged, so no generation bump.
    pub fn set_duals(&mut self, duals: &[f64]) -> Result<(), crate::error::SolverError> {
        if duals.len() != self.cuts.len() {
            return Err(crate::error::SolverError::CutDualLength(
                duals.len(),
                self.cuts.len(),
            ));
        }
        for (cut, &dual) in self.cuts.iter_mut().zip(duals.iter()) {
            cut.dual = dual;
        }
        Ok(())
    }

    /// Advance a predecessor's SRC state across an extension into
    /// vertex `v`. Returns the new state together with the summed dual
    /// carry to subtract from the reduced cost.
    pub fn extend_state(&self, pred: &SrcState, v: usize) -> (SrcState, f64) {
        let mut state = SrcState::zeroed(self.cuts.len());
        let mut carry = 0.0;
        for (k, cut) in self.cuts.iter().enumerate() {
            let mut counter = if pred.len() > k { pred.get(k) } else { 0 };
            if !bitmap::is_set(&cut.memory, v) {
                counter = 0;
            } else if bitmap::is_set(&cut.base, v) {
                counter += cut.numerator;
                if counter >= cut.denominator {
                    counter -= cut.denominator;
                    carry += cut.dual;
                }
            }
            state.set(k, counter);
        }
        (state, carry)
    }

    /// Dual carry incurred when a forward and a backward state meet: a
    /// cut whose counters sum past the denominator wraps once more.
    pub fn merge_carry(&self, fw: &SrcState, bw: &SrcState) -> f64 {
        let mut carry = 0.0;
        for (k, cut) in self.cuts.iter().enumerate() {
            let cf = if fw.len() > k { fw.get(k) } else { 0 };
            let cb = if bw.len() > k { bw.get(k) } else { 0 };
            if cf + cb >= cut.denominator {
                carry += cut.dual;
            }
        }
        carry
    }
}

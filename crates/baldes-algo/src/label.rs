//! Labels and the per-direction label pool.
//!
//! A [`Label`] summarizes a partial path: terminating vertex, resource
//! vector, reduced and real cost, packed visit bitmap, SRC counters and
//! a predecessor reference. Labels live in a [`LabelPool`] arena and
//! refer to each other by index, never by owning pointer; the pool is
//! released in bulk by [`LabelPool::reset`] at the start of each pricing
//! call, which just rewinds the high-water mark and keeps every slot's
//! heap allocations for reuse.

use crate::direction::Direction;
use crate::error::SolverError;

/// Index of a label inside its direction's pool.
pub type LabelId = u32;

/// Number of SRC counters stored inline before spilling to the heap.
pub const SRC_INLINE: usize = 16;

/// Per-cut counter state of a label.
///
/// One small integer modulo the cut's denominator per active cut. The
/// first [`SRC_INLINE`] counters live inline; instances with more active
/// cuts spill the remainder into a heap vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SrcState {
    inline: [u8; SRC_INLINE],
    spill: Vec<u8>,
    len: usize,
}

impl SrcState {
    /// All-zero state for `len` active cuts.
    pub fn zeroed(len: usize) -> Self {
        let spill = if len > SRC_INLINE {
            vec![0u8; len - SRC_INLINE]
        } else {
            Vec::new()
        };
        Self {
            inline: [0u8; SRC_INLINE],
            spill,
            len,
        }
    }

    /// Number of tracked counters.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no counters are tracked.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Counter of cut `k`.
    #[inline]
    pub fn get(&self, k: usize) -> u8 {
        debug_assert!(k < self.len);
        if k < SRC_INLINE {
            self.inline[k]
        } else {
            self.spill[k - SRC_INLINE]
        }
    }

    /// Overwrite counter of cut `k`.
    #[inline]
    pub fn set(&mut self, k: usize, value: u8) {
        debug_assert!(k < self.len);
        if k < SRC_INLINE {
            self.inline[k] = value;
        } else {
            self.spill[k - SRC_INLINE] = value;
        }
    }

    /// Iterate the counters in cut order.
    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..self.len).map(move |k| self.get(k))
    }
}

/// A partial-path summary, immutable once attached to a bucket except
/// for the `extended` flag.
#[derive(Debug, Clone)]
pub struct Label {
    /// Terminating vertex
    pub node_id: usize,
    /// Resource vector at the terminating vertex
    pub resources: Vec<f64>,
    /// Accumulated reduced cost c̃
    pub cost: f64,
    /// Accumulated real (travel) cost
    pub real_cost: f64,
    /// Predecessor label in the same pool
    pub pred: Option<LabelId>,
    /// Packed visit bitmap, already intersected with ng-memories
    pub visited: Vec<u64>,
    /// SRC counter state
    pub src_state: SrcState,
    /// Vertices on the chain including the depot seed
    pub path_len: u16,
    /// Set once the label has been expanded along all its arcs; an
    /// extended label may still serve as a dominator
    pub extended: bool,
    /// Direction of the pool this label belongs to
    pub direction: Direction,
}

impl Label {
    /// Walk the predecessor chain, returning vertex ids from the seed to
    /// this label.
    pub fn chain_vertices(&self, pool: &LabelPool) -> Vec<usize> {
        let mut vertices = Vec::with_capacity(self.path_len as usize);
        vertices.push(self.node_id);
        let mut current = self.pred;
        while let Some(id) = current {
            let label = pool.get(id);
            vertices.push(label.node_id);
            current = label.pred;
        }
        vertices.reverse();
        vertices
    }
}

/// Counters kept per direction, reported via `BucketGraph::statistics`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectionStats {
    /// Labels interned into the pool
    pub labels_created: u64,
    /// Pairwise dominance tests performed
    pub dominance_checks: u64,
}

/// Vec-backed label arena with O(1) bulk reset.
///
/// Slots beyond the high-water mark are overwritten on insertion rather
/// than reallocated, so the inner `Vec` allocations of recycled labels
/// survive across pricing calls.
#[derive(Debug)]
pub struct LabelPool {
    slots: Vec<Label>,
    in_use: usize,
    limit: usize,
}

impl LabelPool {
    /// Create a pool that refuses to grow beyond `limit` live labels.
    pub fn new(limit: usize) -> Self {
        Self {
            slots: Vec::new(),
            in_use: 0,
            limit,
        }
    }

    /// Number of live labels.
    #[inline]
    pub fn len(&self) -> usize {
        self.in_use
    }

    /// Whether no labels are live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.in_use == 0
    }

    /// Intern a label, returning its id.
    pub fn insert(&mut self, label: Label) -> Result<LabelId, SolverError> {
        if self.in_use >= self.limit {
            return Err(SolverError::PoolExhausted(self.in_use, self.limit));
        }
        let id = self.in_use as LabelId;
        if self.in_use < self.slots.len() {
            self.slots[self.in_use] = label;
        } else {
            self.slots.push(label);
        }
        self.in_use += 1;
        Ok(id)
    }

    /// Borrow a live label.
    #[inline]
    pub fn get(&self, id: LabelId) -> &Label {
        debug_assert!((id as usize) < self.in_use);
        &self.slots[id as usize]
    }

    /// Mutably borrow a live label (extended flag, SRC re-pricing).
    #[inline]
    pub fn get_mut(&mut self, id: LabelId) -> &mut Label {
        debug_assert!((id as usize) < self.in_use);
        &mut self.slots[id as usize]
    }

    /// Iterate the live labels.
    pub fn iter(&self) -> impl Iterator<Item = &Label> {
        self.slots[..self.in_use].iter()
    }

    /// Release every label; slot allocations are kept for reuse.
    pub fn reset(&mut self) {
        self.in_use = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(node_id: usize, pred: Option<LabelId>) -> Label {
        Label {
            node_id,
            resources: vec![0.0, 0.0],
            cost: 0.0,
            real_cost: 0.0,
            pred,
            visited: vec![0],
            src_state: SrcState::default(),
            path_len: 1,
            extended: false,
            direction: Direction::Forward,
        }
    }

    #[test]
    fn test_pool_insert_and_reset() {
        let mut pool = LabelPool::new(100);
        let a = pool.insert(label(0, None)).unwrap();
        let b = pool.insert(label(1, Some(a))).unwrap();
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(b).pred, Some(a));
        pool.reset();
        assert!(pool.is_empty());
        // slots are reused, ids restart from zero
        let c = pool.insert(label(2, None)).unwrap();
        assert_eq!(c, 0);
        assert_eq!(pool.get(c).node_id, 2);
    }

    #[test]
    fn test_pool_limit() {
        let mut pool = LabelPool::new(2);
        pool.insert(label(0, None)).unwrap();
        pool.insert(label(1, None)).unwrap();
        assert!(matches!(
            pool.insert(label(2, None)),
            Err(SolverError::PoolExhausted(2, 2))
        ));
    }

    #[test]
    fn test_chain_vertices() {
        let mut pool = LabelPool::new(10);
        let a = pool.insert(label(0, None)).unwrap();
        let b = pool.insert(label(3, Some(a))).unwrap();
        let c = pool.insert(label(5, Some(b))).unwrap();
        assert_eq!(pool.get(c).chain_vertices(&pool), vec![0, 3, 5]);
    }

    #[test]
    fn test_src_state_spill() {
        let mut state = SrcState::zeroed(SRC_INLINE + 4);
        state.set(2, 7);
        state.set(SRC_INLINE + 3, 9);
        assert_eq!(state.get(2), 7);
        assert_eq!(state.get(SRC_INLINE + 3), 9);
        assert_eq!(state.len(), SRC_INLINE + 4);
        assert_eq!(state.iter().filter(|&v| v != 0).count(), 2);
    }
}

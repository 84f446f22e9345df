//! Arena-backed scratch structures for the concatenation phase.
//!
//! One merge pass allocates two kinds of short-lived data: the dedup
//! table of routes already emitted (one vertex sequence per surviving
//! column candidate) and the per-node completion bounds. Both live in a
//! bumpalo arena owned by the engine and released wholesale by
//! [`ArenaContext::reset`] between pricing calls, so neither the hash
//! table growth nor the interned vertex sequences ever churn the global
//! allocator. Route keys are interned as bump-allocated slices rather
//! than owned `Vec`s, which keeps the dedup table allocation-free per
//! lookup.

use bumpalo::Bump;

/// Arena context for merge-phase scratch allocations.
///
/// Created once per engine, reset between pricing calls. The reset is
/// O(1) and runs no destructors; everything handed out here is plain
/// data.
pub struct ArenaContext {
    bump: Bump,
}

impl ArenaContext {
    /// Create new arena context.
    pub fn new() -> Self {
        Self { bump: Bump::new() }
    }

    /// Reset arena for reuse (O(1) operation). Invalidates every
    /// [`RouteSet`] and scratch buffer handed out since the last reset.
    pub fn reset(&mut self) {
        self.bump.reset();
    }

    /// A fresh dedup table for emitted routes.
    pub fn route_set(&self) -> RouteSet<'_> {
        RouteSet {
            routes: hashbrown::HashSet::new_in(&self.bump),
            bump: &self.bump,
        }
    }

    /// Per-node completion-bound scratch, one `+inf` slot per node.
    pub fn completion_bounds(&self, num_nodes: usize) -> bumpalo::collections::Vec<'_, f64> {
        let mut bounds = bumpalo::collections::Vec::with_capacity_in(num_nodes, &self.bump);
        bounds.resize(num_nodes, f64::INFINITY);
        bounds
    }
}

impl Default for ArenaContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Set of vertex sequences already turned into columns this merge pass.
///
/// Keys are interned into the arena on first sight; membership tests
/// borrow the caller's slice directly.
pub struct RouteSet<'a> {
    routes: hashbrown::HashSet<&'a [usize], hashbrown::DefaultHashBuilder, &'a Bump>,
    bump: &'a Bump,
}

impl<'a> RouteSet<'a> {
    /// Record a route; returns whether it was new.
    pub fn insert(&mut self, vertices: &[usize]) -> bool {
        if self.routes.contains(vertices) {
            return false;
        }
        self.routes.insert(self.bump.alloc_slice_copy(vertices));
        true
    }

    /// Whether the route was recorded before.
    pub fn contains(&self, vertices: &[usize]) -> bool {
        self.routes.contains(vertices)
    }

    /// Number of distinct routes recorded.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether nothing was recorded yet.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

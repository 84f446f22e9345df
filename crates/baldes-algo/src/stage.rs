//! Stage and status machinery.
//!
//! Pricing escalates through four stages of increasing exactness, plus a
//! final enumeration mode. Lower stages trade optimality guarantees for
//! speed: relaxed ng-memories produce fewer labels, and the fixing
//! machinery only engages once the surviving column set is small.

use serde::{Deserialize, Serialize};

/// Escalation stage of the pricing loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    /// Relaxed ng-memories, no fixing: a fast lower-bounding pass
    One,
    /// Tight ng-memories
    Two,
    /// Plus heuristic arc fixing
    Three,
    /// Plus exact bucket-arc elimination and jump arcs
    Four,
    /// Exact with all labels kept, for column enumeration
    Enumerate,
}

impl Stage {
    /// The next stage in the escalation order; `Four` is the last stage
    /// `solve()` escalates to on its own, `Enumerate` is caller-driven.
    pub fn next(self) -> Stage {
        match self {
            Stage::One => Stage::Two,
            Stage::Two => Stage::Three,
            Stage::Three => Stage::Four,
            Stage::Four | Stage::Enumerate => self,
        }
    }

    /// Whether extension uses the full ng-memories (relaxed memories
    /// forget everything but the current vertex).
    #[inline]
    pub fn tight_ng(self) -> bool {
        self >= Stage::Two
    }

    /// Whether jump arcs are traversed during extension.
    #[inline]
    pub fn jump_arcs(self) -> bool {
        self >= Stage::Three
    }

    /// Whether entering this stage triggers heuristic arc fixing.
    #[inline]
    pub fn heuristic_fixing(self) -> bool {
        self == Stage::Three
    }

    /// Whether entering this stage triggers exact bucket-arc elimination.
    #[inline]
    pub fn bucket_elimination(self) -> bool {
        self >= Stage::Four
    }

    /// Whether pruning a label requires proof, not heuristics.
    #[inline]
    pub fn exact(self) -> bool {
        self >= Stage::Four
    }
}

/// Outcome of a pricing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// Exact stage proved no negative-reduced-cost column exists
    Optimal,
    /// Columns were produced (or the run was aborted early)
    NotOptimal,
    /// Exact stage found nothing while SRC cuts are active; the caller
    /// should separate further cuts before concluding optimality
    Separation,
    /// Structural failure; the companion `Err` carries the cause
    Error,
    /// SRC dominance assumptions no longer hold; the caller must drop
    /// the cuts (`rollback()`) and re-solve
    Rollback,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escalation_order() {
        assert_eq!(Stage::One.next(), Stage::Two);
        assert_eq!(Stage::Three.next(), Stage::Four);
        assert_eq!(Stage::Four.next(), Stage::Four);
        assert!(Stage::One < Stage::Four);
    }

    #[test]
    fn test_stage_features() {
        assert!(!Stage::One.tight_ng());
        assert!(Stage::Two.tight_ng());
        assert!(!Stage::Two.jump_arcs());
        assert!(Stage::Three.jump_arcs());
        assert!(Stage::Four.bucket_elimination());
        assert!(Stage::Enumerate.exact());
    }
}

//! Labeling statistics.

use crate::label::DirectionStats;

/// Counters from the most recent pricing call, one set per direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct LabelingStats {
    pub forward: DirectionStats,
    pub backward: DirectionStats,
}

impl LabelingStats {
    /// One-line summary, logged at debug level after each solve.
    pub fn summary(&self) -> String {
        format!(
            "labels fw/bw: {}/{}, dominance checks fw/bw: {}/{}",
            self.forward.labels_created,
            self.backward.labels_created,
            self.forward.dominance_checks,
            self.backward.dominance_checks
        )
    }
}

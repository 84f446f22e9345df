//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Configuration of the bucket-graph labeling engine.
///
/// `Default` gives the values used throughout the integration tests; the
/// only field without a universal default is `max_path_size`, which is
/// re-derived as `N / 2` when left at 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketOptions {
    /// Vertex id of the start depot
    pub depot: usize,
    /// Vertex id of the end depot; `usize::MAX` means `N − 1`
    pub end_depot: usize,
    /// Hard cap on labels per predecessor chain; 0 means `N / 2`
    pub max_path_size: usize,
    /// Initial ng-neighborhood size
    pub n_ng: usize,
    /// Upper bound on concurrently active SRC cuts
    pub max_src_cuts: usize,
    /// How many best columns `solve()` returns
    pub max_returned_paths: usize,
    /// Hard cap on labels per direction pool
    pub label_pool_limit: usize,
    /// Pricing calls at one stage before forced escalation
    pub stage_iteration_budget: u32,
}

impl Default for BucketOptions {
    fn default() -> Self {
        Self {
            depot: 0,
            end_depot: usize::MAX,
            max_path_size: 0,
            n_ng: 8,
            max_src_cuts: 64,
            max_returned_paths: 16,
            label_pool_limit: 4_000_000,
            stage_iteration_budget: 50,
        }
    }
}

impl BucketOptions {
    /// Resolve the defaults that depend on the node count.
    pub fn resolved_for(&self, num_nodes: usize) -> Self {
        let mut options = self.clone();
        if options.end_depot == usize::MAX {
            options.end_depot = num_nodes - 1;
        }
        if options.max_path_size == 0 {
            options.max_path_size = (num_nodes / 2).max(3);
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_defaults() {
        let options = BucketOptions::default().resolved_for(10);
        assert_eq!(options.end_depot, 9);
        assert_eq!(options.max_path_size, 5);
    }

    #[test]
    fn test_explicit_values_kept() {
        let options = BucketOptions {
            end_depot: 4,
            max_path_size: 7,
            ..BucketOptions::default()
        }
        .resolved_for(10);
        assert_eq!(options.end_depot, 4);
        assert_eq!(options.max_path_size, 7);
    }

    #[test]
    fn test_json_roundtrip() {
        let options = BucketOptions {
            n_ng: 12,
            max_src_cuts: 32,
            ..BucketOptions::default()
        };
        let json = serde_json::to_string(&options).unwrap();
        let back: BucketOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back.n_ng, 12);
        assert_eq!(back.max_src_cuts, 32);
        assert_eq!(back.depot, options.depot);
    }
}

//! Bucket partition of the resource space.
//!
//! Each node's feasible resource box is cut into intervals of the
//! user-supplied width per resource; a bucket is one cell of that grid
//! and owns the non-dominated labels terminating at its node with
//! resource values inside the cell. Forward buckets count intervals up
//! from the window lower bounds, backward buckets mirror the grid down
//! from the upper bounds, so in both directions coordinate 0 is the cell
//! the direction's seed lands in.
//!
//! The geometry ([`Grid`]) is split from the mutable contents so the
//! labeling loop can hold the grid immutably while it rewrites bucket
//! label lists and the pool.

use baldes_core::RoutingInstance;
use hashbrown::HashSet;

use crate::arcs::{BucketArc, JumpArc};
use crate::direction::Direction;
use crate::error::SolverError;
use crate::label::{DirectionStats, LabelId, LabelPool};

const GRID_TOL: f64 = 1e-9;

/// One cell of a node's resource grid.
#[derive(Debug, Clone)]
pub struct Bucket {
    /// Node this bucket belongs to
    pub node_id: usize,
    /// Interval index per resource
    pub coords: Vec<usize>,
    /// Cell lower corner
    pub lb: Vec<f64>,
    /// Cell upper corner
    pub ub: Vec<f64>,
    /// Non-dominated labels currently stored here
    pub labels: Vec<LabelId>,
}

/// Immutable geometry of one direction's bucket grid.
#[derive(Debug, Clone)]
pub struct Grid {
    pub direction: Direction,
    /// First bucket id of each node
    pub node_offset: Vec<usize>,
    /// Bucket count of each node
    pub node_bucket_count: Vec<usize>,
    /// Intervals per resource of each node
    pub node_dims: Vec<Vec<usize>>,
    /// Interval width per resource
    pub widths: Vec<f64>,
    /// Per node, the window corner the grid grows from (lb forward,
    /// ub backward)
    pub node_origin: Vec<Vec<f64>>,
    /// Componentwise minimum of all node windows
    pub r_min: Vec<f64>,
    /// Componentwise maximum of all node windows
    pub r_max: Vec<f64>,
}

impl Grid {
    /// Total bucket count.
    #[inline]
    pub fn num_buckets(&self) -> usize {
        match (self.node_offset.last(), self.node_bucket_count.last()) {
            (Some(&offset), Some(&count)) => offset + count,
            _ => 0,
        }
    }

    /// The bucket ids of one node, contiguous and sorted by coords.
    #[inline]
    pub fn buckets_of(&self, node_id: usize) -> std::ops::Range<usize> {
        let start = self.node_offset[node_id];
        start..start + self.node_bucket_count[node_id]
    }

    /// Map a resource vector to its unique bucket at `node_id`. O(R).
    pub fn bucket_number(&self, node_id: usize, resources: &[f64]) -> Result<usize, SolverError> {
        let dims = &self.node_dims[node_id];
        if resources.len() != dims.len() {
            return Err(SolverError::ResourceDimension(resources.len(), dims.len()));
        }
        let origin = &self.node_origin[node_id];
        let mut index = 0usize;
        for (r, &value) in resources.iter().enumerate() {
            let distance = match self.direction {
                Direction::Forward => value - origin[r],
                Direction::Backward => origin[r] - value,
            };
            if distance < -GRID_TOL {
                return Err(SolverError::BucketOutOfBounds(node_id, resources.to_vec()));
            }
            let mut k = (distance / self.widths[r] + GRID_TOL).floor() as usize;
            if k >= dims[r] {
                // the far window edge itself belongs to the last interval
                if distance <= self.widths[r] * dims[r] as f64 + GRID_TOL {
                    k = dims[r] - 1;
                } else {
                    return Err(SolverError::BucketOutOfBounds(node_id, resources.to_vec()));
                }
            }
            index = index * dims[r] + k;
        }
        Ok(self.node_offset[node_id] + index)
    }

    /// Bucket id of the cell with the given interval coords at a node.
    pub fn flat_index(&self, node_id: usize, coords: &[usize]) -> usize {
        let dims = &self.node_dims[node_id];
        debug_assert_eq!(coords.len(), dims.len());
        let mut index = 0usize;
        for (&d, &k) in dims.iter().zip(coords.iter()) {
            debug_assert!(k < d);
            index = index * d + k;
        }
        self.node_offset[node_id] + index
    }
}

/// Everything one labeling direction owns: the bucket grid, its arcs,
/// SCC layering, per-bucket cost bounds and the label pool.
///
/// The two `DirectionState` values of an engine never share mutable
/// state, which is what lets the forward and backward passes run as two
/// plain parallel tasks.
#[derive(Debug)]
pub struct DirectionState {
    pub direction: Direction,
    pub grid: Grid,
    pub buckets: Vec<Bucket>,
    /// Outgoing bucket arcs per bucket
    pub bucket_arcs: Vec<Vec<BucketArc>>,
    /// Outgoing jump arcs per bucket (populated by the fixing engine)
    pub jump_arcs: Vec<Vec<JumpArc>>,
    /// Bucket arcs eliminated by Stage-4 fixing
    pub fixed_buckets: HashSet<(usize, usize)>,
    /// SCCs of the bucket graph in topological order, each sorted
    pub sccs: Vec<Vec<usize>>,
    /// Componentwise-predecessor buckets of the same node
    pub phi: Vec<Vec<usize>>,
    /// Per-bucket lower bound on the reduced cost of labels reaching it
    pub c_bar: Vec<f64>,
    pub pool: LabelPool,
    pub stats: DirectionStats,
}

impl DirectionState {
    /// Build the bucket grid for one direction.
    pub fn define(
        direction: Direction,
        instance: &RoutingInstance,
        widths: &[f64],
        pool_limit: usize,
    ) -> Self {
        let num_resources = instance.num_resources;
        debug_assert_eq!(widths.len(), num_resources);

        let mut r_min = vec![f64::INFINITY; num_resources];
        let mut r_max = vec![f64::NEG_INFINITY; num_resources];
        for node in &instance.nodes {
            for r in 0..num_resources {
                r_min[r] = r_min[r].min(node.lb[r]);
                r_max[r] = r_max[r].max(node.ub[r]);
            }
        }

        let mut buckets = Vec::new();
        let mut node_offset = Vec::with_capacity(instance.num_nodes());
        let mut node_bucket_count = Vec::with_capacity(instance.num_nodes());
        let mut node_dims = Vec::with_capacity(instance.num_nodes());
        let mut node_origin = Vec::with_capacity(instance.num_nodes());

        for node in &instance.nodes {
            let dims: Vec<usize> = (0..num_resources)
                .map(|r| {
                    let span = node.ub[r] - node.lb[r];
                    if span <= GRID_TOL {
                        1
                    } else {
                        (span / widths[r]).ceil().max(1.0) as usize
                    }
                })
                .collect();
            let count: usize = dims.iter().product();
            node_offset.push(buckets.len());
            node_bucket_count.push(count);
            node_origin.push(match direction {
                Direction::Forward => node.lb.clone(),
                Direction::Backward => node.ub.clone(),
            });

            let mut coords = vec![0usize; num_resources];
            for _ in 0..count {
                let mut lb = Vec::with_capacity(num_resources);
                let mut ub = Vec::with_capacity(num_resources);
                for r in 0..num_resources {
                    let k = coords[r] as f64;
                    match direction {
                        Direction::Forward => {
                            let lo = node.lb[r] + k * widths[r];
                            lb.push(lo);
                            ub.push((lo + widths[r]).min(node.ub[r]));
                        }
                        Direction::Backward => {
                            let hi = node.ub[r] - k * widths[r];
                            ub.push(hi);
                            lb.push((hi - widths[r]).max(node.lb[r]));
                        }
                    }
                }
                buckets.push(Bucket {
                    node_id: node.id,
                    coords: coords.clone(),
                    lb,
                    ub,
                    labels: Vec::new(),
                });
                // advance coords lexicographically, last resource fastest
                for r in (0..num_resources).rev() {
                    coords[r] += 1;
                    if coords[r] < dims[r] {
                        break;
                    }
                    coords[r] = 0;
                }
            }
            node_dims.push(dims);
        }

        let num_buckets = buckets.len();
        Self {
            direction,
            grid: Grid {
                direction,
                node_offset,
                node_bucket_count,
                node_dims,
                widths: widths.to_vec(),
                node_origin,
                r_min,
                r_max,
            },
            buckets,
            bucket_arcs: vec![Vec::new(); num_buckets],
            jump_arcs: vec![Vec::new(); num_buckets],
            fixed_buckets: HashSet::new(),
            sccs: Vec::new(),
            phi: vec![Vec::new(); num_buckets],
            c_bar: vec![f64::INFINITY; num_buckets],
            pool: LabelPool::new(pool_limit),
            stats: DirectionStats::default(),
        }
    }

    /// Number of buckets in this direction.
    #[inline]
    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// The bucket ids of one node.
    #[inline]
    pub fn buckets_of(&self, node_id: usize) -> std::ops::Range<usize> {
        self.grid.buckets_of(node_id)
    }

    /// Map a resource vector to its unique bucket at `node_id`.
    #[inline]
    pub fn bucket_number(&self, node_id: usize, resources: &[f64]) -> Result<usize, SolverError> {
        self.grid.bucket_number(node_id, resources)
    }

    /// The corner of a bucket from which extensions are lifted: the
    /// earliest resources of the cell in this direction's order.
    #[inline]
    pub fn bucket_corner(&self, bucket: usize) -> &[f64] {
        match self.direction {
            Direction::Forward => &self.buckets[bucket].lb,
            Direction::Backward => &self.buckets[bucket].ub,
        }
    }

    /// The bucket of the opposite direction covering this bucket's
    /// midpoint, used by concatenation and bucket-arc elimination.
    pub fn opposite_bucket(
        &self,
        other: &DirectionState,
        bucket: usize,
    ) -> Result<usize, SolverError> {
        let b = &self.buckets[bucket];
        let midpoint: Vec<f64> = b
            .lb
            .iter()
            .zip(b.ub.iter())
            .map(|(&lo, &hi)| 0.5 * (lo + hi))
            .collect();
        other.grid.bucket_number(b.node_id, &midpoint)
    }

    /// Reset labels, bounds and statistics for a fresh pricing call.
    /// Grid, arcs and SCCs are untouched.
    pub fn reset_labels(&mut self) {
        for bucket in &mut self.buckets {
            bucket.labels.clear();
        }
        self.c_bar.fill(f64::INFINITY);
        self.pool.reset();
        self.stats = DirectionStats::default();
    }
}

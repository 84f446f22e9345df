//! Bucket-level arcs.
//!
//! Job arcs connect nodes; bucket arcs lift them onto the bucket grid.
//! A bucket arc `(b_i → b_j)` exists when `b_j` is the smallest interval
//! of the target node reachable from `b_i`'s resource corner under the
//! job arc's increment; infeasible lifts are skipped at generation time.
//! Jump arcs connect a bucket to a later bucket of the same node and are
//! produced only by the fixing engine, to preserve reachability across
//! eliminated bucket arcs.

use baldes_core::RoutingInstance;

use crate::bucket::DirectionState;
use crate::direction::Direction;
use crate::error::SolverError;

/// A job arc lifted onto the bucket grid.
///
/// `tail`/`head` keep the original orientation of the underlying job arc
/// regardless of direction, so fixed-arc lookups index the same mask
/// from both sides.
#[derive(Debug, Clone)]
pub struct BucketArc {
    pub from_bucket: usize,
    pub to_bucket: usize,
    /// Resource increment of the underlying job arc
    pub resource_increment: Vec<f64>,
    /// Travel cost of the underlying job arc
    pub cost_increment: f64,
    /// Source node of the underlying job arc
    pub tail: usize,
    /// Target node of the underlying job arc
    pub head: usize,
}

/// A synthetic same-node arc restoring reachability after elimination.
#[derive(Debug, Clone)]
pub struct JumpArc {
    pub from_bucket: usize,
    pub to_bucket: usize,
}

/// Regenerate every bucket arc of one direction.
///
/// Arcs forbidden by the caller, by the heuristic fixed-arc mask or by a
/// previous bucket-arc elimination round are not recreated.
pub fn generate_bucket_arcs(
    state: &mut DirectionState,
    instance: &RoutingInstance,
    fixed_arcs: &[Vec<bool>],
) -> Result<(), SolverError> {
    let num_buckets = state.buckets.len();
    state.bucket_arcs = vec![Vec::new(); num_buckets];

    for from_bucket in 0..num_buckets {
        let node_id = state.buckets[from_bucket].node_id;
        let node = &instance.nodes[node_id];
        let job_arcs = match state.direction {
            Direction::Forward => &node.arcs_out,
            Direction::Backward => &node.arcs_in,
        };
        for job_arc in job_arcs {
            if job_arc.fixed || fixed_arcs[job_arc.from][job_arc.to] {
                continue;
            }
            let target_node_id = match state.direction {
                Direction::Forward => job_arc.to,
                Direction::Backward => job_arc.from,
            };
            let target_node = &instance.nodes[target_node_id];

            // lift from the bucket's resource corner; an infeasible lift
            // means no label of this bucket can ever take the arc
            let corner = state.bucket_corner(from_bucket);
            let mut target_resources = Vec::with_capacity(corner.len());
            let mut feasible = true;
            for (r, &value) in corner.iter().enumerate() {
                let combined = state
                    .direction
                    .combine(value, job_arc.resource_increment[r]);
                match state.direction.clamp(combined, target_node, r) {
                    Some(clamped) => target_resources.push(clamped),
                    None => {
                        feasible = false;
                        break;
                    }
                }
            }
            if !feasible {
                continue;
            }

            let to_bucket = state.bucket_number(target_node_id, &target_resources)?;
            if state.fixed_buckets.contains(&(from_bucket, to_bucket)) {
                continue;
            }
            state.bucket_arcs[from_bucket].push(BucketArc {
                from_bucket,
                to_bucket,
                resource_increment: job_arc.resource_increment.clone(),
                cost_increment: job_arc.cost_increment,
                tail: job_arc.from,
                head: job_arc.to,
            });
        }
    }
    Ok(())
}

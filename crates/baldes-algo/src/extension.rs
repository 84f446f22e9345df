//! Label extension.
//!
//! `extend` turns a label and a bucket arc into a candidate label at the
//! arc's target node, or nothing when the extension is infeasible.
//! Infeasibility is silent and expected; it is how windows, capacity,
//! ng-elementarity and the fixed-arc mask prune the search.

use baldes_core::bitmap;

use crate::arcs::BucketArc;
use crate::bucket::Bucket;
use crate::context::SearchContext;
use crate::direction::Direction;
use crate::label::{Label, LabelId, SrcState};
use crate::stage::Stage;

/// Extend `label` along `arc`, producing the candidate label at the
/// target node. Returns `None` on any feasibility violation.
pub(crate) fn extend(
    ctx: &SearchContext<'_>,
    direction: Direction,
    label_id: LabelId,
    label: &Label,
    arc: &BucketArc,
) -> Option<Label> {
    let target = match direction {
        Direction::Forward => arc.head,
        Direction::Backward => arc.tail,
    };

    // elementarity under the ng-relaxation: the bitmap only remembers
    // vertices the memories carried this far, so one test covers both
    if bitmap::is_set(&label.visited, target) {
        return None;
    }
    if ctx.fixed_arcs[arc.tail][arc.head] {
        return None;
    }
    // chain cap counts vertices beyond the depot seed
    if (label.path_len as usize).saturating_sub(1) >= ctx.options.max_path_size {
        return None;
    }

    let node = &ctx.instance.nodes[target];
    let mut resources = Vec::with_capacity(label.resources.len());
    for (r, &value) in label.resources.iter().enumerate() {
        let combined = direction.combine(value, arc.resource_increment[r]);
        resources.push(direction.clamp(combined, node, r)?);
    }

    // duals arrive in the master's natural sign and enter with a minus
    let mut cost = label.cost + arc.cost_increment - node.dual;
    let src_state = if ctx.cuts.is_empty() {
        SrcState::default()
    } else {
        let (state, carry) = ctx.cuts.extend_state(&label.src_state, target);
        cost -= carry;
        state
    };

    let mut visited = label.visited.clone();
    bitmap::set(&mut visited, target);
    if ctx.stage != Stage::Enumerate {
        bitmap::intersect_in_place(&mut visited, ctx.ng.mask(target, ctx.stage.tight_ng()));
    }

    Some(Label {
        node_id: target,
        resources,
        cost,
        real_cost: label.real_cost + arc.cost_increment,
        pred: Some(label_id),
        visited,
        src_state,
        path_len: label.path_len + 1,
        extended: false,
        direction,
    })
}

/// Move a label across a jump arc: same node, later interval, no cost.
/// The label's resources are pulled up (forward) or down (backward) to
/// the target cell so extensions lifted from that cell stay valid.
pub(crate) fn extend_jump(
    direction: Direction,
    label: &Label,
    target_bucket: &Bucket,
) -> Option<Label> {
    debug_assert_eq!(label.node_id, target_bucket.node_id);
    let mut resources = label.resources.clone();
    let mut moved = false;
    for (r, value) in resources.iter_mut().enumerate() {
        match direction {
            Direction::Forward => {
                if *value < target_bucket.lb[r] {
                    *value = target_bucket.lb[r];
                    moved = true;
                }
            }
            Direction::Backward => {
                if *value > target_bucket.ub[r] {
                    *value = target_bucket.ub[r];
                    moved = true;
                }
            }
        }
    }
    if !moved {
        return None;
    }
    Some(Label {
        node_id: label.node_id,
        resources,
        cost: label.cost,
        real_cost: label.real_cost,
        pred: label.pred,
        visited: label.visited.clone(),
        src_state: label.src_state.clone(),
        path_len: label.path_len,
        extended: false,
        direction,
    })
}

/// Fractional-knapsack bound on the dual payoff still collectible within
/// the remaining capacity of a label. The completion of the label cannot
/// price better than `label.cost − bound`, so labels with
/// `label.cost − bound` above zero cannot close a negative column.
pub(crate) fn knapsack_completion_bound(
    ctx: &SearchContext<'_>,
    label: &Label,
    capacity: f64,
) -> f64 {
    if label.resources.len() < 2 {
        // no capacity resource to bound with
        return f64::INFINITY;
    }
    let remaining = capacity - label.resources[1];
    if remaining <= 0.0 {
        return 0.0;
    }
    // best dual density first
    let mut candidates: Vec<(f64, f64)> = ctx
        .instance
        .nodes
        .iter()
        .filter(|node| {
            node.dual > 0.0
                && node.id != ctx.options.depot
                && node.id != ctx.options.end_depot
                && !bitmap::is_set(&label.visited, node.id)
        })
        .map(|node| (node.dual, node.demand[1].max(1e-12)))
        .collect();
    candidates.sort_by(|a, b| (b.0 / b.1).total_cmp(&(a.0 / a.1)));

    let mut bound = 0.0;
    let mut slack = remaining;
    for (dual, demand) in candidates {
        if slack <= 0.0 {
            break;
        }
        let take = (slack / demand).min(1.0);
        bound += take * dual;
        slack -= take * demand;
    }
    bound
}

//! The bucket-graph labeling engine.
//!
//! [`BucketGraph`] owns the instance, both direction states, the
//! ng-memories, the fixed-arc masks and the active SRC cuts, and drives
//! the stage-escalating pricing loop: labeling in both directions,
//! concatenation, fixing, and the rollback protocol.
//!
//! The engine is instantiable; it holds no global mutable state and
//! persists nothing. Duals come in per iteration, columns go out as
//! [`Path`] values.

use std::sync::atomic::{AtomicBool, Ordering};

use baldes_core::{check_depot_connectivity, BaldesError, BaldesResult, Path, RoutingInstance};
use tracing::{debug, info, warn};

use crate::arcs::generate_bucket_arcs;
use crate::arena::ArenaContext;
use crate::bucket::DirectionState;
use crate::context::SearchContext;
use crate::cuts::{CutStorage, SrcCut};
use crate::direction::Direction;
use crate::error::SolverError;
use crate::fixing::{bucket_arc_elimination, compute_heuristic_fixes, obtain_jump_bucket_arcs};
use crate::labeling::run_labeling_algorithms;
use crate::merge::concatenate;
use crate::ng::NgMemory;
use crate::options::BucketOptions;
use crate::scc::{compute_phi, layer_sccs};
use crate::stage::{Stage, Status};
use crate::stats::LabelingStats;

/// The bidirectional bucket-graph labeling engine.
pub struct BucketGraph {
    instance: RoutingInstance,
    options: BucketOptions,
    widths: Vec<f64>,
    ng: NgMemory,
    cuts: CutStorage,
    fixed_arcs: Vec<Vec<bool>>,
    fw: DirectionState,
    bw: DirectionState,
    arena: ArenaContext,
    stage: Stage,
    status: Status,
    incumbent: f64,
    relaxation: f64,
    gap: f64,
    min_red_cost: f64,
    /// Stage-4 elimination latch; cleared by `reset_fixed`/`redefine`
    fixed: bool,
    heuristic_fixed: bool,
    is_set_up: bool,
    abort: AtomicBool,
    stage_calls: u32,
    /// Cut generation the live label pools were priced under
    labels_priced_generation: u64,
}

impl BucketGraph {
    /// Create an engine over `instance`, discretizing resource 0 into
    /// intervals of `bucket_interval` and leaving the remaining
    /// resources as a single interval each. Call [`setup`](Self::setup)
    /// before pricing.
    pub fn new(instance: RoutingInstance, bucket_interval: f64) -> Self {
        let mut widths = vec![bucket_interval];
        for r in 1..instance.num_resources {
            let mut span: f64 = 1.0;
            for node in &instance.nodes {
                span = span.max(node.ub[r] - node.lb[r]);
            }
            widths.push(span.max(1.0));
        }
        Self::with_intervals(instance, widths)
    }

    /// Create an engine with an explicit interval width per resource.
    pub fn with_intervals(instance: RoutingInstance, widths: Vec<f64>) -> Self {
        let options = BucketOptions::default().resolved_for(instance.num_nodes());
        Self::with_intervals_and_options(instance, widths, options)
    }

    /// Create an engine with explicit widths and options.
    pub fn with_intervals_and_options(
        instance: RoutingInstance,
        widths: Vec<f64>,
        options: BucketOptions,
    ) -> Self {
        let options = options.resolved_for(instance.num_nodes());
        let num_nodes = instance.num_nodes();
        let ng = NgMemory::from_neighbors(&instance.nearest_neighbors(options.n_ng));
        let fw = DirectionState::define(
            Direction::Forward,
            &instance,
            &widths,
            options.label_pool_limit,
        );
        let bw = DirectionState::define(
            Direction::Backward,
            &instance,
            &widths,
            options.label_pool_limit,
        );
        Self {
            instance,
            options,
            widths,
            ng,
            cuts: CutStorage::default(),
            fixed_arcs: vec![vec![false; num_nodes]; num_nodes],
            fw,
            bw,
            arena: ArenaContext::new(),
            stage: Stage::One,
            status: Status::NotOptimal,
            incumbent: f64::INFINITY,
            relaxation: f64::INFINITY,
            gap: f64::INFINITY,
            min_red_cost: f64::INFINITY,
            fixed: false,
            heuristic_fixed: false,
            is_set_up: false,
            abort: AtomicBool::new(false),
            stage_calls: 0,
            labels_priced_generation: 0,
        }
    }

    /// Build adjacency, bucket arcs and the SCC layering. Must run once
    /// before pricing and again is harmless.
    pub fn setup(&mut self) -> BaldesResult<()> {
        self.instance.build_adjacency();
        if let Err(err) = check_depot_connectivity(&self.instance) {
            // stranded customers can never enter a column; keep going
            warn!("{err}");
        }
        generate_bucket_arcs(&mut self.fw, &self.instance, &self.fixed_arcs)
            .map_err(BaldesError::from)?;
        generate_bucket_arcs(&mut self.bw, &self.instance, &self.fixed_arcs)
            .map_err(BaldesError::from)?;
        compute_phi(&mut self.fw);
        compute_phi(&mut self.bw);
        layer_sccs(&mut self.fw);
        layer_sccs(&mut self.bw);
        self.is_set_up = true;
        info!(
            nodes = self.instance.num_nodes(),
            fw_buckets = self.fw.num_buckets(),
            bw_buckets = self.bw.num_buckets(),
            "bucket graph ready"
        );
        Ok(())
    }

    /// Rebuild the bucket grids with a new resource-0 interval width,
    /// clearing all fixing state.
    pub fn redefine(&mut self, bucket_interval: f64) -> BaldesResult<()> {
        self.widths[0] = bucket_interval;
        self.fw = DirectionState::define(
            Direction::Forward,
            &self.instance,
            &self.widths,
            self.options.label_pool_limit,
        );
        self.bw = DirectionState::define(
            Direction::Backward,
            &self.instance,
            &self.widths,
            self.options.label_pool_limit,
        );
        for row in &mut self.fixed_arcs {
            row.fill(false);
        }
        self.fixed = false;
        self.heuristic_fixed = false;
        self.setup()
    }

    /// Replace the distance matrix and recompute the initial ng-memories
    /// as each vertex's `n_ng` nearest neighbors.
    pub fn set_distance_matrix(
        &mut self,
        distance_matrix: Vec<Vec<f64>>,
        n_ng: usize,
    ) -> BaldesResult<()> {
        let n = self.instance.num_nodes();
        if distance_matrix.len() != n || distance_matrix.iter().any(|row| row.len() != n) {
            return Err(BaldesError::Validation(format!(
                "distance matrix must be {n}x{n}"
            )));
        }
        self.instance.distance_matrix = distance_matrix;
        self.ng = NgMemory::from_neighbors(&self.instance.nearest_neighbors(n_ng));
        if self.is_set_up {
            self.setup()?;
        }
        Ok(())
    }

    /// Install the per-customer duals of this pricing iteration;
    /// `duals[i]` belongs to customer `i + 1`.
    pub fn set_duals(&mut self, duals: &[f64]) -> BaldesResult<()> {
        self.instance
            .set_duals(duals)
            .map_err(|err| BaldesError::Validation(err.to_string()))
    }

    /// Re-price the active SRC cut duals.
    pub fn set_cut_duals(&mut self, cut_duals: &[f64]) -> BaldesResult<()> {
        self.cuts.set_duals(cut_duals).map_err(BaldesError::from)
    }

    /// Activate an SRC cut. Labels priced under the previous cut set
    /// stay in the pools; the next `solve` without an intervening
    /// [`reset_pool`](Self::reset_pool) reports `Rollback`.
    pub fn add_cut(&mut self, cut: SrcCut) -> BaldesResult<()> {
        if self.cuts.len() >= self.options.max_src_cuts {
            return Err(BaldesError::Config(format!(
                "cut limit of {} reached",
                self.options.max_src_cuts
            )));
        }
        self.cuts.push(cut);
        Ok(())
    }

    /// Best integer objective known to the caller; feeds the gap.
    pub fn set_incumbent(&mut self, incumbent: f64) {
        self.incumbent = incumbent;
    }

    /// Current master relaxation value; feeds the gap.
    pub fn set_relaxation(&mut self, relaxation: f64) {
        self.relaxation = relaxation;
    }

    /// Cooperative cancellation; the labeling loop checks between SCCs.
    /// The flag is monotone within a pricing call, the caller clears it
    /// with [`clear_abort`](Self::clear_abort).
    pub fn request_abort(&self) {
        self.abort.store(true, Ordering::Relaxed);
    }

    /// Re-arm the engine after an aborted pricing call.
    pub fn clear_abort(&self) {
        self.abort.store(false, Ordering::Relaxed);
    }

    /// Outcome of the most recent pricing call.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Current escalation stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Optimality gap used by the fixing engine.
    pub fn gap(&self) -> f64 {
        self.gap
    }

    /// Counters of the most recent pricing call.
    pub fn statistics(&self) -> LabelingStats {
        LabelingStats {
            forward: self.fw.stats,
            backward: self.bw.stats,
        }
    }

    /// Release every label in both pools.
    pub fn reset_pool(&mut self) {
        self.fw.reset_labels();
        self.bw.reset_labels();
        self.labels_priced_generation = self.cuts.generation();
    }

    /// Clear the heuristic fixed-arc mask, restore eliminated bucket
    /// arcs and unlock a future Stage-4 elimination round.
    pub fn reset_fixed(&mut self) -> BaldesResult<()> {
        for row in &mut self.fixed_arcs {
            row.fill(false);
        }
        self.fw.fixed_buckets.clear();
        self.bw.fixed_buckets.clear();
        for arcs in &mut self.fw.jump_arcs {
            arcs.clear();
        }
        for arcs in &mut self.bw.jump_arcs {
            arcs.clear();
        }
        self.fixed = false;
        self.heuristic_fixed = false;
        if self.is_set_up {
            self.setup()?;
        }
        Ok(())
    }

    /// Rollback protocol: drop every SRC cut, release the pools and fall
    /// back to Stage 1. The next `solve` reproduces pre-cut results.
    pub fn rollback(&mut self) {
        self.cuts.clear();
        self.reset_pool();
        self.stage = Stage::One;
        self.stage_calls = 0;
        self.status = Status::NotOptimal;
        info!("rolled back: cuts dropped, pools reset, stage 1");
    }

    /// Grow the ng-memories from a fractional master solution; returns
    /// whether anything changed.
    #[allow(clippy::too_many_arguments)]
    pub fn augment_ng_memories(
        &mut self,
        solution: &[f64],
        paths: &[Path],
        aggressive: bool,
        eta1: usize,
        eta2: usize,
        eta_max: usize,
        n: usize,
    ) -> bool {
        self.ng
            .augment(solution, paths, aggressive, eta1, eta2, eta_max, n)
    }

    /// Run the stage-escalating pricing loop: the current stage is
    /// priced and, while it yields nothing, the engine escalates up to
    /// Stage 4. Returns the best negative-reduced-cost columns ascending
    /// by reduced cost; an empty result at an exact stage means proven
    /// optimality (or `Separation` when SRC cuts are active).
    pub fn solve(&mut self, q_star: &[f64]) -> BaldesResult<Vec<Path>> {
        match self.solve_inner(q_star) {
            Ok(paths) => Ok(paths),
            Err(err) => {
                self.status = Status::Error;
                Err(err)
            }
        }
    }

    fn solve_inner(&mut self, q_star: &[f64]) -> BaldesResult<Vec<Path>> {
        self.ensure_ready("solve", q_star)?;

        // labels priced under a different cut set cannot be compared by
        // the SRC dominance rule
        if self.cuts.generation() != self.labels_priced_generation
            && (!self.fw.pool.is_empty() || !self.bw.pool.is_empty())
            && self.pools_have_stale_src()
        {
            warn!("cut set changed under live labels");
            self.status = Status::Rollback;
            return Ok(Vec::new());
        }

        self.stage_calls += 1;
        if self.stage < Stage::Four && self.stage_calls > self.options.stage_iteration_budget {
            self.stage = self.stage.next();
            self.stage_calls = 1;
            debug!(stage = ?self.stage, "iteration budget exceeded, escalated");
        }

        loop {
            let stage = self.stage;
            self.prepare_fixing(stage, q_star)?;
            let paths = self.run_stage(stage, q_star)?;
            if !paths.is_empty() {
                self.status = Status::NotOptimal;
                return Ok(paths);
            }
            if self.abort.load(Ordering::Relaxed) {
                self.status = Status::NotOptimal;
                return Ok(paths);
            }
            if stage >= Stage::Four {
                self.status = if self.cuts.is_empty() {
                    Status::Optimal
                } else {
                    Status::Separation
                };
                return Ok(Vec::new());
            }
            self.stage = stage.next();
            self.stage_calls = 0;
            debug!(stage = ?self.stage, "no columns, stage escalated");
        }
    }

    /// Run only Stage 1 (relaxed ng-memories).
    pub fn phase_one(&mut self, q_star: &[f64]) -> BaldesResult<Vec<Path>> {
        self.run_single(Stage::One, q_star)
    }

    /// Run only Stage 2 (tight ng-memories).
    pub fn phase_two(&mut self, q_star: &[f64]) -> BaldesResult<Vec<Path>> {
        self.run_single(Stage::Two, q_star)
    }

    /// Run only Stage 3 (plus heuristic arc fixing).
    pub fn phase_three(&mut self, q_star: &[f64]) -> BaldesResult<Vec<Path>> {
        self.run_single(Stage::Three, q_star)
    }

    /// Run only Stage 4 (plus exact bucket-arc elimination).
    pub fn phase_four(&mut self, q_star: &[f64]) -> BaldesResult<Vec<Path>> {
        self.run_single(Stage::Four, q_star)
    }

    /// Exact enumeration: dominance only collapses labels with identical
    /// visit sets, so every distinct negative column survives.
    pub fn enumerate(&mut self, q_star: &[f64]) -> BaldesResult<Vec<Path>> {
        self.run_single(Stage::Enumerate, q_star)
    }

    /// Borrow the instance (duals included).
    pub fn instance(&self) -> &RoutingInstance {
        &self.instance
    }

    /// The engine's resolved options.
    pub fn options(&self) -> &BucketOptions {
        &self.options
    }

    /// Job arcs forbidden by heuristic fixing, for inspection.
    pub fn fixed_arc_count(&self) -> usize {
        self.fixed_arcs
            .iter()
            .map(|row| row.iter().filter(|&&f| f).count())
            .sum()
    }

    /// Bucket arcs eliminated by Stage-4 fixing, per direction.
    pub fn eliminated_bucket_arcs(&self) -> (usize, usize) {
        (self.fw.fixed_buckets.len(), self.bw.fixed_buckets.len())
    }

    fn run_single(&mut self, stage: Stage, q_star: &[f64]) -> BaldesResult<Vec<Path>> {
        match self.run_single_inner(stage, q_star) {
            Ok(paths) => Ok(paths),
            Err(err) => {
                self.status = Status::Error;
                Err(err)
            }
        }
    }

    fn run_single_inner(&mut self, stage: Stage, q_star: &[f64]) -> BaldesResult<Vec<Path>> {
        self.ensure_ready("phase", q_star)?;
        self.prepare_fixing(stage, q_star)?;
        let paths = self.run_stage(stage, q_star)?;
        self.status = if paths.is_empty() {
            if stage.exact() && !self.abort.load(Ordering::Relaxed) {
                if self.cuts.is_empty() {
                    Status::Optimal
                } else {
                    Status::Separation
                }
            } else {
                Status::NotOptimal
            }
        } else {
            Status::NotOptimal
        };
        Ok(paths)
    }

    /// Run the fixing passes a stage entry demands.
    fn prepare_fixing(&mut self, stage: Stage, q_star: &[f64]) -> BaldesResult<()> {
        if stage.heuristic_fixing() && !self.heuristic_fixed {
            self.heuristic_fixing_pass(q_star)?;
            self.heuristic_fixed = true;
        }
        if stage.bucket_elimination() && !self.fixed {
            self.bucket_fixing(q_star)?;
        }
        Ok(())
    }

    /// One labeling + concatenation round at `stage`.
    fn run_stage(&mut self, stage: Stage, q_star: &[f64]) -> BaldesResult<Vec<Path>> {
        let (paths, best_cost) = {
            let Self {
                ref instance,
                ref options,
                ref ng,
                ref cuts,
                ref fixed_arcs,
                ref mut fw,
                ref mut bw,
                ref abort,
                ref mut arena,
                ..
            } = *self;
            let ctx = SearchContext {
                instance,
                options,
                ng,
                cuts,
                fixed_arcs,
                stage,
                full: false,
                q_star,
                abort,
            };
            run_labeling_algorithms(&ctx, fw, bw).map_err(BaldesError::from)?;
            arena.reset();
            let outcome = concatenate(&ctx, fw, bw, arena);
            (outcome.paths, outcome.best_cost)
        };
        self.min_red_cost = best_cost;
        self.labels_priced_generation = self.cuts.generation();
        debug!(stage = ?stage, "{}", self.statistics().summary());
        Ok(paths)
    }

    /// Full (un-split) labeling pass at `stage`, filling both `c̄`s.
    fn run_full_labeling(&mut self, stage: Stage, q_star: &[f64]) -> BaldesResult<()> {
        let Self {
            ref instance,
            ref options,
            ref ng,
            ref cuts,
            ref fixed_arcs,
            ref mut fw,
            ref mut bw,
            ref abort,
            ..
        } = *self;
        let ctx = SearchContext {
            instance,
            options,
            ng,
            cuts,
            fixed_arcs,
            stage,
            full: true,
            q_star,
            abort,
        };
        run_labeling_algorithms(&ctx, fw, bw).map_err(BaldesError::from)
    }

    /// Stage-3 heuristic arc fixing: bound every ordered node pair by
    /// its cheapest forward/backward label pair and forbid the arcs that
    /// cannot beat the gap.
    fn heuristic_fixing_pass(&mut self, q_star: &[f64]) -> BaldesResult<()> {
        self.update_gap();
        if !self.gap.is_finite() {
            debug!("no finite gap, heuristic fixing skipped");
            return Ok(());
        }
        // recompute from a clean mask so stale fixes cannot compound
        for row in &mut self.fixed_arcs {
            row.fill(false);
        }
        self.run_full_labeling(Stage::Two, q_star)?;
        let fixes = {
            let Self {
                ref instance,
                ref options,
                ref ng,
                ref cuts,
                ref fixed_arcs,
                ref fw,
                ref bw,
                ref abort,
                ..
            } = *self;
            let ctx = SearchContext {
                instance,
                options,
                ng,
                cuts,
                fixed_arcs,
                stage: Stage::Two,
                full: true,
                q_star,
                abort,
            };
            compute_heuristic_fixes(&ctx, fw, bw, self.gap)
        };
        let count = fixes.len();
        for (u, v) in fixes {
            self.fixed_arcs[u][v] = true;
        }
        info!(fixed = count, gap = self.gap, "heuristic arc fixing applied");
        Ok(())
    }

    /// Stage-4 exact fixing: one full labeling pass to refresh both
    /// bounds, then bucket-arc elimination and jump-arc regeneration in
    /// both directions. Latched until `reset_fixed`/`redefine`.
    fn bucket_fixing(&mut self, q_star: &[f64]) -> BaldesResult<()> {
        if self.fixed {
            return Ok(());
        }
        self.fixed = true;
        self.run_full_labeling(Stage::Four, q_star)?;
        self.update_gap();
        if !self.gap.is_finite() {
            debug!("no finite gap, bucket elimination skipped");
            return Ok(());
        }
        let gap = self.gap;
        let fw_grid = self.fw.grid.clone();
        let fw_c_bar = self.fw.c_bar.clone();
        let bw_grid = self.bw.grid.clone();
        let bw_c_bar = self.bw.c_bar.clone();
        let (fw_removed, bw_removed) = {
            let Self {
                ref mut fw,
                ref mut bw,
                ..
            } = *self;
            rayon::join(
                || {
                    let removed = bucket_arc_elimination(fw, &bw_grid, &bw_c_bar, gap);
                    obtain_jump_bucket_arcs(fw);
                    removed
                },
                || {
                    let removed = bucket_arc_elimination(bw, &fw_grid, &fw_c_bar, gap);
                    obtain_jump_bucket_arcs(bw);
                    removed
                },
            )
        };
        layer_sccs(&mut self.fw);
        layer_sccs(&mut self.bw);
        info!(fw_removed, bw_removed, gap, "bucket arcs eliminated");
        Ok(())
    }

    fn update_gap(&mut self) {
        self.gap = if self.incumbent.is_finite() && self.relaxation.is_finite() {
            self.incumbent - (self.relaxation + self.min_red_cost.min(0.0))
        } else {
            f64::INFINITY
        };
    }

    fn pools_have_stale_src(&self) -> bool {
        let expected = self.cuts.len();
        self.fw
            .pool
            .iter()
            .chain(self.bw.pool.iter())
            .any(|label| label.src_state.len() != expected)
    }

    fn ensure_ready(&mut self, operation: &'static str, q_star: &[f64]) -> BaldesResult<()> {
        if !self.is_set_up {
            self.status = Status::Error;
            return Err(SolverError::NotSetUp(operation).into());
        }
        if q_star.len() != self.instance.num_resources {
            self.status = Status::Error;
            return Err(
                SolverError::ResourceDimension(q_star.len(), self.instance.num_resources).into(),
            );
        }
        Ok(())
    }
}

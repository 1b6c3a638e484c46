//! Layout optimizer entry point.
//!
//! Validates the request, seeds a complete placement, then anneals over
//! swaps and relocations of unlocked devices. Every candidate is scored by
//! the thermal evaluator plus the four objectives, and the best one seen is
//! returned whatever stopped the search.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use rackplan_core::config::PlannerConfig;
use rackplan_core::error::RackResult;
use rackplan_core::placement::Placement;
use rackplan_core::types::{DeviceId, RackId};
use rackplan_core::RackSnapshot;
use rackplan_thermal::{ThermalConfig, ThermalEvaluator, ThermalReport};

use crate::problem::LayoutProblem;
use crate::scorer::{ObjectiveWeights, ScoreBreakdown, Scorer, ScoringConfig};
use crate::search::{CancelFlag, Objective, SearchConfig, SearchStats, anneal};
use crate::seed::{SeedSource, check_feasibility, seed_placement};

/// Runtime configuration for one optimizer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptimizerConfig {
    pub thermal: ThermalConfig,
    pub search: SearchConfig,
    pub scoring: ScoringConfig,
    /// Weights used when a request does not supply its own.
    pub weights: ObjectiveWeights,
}

impl OptimizerConfig {
    pub fn from_planner_config(config: &PlannerConfig) -> Self {
        Self {
            thermal: ThermalConfig::from_planner_config(config),
            search: SearchConfig::from_planner_config(config),
            scoring: ScoringConfig::from_planner_config(config),
            weights: config
                .weights
                .as_ref()
                .map(ObjectiveWeights::from_section)
                .unwrap_or_default(),
        }
    }

    pub fn validate(&self) -> RackResult<()> {
        self.thermal.validate()?;
        self.search.validate()?;
        self.scoring.validate()?;
        self.weights.normalized()?;
        Ok(())
    }
}

/// Best placement found for one rack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub rack_id: RackId,
    pub placement: Placement,
    /// Weighted aggregate of `breakdown`.
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    /// Normalized weights the score was computed with.
    pub weights: ObjectiveWeights,
    pub thermal: ThermalReport,
    pub moves_from_current: usize,
    /// No cabling was supplied; the cable score is positional.
    pub cable_score_approximate: bool,
    pub seed: SeedSource,
    pub stats: SearchStats,
}

/// Layout optimizer with a fixed configuration.
///
/// Holds no per-request state; one instance can serve many racks.
#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    config: OptimizerConfig,
    cancel: CancelFlag,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            config,
            cancel: CancelFlag::new(),
        }
    }

    /// Share `flag` so another thread can stop a running search.
    pub fn with_cancel(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Optimize the unlocked devices of `snapshot`.
    ///
    /// `locked` adds to the devices already flagged locked. `weights`
    /// falls back to the configured defaults.
    pub fn optimize(
        &self,
        snapshot: &RackSnapshot,
        locked: &[DeviceId],
        weights: Option<&ObjectiveWeights>,
    ) -> RackResult<OptimizationResult> {
        let weights = weights.unwrap_or(&self.config.weights).normalized()?;
        self.config.validate()?;
        snapshot.validate()?;

        let problem = LayoutProblem::new(snapshot, locked)?;
        check_feasibility(&problem)?;
        let (seed_layout, seed_source) = seed_placement(&problem)?;

        let evaluator = ThermalEvaluator::new(&snapshot.rack, &snapshot.devices, &self.config.thermal);
        let scorer = Scorer::new(
            &snapshot.rack,
            &snapshot.devices,
            &snapshot.connections,
            &self.config.scoring,
        );
        let cable_score_approximate = scorer.cable_is_approximate();
        if cable_score_approximate && snapshot.devices.len() > 1 {
            warn!(rack = %snapshot.rack.id, "no cabling supplied; cable score is positional");
        }

        info!(
            rack = %snapshot.rack.id,
            devices = snapshot.devices.len(),
            movable = problem.movable().len(),
            seed = ?seed_source,
            rng_seed = self.config.search.seed,
            "optimizing rack layout"
        );

        let objective = Objective {
            problem: &problem,
            evaluator: &evaluator,
            scorer: &scorer,
            weights,
        };
        let start = objective.candidate(seed_layout)?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.search.seed);
        let (best, stats) = anneal(&objective, start, &self.config.search, &self.cancel, &mut rng)?;

        info!(
            rack = %snapshot.rack.id,
            score = best.score,
            moves = best.moves,
            iterations = stats.iterations,
            stop = %stats.stop_reason,
            "optimization finished"
        );

        Ok(OptimizationResult {
            rack_id: snapshot.rack.id.clone(),
            placement: best.placement,
            score: best.score,
            breakdown: best.breakdown,
            weights,
            thermal: best.thermal,
            moves_from_current: best.moves,
            cable_score_approximate,
            seed: seed_source,
            stats,
        })
    }
}

/// Optimize with a one-off [`Optimizer`].
pub fn optimize(
    snapshot: &RackSnapshot,
    locked: &[DeviceId],
    weights: Option<&ObjectiveWeights>,
    config: &OptimizerConfig,
) -> RackResult<OptimizationResult> {
    Optimizer::new(config.clone()).optimize(snapshot, locked, weights)
}

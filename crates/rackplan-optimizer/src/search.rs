//! Simulated annealing over complete placements.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use rackplan_core::ValidationError;
use rackplan_core::config::{PlannerConfig, SearchSection};
use rackplan_core::error::RackResult;
use rackplan_core::placement::Placement;
use rackplan_thermal::{ThermalEvaluator, ThermalReport};

use crate::moves::propose;
use crate::problem::LayoutProblem;
use crate::scorer::{ObjectiveWeights, ScoreBreakdown, Scorer};

/// Scores closer than this are treated as equal.
const SCORE_EPSILON: f64 = 1e-12;

/// Annealing schedule and budgets.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub max_iterations: u32,
    /// Consecutive non-accepted proposals before the search stops.
    pub stall_limit: u32,
    pub time_budget: Option<Duration>,
    pub initial_temperature: f64,
    pub final_temperature: f64,
    /// Chance of proposing a swap rather than a relocation.
    pub swap_probability: f64,
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 4000,
            stall_limit: 800,
            time_budget: None,
            initial_temperature: 0.05,
            final_temperature: 0.0005,
            swap_probability: 0.5,
            seed: 42,
        }
    }
}

impl SearchConfig {
    pub fn from_section(section: &SearchSection) -> Self {
        let d = Self::default();
        Self {
            max_iterations: section.max_iterations.unwrap_or(d.max_iterations),
            stall_limit: section.stall_limit.unwrap_or(d.stall_limit),
            time_budget: section.time_budget_ms.map(Duration::from_millis).or(d.time_budget),
            initial_temperature: section.initial_temperature.unwrap_or(d.initial_temperature),
            final_temperature: section.final_temperature.unwrap_or(d.final_temperature),
            swap_probability: section.swap_probability.unwrap_or(d.swap_probability),
            seed: section.seed.unwrap_or(d.seed),
        }
    }

    pub fn from_planner_config(config: &PlannerConfig) -> Self {
        config
            .search
            .as_ref()
            .map(Self::from_section)
            .unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let bad = |msg: &str| Err(ValidationError::InvalidConfig(format!("search: {msg}")));
        if !(self.initial_temperature > 0.0 && self.initial_temperature.is_finite()) {
            return bad("initial_temperature must be positive");
        }
        if !(self.final_temperature > 0.0 && self.final_temperature <= self.initial_temperature) {
            return bad("final_temperature must be positive and at most initial_temperature");
        }
        if !(0.0..=1.0).contains(&self.swap_probability) {
            return bad("swap_probability must be in [0, 1]");
        }
        if self.stall_limit == 0 {
            return bad("stall_limit must be at least 1");
        }
        Ok(())
    }

    /// Temperature at `iteration`, cooling geometrically.
    pub fn temperature(&self, iteration: u32) -> f64 {
        if self.max_iterations == 0 {
            return self.final_temperature;
        }
        let progress = f64::from(iteration) / f64::from(self.max_iterations);
        self.initial_temperature * (self.final_temperature / self.initial_temperature).powf(progress)
    }
}

/// Shared stop signal for a running search.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    IterationBudget,
    Converged,
    Deadline,
    Cancelled,
    NothingToMove,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StopReason::IterationBudget => "iteration budget",
            StopReason::Converged => "converged",
            StopReason::Deadline => "deadline",
            StopReason::Cancelled => "cancelled",
            StopReason::NothingToMove => "nothing to move",
        };
        f.write_str(s)
    }
}

/// Counters from one search run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchStats {
    pub iterations: u32,
    pub accepted: u32,
    /// Accepted moves that lowered the score.
    pub worsening: u32,
    /// Accepted moves that set a new best.
    pub improved: u32,
    /// Proposals with no feasible outcome.
    pub infeasible: u32,
    pub stop_reason: StopReason,
}

/// A fully scored placement.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub placement: Placement,
    pub breakdown: ScoreBreakdown,
    pub score: f64,
    pub thermal: ThermalReport,
    /// Devices whose start differs from the recorded layout.
    pub moves: usize,
}

impl Candidate {
    /// Higher score wins; near-ties go to fewer moves, then to the lower
    /// placement in id order.
    pub fn beats(&self, other: &Candidate) -> bool {
        if self.score > other.score + SCORE_EPSILON {
            return true;
        }
        if self.score + SCORE_EPSILON < other.score {
            return false;
        }
        (self.moves, &self.placement) < (other.moves, &other.placement)
    }
}

/// Everything needed to turn a placement into a [`Candidate`].
pub struct Objective<'a> {
    pub problem: &'a LayoutProblem<'a>,
    pub evaluator: &'a ThermalEvaluator<'a>,
    pub scorer: &'a Scorer<'a>,
    pub weights: ObjectiveWeights,
}

impl Objective<'_> {
    pub fn candidate(&self, placement: Placement) -> RackResult<Candidate> {
        let thermal = self.evaluator.evaluate(&placement)?;
        let breakdown = self.scorer.score(&placement, &thermal);
        Ok(Candidate {
            score: breakdown.weighted(&self.weights),
            moves: placement.moves_from(&self.problem.current),
            placement,
            breakdown,
            thermal,
        })
    }
}

/// Anneal from `start`, returning the best candidate seen.
pub fn anneal<R: Rng>(
    objective: &Objective<'_>,
    start: Candidate,
    config: &SearchConfig,
    cancel: &CancelFlag,
    rng: &mut R,
) -> RackResult<(Candidate, SearchStats)> {
    let mut stats = SearchStats {
        iterations: 0,
        accepted: 0,
        worsening: 0,
        improved: 0,
        infeasible: 0,
        stop_reason: StopReason::IterationBudget,
    };

    if objective.problem.movable().is_empty() {
        stats.stop_reason = StopReason::NothingToMove;
        return Ok((start, stats));
    }

    let started = Instant::now();
    let mut best = start.clone();
    let mut current = start;
    let mut stalled = 0u32;

    while stats.iterations < config.max_iterations {
        if cancel.is_cancelled() {
            stats.stop_reason = StopReason::Cancelled;
            break;
        }
        if config.time_budget.is_some_and(|budget| started.elapsed() >= budget) {
            stats.stop_reason = StopReason::Deadline;
            break;
        }
        if stalled >= config.stall_limit {
            stats.stop_reason = StopReason::Converged;
            break;
        }

        let temperature = config.temperature(stats.iterations);
        stats.iterations += 1;

        let Some((step, placement)) =
            propose(objective.problem, &current.placement, config.swap_probability, rng)
        else {
            stats.infeasible += 1;
            stalled += 1;
            continue;
        };

        let next = objective.candidate(placement)?;
        let delta = next.score - current.score;
        let accept = delta > SCORE_EPSILON || rng.gen_range(0.0..1.0) < (delta / temperature).exp();
        if !accept {
            stalled += 1;
            continue;
        }

        stats.accepted += 1;
        if delta < -SCORE_EPSILON {
            stats.worsening += 1;
        }
        stalled = 0;
        if next.beats(&best) {
            stats.improved += 1;
            debug!(
                iteration = stats.iterations,
                score = next.score,
                moves = next.moves,
                step = ?step,
                "new best placement"
            );
            best = next.clone();
        }
        current = next;
    }

    Ok((best, stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rackplan_core::RackSnapshot;
    use rackplan_core::types::{AccessTier, Device, DeviceRole, Rack};
    use rackplan_thermal::{ThermalConfig, evaluate};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::scorer::ScoringConfig;

    fn make_candidate(score: f64, moves: usize, starts: &[(&str, u32)]) -> Candidate {
        let thermal =
            evaluate(&Rack::new("r1", 8), &[], &Placement::new(), &ThermalConfig::default()).unwrap();
        Candidate {
            placement: starts.iter().map(|(id, s)| (id.to_string(), *s)).collect(),
            breakdown: ScoreBreakdown {
                cable: score,
                weight: score,
                thermal: score,
                access: score,
            },
            score,
            thermal,
            moves,
        }
    }

    /// A 16U rack with a mix of hot, heavy, and network gear, all unlocked.
    fn mixed_rack() -> RackSnapshot {
        let mut rack = Rack::new("r1", 16);
        rack.max_inlet_temp_c = Some(27.0);
        let specs = [
            ("db", DeviceRole::Server, 2, 600.0, 30.0, AccessTier::Occasional),
            ("web", DeviceRole::Server, 1, 350.0, 12.0, AccessTier::Frequent),
            ("san", DeviceRole::Storage, 3, 250.0, 45.0, AccessTier::Rare),
            ("sw", DeviceRole::Switch, 1, 80.0, 4.0, AccessTier::Frequent),
            ("ups", DeviceRole::Ups, 2, 50.0, 60.0, AccessTier::Rare),
        ];
        let mut next = 1;
        let devices = specs
            .into_iter()
            .map(|(id, role, height, watts, kg, access)| {
                let mut d = Device::new(id, height).mounted("r1", next);
                d.role = role;
                d.power_watts = watts;
                d.weight_kg = kg;
                d.access = access;
                next += height;
                d
            })
            .collect();
        RackSnapshot::new(rack, devices)
    }

    fn run(snapshot: &RackSnapshot, config: &SearchConfig) -> (Candidate, SearchStats) {
        let problem = LayoutProblem::new(snapshot, &[]).unwrap();
        let evaluator =
            ThermalEvaluator::new(&snapshot.rack, &snapshot.devices, &ThermalConfig::default());
        let scorer = Scorer::new(
            &snapshot.rack,
            &snapshot.devices,
            &snapshot.connections,
            &ScoringConfig::default(),
        );
        let objective = Objective {
            problem: &problem,
            evaluator: &evaluator,
            scorer: &scorer,
            weights: ObjectiveWeights::default(),
        };
        let start = objective.candidate(problem.current.clone()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        anneal(&objective, start, config, &CancelFlag::new(), &mut rng).unwrap()
    }

    #[test]
    fn higher_score_beats_fewer_moves() {
        let better = make_candidate(0.8, 5, &[("a", 3)]);
        let stable = make_candidate(0.7, 0, &[("a", 1)]);
        assert!(better.beats(&stable));
        assert!(!stable.beats(&better));
    }

    #[test]
    fn tie_goes_to_fewer_moves() {
        let stable = make_candidate(0.5, 1, &[("a", 1), ("b", 4)]);
        let restless = make_candidate(0.5 + SCORE_EPSILON / 2.0, 3, &[("a", 2), ("b", 1)]);
        assert!(stable.beats(&restless));
        assert!(!restless.beats(&stable));
    }

    #[test]
    fn tie_with_equal_moves_goes_to_lower_placement() {
        let low = make_candidate(0.5, 2, &[("a", 1), ("b", 3)]);
        let high = make_candidate(0.5, 2, &[("a", 2), ("b", 1)]);
        assert!(low.beats(&high));
        assert!(!high.beats(&low));
        assert!(!low.beats(&low.clone()), "a candidate never beats itself");
    }

    #[test]
    fn warm_schedule_accepts_worsening_moves() {
        let config = SearchConfig {
            max_iterations: 2000,
            stall_limit: u32::MAX,
            ..Default::default()
        };
        let (_, stats) = run(&mixed_rack(), &config);
        assert!(stats.accepted > stats.improved, "{stats:?}");
        assert!(stats.worsening > 0, "{stats:?}");
    }

    #[test]
    fn cold_schedule_never_accepts_worsening_moves() {
        let snapshot = mixed_rack();
        let config = SearchConfig {
            max_iterations: 2000,
            stall_limit: u32::MAX,
            initial_temperature: 1e-300,
            final_temperature: 1e-300,
            ..Default::default()
        };
        let (best, stats) = run(&snapshot, &config);
        assert_eq!(stats.worsening, 0, "{stats:?}");
        let start = run(&snapshot, &SearchConfig { max_iterations: 0, ..config.clone() }).0;
        assert!(best.score + SCORE_EPSILON >= start.score);
    }

    #[test]
    fn scaffold_section_matches_defaults() {
        let scaffold = rackplan_core::config::PlannerConfig::scaffold();
        let config = scaffold.search.as_ref().map(SearchConfig::from_section);
        assert_eq!(config, Some(SearchConfig::default()));
    }

    #[test]
    fn temperature_cools_geometrically() {
        let config = SearchConfig::default();
        assert!((config.temperature(0) - 0.05).abs() < 1e-15);
        assert!((config.temperature(config.max_iterations) - 0.0005).abs() < 1e-12);
        let mid = config.temperature(config.max_iterations / 2);
        assert!((mid - 0.005).abs() < 1e-9, "midpoint of a geometric schedule, got {mid}");
    }

    #[test]
    fn section_overrides_defaults() {
        let config = SearchConfig::from_section(&SearchSection {
            max_iterations: Some(10),
            time_budget_ms: Some(250),
            ..Default::default()
        });
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.time_budget, Some(Duration::from_millis(250)));
        assert_eq!(config.stall_limit, 800);
    }

    #[test]
    fn invalid_schedule_rejected() {
        let config = SearchConfig {
            final_temperature: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = SearchConfig {
            swap_probability: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(SearchConfig::default().validate().is_ok());
    }

    #[test]
    fn cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let handle = flag.clone();
        assert!(!flag.is_cancelled());
        handle.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn stop_reason_serializes_snake_case() {
        let json = serde_json::to_string(&StopReason::IterationBudget).unwrap();
        assert_eq!(json, "\"iteration_budget\"");
    }
}

//! Objective scoring for candidate placements.
//!
//! Evaluates a placement with a weighted combination of:
//! - **Cable**: network gear near the top, short runs between connected devices
//! - **Weight**: low centre of mass, headroom below the weight rating
//! - **Thermal**: headroom below the hotspot threshold, no hotspots or conflicts
//! - **Access**: frequently serviced gear at working height, rarely serviced
//!   gear at the extremes
//!
//! Every objective is normalized to `[0, 1]`, higher is better.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use rackplan_core::ValidationError;
use rackplan_core::config::{PlannerConfig, ScoringSection, WeightsSection};
use rackplan_core::placement::{Placement, UnitRange};
use rackplan_core::types::{AccessTier, Connection, Device, DeviceRole, Rack};
use rackplan_thermal::ThermalReport;

/// Per-objective scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub cable: f64,
    pub weight: f64,
    pub thermal: f64,
    pub access: f64,
}

impl ScoreBreakdown {
    /// Weighted sum. `weights` are expected to be normalized.
    pub fn weighted(&self, weights: &ObjectiveWeights) -> f64 {
        weights.cable * self.cable
            + weights.weight * self.weight
            + weights.thermal * self.thermal
            + weights.access * self.access
    }
}

/// Relative importance of the four objectives.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveWeights {
    pub cable: f64,
    pub weight: f64,
    pub thermal: f64,
    pub access: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self {
            cable: 0.30,
            weight: 0.25,
            thermal: 0.25,
            access: 0.20,
        }
    }
}

impl ObjectiveWeights {
    pub fn new(cable: f64, weight: f64, thermal: f64, access: f64) -> Self {
        Self {
            cable,
            weight,
            thermal,
            access,
        }
    }

    /// Equal weight on every objective.
    pub fn even() -> Self {
        Self::new(0.25, 0.25, 0.25, 0.25)
    }

    pub fn from_section(section: &WeightsSection) -> Self {
        let d = Self::default();
        Self {
            cable: section.cable.unwrap_or(d.cable),
            weight: section.weight.unwrap_or(d.weight),
            thermal: section.thermal.unwrap_or(d.thermal),
            access: section.access.unwrap_or(d.access),
        }
    }

    fn components(&self) -> [(&'static str, f64); 4] {
        [
            ("cable", self.cable),
            ("weight", self.weight),
            ("thermal", self.thermal),
            ("access", self.access),
        ]
    }

    /// Scale to sum to 1. Rejects negative or non-finite components and
    /// the all-zero vector.
    pub fn normalized(&self) -> Result<ObjectiveWeights, ValidationError> {
        for (name, value) in self.components() {
            if !value.is_finite() || value < 0.0 {
                return Err(ValidationError::InvalidWeights(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        let sum = self.cable + self.weight + self.thermal + self.access;
        if !sum.is_finite() {
            return Err(ValidationError::InvalidWeights(
                "weights are too large to normalize".to_string(),
            ));
        }
        if sum <= 0.0 {
            return Err(ValidationError::InvalidWeights(
                "at least one weight must be positive".to_string(),
            ));
        }
        Ok(Self {
            cable: self.cable / sum,
            weight: self.weight / sum,
            thermal: self.thermal / sum,
            access: self.access / sum,
        })
    }
}

/// Shape parameters of the individual objectives.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Lower edge of the working-height band, as a fraction of rack height.
    pub ergonomic_low: f64,
    /// Upper edge of the working-height band, as a fraction of rack height.
    pub ergonomic_high: f64,
    /// Thermal score divisor added per hotspot unit.
    pub hotspot_penalty: f64,
    /// Thermal score divisor added per airflow conflict.
    pub conflict_penalty: f64,
    /// Share of the weight rating above which the weight score is reduced.
    pub ceiling_soft_ratio: f64,
    /// Largest reduction applied at 100 % of the weight rating.
    pub ceiling_penalty: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            ergonomic_low: 0.35,
            ergonomic_high: 0.80,
            hotspot_penalty: 0.15,
            conflict_penalty: 0.10,
            ceiling_soft_ratio: 0.8,
            ceiling_penalty: 0.5,
        }
    }
}

impl ScoringConfig {
    pub fn from_section(section: &ScoringSection) -> Self {
        let d = Self::default();
        Self {
            ergonomic_low: section.ergonomic_low.unwrap_or(d.ergonomic_low),
            ergonomic_high: section.ergonomic_high.unwrap_or(d.ergonomic_high),
            hotspot_penalty: section.hotspot_penalty.unwrap_or(d.hotspot_penalty),
            conflict_penalty: section.conflict_penalty.unwrap_or(d.conflict_penalty),
            ceiling_soft_ratio: section.ceiling_soft_ratio.unwrap_or(d.ceiling_soft_ratio),
            ceiling_penalty: section.ceiling_penalty.unwrap_or(d.ceiling_penalty),
        }
    }

    pub fn from_planner_config(config: &PlannerConfig) -> Self {
        config
            .scoring
            .as_ref()
            .map(Self::from_section)
            .unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let bad = |msg: &str| Err(ValidationError::InvalidConfig(format!("scoring: {msg}")));
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        let fields = [
            ("ergonomic_low", self.ergonomic_low),
            ("ergonomic_high", self.ergonomic_high),
            ("hotspot_penalty", self.hotspot_penalty),
            ("conflict_penalty", self.conflict_penalty),
            ("ceiling_soft_ratio", self.ceiling_soft_ratio),
            ("ceiling_penalty", self.ceiling_penalty),
        ];
        if let Some((name, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ValidationError::InvalidConfig(format!(
                "scoring: {name} must be a finite number"
            )));
        }
        if !in_unit(self.ergonomic_low) || !in_unit(self.ergonomic_high) {
            return bad("ergonomic band must lie within [0, 1]");
        }
        if self.ergonomic_low > self.ergonomic_high {
            return bad("ergonomic_low must not exceed ergonomic_high");
        }
        if !(self.hotspot_penalty >= 0.0 && self.conflict_penalty >= 0.0) {
            return bad("penalties must be non-negative");
        }
        if !(self.ceiling_soft_ratio > 0.0 && self.ceiling_soft_ratio <= 1.0) {
            return bad("ceiling_soft_ratio must be in (0, 1]");
        }
        if !in_unit(self.ceiling_penalty) {
            return bad("ceiling_penalty must be in [0, 1]");
        }
        Ok(())
    }
}

/// Scores placements of one rack's devices.
pub struct Scorer<'a> {
    rack: &'a Rack,
    by_id: HashMap<&'a str, &'a Device>,
    connections: &'a [Connection],
    config: ScoringConfig,
}

impl<'a> Scorer<'a> {
    pub fn new(
        rack: &'a Rack,
        devices: &'a [Device],
        connections: &'a [Connection],
        config: &ScoringConfig,
    ) -> Self {
        Self {
            rack,
            by_id: devices.iter().map(|d| (d.id.as_str(), d)).collect(),
            connections,
            config: config.clone(),
        }
    }

    /// True when no cabling was supplied and the cable score falls back
    /// to the positional heuristic.
    pub fn cable_is_approximate(&self) -> bool {
        self.connections.is_empty()
    }

    /// Score `placement` given its thermal report.
    pub fn score(&self, placement: &Placement, report: &ThermalReport) -> ScoreBreakdown {
        let placed: Vec<(&Device, UnitRange)> = placement
            .iter()
            .filter_map(|(id, start)| {
                self.by_id
                    .get(id.as_str())
                    .map(|d| (*d, UnitRange::new(start, d.height_units)))
            })
            .collect();

        ScoreBreakdown {
            cable: cable_score(self.rack, &placed, self.connections),
            weight: weight_score(self.rack, &placed, &self.config),
            thermal: thermal_score(report, &self.config),
            access: access_score(self.rack, &placed, &self.config),
        }
    }
}

/// Distance between U1 and the top unit, never zero.
fn span(rack: &Rack) -> f64 {
    f64::from(rack.capacity_units.saturating_sub(1).max(1))
}

/// Weighted mean over the components that apply; 1.0 when none do.
fn blend(parts: &[(f64, Option<f64>)]) -> f64 {
    let (total, weight) = parts
        .iter()
        .filter_map(|(w, v)| v.map(|v| (w * v, *w)))
        .fold((0.0, 0.0), |(t, s), (wv, w)| (t + wv, s + w));
    if weight > 0.0 {
        (total / weight).clamp(0.0, 1.0)
    } else {
        1.0
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Cable objective.
///
/// With explicit connections: short vertical runs between connected
/// devices and network gear near the top. Without: network gear near the
/// top, every other device close to its nearest network device, and
/// devices of the same role kept together.
pub fn cable_score(rack: &Rack, placed: &[(&Device, UnitRange)], connections: &[Connection]) -> f64 {
    let span = span(rack);
    let network: Vec<&UnitRange> = placed
        .iter()
        .filter(|(d, _)| d.role.is_network())
        .map(|(_, r)| r)
        .collect();

    let near_top = mean(network.iter().map(|r| f64::from(r.end - 1) / span));

    if !connections.is_empty() {
        let mids: HashMap<&str, f64> = placed
            .iter()
            .map(|(d, r)| (d.id.as_str(), r.midpoint()))
            .collect();
        let run_length = mean(connections.iter().filter_map(|c| {
            let a = mids.get(c.a.as_str())?;
            let b = mids.get(c.b.as_str())?;
            Some((a - b).abs() / span)
        }));
        return blend(&[(0.7, run_length.map(|l| 1.0 - l)), (0.3, near_top)]);
    }

    let proximity = if network.is_empty() {
        None
    } else {
        mean(
            placed
                .iter()
                .filter(|(d, _)| !d.role.is_network())
                .map(|(_, r)| {
                    let nearest = network
                        .iter()
                        .map(|n| (n.midpoint() - r.midpoint()).abs())
                        .fold(f64::INFINITY, f64::min);
                    1.0 - nearest / span
                }),
        )
    };

    let mut groups: BTreeMap<DeviceRole, Vec<&UnitRange>> = BTreeMap::new();
    for (device, range) in placed {
        groups.entry(device.role).or_default().push(range);
    }
    let clustering = mean(groups.values().filter(|g| g.len() > 1).map(|ranges| {
        let used: u32 = ranges.iter().map(|r| r.len()).sum();
        let low = ranges.iter().map(|r| r.start).min().unwrap_or(1);
        let high = ranges.iter().map(|r| r.end).max().unwrap_or(1);
        f64::from(used) / f64::from(high - low + 1)
    }));

    blend(&[(0.4, near_top), (0.35, proximity), (0.25, clustering)])
}

/// Weight objective: low centre of mass, discounted near the weight rating.
pub fn weight_score(rack: &Rack, placed: &[(&Device, UnitRange)], config: &ScoringConfig) -> f64 {
    let total: f64 = placed.iter().map(|(d, _)| d.weight_kg).sum();
    if total <= 0.0 {
        return 1.0;
    }

    let centre = placed
        .iter()
        .map(|(d, r)| d.weight_kg * r.midpoint())
        .sum::<f64>()
        / total;
    let low_mass = 1.0 - ((centre - 1.0) / span(rack)).clamp(0.0, 1.0);

    let ceiling = match rack.max_weight_kg {
        Some(max) if max > 0.0 => {
            let ratio = total / max;
            let soft = config.ceiling_soft_ratio;
            let excess = if ratio <= soft {
                0.0
            } else if soft >= 1.0 {
                1.0
            } else {
                ((ratio - soft) / (1.0 - soft)).clamp(0.0, 1.0)
            };
            1.0 - config.ceiling_penalty * excess
        }
        _ => 1.0,
    };

    (low_mass * ceiling).clamp(0.0, 1.0)
}

/// Thermal objective from the evaluator's report.
pub fn thermal_score(report: &ThermalReport, config: &ScoringConfig) -> f64 {
    let headroom = 1.0 - report.mean_rise_ratio();
    let divisor = 1.0
        + config.hotspot_penalty * report.hotspots.len() as f64
        + config.conflict_penalty * report.airflow_conflicts.len() as f64;

    let cooling = match report.cooling.capacity_btu {
        Some(capacity) if !report.cooling.sufficient && report.cooling.heat_load_btu > 0.0 => {
            capacity / report.cooling.heat_load_btu
        }
        _ => 1.0,
    };

    (headroom / divisor * cooling).clamp(0.0, 1.0)
}

/// Access objective over devices with a frequent or rare service tier.
pub fn access_score(rack: &Rack, placed: &[(&Device, UnitRange)], config: &ScoringConfig) -> f64 {
    let span = span(rack);
    let band_low = 1.0 + config.ergonomic_low * span;
    let band_high = 1.0 + config.ergonomic_high * span;
    let top = f64::from(rack.capacity_units);

    let rated = placed.iter().filter_map(|(device, range)| {
        let mid = range.midpoint();
        match device.access {
            AccessTier::Frequent => {
                let outside = if mid < band_low {
                    band_low - mid
                } else if mid > band_high {
                    mid - band_high
                } else {
                    0.0
                };
                Some((1.0 - 2.0 * outside / span).max(0.0))
            }
            AccessTier::Rare => {
                let from_edge = (mid - 1.0).min(top - mid).max(0.0);
                Some((1.0 - from_edge / (span / 2.0)).clamp(0.0, 1.0))
            }
            AccessTier::Occasional => None,
        }
    });

    mean(rated).unwrap_or(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rackplan_thermal::{ThermalConfig, evaluate};

    fn make_rack(capacity: u32) -> Rack {
        Rack::new("r1", capacity)
    }

    fn make_device(id: &str, role: DeviceRole, height: u32) -> Device {
        let mut d = Device::new(id, height);
        d.role = role;
        d
    }

    fn at<'a>(device: &'a Device, start: u32) -> (&'a Device, UnitRange) {
        (device, UnitRange::new(start, device.height_units))
    }

    #[test]
    fn weights_normalize_to_one() {
        let w = ObjectiveWeights::new(2.0, 1.0, 1.0, 0.0).normalized().unwrap();
        assert!((w.cable - 0.5).abs() < 1e-12);
        assert!((w.cable + w.weight + w.thermal + w.access - 1.0).abs() < 1e-12);
    }

    #[test]
    fn all_zero_weights_rejected() {
        let err = ObjectiveWeights::new(0.0, 0.0, 0.0, 0.0).normalized().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidWeights(_)));
    }

    #[test]
    fn negative_or_nan_weight_rejected() {
        assert!(ObjectiveWeights::new(1.0, -0.1, 0.0, 0.0).normalized().is_err());
        assert!(ObjectiveWeights::new(f64::NAN, 1.0, 0.0, 0.0).normalized().is_err());
    }

    #[test]
    fn overflowing_weight_sum_rejected() {
        let err = ObjectiveWeights::new(1e308, 1e308, 0.0, 0.0).normalized().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidWeights(_)));
    }

    #[test]
    fn non_finite_penalties_rejected() {
        for config in [
            ScoringConfig {
                hotspot_penalty: f64::INFINITY,
                ..Default::default()
            },
            ScoringConfig {
                conflict_penalty: f64::INFINITY,
                ..Default::default()
            },
            ScoringConfig {
                hotspot_penalty: f64::NAN,
                ..Default::default()
            },
        ] {
            let err = config.validate().unwrap_err();
            assert!(matches!(err, ValidationError::InvalidConfig(_)), "{config:?}");
        }
    }

    #[test]
    fn scaffold_section_matches_defaults() {
        let scaffold = PlannerConfig::scaffold();
        let scoring = scaffold.scoring.as_ref().map(ScoringConfig::from_section);
        assert_eq!(scoring, Some(ScoringConfig::default()));
        let weights = scaffold.weights.as_ref().map(ObjectiveWeights::from_section);
        assert_eq!(weights, Some(ObjectiveWeights::default()));
    }

    #[test]
    fn default_weights_match_documented_split() {
        let w = ObjectiveWeights::default();
        assert_eq!((w.cable, w.weight, w.thermal, w.access), (0.30, 0.25, 0.25, 0.20));
        let partial = ObjectiveWeights::from_section(&WeightsSection {
            thermal: Some(0.9),
            ..Default::default()
        });
        assert_eq!(partial.thermal, 0.9);
        assert_eq!(partial.cable, 0.30);
    }

    #[test]
    fn scoring_config_rejects_inverted_band() {
        let config = ScoringConfig {
            ergonomic_low: 0.9,
            ergonomic_high: 0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(ScoringConfig::default().validate().is_ok());
    }

    #[test]
    fn switch_near_top_scores_higher() {
        let rack = make_rack(42);
        let switch = make_device("sw", DeviceRole::Switch, 1);
        let server = make_device("srv", DeviceRole::Server, 2);

        let high = cable_score(&rack, &[at(&switch, 42), at(&server, 38)], &[]);
        let low = cable_score(&rack, &[at(&switch, 1), at(&server, 38)], &[]);
        assert!(high > low, "top-of-rack switch ({high}) should beat bottom ({low})");
    }

    #[test]
    fn explicit_connections_reward_short_runs() {
        let rack = make_rack(42);
        let a = make_device("a", DeviceRole::Server, 1);
        let b = make_device("b", DeviceRole::Server, 1);
        let links = [Connection::new("a", "b")];

        let close = cable_score(&rack, &[at(&a, 10), at(&b, 11)], &links);
        let far = cable_score(&rack, &[at(&a, 1), at(&b, 42)], &links);
        assert!(close > far);
    }

    #[test]
    fn cable_score_is_neutral_without_structure() {
        let rack = make_rack(42);
        let lone = make_device("x", DeviceRole::Server, 1);
        assert_eq!(cable_score(&rack, &[at(&lone, 7)], &[]), 1.0);
        assert_eq!(cable_score(&rack, &[], &[]), 1.0);
    }

    #[test]
    fn heavy_device_low_scores_higher() {
        let rack = make_rack(42);
        let mut ups = make_device("ups", DeviceRole::Ups, 2);
        ups.weight_kg = 60.0;
        let mut sw = make_device("sw", DeviceRole::Switch, 1);
        sw.weight_kg = 3.0;
        let config = ScoringConfig::default();

        let low = weight_score(&rack, &[at(&ups, 1), at(&sw, 42)], &config);
        let high = weight_score(&rack, &[at(&ups, 40), at(&sw, 1)], &config);
        assert!(low > high);
        assert!((0.0..=1.0).contains(&low) && (0.0..=1.0).contains(&high));
    }

    #[test]
    fn weight_near_rating_is_discounted() {
        let mut rack = make_rack(42);
        let mut heavy = make_device("h", DeviceRole::Storage, 2);
        heavy.weight_kg = 95.0;
        let config = ScoringConfig::default();

        let unrated = weight_score(&rack, &[at(&heavy, 1)], &config);
        rack.max_weight_kg = Some(100.0);
        let rated = weight_score(&rack, &[at(&heavy, 1)], &config);
        assert!(rated < unrated);
        // 95 % of rating: excess (0.95 - 0.8) / 0.2 = 0.75, factor 1 - 0.5 * 0.75.
        assert!((rated / unrated - 0.625).abs() < 1e-9);
    }

    #[test]
    fn weightless_devices_are_neutral() {
        let rack = make_rack(42);
        let d = make_device("d", DeviceRole::Server, 1);
        assert_eq!(weight_score(&rack, &[at(&d, 40)], &ScoringConfig::default()), 1.0);
    }

    #[test]
    fn frequent_access_prefers_working_height() {
        let rack = make_rack(42);
        let mut kvm = make_device("kvm", DeviceRole::Other, 1);
        kvm.access = AccessTier::Frequent;
        let config = ScoringConfig::default();

        assert_eq!(access_score(&rack, &[at(&kvm, 25)], &config), 1.0);
        assert!(access_score(&rack, &[at(&kvm, 1)], &config) < 1.0);
    }

    #[test]
    fn rare_access_prefers_extremes() {
        let rack = make_rack(42);
        let mut archive = make_device("tape", DeviceRole::Storage, 1);
        archive.access = AccessTier::Rare;
        let config = ScoringConfig::default();

        let bottom = access_score(&rack, &[at(&archive, 1)], &config);
        let middle = access_score(&rack, &[at(&archive, 21)], &config);
        let top = access_score(&rack, &[at(&archive, 42)], &config);
        assert_eq!(bottom, 1.0);
        assert_eq!(top, 1.0);
        assert!(middle < 0.1);
    }

    #[test]
    fn occasional_access_is_ignored() {
        let rack = make_rack(42);
        let d = make_device("d", DeviceRole::Server, 1);
        assert_eq!(access_score(&rack, &[at(&d, 1)], &ScoringConfig::default()), 1.0);
    }

    #[test]
    fn thermal_score_drops_with_hotspots() {
        let mut rack = make_rack(42);
        rack.max_inlet_temp_c = Some(27.0);
        let mut hot = make_device("hot", DeviceRole::Server, 1);
        hot.power_watts = 900.0;
        let devices = vec![hot];
        let config = ScoringConfig::default();

        let cool = evaluate(&rack, &devices, &Placement::new(), &ThermalConfig::default()).unwrap();
        let placement: Placement = [("hot".to_string(), 10)].into_iter().collect();
        let warm = evaluate(&rack, &devices, &placement, &ThermalConfig::default()).unwrap();

        assert_eq!(thermal_score(&cool, &config), 1.0);
        assert!(!warm.hotspots.is_empty());
        assert!(thermal_score(&warm, &config) < thermal_score(&cool, &config));
    }

    #[test]
    fn thermal_score_penalizes_cooling_deficit() {
        let mut rack = make_rack(42);
        let mut d = make_device("d", DeviceRole::Server, 1);
        d.power_watts = 100.0;
        let devices = vec![d];
        let placement: Placement = [("d".to_string(), 42)].into_iter().collect();
        let config = ScoringConfig::default();

        let unrated = evaluate(&rack, &devices, &placement, &ThermalConfig::default()).unwrap();
        rack.cooling_capacity_btu = Some(170.6);
        let short = evaluate(&rack, &devices, &placement, &ThermalConfig::default()).unwrap();
        assert!(!short.cooling.sufficient);
        let ratio = thermal_score(&short, &config) / thermal_score(&unrated, &config);
        assert!((ratio - 0.5).abs() < 1e-9);
    }

    #[test]
    fn breakdown_weighted_sum() {
        let b = ScoreBreakdown {
            cable: 1.0,
            weight: 0.5,
            thermal: 0.0,
            access: 1.0,
        };
        let w = ObjectiveWeights::even();
        assert!((b.weighted(&w) - 0.625).abs() < 1e-12);
    }
}

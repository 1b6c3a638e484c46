//! rackplan.toml configuration parser.
//!
//! Every section and field is optional. The evaluator and optimizer crates
//! turn their section into a runtime config with defaults filled in.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub thermal: Option<ThermalSection>,
    pub search: Option<SearchSection>,
    pub weights: Option<WeightsSection>,
    pub scoring: Option<ScoringSection>,
}

/// Coefficients of the unit-level heat model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThermalSection {
    pub watts_to_btu: Option<f64>,
    pub decay: Option<f64>,
    pub recirculation_fraction: Option<f64>,
    pub default_cfm_per_unit: Option<f64>,
    pub default_hotspot_margin_c: Option<f64>,
    pub adjacency_gap_units: Option<u32>,
}

/// Local-search budget and annealing schedule.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSection {
    pub max_iterations: Option<u32>,
    pub stall_limit: Option<u32>,
    pub time_budget_ms: Option<u64>,
    pub initial_temperature: Option<f64>,
    pub final_temperature: Option<f64>,
    pub swap_probability: Option<f64>,
    pub seed: Option<u64>,
}

/// Default objective weights.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightsSection {
    pub cable: Option<f64>,
    pub weight: Option<f64>,
    pub thermal: Option<f64>,
    pub access: Option<f64>,
}

/// Shape of the individual objective functions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringSection {
    pub ergonomic_low: Option<f64>,
    pub ergonomic_high: Option<f64>,
    pub hotspot_penalty: Option<f64>,
    pub conflict_penalty: Option<f64>,
    pub ceiling_soft_ratio: Option<f64>,
    pub ceiling_penalty: Option<f64>,
}

impl PlannerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PlannerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// A config with every knob spelled out at its default value.
    pub fn scaffold() -> Self {
        PlannerConfig {
            thermal: Some(ThermalSection {
                watts_to_btu: Some(crate::types::WATTS_TO_BTU),
                decay: Some(0.5),
                recirculation_fraction: Some(0.2),
                default_cfm_per_unit: Some(30.0),
                default_hotspot_margin_c: Some(10.0),
                adjacency_gap_units: Some(0),
            }),
            search: Some(SearchSection {
                max_iterations: Some(4000),
                stall_limit: Some(800),
                time_budget_ms: None,
                initial_temperature: Some(0.05),
                final_temperature: Some(0.0005),
                swap_probability: Some(0.5),
                seed: Some(42),
            }),
            weights: Some(WeightsSection {
                cable: Some(0.30),
                weight: Some(0.25),
                thermal: Some(0.25),
                access: Some(0.20),
            }),
            scoring: Some(ScoringSection {
                ergonomic_low: Some(0.35),
                ergonomic_high: Some(0.80),
                hotspot_penalty: Some(0.15),
                conflict_penalty: Some(0.10),
                ceiling_soft_ratio: Some(0.8),
                ceiling_penalty: Some(0.5),
            }),
        }
    }
}

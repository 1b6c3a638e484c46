//! Thermal model coefficients.

use rackplan_core::ValidationError;
use rackplan_core::config::{PlannerConfig, ThermalSection};
use rackplan_core::types::{Rack, WATTS_TO_BTU};

/// Sensible-heat relation for air: temperature rise (°C) per watt per CFM.
pub const SENSIBLE_HEAT_C_PER_W_CFM: f64 = 1.756;

/// Coefficients for the unit-level heat model.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalConfig {
    /// Watts → BTU/hr factor for cooling accounting.
    pub watts_to_btu: f64,
    /// Geometric decay of a device's rise per unit of height above it.
    pub decay: f64,
    /// Share of exhaust heat that reaches the intake plane.
    pub recirculation_fraction: f64,
    /// Airflow per unit when the rack does not declare a CFM rating.
    pub default_cfm_per_unit: f64,
    /// Hotspot margin above ambient when the rack has no inlet limit.
    pub default_hotspot_margin_c: f64,
    /// Largest gap (in units) still treated as adjacent for airflow.
    pub adjacency_gap_units: u32,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            watts_to_btu: WATTS_TO_BTU,
            decay: 0.5,
            recirculation_fraction: 0.2,
            default_cfm_per_unit: 30.0,
            default_hotspot_margin_c: 10.0,
            adjacency_gap_units: 0,
        }
    }
}

impl ThermalConfig {
    /// Build from the `[thermal]` TOML section, filling defaults.
    pub fn from_section(section: &ThermalSection) -> Self {
        let d = Self::default();
        Self {
            watts_to_btu: section.watts_to_btu.unwrap_or(d.watts_to_btu),
            decay: section.decay.unwrap_or(d.decay),
            recirculation_fraction: section
                .recirculation_fraction
                .unwrap_or(d.recirculation_fraction),
            default_cfm_per_unit: section
                .default_cfm_per_unit
                .unwrap_or(d.default_cfm_per_unit),
            default_hotspot_margin_c: section
                .default_hotspot_margin_c
                .unwrap_or(d.default_hotspot_margin_c),
            adjacency_gap_units: section
                .adjacency_gap_units
                .unwrap_or(d.adjacency_gap_units),
        }
    }

    pub fn from_planner_config(config: &PlannerConfig) -> Self {
        config
            .thermal
            .as_ref()
            .map(Self::from_section)
            .unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let bad = |msg: &str| Err(ValidationError::InvalidConfig(format!("thermal: {msg}")));
        if !(0.0..1.0).contains(&self.decay) {
            return bad("decay must be in [0, 1)");
        }
        if !self.recirculation_fraction.is_finite() || self.recirculation_fraction < 0.0 {
            return bad("recirculation_fraction must be non-negative");
        }
        if !self.default_cfm_per_unit.is_finite() || self.default_cfm_per_unit <= 0.0 {
            return bad("default_cfm_per_unit must be positive");
        }
        if !self.default_hotspot_margin_c.is_finite() || self.default_hotspot_margin_c <= 0.0 {
            return bad("default_hotspot_margin_c must be positive");
        }
        if !self.watts_to_btu.is_finite() || self.watts_to_btu <= 0.0 {
            return bad("watts_to_btu must be positive");
        }
        Ok(())
    }

    /// Temperature rise (°C) contributed per watt to a 1U slot.
    pub fn rise_per_watt(&self, rack: &Rack) -> f64 {
        let cfm_per_unit = rack
            .airflow_cfm
            .map(|cfm| cfm / f64::from(rack.capacity_units.max(1)))
            .unwrap_or(self.default_cfm_per_unit);
        self.recirculation_fraction * SENSIBLE_HEAT_C_PER_W_CFM / cfm_per_unit
    }

    /// Temperature above which a unit is a hotspot.
    pub fn hotspot_threshold(&self, rack: &Rack) -> f64 {
        rack.max_inlet_temp_c
            .unwrap_or(rack.ambient_temp_c + self.default_hotspot_margin_c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_overrides_only_given_fields() {
        let section = ThermalSection {
            decay: Some(0.3),
            ..Default::default()
        };
        let config = ThermalConfig::from_section(&section);
        assert_eq!(config.decay, 0.3);
        assert_eq!(config.default_cfm_per_unit, 30.0);
    }

    #[test]
    fn missing_section_gives_defaults() {
        let config = ThermalConfig::from_planner_config(&PlannerConfig::default());
        assert_eq!(config, ThermalConfig::default());
    }

    #[test]
    fn scaffold_section_matches_defaults() {
        let scaffold = PlannerConfig::scaffold();
        let config = scaffold.thermal.as_ref().map(ThermalConfig::from_section);
        assert_eq!(config, Some(ThermalConfig::default()));
    }

    #[test]
    fn rejects_decay_of_one() {
        let config = ThermalConfig {
            decay: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(ThermalConfig::default().validate().is_ok());
    }

    #[test]
    fn rack_airflow_drives_rise() {
        let config = ThermalConfig::default();
        let mut rack = Rack::new("r1", 42);
        let fallback = config.rise_per_watt(&rack);

        rack.airflow_cfm = Some(42.0 * 60.0);
        let generous = config.rise_per_watt(&rack);
        assert!(generous < fallback, "more airflow should lower the rise per watt");
    }

    #[test]
    fn threshold_prefers_rack_inlet_limit() {
        let config = ThermalConfig::default();
        let mut rack = Rack::new("r1", 42);
        assert_eq!(config.hotspot_threshold(&rack), 32.0);
        rack.max_inlet_temp_c = Some(27.0);
        assert_eq!(config.hotspot_threshold(&rack), 27.0);
    }
}

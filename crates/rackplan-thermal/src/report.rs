//! Thermal report returned for a single (rack, placement) pair.

use serde::{Deserialize, Serialize};

use rackplan_core::types::{DeviceId, RackId};

/// Outcome of a thermal evaluation. Hotspots, conflicts, and an
/// insufficient cooling verdict are warnings, not errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalReport {
    pub rack_id: RackId,
    /// Intake temperature the profile starts from (°C).
    pub ambient_c: f64,
    /// Hotspot threshold in effect (°C).
    pub threshold_c: f64,
    /// Estimated temperature per unit; index 0 is U1.
    pub unit_temperatures_c: Vec<f64>,
    pub peak_temp_c: f64,
    /// Units above the threshold, ascending.
    pub hotspots: Vec<u32>,
    pub airflow_conflicts: Vec<AirflowConflict>,
    pub cooling: CoolingVerdict,
    pub power: PowerSummary,
}

/// Two adjacent devices whose exhaust and intake faces meet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirflowConflict {
    /// Lower device first.
    pub devices: [DeviceId; 2],
    pub reason: String,
}

impl AirflowConflict {
    pub fn involves(&self, id: &str) -> bool {
        self.devices.iter().any(|d| d == id)
    }
}

/// Heat load against the rack's cooling rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoolingVerdict {
    pub sufficient: bool,
    /// Headroom when sufficient, deficit when not; `None` when the rack
    /// has no cooling rating.
    pub margin_btu: Option<f64>,
    pub heat_load_btu: f64,
    pub capacity_btu: Option<f64>,
}

/// Power draw against the rack's power rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerSummary {
    pub total_watts: f64,
    pub max_watts: Option<f64>,
    pub within_limit: bool,
}

impl ThermalReport {
    /// Temperature of a 1-based unit.
    pub fn temperature_at(&self, unit: u32) -> Option<f64> {
        let idx = usize::try_from(unit).ok()?.checked_sub(1)?;
        self.unit_temperatures_c.get(idx).copied()
    }

    pub fn is_hotspot(&self, unit: u32) -> bool {
        self.hotspots.binary_search(&unit).is_ok()
    }

    /// No hotspots, no conflicts, and cooling not exceeded.
    pub fn is_clean(&self) -> bool {
        self.hotspots.is_empty() && self.airflow_conflicts.is_empty() && self.cooling.sufficient
    }

    /// Mean of each unit's rise over ambient as a share of the allowed rise
    /// (threshold − ambient), each clamped to `[0, 1]`.
    pub fn mean_rise_ratio(&self) -> f64 {
        let allowed = self.threshold_c - self.ambient_c;
        if self.unit_temperatures_c.is_empty() {
            return 0.0;
        }
        if allowed <= 0.0 {
            return if self.peak_temp_c > self.ambient_c { 1.0 } else { 0.0 };
        }
        let total: f64 = self
            .unit_temperatures_c
            .iter()
            .map(|t| ((t - self.ambient_c) / allowed).clamp(0.0, 1.0))
            .sum();
        total / self.unit_temperatures_c.len() as f64
    }
}

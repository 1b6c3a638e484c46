//! Thermal evaluation of a concrete placement.

use std::collections::HashMap;

use tracing::debug;

use rackplan_core::error::RackResult;
use rackplan_core::placement::{Placement, UnitRange};
use rackplan_core::types::{Device, Rack};

use crate::airflow::detect_conflicts;
use crate::config::ThermalConfig;
use crate::model::unit_profile;
use crate::report::{CoolingVerdict, PowerSummary, ThermalReport};

/// Evaluator bound to one rack and its device records.
///
/// Build once per request and call [`ThermalEvaluator::evaluate`] for
/// every candidate placement.
pub struct ThermalEvaluator<'a> {
    rack: &'a Rack,
    devices: &'a [Device],
    by_id: HashMap<&'a str, &'a Device>,
    config: ThermalConfig,
}

impl<'a> ThermalEvaluator<'a> {
    pub fn new(rack: &'a Rack, devices: &'a [Device], config: &ThermalConfig) -> Self {
        Self {
            rack,
            devices,
            by_id: devices.iter().map(|d| (d.id.as_str(), d)).collect(),
            config: config.clone(),
        }
    }

    /// Evaluate `placement`. Fails only when the placement breaks the
    /// capacity, overlap, or lock invariants or names an unknown device.
    pub fn evaluate(&self, placement: &Placement) -> RackResult<ThermalReport> {
        placement.validate(self.rack, self.devices)?;

        let placed: Vec<(&Device, UnitRange)> = placement
            .iter()
            .filter_map(|(id, start)| {
                self.by_id
                    .get(id.as_str())
                    .map(|d| (*d, UnitRange::new(start, d.height_units)))
            })
            .collect();

        let unit_temperatures_c = unit_profile(self.rack, &placed, &self.config);
        let ambient = self.rack.ambient_temp_c;
        let threshold = self.config.hotspot_threshold(self.rack);

        let hotspots: Vec<u32> = unit_temperatures_c
            .iter()
            .zip(self.rack.units())
            .filter(|(t, _)| **t > threshold && **t > ambient)
            .map(|(_, unit)| unit)
            .collect();

        let peak_temp_c = unit_temperatures_c.iter().copied().fold(ambient, f64::max);

        let airflow_conflicts = detect_conflicts(&placed, self.config.adjacency_gap_units);

        let total_watts: f64 = placed.iter().map(|(d, _)| d.power_watts).sum();
        let cooling = self.cooling_verdict(total_watts);
        let power = PowerSummary {
            total_watts,
            max_watts: self.rack.max_power_watts,
            within_limit: self.rack.max_power_watts.is_none_or(|max| total_watts <= max),
        };

        debug!(
            rack = %self.rack.id,
            devices = placed.len(),
            hotspots = hotspots.len(),
            conflicts = airflow_conflicts.len(),
            peak_c = peak_temp_c,
            cooling_ok = cooling.sufficient,
            "evaluated placement"
        );

        Ok(ThermalReport {
            rack_id: self.rack.id.clone(),
            ambient_c: ambient,
            threshold_c: threshold,
            unit_temperatures_c,
            peak_temp_c,
            hotspots,
            airflow_conflicts,
            cooling,
            power,
        })
    }

    fn cooling_verdict(&self, total_watts: f64) -> CoolingVerdict {
        let heat_load_btu = total_watts * self.config.watts_to_btu;
        match self.rack.cooling_capacity_btu {
            None => CoolingVerdict {
                sufficient: true,
                margin_btu: None,
                heat_load_btu,
                capacity_btu: None,
            },
            Some(capacity) => {
                let sufficient = heat_load_btu <= capacity;
                CoolingVerdict {
                    sufficient,
                    margin_btu: Some((capacity - heat_load_btu).abs()),
                    heat_load_btu,
                    capacity_btu: Some(capacity),
                }
            }
        }
    }
}

/// Evaluate one placement without keeping an evaluator around.
pub fn evaluate(
    rack: &Rack,
    devices: &[Device],
    placement: &Placement,
    config: &ThermalConfig,
) -> RackResult<ThermalReport> {
    ThermalEvaluator::new(rack, devices, config).evaluate(placement)
}

//! Unit-level heat accumulation.
//!
//! Each device adds a local rise proportional to its power, spread evenly
//! over its own units. Warm exhaust rises: every unit above the device
//! receives the local rise scaled by `decay^distance`. Contributions from
//! all devices are summed on top of the ambient baseline.

use rackplan_core::placement::UnitRange;
use rackplan_core::types::{Device, Rack};

use crate::config::ThermalConfig;

/// Increments below this are dropped.
const NEGLIGIBLE_RISE_C: f64 = 1e-9;

/// Per-unit temperature profile (index 0 = U1).
pub fn unit_profile(rack: &Rack, placed: &[(&Device, UnitRange)], config: &ThermalConfig) -> Vec<f64> {
    let capacity = rack.capacity_units;
    let mut temps = vec![rack.ambient_temp_c; capacity as usize];
    let rise_per_watt = config.rise_per_watt(rack);

    for (device, range) in placed {
        let local = device.power_watts * rise_per_watt / f64::from(device.height_units);
        if local <= 0.0 {
            continue;
        }

        for unit in range.start..=range.end.min(capacity) {
            temps[(unit - 1) as usize] += local;
        }

        let mut increment = local;
        for unit in (range.end + 1)..=capacity {
            increment *= config.decay;
            if increment < NEGLIGIBLE_RISE_C {
                break;
            }
            temps[(unit - 1) as usize] += increment;
        }
    }

    temps
}

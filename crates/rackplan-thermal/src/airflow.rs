//! Airflow conflict detection between vertically adjacent devices.

use rackplan_core::placement::UnitRange;
use rackplan_core::types::Device;

use crate::report::AirflowConflict;

/// Pairs of devices within `max_gap` units of each other whose declared
/// airflow directions oppose. Lower device first, ordered by position.
pub fn detect_conflicts(placed: &[(&Device, UnitRange)], max_gap: u32) -> Vec<AirflowConflict> {
    let mut ordered: Vec<&(&Device, UnitRange)> = placed.iter().collect();
    ordered.sort_by(|a, b| a.1.start.cmp(&b.1.start).then_with(|| a.0.id.cmp(&b.0.id)));

    let mut conflicts = Vec::new();
    for (i, (lower, lower_range)) in ordered.iter().enumerate() {
        for (upper, upper_range) in ordered.iter().skip(i + 1) {
            let Some(gap) = lower_range.gap_to(upper_range) else {
                continue;
            };
            if gap > max_gap {
                break;
            }
            if lower.airflow.opposes(upper.airflow) {
                conflicts.push(AirflowConflict {
                    devices: [lower.id.clone(), upper.id.clone()],
                    reason: describe(lower, upper, gap),
                });
            }
        }
    }
    conflicts
}

fn describe(lower: &Device, upper: &Device, gap: u32) -> String {
    let spacing = if gap == 0 {
        "directly below".to_string()
    } else {
        format!("{gap}U below")
    };
    format!(
        "{} ({}) sits {} {} ({}); one device's exhaust feeds the other's intake",
        lower.id,
        lower.airflow.label(),
        spacing,
        upper.id,
        upper.airflow.label(),
    )
}

//! Human-readable report formatting.

use std::collections::HashMap;

use rackplan_core::{Device, Placement, RackSnapshot};
use rackplan_optimizer::OptimizationResult;
use rackplan_thermal::ThermalReport;

pub fn format_thermal(report: &ThermalReport, devices: &[Device], placement: &Placement) -> String {
    let mut out = String::new();

    let status = if report.is_clean() { "OK" } else { "ATTENTION" };
    out.push_str("\n╔══════════════════════════════════════════╗\n");
    out.push_str("║  Rack Thermal Evaluation                 ║\n");
    out.push_str("╠══════════════════════════════════════════╣\n");
    out.push_str(&format!("║  Rack:      {:<29}║\n", report.rack_id));
    out.push_str(&format!("║  Ambient:   {:<29}║\n", format!("{:.1} °C", report.ambient_c)));
    out.push_str(&format!("║  Threshold: {:<29}║\n", format!("{:.1} °C", report.threshold_c)));
    out.push_str(&format!("║  Peak:      {:<29}║\n", format!("{:.1} °C", report.peak_temp_c)));
    out.push_str(&format!("║  Status:    {:<29}║\n", status));
    out.push_str("╚══════════════════════════════════════════╝\n\n");

    push_unit_table(&mut out, report, devices, placement);
    push_verdicts(&mut out, report);
    out
}

pub fn format_optimization(result: &OptimizationResult, snapshot: &RackSnapshot) -> String {
    let mut out = String::new();

    out.push_str("\n╔══════════════════════════════════════════╗\n");
    out.push_str("║  Rack Layout Proposal                    ║\n");
    out.push_str("╠══════════════════════════════════════════╣\n");
    out.push_str(&format!("║  Rack:     {:<30}║\n", result.rack_id));
    out.push_str(&format!("║  Score:    {:<30}║\n", format!("{:.4}", result.score)));
    out.push_str(&format!("║  Moves:    {:<30}║\n", result.moves_from_current));
    out.push_str(&format!("║  Stopped:  {:<30}║\n", result.stats.stop_reason.to_string()));
    out.push_str("╚══════════════════════════════════════════╝\n\n");

    let b = &result.breakdown;
    let w = &result.weights;
    out.push_str("SCORES (raw × weight):\n");
    out.push_str(&format!("  cable    {:.3} × {:.2}\n", b.cable, w.cable));
    out.push_str(&format!("  weight   {:.3} × {:.2}\n", b.weight, w.weight));
    out.push_str(&format!("  thermal  {:.3} × {:.2}\n", b.thermal, w.thermal));
    out.push_str(&format!("  access   {:.3} × {:.2}\n", b.access, w.access));
    if result.cable_score_approximate {
        out.push_str("  (no cabling supplied; cable score is positional)\n");
    }
    out.push('\n');

    let current = snapshot.current_placement();
    let moved: Vec<_> = result
        .placement
        .iter()
        .filter(|(id, start)| current.get(id) != Some(*start))
        .collect();
    if !moved.is_empty() {
        out.push_str("MOVES:\n\n");
        for (id, start) in moved {
            match current.get(id) {
                Some(from) => out.push_str(&format!("  • {id}: U{from} → U{start}\n")),
                None => out.push_str(&format!("  • {id}: unplaced → U{start}\n")),
            }
        }
        out.push('\n');
    }

    out.push_str(&format!(
        "Search: {} iterations, {} accepted ({} worsening), {} improving, {} infeasible\n\n",
        result.stats.iterations,
        result.stats.accepted,
        result.stats.worsening,
        result.stats.improved,
        result.stats.infeasible
    ));

    push_unit_table(&mut out, &result.thermal, &snapshot.devices, &result.placement);
    push_verdicts(&mut out, &result.thermal);
    out
}

/// Top unit first, one line per unit.
fn push_unit_table(out: &mut String, report: &ThermalReport, devices: &[Device], placement: &Placement) {
    let mut owner: HashMap<u32, &str> = HashMap::new();
    for device in devices {
        if let Some(range) = placement.range_of(device) {
            for unit in range.start..=range.end {
                owner.insert(unit, device.id.as_str());
            }
        }
    }

    out.push_str("  Unit  Device                 Temp\n");
    for (idx, temp) in report.unit_temperatures_c.iter().enumerate().rev() {
        let unit = idx as u32 + 1;
        let device = owner.get(&unit).copied().unwrap_or("·");
        let mark = if report.is_hotspot(unit) { "  🔥" } else { "" };
        out.push_str(&format!("  U{unit:<4} {device:<22} {temp:>5.1} °C{mark}\n"));
    }
    out.push('\n');
}

fn push_verdicts(out: &mut String, report: &ThermalReport) {
    if !report.airflow_conflicts.is_empty() {
        out.push_str("⚠️  AIRFLOW CONFLICTS:\n\n");
        for c in &report.airflow_conflicts {
            out.push_str(&format!("  • {} / {}: {}\n", c.devices[0], c.devices[1], c.reason));
        }
        out.push('\n');
    }

    let cooling = &report.cooling;
    match (cooling.capacity_btu, cooling.margin_btu) {
        (Some(capacity), Some(margin)) if cooling.sufficient => out.push_str(&format!(
            "✅ Cooling: {:.0} of {capacity:.0} BTU/hr ({margin:.0} headroom)\n",
            cooling.heat_load_btu
        )),
        (Some(capacity), Some(margin)) => out.push_str(&format!(
            "❌ Cooling: {:.0} of {capacity:.0} BTU/hr ({margin:.0} deficit)\n",
            cooling.heat_load_btu
        )),
        _ => out.push_str(&format!(
            "   Cooling: {:.0} BTU/hr (rack not rated)\n",
            cooling.heat_load_btu
        )),
    }

    let power = &report.power;
    match power.max_watts {
        Some(max) if power.within_limit => {
            out.push_str(&format!("✅ Power:   {:.0} of {max:.0} W\n", power.total_watts))
        }
        Some(max) => out.push_str(&format!("❌ Power:   {:.0} of {max:.0} W\n", power.total_watts)),
        None => out.push_str(&format!("   Power:   {:.0} W (rack not rated)\n", power.total_watts)),
    }
}

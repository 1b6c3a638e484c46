use rackplan_optimizer::ThermalQuery;
use rackplan_thermal::ThermalConfig;
use tracing::info;

use super::{load_config, load_inventory};
use crate::report;

pub fn thermal(inventory: &str, rack: &str, format: &str, config: Option<&str>) -> anyhow::Result<()> {
    println!("{}", render(inventory, rack, format, config)?);
    Ok(())
}

pub fn render(inventory: &str, rack: &str, format: &str, config: Option<&str>) -> anyhow::Result<String> {
    let planner = load_config(config)?;
    let inventory = load_inventory(inventory)?;
    let thermal = ThermalConfig::from_planner_config(&planner);

    let query = ThermalQuery::new(rack);
    let thermal_report = query.run(&inventory, &thermal)?;
    let snapshot = inventory.snapshot(rack)?;

    info!(
        rack,
        hotspots = thermal_report.hotspots.len(),
        conflicts = thermal_report.airflow_conflicts.len(),
        "thermal evaluation complete"
    );

    match format {
        "json" => Ok(serde_json::to_string_pretty(&thermal_report)?),
        _ => Ok(report::format_thermal(
            &thermal_report,
            &snapshot.devices,
            &snapshot.current_placement(),
        )),
    }
}

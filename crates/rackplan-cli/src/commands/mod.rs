pub mod config;
pub mod optimize;
pub mod thermal;

use std::path::Path;

use anyhow::Context;
use rackplan_core::{Inventory, PlannerConfig};

/// Load rackplan.toml when given, otherwise all defaults.
pub fn load_config(path: Option<&str>) -> anyhow::Result<PlannerConfig> {
    match path {
        Some(p) => PlannerConfig::from_file(Path::new(p))
            .with_context(|| format!("reading config {p}")),
        None => Ok(PlannerConfig::default()),
    }
}

pub fn load_inventory(path: &str) -> anyhow::Result<Inventory> {
    Inventory::from_file(Path::new(path)).with_context(|| format!("reading inventory {path}"))
}

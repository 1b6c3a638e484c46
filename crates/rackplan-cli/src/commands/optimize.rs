use std::time::Duration;

use anyhow::Context;
use rackplan_optimizer::{OptimizeRequest, Optimizer, OptimizerConfig, WeightsInput};

use super::{load_config, load_inventory};
use crate::report;

/// Everything `rackctl optimize` takes besides the output format.
#[derive(Debug, Default)]
pub struct OptimizeArgs {
    pub inventory: String,
    pub rack: String,
    pub lock: Vec<String>,
    pub weights: Option<String>,
    pub add: Vec<String>,
    pub seed: Option<u64>,
    pub max_iterations: Option<u32>,
    pub time_budget_ms: Option<u64>,
    pub config: Option<String>,
}

pub fn optimize(args: &OptimizeArgs, format: &str) -> anyhow::Result<()> {
    println!("{}", render(args, format)?);
    Ok(())
}

pub fn render(args: &OptimizeArgs, format: &str) -> anyhow::Result<String> {
    let planner = load_config(args.config.as_deref())?;
    let inventory = load_inventory(&args.inventory)?;

    let mut config = OptimizerConfig::from_planner_config(&planner);
    if let Some(n) = args.max_iterations {
        config.search.max_iterations = n;
    }
    if let Some(ms) = args.time_budget_ms {
        config.search.time_budget = Some(Duration::from_millis(ms));
    }

    let request = OptimizeRequest {
        rack_id: args.rack.clone(),
        locked: args.lock.clone(),
        weights: args.weights.as_deref().map(parse_weights).transpose()?,
        connections: None,
        seed: args.seed,
        additional_devices: args.add.clone(),
    };

    let result = request.run(&inventory, &Optimizer::new(config))?;

    match format {
        "json" => Ok(serde_json::to_string_pretty(&result)?),
        _ => {
            let snapshot = inventory.snapshot_with(&args.rack, &args.add)?;
            Ok(report::format_optimization(&result, &snapshot))
        }
    }
}

/// Parse `cable=0.3,thermal=1`. Keys left out are zero.
pub fn parse_weights(spec: &str) -> anyhow::Result<WeightsInput> {
    let mut weights = WeightsInput::default();
    for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("expected key=value, got '{pair}'"))?;
        let value: f64 = value
            .trim()
            .parse()
            .with_context(|| format!("weight '{}' is not a number", key.trim()))?;
        match key.trim() {
            "cable" => weights.cable = value,
            "weight" => weights.weight = value,
            "thermal" => weights.thermal = value,
            "access" => weights.access = value,
            other => anyhow::bail!("unknown objective '{other}' (expected cable, weight, thermal, access)"),
        }
    }
    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const INVENTORY: &str = r#"{
        "racks": [{"id": "r1", "capacity_units": 12}],
        "devices": [
            {"id": "core-sw", "role": "switch", "height_units": 1, "rack_id": "r1", "position": 1},
            {"id": "db", "role": "storage", "height_units": 2, "weight_kg": 30.0,
             "power_watts": 300.0, "rack_id": "r1", "position": 9},
            {"id": "pdu", "role": "pdu", "height_units": 1, "rack_id": "r1", "position": 5,
             "locked": true},
            {"id": "spare", "height_units": 1}
        ],
        "connections": [{"a": "core-sw", "b": "db"}]
    }"#;

    fn args(file: &tempfile::NamedTempFile) -> OptimizeArgs {
        OptimizeArgs {
            inventory: file.path().to_str().unwrap().to_string(),
            rack: "r1".to_string(),
            max_iterations: Some(300),
            ..Default::default()
        }
    }

    fn write_inventory() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(INVENTORY.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_weights() {
        let w = parse_weights("cable=1, thermal=0.5").unwrap();
        assert_eq!(w.cable, 1.0);
        assert_eq!(w.thermal, 0.5);
        assert_eq!(w.weight, 0.0);
        assert!(parse_weights("cable").is_err());
        assert!(parse_weights("cable=abc").is_err());
        assert!(parse_weights("speed=1").is_err());
    }

    #[test]
    fn test_json_output_keeps_locked_device() {
        let file = write_inventory();
        let out = render(&args(&file), "json").unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["placement"]["pdu"], 5);
        assert_eq!(json["cable_score_approximate"], false);
        assert!(json["score"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn test_lock_flag_and_additional_device() {
        let file = write_inventory();
        let mut a = args(&file);
        a.lock = vec!["db".to_string()];
        a.add = vec!["spare".to_string()];
        let out = render(&a, "json").unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["placement"]["db"], 9);
        assert!(json["placement"]["spare"].is_u64());
    }

    #[test]
    fn test_zero_weights_are_rejected() {
        let file = write_inventory();
        let mut a = args(&file);
        a.weights = Some("cable=0".to_string());
        let err = render(&a, "json").unwrap_err();
        assert!(err.to_string().contains("invalid objective weights"));
    }

    #[test]
    fn test_text_output_lists_moves() {
        let file = write_inventory();
        let out = render(&args(&file), "text").unwrap();
        assert!(out.contains("Rack Layout Proposal"));
        assert!(out.contains("SCORES"));
        assert!(out.contains("core-sw"));
    }
}

//! Request shapes resolved against an [`Inventory`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use rackplan_core::error::RackResult;
use rackplan_core::types::{Connection, DeviceId, RackId};
use rackplan_core::Inventory;
use rackplan_thermal::{ThermalConfig, ThermalReport, evaluate};

use crate::optimizer::{OptimizationResult, Optimizer};
use crate::scorer::ObjectiveWeights;

/// Objective weights as supplied by a caller. Keys left out count as zero,
/// so `{"cable": 1}` asks for cabling only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeightsInput {
    pub cable: f64,
    pub weight: f64,
    pub thermal: f64,
    pub access: f64,
}

impl From<WeightsInput> for ObjectiveWeights {
    fn from(w: WeightsInput) -> Self {
        ObjectiveWeights::new(w.cable, w.weight, w.thermal, w.access)
    }
}

/// Ask for a better layout of one rack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizeRequest {
    pub rack_id: RackId,
    /// Devices that must keep their position, on top of those flagged locked.
    #[serde(default)]
    pub locked: Vec<DeviceId>,
    /// Absent: the configured default weights.
    #[serde(default)]
    pub weights: Option<WeightsInput>,
    /// Replaces the inventory's cabling for this rack when present.
    #[serde(default)]
    pub connections: Option<Vec<Connection>>,
    /// Overrides the configured search seed.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Unplaced inventory devices to fit into the rack as well.
    #[serde(default)]
    pub additional_devices: Vec<DeviceId>,
}

impl OptimizeRequest {
    pub fn new(rack_id: impl Into<RackId>) -> Self {
        Self {
            rack_id: rack_id.into(),
            ..Default::default()
        }
    }

    pub fn run(&self, inventory: &Inventory, optimizer: &Optimizer) -> RackResult<OptimizationResult> {
        let mut snapshot = inventory.snapshot_with(&self.rack_id, &self.additional_devices)?;
        if let Some(connections) = &self.connections {
            snapshot.connections = connections.clone();
        }
        let weights = self.weights.map(ObjectiveWeights::from);

        debug!(
            rack = %self.rack_id,
            locked = self.locked.len(),
            extra = self.additional_devices.len(),
            custom_weights = weights.is_some(),
            "resolved optimize request"
        );

        match self.seed {
            Some(seed) if seed != optimizer.config().search.seed => {
                let mut config = optimizer.config().clone();
                config.search.seed = seed;
                Optimizer::new(config)
                    .with_cancel(optimizer.cancel_flag())
                    .optimize(&snapshot, &self.locked, weights.as_ref())
            }
            _ => optimizer.optimize(&snapshot, &self.locked, weights.as_ref()),
        }
    }
}

/// Ask for the thermal picture of one rack as currently laid out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermalQuery {
    pub rack_id: RackId,
}

impl ThermalQuery {
    pub fn new(rack_id: impl Into<RackId>) -> Self {
        Self {
            rack_id: rack_id.into(),
        }
    }

    pub fn run(&self, inventory: &Inventory, config: &ThermalConfig) -> RackResult<ThermalReport> {
        let snapshot = inventory.snapshot(&self.rack_id)?;
        snapshot.validate()?;
        config.validate()?;
        evaluate(
            &snapshot.rack,
            &snapshot.devices,
            &snapshot.current_placement(),
            config,
        )
    }
}

//! Inventory snapshots handed over by the storage layer.
//!
//! The storage layer owns racks, devices, and cabling. Each request gets
//! an [`Inventory`] snapshot and resolves one rack out of it; nothing here
//! is kept between calls.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::placement::Placement;
use crate::types::{Connection, Device, DeviceId, Rack};

/// Everything the storage layer knows, as one serializable snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Inventory {
    #[serde(default)]
    pub racks: Vec<Rack>,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

/// One rack with the devices mounted in it and the cables among them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RackSnapshot {
    pub rack: Rack,
    pub devices: Vec<Device>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Inventory {
    /// Load a JSON inventory file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let inventory: Inventory = serde_json::from_str(&content)?;
        Ok(inventory)
    }

    pub fn rack(&self, rack_id: &str) -> Option<&Rack> {
        self.racks.iter().find(|r| r.id == rack_id)
    }

    pub fn device(&self, device_id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == device_id)
    }

    /// Resolve a rack id to its snapshot.
    pub fn snapshot(&self, rack_id: &str) -> Result<RackSnapshot, ValidationError> {
        self.snapshot_with(rack_id, &[])
    }

    /// Resolve a rack id, also pulling in `extra` devices to be placed.
    ///
    /// Extra devices lose any previous mounting and join the rack unplaced.
    pub fn snapshot_with(
        &self,
        rack_id: &str,
        extra: &[DeviceId],
    ) -> Result<RackSnapshot, ValidationError> {
        let rack = self
            .rack(rack_id)
            .ok_or_else(|| ValidationError::UnknownRack(rack_id.to_string()))?
            .clone();

        let mut devices: Vec<Device> = self
            .devices
            .iter()
            .filter(|d| d.rack_id.as_deref() == Some(rack_id))
            .cloned()
            .collect();

        for id in extra {
            if devices.iter().any(|d| &d.id == id) {
                continue;
            }
            let mut device = self
                .device(id)
                .ok_or_else(|| ValidationError::UnknownDevice(id.clone()))?
                .clone();
            device.rack_id = Some(rack_id.to_string());
            device.position = None;
            device.locked = false;
            devices.push(device);
        }

        let members: HashSet<&str> = devices.iter().map(|d| d.id.as_str()).collect();
        let connections = self
            .connections
            .iter()
            .filter(|c| members.contains(c.a.as_str()) && members.contains(c.b.as_str()))
            .cloned()
            .collect();

        Ok(RackSnapshot {
            rack,
            devices,
            connections,
        })
    }
}

impl RackSnapshot {
    pub fn new(rack: Rack, devices: Vec<Device>) -> Self {
        Self {
            rack,
            devices,
            connections: Vec::new(),
        }
    }

    pub fn with_connections(mut self, connections: Vec<Connection>) -> Self {
        self.connections = connections;
        self
    }

    /// The layout as currently recorded.
    pub fn current_placement(&self) -> Placement {
        Placement::from_devices(&self.devices)
    }

    pub fn device(&self, id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    /// Check the rack ratings, every device, id uniqueness, and cabling.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.rack.validate()?;

        let mut seen = HashSet::new();
        for device in &self.devices {
            device.validate()?;
            if !seen.insert(device.id.as_str()) {
                return Err(ValidationError::InvalidDevice {
                    device: device.id.clone(),
                    reason: "duplicate device id".to_string(),
                });
            }
        }

        for conn in &self.connections {
            for end in [&conn.a, &conn.b] {
                if !seen.contains(end.as_str()) {
                    return Err(ValidationError::UnknownDevice(end.clone()));
                }
            }
        }
        Ok(())
    }
}

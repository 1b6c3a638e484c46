//! Domain types for racks, devices, and cabling.
//!
//! These are read-only snapshots supplied by the inventory store. Every
//! type round-trips through JSON so callers can hand them over as-is.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Unique identifier for a rack.
pub type RackId = String;

/// Unique identifier for a device.
pub type DeviceId = String;

/// Default conversion from electrical watts to heat output in BTU/hr.
pub const WATTS_TO_BTU: f64 = 3.412;

/// Rack height used when a record does not carry one.
pub const DEFAULT_CAPACITY_UNITS: u32 = 42;

/// Room intake temperature used when a record does not carry one.
pub const DEFAULT_AMBIENT_TEMP_C: f64 = 22.0;

fn default_capacity() -> u32 {
    DEFAULT_CAPACITY_UNITS
}

fn default_ambient() -> f64 {
    DEFAULT_AMBIENT_TEMP_C
}

// ── Rack ──────────────────────────────────────────────────────────

/// A rack and its physical ratings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rack {
    pub id: RackId,
    #[serde(default)]
    pub name: Option<String>,
    /// Number of mountable units.
    #[serde(default = "default_capacity")]
    pub capacity_units: u32,
    /// Maximum supported power draw (watts).
    #[serde(default)]
    pub max_power_watts: Option<f64>,
    /// Maximum supported load (kg).
    #[serde(default)]
    pub max_weight_kg: Option<f64>,
    /// Cooling capacity (BTU/hr). Absent means "not rated".
    #[serde(default)]
    pub cooling_capacity_btu: Option<f64>,
    /// Intake air temperature (°C).
    #[serde(default = "default_ambient")]
    pub ambient_temp_c: f64,
    /// Maximum safe inlet temperature (°C).
    #[serde(default)]
    pub max_inlet_temp_c: Option<f64>,
    /// Rated front-to-back airflow (CFM).
    #[serde(default)]
    pub airflow_cfm: Option<f64>,
}

impl Rack {
    /// A rack with the given id and capacity and no optional ratings.
    pub fn new(id: impl Into<RackId>, capacity_units: u32) -> Self {
        Self {
            id: id.into(),
            name: None,
            capacity_units,
            max_power_watts: None,
            max_weight_kg: None,
            cooling_capacity_btu: None,
            ambient_temp_c: DEFAULT_AMBIENT_TEMP_C,
            max_inlet_temp_c: None,
            airflow_cfm: None,
        }
    }

    /// Check that capacity and every declared ceiling are positive.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidRack {
            rack: self.id.clone(),
            reason,
        };

        if self.capacity_units == 0 {
            return Err(invalid("capacity must be at least 1U".to_string()));
        }
        if !self.ambient_temp_c.is_finite() {
            return Err(invalid("ambient temperature must be finite".to_string()));
        }
        if let Some(t) = self.max_inlet_temp_c {
            if !t.is_finite() {
                return Err(invalid("max inlet temperature must be finite".to_string()));
            }
        }

        let ceilings = [
            ("max_power_watts", self.max_power_watts),
            ("max_weight_kg", self.max_weight_kg),
            ("cooling_capacity_btu", self.cooling_capacity_btu),
            ("airflow_cfm", self.airflow_cfm),
        ];
        for (field, value) in ceilings {
            if let Some(v) = value {
                if !v.is_finite() || v <= 0.0 {
                    return Err(invalid(format!("{field} must be positive, got {v}")));
                }
            }
        }
        Ok(())
    }

    /// Iterate the rack's units from bottom (U1) to top.
    pub fn units(&self) -> impl Iterator<Item = u32> {
        1..=self.capacity_units
    }
}

// ── Device ────────────────────────────────────────────────────────

/// Functional role of a device, used by the cable objective.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceRole {
    Server,
    Storage,
    Switch,
    PatchPanel,
    Router,
    Pdu,
    Ups,
    #[default]
    Other,
}

impl DeviceRole {
    /// Network-layer gear that cables converge on.
    pub fn is_network(self) -> bool {
        matches!(self, Self::Switch | Self::PatchPanel | Self::Router)
    }
}

/// Direction cooling air travels through a device chassis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Airflow {
    /// Intake at the front, exhaust at the back.
    FrontToBack,
    /// Intake at the back, exhaust at the front.
    BackToFront,
    #[default]
    Unknown,
}

impl Airflow {
    /// True when one device's exhaust face meets the other's intake face.
    pub fn opposes(self, other: Airflow) -> bool {
        matches!(
            (self, other),
            (Self::FrontToBack, Self::BackToFront) | (Self::BackToFront, Self::FrontToBack)
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::FrontToBack => "front-to-back",
            Self::BackToFront => "back-to-front",
            Self::Unknown => "unknown",
        }
    }
}

/// How often technicians need hands on a device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessTier {
    Frequent,
    #[default]
    Occasional,
    Rare,
}

/// A mountable device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Device {
    pub id: DeviceId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: DeviceRole,
    /// Height in contiguous units.
    pub height_units: u32,
    /// Power draw (watts).
    #[serde(default)]
    pub power_watts: f64,
    /// Weight (kg).
    #[serde(default)]
    pub weight_kg: f64,
    #[serde(default)]
    pub airflow: Airflow,
    #[serde(default)]
    pub access: AccessTier,
    /// Position must not change during optimization.
    #[serde(default)]
    pub locked: bool,
    /// Rack the device is mounted in, if any.
    #[serde(default)]
    pub rack_id: Option<RackId>,
    /// Lowest occupied unit, if mounted.
    #[serde(default)]
    pub position: Option<u32>,
}

impl Device {
    /// An unplaced device of the given height with no power or weight data.
    pub fn new(id: impl Into<DeviceId>, height_units: u32) -> Self {
        Self {
            id: id.into(),
            name: None,
            role: DeviceRole::Other,
            height_units,
            power_watts: 0.0,
            weight_kg: 0.0,
            airflow: Airflow::Unknown,
            access: AccessTier::Occasional,
            locked: false,
            rack_id: None,
            position: None,
        }
    }

    /// Mount the device in `rack` starting at `position`.
    pub fn mounted(mut self, rack: &str, position: u32) -> Self {
        self.rack_id = Some(rack.to_string());
        self.position = Some(position);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |reason: String| ValidationError::InvalidDevice {
            device: self.id.clone(),
            reason,
        };
        if self.height_units == 0 {
            return Err(invalid("height must be at least 1U".to_string()));
        }
        if !self.power_watts.is_finite() || self.power_watts < 0.0 {
            return Err(invalid(format!("power draw must be non-negative, got {}", self.power_watts)));
        }
        if !self.weight_kg.is_finite() || self.weight_kg < 0.0 {
            return Err(invalid(format!("weight must be non-negative, got {}", self.weight_kg)));
        }
        if self.position == Some(0) {
            return Err(invalid("units are numbered from 1".to_string()));
        }
        Ok(())
    }
}

// ── Connection ────────────────────────────────────────────────────

/// An undirected cable between two devices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Connection {
    pub a: DeviceId,
    pub b: DeviceId,
}

impl Connection {
    pub fn new(a: impl Into<DeviceId>, b: impl Into<DeviceId>) -> Self {
        Self { a: a.into(), b: b.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rack_defaults_apply_when_fields_missing() {
        let rack: Rack = serde_json::from_str(r#"{"id": "r1"}"#).unwrap();
        assert_eq!(rack.capacity_units, 42);
        assert_eq!(rack.ambient_temp_c, 22.0);
        assert!(rack.cooling_capacity_btu.is_none());
        assert!(rack.validate().is_ok());
    }

    #[test]
    fn rack_rejects_zero_capacity() {
        let rack = Rack::new("r1", 0);
        assert!(matches!(rack.validate(), Err(ValidationError::InvalidRack { .. })));
    }

    #[test]
    fn rack_rejects_non_positive_ceiling() {
        let mut rack = Rack::new("r1", 42);
        rack.max_weight_kg = Some(0.0);
        let err = rack.validate().unwrap_err();
        assert!(err.to_string().contains("max_weight_kg"));

        rack.max_weight_kg = Some(500.0);
        rack.cooling_capacity_btu = Some(-1.0);
        assert!(rack.validate().is_err());
    }

    #[test]
    fn device_enums_use_snake_case() {
        let json = r#"{
            "id": "sw-1",
            "role": "patch_panel",
            "height_units": 1,
            "airflow": "back_to_front",
            "access": "frequent"
        }"#;
        let device: Device = serde_json::from_str(json).unwrap();
        assert_eq!(device.role, DeviceRole::PatchPanel);
        assert_eq!(device.airflow, Airflow::BackToFront);
        assert_eq!(device.access, AccessTier::Frequent);
        assert!(!device.locked);
        assert!(device.position.is_none());
    }

    #[test]
    fn device_rejects_negative_power() {
        let mut device = Device::new("d1", 1);
        device.power_watts = -5.0;
        assert!(device.validate().is_err());
    }

    #[test]
    fn device_rejects_zero_height() {
        assert!(Device::new("d1", 0).validate().is_err());
    }

    #[test]
    fn airflow_opposition_requires_both_declared() {
        assert!(Airflow::FrontToBack.opposes(Airflow::BackToFront));
        assert!(Airflow::BackToFront.opposes(Airflow::FrontToBack));
        assert!(!Airflow::FrontToBack.opposes(Airflow::FrontToBack));
        assert!(!Airflow::Unknown.opposes(Airflow::BackToFront));
    }

    #[test]
    fn network_roles() {
        assert!(DeviceRole::Switch.is_network());
        assert!(DeviceRole::PatchPanel.is_network());
        assert!(!DeviceRole::Server.is_network());
    }
}

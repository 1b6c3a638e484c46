//! Error types shared by the thermal evaluator and the layout optimizer.
//!
//! Three families are kept distinct so callers can explain failures:
//! malformed input ([`ValidationError`]), a placement that already breaks
//! the unit invariants ([`ConstraintViolation`]), and a request that no
//! arrangement can satisfy ([`InfeasibleRequest`]).

use thiserror::Error;

use crate::types::{DeviceId, RackId};

/// Result type alias for rackplan operations.
pub type RackResult<T> = Result<T, RackError>;

/// Top-level error for every rackplan operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RackError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("constraint violation: {0}")]
    Constraint(#[from] ConstraintViolation),

    #[error("infeasible request: {0}")]
    Infeasible(#[from] InfeasibleRequest),
}

/// Malformed input. Reported immediately, never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid objective weights: {0}")]
    InvalidWeights(String),

    #[error("unknown rack: {0}")]
    UnknownRack(RackId),

    #[error("unknown device: {0}")]
    UnknownDevice(DeviceId),

    #[error("locked device {0} is not mounted in the rack")]
    LockedDeviceNotInRack(DeviceId),

    #[error("device {device} is {height}U tall but the rack only has {capacity}U")]
    DeviceTooTall {
        device: DeviceId,
        height: u32,
        capacity: u32,
    },

    #[error("invalid rack {rack}: {reason}")]
    InvalidRack { rack: RackId, reason: String },

    #[error("invalid device {device}: {reason}")]
    InvalidDevice { device: DeviceId, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A placement that breaks the capacity, overlap, or lock invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstraintViolation {
    #[error("device {device} occupies U{start}-U{end}, outside rack capacity of {capacity}U")]
    OutOfRange {
        device: DeviceId,
        start: u32,
        end: u32,
        capacity: u32,
    },

    #[error("devices {first} and {second} overlap at U{unit}")]
    Overlap {
        first: DeviceId,
        second: DeviceId,
        unit: u32,
    },

    #[error("locked device {device} moved from {expected:?} to {actual:?}")]
    LockedMoved {
        device: DeviceId,
        expected: Option<u32>,
        actual: Option<u32>,
    },
}

/// The locked set plus the remaining devices cannot coexist in the rack.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InfeasibleRequest {
    #[error("unlocked devices need {required}U but only {available}U are free around locked devices")]
    InsufficientUnits { required: u32, available: u32 },

    #[error("device {device} needs {height}U but the largest free gap is {largest_gap}U")]
    NoGapLargeEnough {
        device: DeviceId,
        height: u32,
        largest_gap: u32,
    },

    #[error("free space is too fragmented to fit all unlocked devices")]
    Fragmented,

    #[error("devices draw {total_watts:.0} W but the rack is rated for {max_watts:.0} W")]
    PowerCeiling { total_watts: f64, max_watts: f64 },

    #[error("devices weigh {total_kg:.1} kg but the rack is rated for {max_kg:.1} kg")]
    WeightCeiling { total_kg: f64, max_kg: f64 },
}

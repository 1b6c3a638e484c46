//! Placement values and the unit invariants they must satisfy.
//!
//! A [`Placement`] maps device ids to their lowest occupied unit. It is an
//! immutable value: every edit returns a new placement. Ordering follows
//! the `(device id, start)` sequence so ties can be broken deterministically.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{ConstraintViolation, RackResult, ValidationError};
use crate::types::{Device, DeviceId, Rack};

/// An inclusive run of units `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnitRange {
    pub start: u32,
    pub end: u32,
}

impl UnitRange {
    /// Range starting at `start` spanning `height` units. `height` must be >= 1.
    pub fn new(start: u32, height: u32) -> Self {
        Self {
            start,
            end: start.saturating_add(height.saturating_sub(1)),
        }
    }

    pub fn len(&self) -> u32 {
        self.end - self.start + 1
    }

    pub fn overlaps(&self, other: &UnitRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Free units strictly between two non-overlapping ranges.
    pub fn gap_to(&self, other: &UnitRange) -> Option<u32> {
        if self.overlaps(other) {
            None
        } else if self.end < other.start {
            Some(other.start - self.end - 1)
        } else {
            Some(self.start - other.end - 1)
        }
    }

    /// Midpoint in unit coordinates (U1 = 1.0).
    pub fn midpoint(&self) -> f64 {
        (f64::from(self.start) + f64::from(self.end)) / 2.0
    }

    pub fn fits_within(&self, capacity: u32) -> bool {
        self.start >= 1 && self.end <= capacity
    }
}

/// Maximal runs of free units given the occupied ranges.
///
/// Occupied ranges may overlap or extend past `capacity`; only units in
/// `[1, capacity]` are considered.
pub fn free_gaps(capacity: u32, occupied: impl IntoIterator<Item = UnitRange>) -> Vec<UnitRange> {
    let mut taken = vec![false; capacity as usize + 1];
    for range in occupied {
        for unit in range.start.max(1)..=range.end.min(capacity) {
            taken[unit as usize] = true;
        }
    }

    let mut gaps = Vec::new();
    let mut run_start: Option<u32> = None;
    for unit in 1..=capacity {
        match (taken[unit as usize], run_start) {
            (false, None) => run_start = Some(unit),
            (true, Some(start)) => {
                gaps.push(UnitRange { start, end: unit - 1 });
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        gaps.push(UnitRange { start, end: capacity });
    }
    gaps
}

/// Device id → starting unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Placement {
    starts: BTreeMap<DeviceId, u32>,
}

impl Placement {
    pub fn new() -> Self {
        Self::default()
    }

    /// The placement implied by each device's recorded position.
    pub fn from_devices<'a>(devices: impl IntoIterator<Item = &'a Device>) -> Self {
        devices
            .into_iter()
            .filter_map(|d| d.position.map(|p| (d.id.clone(), p)))
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<u32> {
        self.starts.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.starts.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Entries in device id order.
    pub fn iter(&self) -> impl Iterator<Item = (&DeviceId, u32)> {
        self.starts.iter().map(|(id, start)| (id, *start))
    }

    /// Occupied range of `device`, if it is placed.
    pub fn range_of(&self, device: &Device) -> Option<UnitRange> {
        self.get(&device.id)
            .map(|start| UnitRange::new(start, device.height_units))
    }

    /// A copy with `id` starting at `start`.
    pub fn with_start(&self, id: &str, start: u32) -> Placement {
        let mut starts = self.starts.clone();
        starts.insert(id.to_string(), start);
        Placement { starts }
    }

    /// A copy with several devices moved at once.
    pub fn with_starts(&self, updates: &[(&str, u32)]) -> Placement {
        let mut starts = self.starts.clone();
        for (id, start) in updates {
            starts.insert((*id).to_string(), *start);
        }
        Placement { starts }
    }

    /// A copy without `id`.
    pub fn without(&self, id: &str) -> Placement {
        let mut starts = self.starts.clone();
        starts.remove(id);
        Placement { starts }
    }

    /// Number of devices whose start differs from `baseline` (devices
    /// missing from `baseline` count as moved).
    pub fn moves_from(&self, baseline: &Placement) -> usize {
        self.starts
            .iter()
            .filter(|(id, start)| baseline.get(id) != Some(**start))
            .count()
    }

    /// Check the placement against the rack capacity, overlap, and lock
    /// invariants.
    ///
    /// Every placed id must name one of `devices`. Locked devices must sit
    /// at their recorded position (or stay unplaced if they have none).
    pub fn validate(&self, rack: &Rack, devices: &[Device]) -> RackResult<()> {
        let by_id: HashMap<&str, &Device> = devices.iter().map(|d| (d.id.as_str(), d)).collect();

        let mut ranges = Vec::with_capacity(self.starts.len());
        for (id, start) in &self.starts {
            let device = by_id
                .get(id.as_str())
                .ok_or_else(|| ValidationError::UnknownDevice(id.clone()))?;
            let range = UnitRange::new(*start, device.height_units);
            if !range.fits_within(rack.capacity_units) {
                return Err(ConstraintViolation::OutOfRange {
                    device: id.clone(),
                    start: range.start,
                    end: range.end,
                    capacity: rack.capacity_units,
                }
                .into());
            }
            ranges.push((id, range));
        }

        let mut owner: Vec<Option<&DeviceId>> = vec![None; rack.capacity_units as usize + 1];
        for (id, range) in &ranges {
            for unit in range.start..=range.end {
                if let Some(first) = owner[unit as usize] {
                    return Err(ConstraintViolation::Overlap {
                        first: first.clone(),
                        second: (*id).clone(),
                        unit,
                    }
                    .into());
                }
                owner[unit as usize] = Some(*id);
            }
        }

        for device in devices.iter().filter(|d| d.locked) {
            let actual = self.get(&device.id);
            if actual != device.position {
                return Err(ConstraintViolation::LockedMoved {
                    device: device.id.clone(),
                    expected: device.position,
                    actual,
                }
                .into());
            }
        }

        Ok(())
    }
}

impl FromIterator<(DeviceId, u32)> for Placement {
    fn from_iter<I: IntoIterator<Item = (DeviceId, u32)>>(iter: I) -> Self {
        Self {
            starts: iter.into_iter().collect(),
        }
    }
}

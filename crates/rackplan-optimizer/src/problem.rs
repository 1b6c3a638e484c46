//! The search problem for one rack: which devices may move, which may not,
//! and fast occupancy checks over candidate placements.

use std::collections::{BTreeSet, HashMap};

use rackplan_core::error::{RackResult, ValidationError};
use rackplan_core::placement::{Placement, UnitRange};
use rackplan_core::types::{Device, DeviceId, Rack};
use rackplan_core::RackSnapshot;

/// Rack, devices, and lock set for a single optimization call.
pub struct LayoutProblem<'a> {
    pub rack: &'a Rack,
    pub devices: &'a [Device],
    by_id: HashMap<&'a str, &'a Device>,
    locked: BTreeSet<&'a str>,
    /// Unlocked devices, ordered by id.
    movable: Vec<&'a Device>,
    /// Layout as recorded before optimization.
    pub current: Placement,
}

impl<'a> LayoutProblem<'a> {
    /// Resolve the lock set: explicitly requested ids plus every device
    /// flagged `locked`. Each locked device must be mounted in the rack.
    pub fn new(snapshot: &'a RackSnapshot, locked_ids: &[DeviceId]) -> RackResult<Self> {
        let rack = &snapshot.rack;
        let devices = snapshot.devices.as_slice();
        let by_id: HashMap<&str, &Device> = devices.iter().map(|d| (d.id.as_str(), d)).collect();

        for device in devices {
            if device.height_units > rack.capacity_units {
                return Err(ValidationError::DeviceTooTall {
                    device: device.id.clone(),
                    height: device.height_units,
                    capacity: rack.capacity_units,
                }
                .into());
            }
        }

        let mut locked = BTreeSet::new();
        for id in locked_ids {
            let device = by_id
                .get(id.as_str())
                .ok_or_else(|| ValidationError::UnknownDevice(id.clone()))?;
            locked.insert(device.id.as_str());
        }
        for device in devices.iter().filter(|d| d.locked) {
            locked.insert(device.id.as_str());
        }
        for id in &locked {
            if by_id[id].position.is_none() {
                return Err(ValidationError::LockedDeviceNotInRack((*id).to_string()).into());
            }
        }

        let mut movable: Vec<&Device> = devices
            .iter()
            .filter(|d| !locked.contains(d.id.as_str()))
            .collect();
        movable.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(Self {
            rack,
            devices,
            by_id,
            locked,
            movable,
            current: snapshot.current_placement(),
        })
    }

    pub fn device(&self, id: &str) -> Option<&'a Device> {
        self.by_id.get(id).copied()
    }

    pub fn is_locked(&self, id: &str) -> bool {
        self.locked.contains(id)
    }

    pub fn movable(&self) -> &[&'a Device] {
        &self.movable
    }

    /// Locked devices with their fixed ranges.
    pub fn locked_ranges(&self) -> Vec<(&'a Device, UnitRange)> {
        self.locked
            .iter()
            .filter_map(|id| {
                let device = self.by_id[id];
                device
                    .position
                    .map(|start| (device, UnitRange::new(start, device.height_units)))
            })
            .collect()
    }

    /// The placement holding only locked devices.
    pub fn locked_placement(&self) -> Placement {
        self.locked_ranges()
            .into_iter()
            .map(|(d, r)| (d.id.clone(), r.start))
            .collect()
    }

    /// Every device placed, in range, no overlaps, locks untouched.
    pub fn is_complete_and_valid(&self, placement: &Placement) -> bool {
        if placement.len() != self.devices.len() {
            return false;
        }
        let mut grid = Occupancy::empty(self.rack.capacity_units);
        for device in self.devices {
            let Some(range) = placement.range_of(device) else {
                return false;
            };
            if !grid.is_free(range) {
                return false;
            }
            grid.mark(range);
        }
        self.locked
            .iter()
            .all(|id| placement.get(id) == self.by_id[id].position)
    }

    /// Occupancy of `placement`, leaving out the devices in `except`.
    pub fn occupancy(&self, placement: &Placement, except: &[&str]) -> Occupancy {
        let mut grid = Occupancy::empty(self.rack.capacity_units);
        for (id, start) in placement.iter() {
            if except.contains(&id.as_str()) {
                continue;
            }
            if let Some(device) = self.device(id) {
                grid.mark(UnitRange::new(start, device.height_units));
            }
        }
        grid
    }
}

/// Unit-by-unit occupancy of a rack.
#[derive(Debug, Clone)]
pub struct Occupancy {
    taken: Vec<bool>,
}

impl Occupancy {
    pub fn empty(capacity: u32) -> Self {
        Self {
            taken: vec![false; capacity as usize],
        }
    }

    pub fn capacity(&self) -> u32 {
        self.taken.len() as u32
    }

    /// In range and every unit free.
    pub fn is_free(&self, range: UnitRange) -> bool {
        range.fits_within(self.capacity())
            && (range.start..=range.end).all(|u| !self.taken[(u - 1) as usize])
    }

    pub fn mark(&mut self, range: UnitRange) {
        for unit in range.start.max(1)..=range.end.min(self.capacity()) {
            self.taken[(unit - 1) as usize] = true;
        }
    }

    /// Every start at which a device of `height` fits, ascending.
    pub fn feasible_starts(&self, height: u32) -> Vec<u32> {
        let capacity = self.capacity();
        if height == 0 || height > capacity {
            return Vec::new();
        }
        (1..=capacity - height + 1)
            .filter(|s| self.is_free(UnitRange::new(*s, height)))
            .collect()
    }

    /// Lowest start at which a device of `height` fits.
    pub fn first_fit(&self, height: u32) -> Option<u32> {
        let capacity = self.capacity();
        if height == 0 || height > capacity {
            return None;
        }
        (1..=capacity - height + 1).find(|s| self.is_free(UnitRange::new(*s, height)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rackplan_core::error::RackError;

    fn snapshot(devices: Vec<Device>) -> RackSnapshot {
        RackSnapshot::new(Rack::new("r1", 10), devices)
    }

    #[test]
    fn locks_combine_flags_and_request() {
        let mut flagged = Device::new("flagged", 1).mounted("r1", 1);
        flagged.locked = true;
        let snap = snapshot(vec![
            flagged,
            Device::new("asked", 1).mounted("r1", 2),
            Device::new("free", 1).mounted("r1", 3),
        ]);

        let problem = LayoutProblem::new(&snap, &["asked".to_string()]).unwrap();
        assert!(problem.is_locked("flagged"));
        assert!(problem.is_locked("asked"));
        assert!(!problem.is_locked("free"));
        let movable: Vec<&str> = problem.movable().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(movable, vec!["free"]);
    }

    #[test]
    fn unknown_locked_id_is_rejected() {
        let snap = snapshot(vec![Device::new("a", 1).mounted("r1", 1)]);
        let err = LayoutProblem::new(&snap, &["zzz".to_string()]).err().unwrap();
        assert_eq!(err, RackError::Validation(ValidationError::UnknownDevice("zzz".to_string())));
    }

    #[test]
    fn locked_but_unmounted_is_rejected() {
        let snap = snapshot(vec![Device::new("a", 1)]);
        let err = LayoutProblem::new(&snap, &["a".to_string()]).err().unwrap();
        assert_eq!(
            err,
            RackError::Validation(ValidationError::LockedDeviceNotInRack("a".to_string()))
        );
    }

    #[test]
    fn too_tall_device_is_rejected() {
        let snap = snapshot(vec![Device::new("huge", 11)]);
        let err = LayoutProblem::new(&snap, &[]).err().unwrap();
        assert!(matches!(err, RackError::Validation(ValidationError::DeviceTooTall { height: 11, .. })));
    }

    #[test]
    fn completeness_requires_every_device() {
        let snap = snapshot(vec![Device::new("a", 1).mounted("r1", 1), Device::new("b", 2)]);
        let problem = LayoutProblem::new(&snap, &[]).unwrap();
        assert!(!problem.is_complete_and_valid(&problem.current));
        assert!(problem.is_complete_and_valid(&problem.current.with_start("b", 2)));
        assert!(!problem.is_complete_and_valid(&problem.current.with_start("b", 10)));
    }

    #[test]
    fn occupancy_finds_starts() {
        let mut grid = Occupancy::empty(6);
        grid.mark(UnitRange::new(2, 2));
        assert_eq!(grid.first_fit(1), Some(1));
        assert_eq!(grid.first_fit(2), Some(4));
        assert_eq!(grid.feasible_starts(2), vec![4, 5]);
        assert!(grid.feasible_starts(4).is_empty());
        assert!(!grid.is_free(UnitRange::new(6, 2)));
    }
}

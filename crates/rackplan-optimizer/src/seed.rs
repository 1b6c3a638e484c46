//! Feasibility checks and the starting placement for the search.
//!
//! The recorded layout is used as-is when it is complete and valid.
//! Otherwise a repair step keeps every unlocked device that still fits
//! where it is and first-fits the rest. When that fails, unlocked devices
//! are packed into the free gaps around locked devices, largest first
//! into the lowest gap, backtracking if the greedy choice dead-ends.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use rackplan_core::error::{ConstraintViolation, InfeasibleRequest, RackResult};
use rackplan_core::placement::{Placement, UnitRange, free_gaps};
use rackplan_core::types::Device;

use crate::problem::LayoutProblem;

/// Gap-assignment steps explored before declaring the space fragmented.
const PACKING_NODE_BUDGET: u32 = 200_000;

/// Where the starting placement came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedSource {
    /// The recorded layout was complete and valid.
    Current,
    /// Devices that still fit were kept; the rest were first-fit.
    Repaired,
    /// Unlocked devices were re-packed around the locked ones.
    Packed,
}

/// Reject requests no arrangement can satisfy, before any scoring.
pub fn check_feasibility(problem: &LayoutProblem<'_>) -> RackResult<()> {
    let rack = problem.rack;
    let locked = problem.locked_ranges();

    // Locked devices cannot be repaired, so their placement must already hold.
    let mut grid: Vec<Option<&Device>> = vec![None; rack.capacity_units as usize];
    for (device, range) in &locked {
        if !range.fits_within(rack.capacity_units) {
            return Err(ConstraintViolation::OutOfRange {
                device: device.id.clone(),
                start: range.start,
                end: range.end,
                capacity: rack.capacity_units,
            }
            .into());
        }
        for unit in range.start..=range.end {
            let slot = &mut grid[(unit - 1) as usize];
            if let Some(first) = *slot {
                return Err(ConstraintViolation::Overlap {
                    first: first.id.clone(),
                    second: device.id.clone(),
                    unit,
                }
                .into());
            }
            *slot = Some(*device);
        }
    }

    let total_watts: f64 = problem.devices.iter().map(|d| d.power_watts).sum();
    if let Some(max_watts) = rack.max_power_watts {
        if total_watts > max_watts {
            return Err(InfeasibleRequest::PowerCeiling { total_watts, max_watts }.into());
        }
    }
    let total_kg: f64 = problem.devices.iter().map(|d| d.weight_kg).sum();
    if let Some(max_kg) = rack.max_weight_kg {
        if total_kg > max_kg {
            return Err(InfeasibleRequest::WeightCeiling { total_kg, max_kg }.into());
        }
    }

    let gaps = free_gaps(rack.capacity_units, locked.iter().map(|(_, r)| *r));
    let available: u32 = gaps.iter().map(UnitRange::len).sum();
    let required: u32 = problem.movable().iter().map(|d| d.height_units).sum();
    if required > available {
        return Err(InfeasibleRequest::InsufficientUnits { required, available }.into());
    }

    let largest_gap = gaps.iter().map(UnitRange::len).max().unwrap_or(0);
    if let Some(tallest) = problem.movable().iter().max_by_key(|d| d.height_units) {
        if tallest.height_units > largest_gap {
            return Err(InfeasibleRequest::NoGapLargeEnough {
                device: tallest.id.clone(),
                height: tallest.height_units,
                largest_gap,
            }
            .into());
        }
    }

    Ok(())
}

/// Pick the starting placement. Assumes [`check_feasibility`] passed.
pub fn seed_placement(problem: &LayoutProblem<'_>) -> RackResult<(Placement, SeedSource)> {
    if problem.is_complete_and_valid(&problem.current) {
        return Ok((problem.current.clone(), SeedSource::Current));
    }

    if let Some(placement) = repair(problem) {
        warn!(
            rack = %problem.rack.id,
            moved = placement.moves_from(&problem.current),
            "recorded layout was incomplete or invalid; repaired"
        );
        return Ok((placement, SeedSource::Repaired));
    }

    match pack(problem) {
        Some(placement) => {
            warn!(
                rack = %problem.rack.id,
                moved = placement.moves_from(&problem.current),
                "recorded layout could not be repaired in place; re-packed unlocked devices"
            );
            Ok((placement, SeedSource::Packed))
        }
        None => Err(InfeasibleRequest::Fragmented.into()),
    }
}

/// Keep unlocked devices that still fit where recorded, first-fit the rest.
fn repair(problem: &LayoutProblem<'_>) -> Option<Placement> {
    let mut placement = problem.locked_placement();
    let mut grid = problem.occupancy(&placement, &[]);

    let mut kept: Vec<(&Device, UnitRange)> = problem
        .movable()
        .iter()
        .filter_map(|d| problem.current.range_of(d).map(|r| (*d, r)))
        .collect();
    kept.sort_by(|a, b| a.1.start.cmp(&b.1.start).then_with(|| a.0.id.cmp(&b.0.id)));

    let mut homeless: Vec<&Device> = problem
        .movable()
        .iter()
        .filter(|d| !problem.current.contains(&d.id))
        .copied()
        .collect();

    for (device, range) in kept {
        if grid.is_free(range) {
            grid.mark(range);
            placement = placement.with_start(&device.id, range.start);
        } else {
            homeless.push(device);
        }
    }

    sort_largest_first(&mut homeless);
    for device in homeless {
        let start = grid.first_fit(device.height_units)?;
        grid.mark(UnitRange::new(start, device.height_units));
        placement = placement.with_start(&device.id, start);
    }
    Some(placement)
}

/// Assign unlocked devices to the free gaps around locked devices.
///
/// Devices go largest first; gaps are tried lowest first, so the first
/// branch explored is the greedy first-fit-decreasing layout. Inside each
/// gap devices stack upward from its lowest unit in assignment order.
fn pack(problem: &LayoutProblem<'_>) -> Option<Placement> {
    let locked = problem.locked_ranges();
    let gaps = free_gaps(problem.rack.capacity_units, locked.iter().map(|(_, r)| *r));

    let mut devices: Vec<&Device> = problem.movable().to_vec();
    sort_largest_first(&mut devices);

    let mut remaining: Vec<u32> = gaps.iter().map(UnitRange::len).collect();
    let mut assignment = vec![0usize; devices.len()];
    let mut budget = PACKING_NODE_BUDGET;

    if !assign(&devices, 0, &mut remaining, &mut assignment, &mut budget) {
        debug!(
            rack = %problem.rack.id,
            explored = PACKING_NODE_BUDGET - budget,
            "gap packing failed"
        );
        return None;
    }

    let mut next_free: Vec<u32> = gaps.iter().map(|g| g.start).collect();
    let mut placement = problem.locked_placement();
    for (device, gap) in devices.iter().zip(&assignment) {
        placement = placement.with_start(&device.id, next_free[*gap]);
        next_free[*gap] += device.height_units;
    }
    Some(placement)
}

fn assign(
    devices: &[&Device],
    idx: usize,
    remaining: &mut [u32],
    assignment: &mut [usize],
    budget: &mut u32,
) -> bool {
    if idx == devices.len() {
        return true;
    }
    if *budget == 0 {
        return false;
    }
    *budget -= 1;

    let height = devices[idx].height_units;
    for gap in 0..remaining.len() {
        if remaining[gap] < height {
            continue;
        }
        // Gaps with the same free space are interchangeable from here on.
        if remaining[..gap].contains(&remaining[gap]) {
            continue;
        }
        remaining[gap] -= height;
        assignment[idx] = gap;
        if assign(devices, idx + 1, remaining, assignment, budget) {
            return true;
        }
        remaining[gap] += height;
    }
    false
}

fn sort_largest_first(devices: &mut [&Device]) {
    devices.sort_by(|a, b| b.height_units.cmp(&a.height_units).then_with(|| a.id.cmp(&b.id)));
}

//! Neighbourhood moves over complete placements.
//!
//! Only unlocked devices move. A proposal is returned only when the
//! resulting placement keeps every device in range and overlap-free.

use rand::Rng;

use rackplan_core::placement::{Placement, UnitRange};
use rackplan_core::types::{Device, DeviceId};

use crate::problem::LayoutProblem;

/// A single neighbourhood step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Move {
    /// Two devices trade places.
    Swap { a: DeviceId, b: DeviceId },
    /// One device moves to a free start.
    Relocate { device: DeviceId, from: u32, to: u32 },
}

/// Draw a random move and apply it to `placement`.
///
/// Returns `None` when the drawn move has no feasible outcome. The caller
/// counts that as a rejected proposal.
pub fn propose<R: Rng>(
    problem: &LayoutProblem<'_>,
    placement: &Placement,
    swap_probability: f64,
    rng: &mut R,
) -> Option<(Move, Placement)> {
    let movable = problem.movable();
    match movable.len() {
        0 => None,
        1 => relocate(problem, placement, movable[0], rng),
        n => {
            if rng.gen_bool(swap_probability.clamp(0.0, 1.0)) {
                let i = rng.gen_range(0..n);
                let mut j = rng.gen_range(0..n - 1);
                if j >= i {
                    j += 1;
                }
                swap(problem, placement, movable[i], movable[j])
            } else {
                let i = rng.gen_range(0..n);
                relocate(problem, placement, movable[i], rng)
            }
        }
    }
}

fn relocate<R: Rng>(
    problem: &LayoutProblem<'_>,
    placement: &Placement,
    device: &Device,
    rng: &mut R,
) -> Option<(Move, Placement)> {
    let from = placement.get(&device.id)?;
    let grid = problem.occupancy(placement, &[device.id.as_str()]);
    let starts: Vec<u32> = grid
        .feasible_starts(device.height_units)
        .into_iter()
        .filter(|s| *s != from)
        .collect();
    if starts.is_empty() {
        return None;
    }
    let to = starts[rng.gen_range(0..starts.len())];
    Some((
        Move::Relocate {
            device: device.id.clone(),
            from,
            to,
        },
        placement.with_start(&device.id, to),
    ))
}

/// Trade positions. Bottom-aligned first; when heights differ, the
/// top-aligned variants are tried in turn.
fn swap(
    problem: &LayoutProblem<'_>,
    placement: &Placement,
    a: &Device,
    b: &Device,
) -> Option<(Move, Placement)> {
    let pa = placement.get(&a.id)?;
    let pb = placement.get(&b.id)?;
    let grid = problem.occupancy(placement, &[a.id.as_str(), b.id.as_str()]);

    let fits = |sa: u32, sb: u32| {
        let ra = UnitRange::new(sa, a.height_units);
        let rb = UnitRange::new(sb, b.height_units);
        grid.is_free(ra) && grid.is_free(rb) && !ra.overlaps(&rb)
    };

    // Each device may align with the bottom or the top of the other's slot.
    let align = |slot: u32, slot_height: u32, height: u32| {
        let mut starts = vec![slot];
        if let Some(top) = (slot + slot_height).checked_sub(height) {
            if top >= 1 && top != slot {
                starts.push(top);
            }
        }
        starts
    };
    let starts_a = align(pb, b.height_units, a.height_units);
    let starts_b = align(pa, a.height_units, b.height_units);
    let options = starts_a
        .iter()
        .flat_map(|sa| starts_b.iter().map(move |sb| (*sa, *sb)));

    let (sa, sb) = options.into_iter().find(|(sa, sb)| fits(*sa, *sb))?;
    Some((
        Move::Swap {
            a: a.id.clone(),
            b: b.id.clone(),
        },
        placement.with_starts(&[(a.id.as_str(), sa), (b.id.as_str(), sb)]),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rackplan_core::RackSnapshot;
    use rackplan_core::types::Rack;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn locked_at(id: &str, height: u32, at: u32) -> Device {
        let mut d = Device::new(id, height).mounted("r1", at);
        d.locked = true;
        d
    }

    #[test]
    fn proposals_stay_valid_and_respect_locks() {
        let snap = RackSnapshot::new(
            Rack::new("r1", 12),
            vec![
                locked_at("lock", 2, 5),
                Device::new("a", 1).mounted("r1", 1),
                Device::new("b", 2).mounted("r1", 2),
                Device::new("c", 3).mounted("r1", 8),
            ],
        );
        let problem = LayoutProblem::new(&snap, &[]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut placement = problem.current.clone();

        let mut produced = 0;
        for _ in 0..500 {
            if let Some((_, next)) = propose(&problem, &placement, 0.5, &mut rng) {
                assert!(problem.is_complete_and_valid(&next), "{next:?}");
                assert_eq!(next.get("lock"), Some(5));
                placement = next;
                produced += 1;
            }
        }
        assert!(produced > 0);
    }

    #[test]
    fn nothing_movable_yields_nothing() {
        let snap = RackSnapshot::new(Rack::new("r1", 4), vec![locked_at("l", 1, 1)]);
        let problem = LayoutProblem::new(&snap, &[]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(propose(&problem, &problem.current, 0.5, &mut rng).is_none());
    }

    #[test]
    fn full_rack_cannot_relocate() {
        let snap = RackSnapshot::new(
            Rack::new("r1", 2),
            vec![Device::new("a", 1).mounted("r1", 1), Device::new("b", 1).mounted("r1", 2)],
        );
        let problem = LayoutProblem::new(&snap, &[]).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert!(propose(&problem, &problem.current, 0.0, &mut rng).is_none());

        let (mv, next) = propose(&problem, &problem.current, 1.0, &mut rng).unwrap();
        assert!(matches!(mv, Move::Swap { .. }));
        assert_eq!(next.get("a"), Some(2));
        assert_eq!(next.get("b"), Some(1));
    }

    #[test]
    fn unequal_swap_falls_back_to_top_alignment() {
        // a: 1U at U1, b: 2U at U2-3, rack full. Bottom-aligned overlaps at U2,
        // so a takes the top of b's slot.
        let snap = RackSnapshot::new(
            Rack::new("r1", 3),
            vec![Device::new("a", 1).mounted("r1", 1), Device::new("b", 2).mounted("r1", 2)],
        );
        let problem = LayoutProblem::new(&snap, &[]).unwrap();
        let (_, next) = swap(&problem, &problem.current, problem.device("a").unwrap(), problem.device("b").unwrap())
            .unwrap();
        assert_eq!(next.get("a"), Some(3));
        assert_eq!(next.get("b"), Some(1));
    }
}

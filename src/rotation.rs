//! Rotation planning
//!
//! A rotation plan is a diff between the layout a vehicle has now and the
//! layout the planner proposes. Each tyre is compared on its own, so
//! pairwise swaps and longer chains (A -> B -> C -> A) produce the same kind
//! of move list.
use std::collections::{BTreeMap, BTreeSet};

use super::error::LifecycleError;
use super::position::{Position, Side};

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct RotationMove {
    #[n(0)]
    pub tyre_id: String,
    #[n(1)]
    pub from: Position,
    #[n(2)]
    pub to: Position,
}

/// Tyre id -> position.
pub type Assignment = BTreeMap<String, Position>;

/// Fails when two tyres share a position.
pub fn ensure_unique_positions(
    vehicle_id: &str,
    assignment: &Assignment,
) -> Result<(), LifecycleError> {
    // keyed by label so structurally different spellings of one slot collide
    let mut seen: BTreeMap<String, &str> = BTreeMap::new();
    for (tyre_id, position) in assignment {
        if let Some(occupant) = seen.insert(position.label(), tyre_id) {
            return Err(LifecycleError::PositionOccupied {
                vehicle: vehicle_id.to_string(),
                position: position.label(),
                occupant: occupant.to_string(),
            });
        }
    }
    Ok(())
}

/// One move per tyre whose position differs between `current` and `proposed`.
///
/// Both layouts must cover the same tyres, and the proposed one must not put
/// two tyres in one position.
pub fn plan_rotation(
    vehicle_id: &str,
    current: &Assignment,
    proposed: &Assignment,
) -> Result<Vec<RotationMove>, LifecycleError> {
    let current_ids: BTreeSet<&String> = current.keys().collect();
    let proposed_ids: BTreeSet<&String> = proposed.keys().collect();
    if current_ids != proposed_ids {
        return Err(LifecycleError::AssignmentMismatch);
    }
    ensure_unique_positions(vehicle_id, proposed)?;

    let moves: Vec<RotationMove> = current
        .iter()
        .filter_map(|(tyre_id, from)| {
            let to = proposed.get(tyre_id)?;
            (from != to).then(|| RotationMove {
                tyre_id: tyre_id.clone(),
                from: *from,
                to: *to,
            })
        })
        .collect();

    tracing::debug!(vehicle = %vehicle_id, moves = moves.len(), "rotation diff computed");
    Ok(moves)
}

/// Applies `moves` to `assignment`, ignoring moves for unknown tyres.
pub fn apply_moves(assignment: &Assignment, moves: &[RotationMove]) -> Assignment {
    let mut next = assignment.clone();
    for m in moves {
        if let Some(position) = next.get_mut(&m.tyre_id) {
            *position = m.to;
        }
    }
    next
}

/// Interactive planning session over one vehicle's layout.
#[derive(Debug, Clone)]
pub struct RotationPlanner {
    vehicle_id: String,
    initial: Assignment,
    planned: Assignment,
}

impl RotationPlanner {
    pub fn new(vehicle_id: &str, current: Assignment) -> Self {
        Self {
            vehicle_id: vehicle_id.to_string(),
            planned: current.clone(),
            initial: current,
        }
    }
    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }
    pub fn planned(&self) -> &Assignment {
        &self.planned
    }

    /// Exchanges the planned positions of two tyres. Returns false when
    /// either tyre is not part of the layout.
    pub fn swap(&mut self, first: &str, second: &str) -> bool {
        let (Some(a), Some(b)) = (
            self.planned.get(first).copied(),
            self.planned.get(second).copied(),
        ) else {
            return false;
        };
        self.planned.insert(first.to_string(), b);
        self.planned.insert(second.to_string(), a);
        true
    }

    /// Restarts from the original layout and crosses the steer axle tyres.
    pub fn cross_steer(&mut self) -> bool {
        self.reset();
        let find = |side: Side| {
            self.initial
                .iter()
                .find(|(_, p)| p.axle_index == 1 && p.side == side && !p.is_spare())
                .map(|(id, _)| id.clone())
        };
        match (find(Side::Left), find(Side::Right)) {
            (Some(left), Some(right)) => self.swap(&left, &right),
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.planned = self.initial.clone();
    }

    /// The move list for the job card.
    pub fn moves(&self) -> Result<Vec<RotationMove>, LifecycleError> {
        plan_rotation(&self.vehicle_id, &self.initial, &self.planned)
    }
}

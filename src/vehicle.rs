//! Vehicle types, axle layouts and vehicles
use super::position::{Position, Side, WheelSlot};

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxleDefinition {
    #[n(0)]
    pub is_steer: bool,
    #[n(1)]
    pub is_dual: bool, // true = 4 tyres, false = 2 tyres
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct VehicleType {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub axles: Vec<AxleDefinition>,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Vehicle {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub plate_number: String,
    #[n(2)]
    pub type_id: String,
    #[n(3)]
    pub odometer: u64,
    #[n(4)]
    pub spare_count: u8, // declared at onboarding
}

impl AxleDefinition {
    pub fn steer() -> Self {
        Self {
            is_steer: true,
            is_dual: false,
        }
    }
    pub fn single() -> Self {
        Self {
            is_steer: false,
            is_dual: false,
        }
    }
    pub fn dual() -> Self {
        Self {
            is_steer: false,
            is_dual: true,
        }
    }
    pub fn tyre_count(&self) -> usize {
        if self.is_dual { 4 } else { 2 }
    }
}

impl VehicleType {
    pub fn new(id: &str, name: &str, axles: Vec<AxleDefinition>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            axles,
        }
    }

    /// Number of running tyres, spares excluded.
    pub fn tyre_count(&self) -> usize {
        self.axles.iter().map(AxleDefinition::tyre_count).sum()
    }

    /// The ordered set of positions a vehicle of this type must carry.
    ///
    /// Dual axles yield left-outer, left-inner, right-inner, right-outer;
    /// single axles yield left then right. Spare slots are appended last,
    /// numbered from 1.
    pub fn required_positions(&self, spare_count: u8) -> Vec<Position> {
        let mut positions = Vec::with_capacity(self.tyre_count() + spare_count as usize);

        // axle indices are u8; types with more axles are refused when added
        for (axle_index, axle) in (1..=u8::MAX).zip(&self.axles) {
            if axle.is_dual {
                positions.extend([
                    Position::outer(axle_index, Side::Left),
                    Position::inner(axle_index, Side::Left),
                    Position::inner(axle_index, Side::Right),
                    Position::outer(axle_index, Side::Right),
                ]);
            } else {
                positions.extend([
                    Position::single(axle_index, Side::Left),
                    Position::single(axle_index, Side::Right),
                ]);
            }
        }
        positions.extend((1..=spare_count).map(Position::spare));

        positions
    }

    /// Whether `position` can exist on this layout with `spare_count` spare slots.
    pub fn is_valid_position(&self, position: &Position, spare_count: u8) -> bool {
        if position.slot == WheelSlot::Spare {
            return *position == Position::spare(position.axle_index)
                && position.axle_index >= 1
                && position.axle_index <= spare_count;
        }
        let Some(axle) = self
            .axles
            .get((position.axle_index as usize).wrapping_sub(1))
        else {
            return false;
        };
        match position.slot {
            WheelSlot::Inner | WheelSlot::Outer => axle.is_dual,
            WheelSlot::Single => !axle.is_dual,
            WheelSlot::Spare => false,
        }
    }
}

impl Vehicle {
    pub fn new(id: &str, plate_number: &str, type_id: &str) -> Self {
        Self {
            id: id.to_string(),
            plate_number: plate_number.to_string(),
            type_id: type_id.to_string(),
            odometer: 0,
            spare_count: 0,
        }
    }
    pub fn set_odometer(mut self, odometer: u64) -> Self {
        self.odometer = odometer;
        self
    }
    pub fn set_spare_count(mut self, spare_count: u8) -> Self {
        self.spare_count = spare_count;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn six_wheeler() -> VehicleType {
        VehicleType::new(
            "TYPE-6W",
            "Standard 6-Wheeler (4x2)",
            vec![AxleDefinition::steer(), AxleDefinition::dual()],
        )
    }

    #[test]
    fn required_positions_follow_axle_order() {
        let labels: Vec<String> = six_wheeler()
            .required_positions(1)
            .iter()
            .map(Position::label)
            .collect();

        assert_eq!(
            labels,
            ["L1", "R1", "L2-OUT", "L2-IN", "R2-IN", "R2-OUT", "SP-1"]
        );
    }

    #[test]
    fn slot_kind_must_match_axle() {
        let vt = six_wheeler();
        assert!(vt.is_valid_position(&Position::single(1, Side::Left), 0));
        assert!(!vt.is_valid_position(&Position::inner(1, Side::Left), 0));
        assert!(vt.is_valid_position(&Position::inner(2, Side::Left), 0));
        assert!(!vt.is_valid_position(&Position::single(2, Side::Left), 0));
        assert!(!vt.is_valid_position(&Position::single(3, Side::Left), 0));
        assert!(!vt.is_valid_position(&Position::single(0, Side::Left), 0));
        assert!(!vt.is_valid_position(&Position::spare(1), 0));
        assert!(vt.is_valid_position(&Position::spare(2), 2));

        let left_spare = Position {
            axle_index: 1,
            side: Side::Left,
            slot: WheelSlot::Spare,
        };
        assert!(!vt.is_valid_position(&left_spare, 1));
    }
}

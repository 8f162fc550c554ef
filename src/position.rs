//! Wheel positions and their canonical labels
//!
//! Labels follow the fleet convention used on job cards and walkaround sheets:
//! `L1-OUT`/`R2-IN` on dual axles, `L1`/`R1` on single axles and `SP-1` for
//! spare slots. A tyre that is not on a vehicle renders as `STORE`.
use std::fmt;
use std::str::FromStr;

#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum Side {
    #[n(0)]
    Left,
    #[n(1)]
    Right,
}

#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum WheelSlot {
    #[n(0)]
    Outer,
    #[n(1)]
    Inner,
    #[n(2)]
    Single,
    #[n(3)]
    Spare,
}

#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Position {
    #[n(0)]
    pub axle_index: u8, // 1-based, or the spare slot number for spares
    #[n(1)]
    pub side: Side,
    #[n(2)]
    pub slot: WheelSlot,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("'{0}' is not a wheel position label")]
pub struct ParsePositionError(pub String);

/// Label used for a tyre that has no position.
pub const STORE_LABEL: &str = "STORE";

impl Position {
    /// Spare slots have no side; they always normalise to the right.
    pub fn new(axle_index: u8, side: Side, slot: WheelSlot) -> Self {
        let side = match slot {
            WheelSlot::Spare => Side::Right,
            _ => side,
        };
        Self {
            axle_index,
            side,
            slot,
        }
    }
    pub fn single(axle_index: u8, side: Side) -> Self {
        Self::new(axle_index, side, WheelSlot::Single)
    }
    pub fn outer(axle_index: u8, side: Side) -> Self {
        Self::new(axle_index, side, WheelSlot::Outer)
    }
    pub fn inner(axle_index: u8, side: Side) -> Self {
        Self::new(axle_index, side, WheelSlot::Inner)
    }
    /// Spares are tracked on the right-hand side, numbered from 1.
    pub fn spare(number: u8) -> Self {
        Self::new(number, Side::Right, WheelSlot::Spare)
    }
    pub fn is_spare(&self) -> bool {
        self.slot == WheelSlot::Spare
    }
    pub fn label(&self) -> String {
        self.to_string()
    }
}

/// Renders an optional position, `STORE` when absent.
pub fn format_position(position: Option<&Position>) -> String {
    match position {
        Some(p) => p.label(),
        None => STORE_LABEL.to_string(),
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.side {
            Side::Left => 'L',
            Side::Right => 'R',
        };
        match self.slot {
            WheelSlot::Spare => write!(f, "SP-{}", self.axle_index),
            WheelSlot::Single => write!(f, "{}{}", side, self.axle_index),
            WheelSlot::Inner => write!(f, "{}{}-IN", side, self.axle_index),
            WheelSlot::Outer => write!(f, "{}{}-OUT", side, self.axle_index),
        }
    }
}

impl FromStr for Position {
    type Err = ParsePositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParsePositionError(s.to_string());

        if let Some(number) = s.strip_prefix("SP-") {
            let number: u8 = number.parse().map_err(|_| err())?;
            if number == 0 {
                return Err(err());
            }
            return Ok(Position::spare(number));
        }

        let mut chars = s.chars();
        let side = match chars.next() {
            Some('L') => Side::Left,
            Some('R') => Side::Right,
            _ => return Err(err()),
        };
        let rest = chars.as_str();
        let (axle, slot) = match rest.split_once('-') {
            Some((axle, "IN")) => (axle, WheelSlot::Inner),
            Some((axle, "OUT")) => (axle, WheelSlot::Outer),
            Some(_) => return Err(err()),
            None => (rest, WheelSlot::Single),
        };
        let axle_index: u8 = axle.parse().map_err(|_| err())?;
        if axle_index == 0 {
            return Err(err());
        }

        Ok(Position::new(axle_index, side, slot))
    }
}

use crate::job::JobStatus;
use crate::tyre::TyreStatus;

/// Result of every lifecycle transition.
pub type Outcome<T> = Result<T, LifecycleError>;

/// Broad class of a rejected transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// A required reference or selection was missing or unknown.
    InvalidInput,
    /// Applying the transition would break a lifecycle or layout invariant.
    InvariantViolation,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LifecycleError {
    #[error("Required field '{0}' is empty")]
    MissingField(&'static str),
    #[error("Selection is empty")]
    EmptySelection,
    #[error("Quantity must be at least one")]
    ZeroQuantity,
    #[error("Tyre {0} does not exist")]
    UnknownTyre(String),
    #[error("Vehicle {0} does not exist")]
    UnknownVehicle(String),
    #[error("Vehicle type {0} does not exist")]
    UnknownVehicleType(String),
    #[error("Job card {0} does not exist")]
    UnknownJob(String),
    #[error("Spare count {requested} exceeds the maximum of {max}")]
    TooManySpares { requested: u8, max: u8 },
    #[error("Vehicle type has {0} axles, at most 255 are supported")]
    TooManyAxles(usize),
    #[error("Tyre {0} is not fitted to a vehicle")]
    NotFitted(String),
    #[error("Tyre {tyre} is fitted to {actual:?}, expected vehicle {expected}")]
    WrongVehicle {
        tyre: String,
        expected: String,
        actual: Option<String>,
    },
    #[error("Tyre {tyre} cannot move from {from} to {to}")]
    IllegalTyreTransition {
        tyre: String,
        from: TyreStatus,
        to: TyreStatus,
    },
    #[error("Tyre {tyre} is {actual}, expected {expected}")]
    UnexpectedTyreStatus {
        tyre: String,
        actual: TyreStatus,
        expected: TyreStatus,
    },
    #[error("Job card {job} cannot move from {from} to {to}")]
    IllegalJobTransition {
        job: String,
        from: JobStatus,
        to: JobStatus,
    },
    #[error("Position {position} on {vehicle} is already held by tyre {occupant}")]
    PositionOccupied {
        vehicle: String,
        position: String,
        occupant: String,
    },
    #[error("Position {position} does not exist on vehicle {vehicle}")]
    InvalidPosition { vehicle: String, position: String },
    #[error("Tyre {0} is currently at {1}, expected {2}")]
    PositionMismatch(String, String, String),
    #[error("Tyre {0} already exists")]
    DuplicateTyre(String),
    #[error("Vehicle type {0} already exists")]
    DuplicateVehicleType(String),
    #[error("Vehicle type {0} is still referenced by {1} vehicle(s)")]
    VehicleTypeInUse(String, usize),
    #[error("Proposed layout does not cover the same tyres as the current one")]
    AssignmentMismatch,
    #[error("Tyre {0} cannot replace itself")]
    SelfReplacement(String),
    #[error("Failed to mint identifier: {0}")]
    Identifier(String),
}

impl LifecycleError {
    pub fn rejection(&self) -> Rejection {
        match self {
            LifecycleError::MissingField(_)
            | LifecycleError::EmptySelection
            | LifecycleError::ZeroQuantity
            | LifecycleError::UnknownTyre(_)
            | LifecycleError::UnknownVehicle(_)
            | LifecycleError::UnknownVehicleType(_)
            | LifecycleError::UnknownJob(_)
            | LifecycleError::TooManySpares { .. }
            | LifecycleError::TooManyAxles(_)
            | LifecycleError::AssignmentMismatch
            | LifecycleError::SelfReplacement(_) => Rejection::InvalidInput,
            LifecycleError::NotFitted(_)
            | LifecycleError::WrongVehicle { .. }
            | LifecycleError::IllegalTyreTransition { .. }
            | LifecycleError::UnexpectedTyreStatus { .. }
            | LifecycleError::IllegalJobTransition { .. }
            | LifecycleError::PositionOccupied { .. }
            | LifecycleError::InvalidPosition { .. }
            | LifecycleError::PositionMismatch(..)
            | LifecycleError::DuplicateTyre(_)
            | LifecycleError::DuplicateVehicleType(_)
            | LifecycleError::VehicleTypeInUse(..)
            | LifecycleError::Identifier(_) => Rejection::InvariantViolation,
        }
    }
}

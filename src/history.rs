//! Audit trail events
//!
//! History is a one-way sink: transitions append to it and nothing reads it
//! back to make a decision.
use std::fmt;

use super::tyre::TimeStamp;

/// Subject used for events that cover a whole scrap sale.
pub const BULK_SALE_SUBJECT: &str = "BULK-SALE";

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserRole {
    #[n(0)]
    FleetAdmin,
    #[n(1)]
    MaintenanceManager,
    #[n(2)]
    OpsViewer,
    #[n(3)]
    Driver,
}

/// Who is performing an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub name: String,
    pub role: UserRole,
}

impl Actor {
    pub fn new(name: &str, role: UserRole) -> Self {
        Self {
            name: name.to_string(),
            role,
        }
    }
    /// The automation identity used for auto-raised jobs.
    pub fn system() -> Self {
        Self::new("System", UserRole::FleetAdmin)
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    #[n(0)]
    Created,
    #[n(1)]
    Fitted,
    #[n(2)]
    Removed,
    #[n(3)]
    Inspected,
    #[n(4)]
    RetreadSent,
    #[n(5)]
    RetreadCompleted,
    #[n(6)]
    RetreadRejected,
    #[n(7)]
    RepairLogged,
    #[n(8)]
    Scrapped,
    #[n(9)]
    JobCreated,
    #[n(10)]
    JobCompleted,
    #[n(11)]
    JobCancelled,
    #[n(12)]
    StockTransferred,
    #[n(13)]
    Rotation,
    #[n(14)]
    ScrapSold,
    #[n(15)]
    AlignmentJobCreated,
    #[n(16)]
    SensorLinked,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionType::Created => "Created",
            ActionType::Fitted => "Fitted",
            ActionType::Removed => "Removed",
            ActionType::Inspected => "Inspected",
            ActionType::RetreadSent => "Sent for Retread",
            ActionType::RetreadCompleted => "Retread Completed",
            ActionType::RetreadRejected => "Retread Rejected",
            ActionType::RepairLogged => "Repair Logged",
            ActionType::Scrapped => "Scrapped",
            ActionType::JobCreated => "Job Card Created",
            ActionType::JobCompleted => "Job Card Completed",
            ActionType::JobCancelled => "Job Card Cancelled",
            ActionType::StockTransferred => "Stock Transferred",
            ActionType::Rotation => "Tyre Rotated",
            ActionType::ScrapSold => "Scrap Sold",
            ActionType::AlignmentJobCreated => "Alignment Job Created",
            ActionType::SensorLinked => "TPMS Sensor Linked",
        };
        f.write_str(label)
    }
}

#[derive(Debug, PartialEq, Eq, minicbor::Encode, minicbor::Decode, Clone)]
pub struct HistoryEvent {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub tyre_id: String, // or BULK_SALE_SUBJECT
    #[n(2)]
    pub action: ActionType,
    #[n(3)]
    pub details: String,
    #[n(4)]
    pub timestamp: TimeStamp,
    #[n(5)]
    pub user: String,
    #[n(6)]
    pub role: UserRole,
}

impl HistoryEvent {
    pub fn new(id: String, tyre_id: &str, action: ActionType, details: String, actor: &Actor) -> Self {
        Self {
            id,
            tyre_id: tyre_id.to_string(),
            action,
            details,
            timestamp: TimeStamp::new(),
            user: actor.name.clone(),
            role: actor.role,
        }
    }
    /// CBOR encoding of the event and the sha256 digest that addresses it.
    pub fn build(&self) -> anyhow::Result<(String, Vec<u8>)> {
        let cbor = minicbor::to_vec(self)?;
        let hash = sha256::digest(&cbor);

        Ok((hash, cbor))
    }
}

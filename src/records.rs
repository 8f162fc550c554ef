//! Append-only operational records: inspections, retreads and repairs
use std::fmt;

use super::tyre::TimeStamp;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InspectionCondition {
    #[n(0)]
    Ok,
    #[n(1)]
    Cut,
    #[n(2)]
    Bulge,
    #[n(3)]
    Uneven,
    #[n(4)]
    Damaged,
}

impl fmt::Display for InspectionCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InspectionCondition::Ok => "OK",
            InspectionCondition::Cut => "Cut",
            InspectionCondition::Bulge => "Bulge",
            InspectionCondition::Uneven => "Uneven",
            InspectionCondition::Damaged => "Damaged",
        };
        f.write_str(label)
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Inspection {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub tyre_id: String,
    #[n(2)]
    pub condition: InspectionCondition,
    #[n(3)]
    pub pressure_psi: Option<f64>,
    #[n(4)]
    pub tread_depth_mm: Option<f64>,
    #[n(5)]
    pub remarks: Option<String>,
    #[n(6)]
    pub timestamp: TimeStamp,
    #[n(7)]
    pub user: String,
}

impl Inspection {
    pub fn is_ok(&self) -> bool {
        self.condition == InspectionCondition::Ok
    }
}

/// Most recent inspection of `tyre_id`. Ties on timestamp go to the later record.
pub fn latest_inspection<'a>(inspections: &'a [Inspection], tyre_id: &str) -> Option<&'a Inspection> {
    inspections
        .iter()
        .filter(|i| i.tyre_id == tyre_id)
        .max_by_key(|i| i.timestamp)
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetreadStatus {
    #[n(0)]
    Pending,
    #[n(1)]
    Completed,
    #[n(2)]
    Rejected,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetreadProcess {
    #[n(0)]
    Cold,
    #[n(1)]
    Hot,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct RetreadRecord {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub tyre_id: String,
    #[n(2)]
    pub life_no: u32, // life number the casing had when it went out
    #[n(3)]
    pub vendor_id: String,
    #[n(4)]
    pub process: RetreadProcess,
    #[n(5)]
    pub start_date: TimeStamp,
    #[n(6)]
    pub completion_date: Option<TimeStamp>,
    #[n(7)]
    pub cost: Option<u64>,
    #[n(8)]
    pub status: RetreadStatus,
    #[n(9)]
    pub rejection_reason: Option<String>,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Repair {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub tyre_id: String,
    #[n(2)]
    pub kind: String,
    #[n(3)]
    pub cost: u64,
    #[n(4)]
    pub vendor_id: String,
    #[n(5)]
    pub date: TimeStamp,
    #[n(6)]
    pub remarks: Option<String>,
}

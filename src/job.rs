//! Job cards and their open -> in progress -> completed workflow
use std::fmt;

use super::error::LifecycleError;
use super::position::Position;
use super::rotation::RotationMove;
use super::tyre::TimeStamp;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    #[n(0)]
    Open, // Created, waiting for stock issue
    #[n(1)]
    InProgress, // Stock issued, waiting for fitment
    #[n(2)]
    Completed,
    #[n(3)]
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }
    pub fn is_outstanding(self) -> bool {
        !self.is_terminal()
    }
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;

        matches!(
            (self, next),
            (Open, InProgress) | (InProgress, Completed) | (Open, Cancelled) | (InProgress, Cancelled)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Open => "Open",
            JobStatus::InProgress => "In Progress",
            JobStatus::Completed => "Completed",
            JobStatus::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    #[n(0)]
    High,
    #[n(1)]
    Medium,
    #[n(2)]
    Low,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    #[n(0)]
    Wear,
    #[n(1)]
    Damage,
    #[n(2)]
    Rotation,
    #[n(3)]
    EndOfLife,
    #[n(4)]
    AbnormalWear,
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RemovalReason::Wear => "Excessive Wear",
            RemovalReason::Damage => "Damage / Blowout",
            RemovalReason::Rotation => "Rotation",
            RemovalReason::EndOfLife => "End of Life",
            RemovalReason::AbnormalWear => "Abnormal Wear",
        };
        f.write_str(label)
    }
}

/// Where a removed tyre goes once its replacement job completes.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    #[n(0)]
    Retread,
    #[n(1)]
    Inventory,
    #[n(2)]
    Scrap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobType {
    Replacement,
    Rotation,
    Inspection,
    Alignment,
}

/// Job payload, one shape per job type.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    #[n(0)]
    Replacement {
        #[n(0)]
        target_tyre_id: String,
        #[n(1)]
        position: Position,
        #[n(2)]
        replacement_tyre_id: String,
        #[n(3)]
        removal_reason: RemovalReason,
        #[n(4)]
        destination: Destination,
    },
    #[n(1)]
    Rotation {
        #[n(0)]
        moves: Vec<RotationMove>,
    },
    #[n(2)]
    Inspection {
        #[n(0)]
        target_tyre_id: Option<String>,
    },
    #[n(3)]
    Alignment {
        #[n(0)]
        trigger_tyre_id: String, // the tyre whose uneven wear raised the job
    },
}

impl JobKind {
    pub fn job_type(&self) -> JobType {
        match self {
            JobKind::Replacement { .. } => JobType::Replacement,
            JobKind::Rotation { .. } => JobType::Rotation,
            JobKind::Inspection { .. } => JobType::Inspection,
            JobKind::Alignment { .. } => JobType::Alignment,
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct JobCard {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub vehicle_id: String,
    #[n(2)]
    pub kind: JobKind,
    #[n(3)]
    pub priority: Priority,
    #[n(4)]
    pub status: JobStatus,
    #[n(5)]
    pub created_at: TimeStamp,
    #[n(6)]
    pub created_by: String,
    #[n(7)]
    pub issued_at: Option<TimeStamp>,
    #[n(8)]
    pub completed_at: Option<TimeStamp>,
    #[n(9)]
    pub completed_by: Option<String>,
    #[n(10)]
    pub cancelled_at: Option<TimeStamp>,
}

impl JobCard {
    pub fn new(id: String, vehicle_id: &str, kind: JobKind, priority: Priority, created_by: &str) -> Self {
        Self {
            id,
            vehicle_id: vehicle_id.to_string(),
            kind,
            priority,
            status: JobStatus::Open,
            created_at: TimeStamp::new(),
            created_by: created_by.to_string(),
            issued_at: None,
            completed_at: None,
            completed_by: None,
            cancelled_at: None,
        }
    }

    pub fn job_type(&self) -> JobType {
        self.kind.job_type()
    }

    pub fn check_transition(&self, next: JobStatus) -> Result<(), LifecycleError> {
        if self.status.can_transition_to(next) {
            return Ok(());
        }
        Err(LifecycleError::IllegalJobTransition {
            job: self.id.clone(),
            from: self.status,
            to: next,
        })
    }

    /// Open -> InProgress.
    pub fn issue(&mut self, at: TimeStamp) -> Result<(), LifecycleError> {
        self.check_transition(JobStatus::InProgress)?;
        self.status = JobStatus::InProgress;
        self.issued_at = Some(at);
        Ok(())
    }

    /// InProgress -> Completed.
    pub fn complete(&mut self, at: TimeStamp, by: &str) -> Result<(), LifecycleError> {
        self.check_transition(JobStatus::Completed)?;
        self.status = JobStatus::Completed;
        self.completed_at = Some(at);
        self.completed_by = Some(by.to_string());
        Ok(())
    }

    /// Open or InProgress -> Cancelled.
    pub fn cancel(&mut self, at: TimeStamp) -> Result<(), LifecycleError> {
        self.check_transition(JobStatus::Cancelled)?;
        self.status = JobStatus::Cancelled;
        self.cancelled_at = Some(at);
        Ok(())
    }

    /// Whether this is an outstanding alignment job on `vehicle_id`.
    pub fn is_open_alignment_for(&self, vehicle_id: &str) -> bool {
        self.vehicle_id == vehicle_id
            && self.job_type() == JobType::Alignment
            && self.status.is_outstanding()
    }
}

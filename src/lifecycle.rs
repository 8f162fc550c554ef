//! Lifecycle transitions over the fleet store
//!
//! Each transition stages its records and history events against an
//! immutable view of the fleet. Nothing is written unless staging succeeds,
//! so a rejected call leaves the store exactly as it was.
use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};

use super::error::{LifecycleError, Outcome};
use super::fleet::Fleet;
use super::history::{ActionType, Actor, BULK_SALE_SUBJECT, HistoryEvent};
use super::job::{Destination, JobCard, JobKind, JobStatus, Priority, RemovalReason};
use super::position::{Position, format_position};
use super::records::{
    Inspection, InspectionCondition, Repair, RetreadProcess, RetreadRecord, RetreadStatus,
};
use super::rotation::{RotationMove, apply_moves, ensure_unique_positions};
use super::tyre::{Fitment, TimeStamp, Tyre, TyreStatus};
use super::utils::{
    HISTORY_HRP, INSPECTION_HRP, JOB_HRP, REPAIR_HRP, RETREAD_HRP, VEHICLE_HRP, mint_id,
    new_sensor_id, short_suffix,
};
use super::vehicle::{Vehicle, VehicleType};

const AUTO_TRIGGER_USER: &str = "System (Auto-Trigger)";

fn rejected(op: &'static str) -> impl Fn(&LifecycleError) {
    move |e: &LifecycleError| warn!(op, kind = ?e.rejection(), error = %e, "transition rejected")
}

fn event(tyre_id: &str, action: ActionType, details: String, actor: &Actor) -> Outcome<HistoryEvent> {
    Ok(HistoryEvent::new(mint_id(HISTORY_HRP)?, tyre_id, action, details, actor))
}

fn require_text(value: &str, field: &'static str) -> Outcome<()> {
    if value.trim().is_empty() {
        return Err(LifecycleError::MissingField(field));
    }
    Ok(())
}

/// Whether received stock is new or already retreaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockClass {
    New,
    Retread { life_no: u32 },
}

/// Goods receipt note for inbound stock.
#[derive(Debug, Clone, PartialEq)]
pub struct GoodsReceipt {
    pub po_ref: String,
    pub vendor_id: String,
    pub location_id: String, // empty = default hub
    pub quantity: u32,
    pub base_serial: String,
    pub brand: String,
    pub model: String,
    pub size: String,
    pub unit_cost: u64,
    pub stock: StockClass,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InspectionReport {
    pub tyre_id: String,
    pub condition: InspectionCondition,
    pub pressure_psi: Option<f64>,
    pub tread_depth_mm: Option<f64>,
    pub remarks: Option<String>,
}

impl InspectionReport {
    pub fn new(tyre_id: &str, condition: InspectionCondition) -> Self {
        Self {
            tyre_id: tyre_id.to_string(),
            condition,
            pressure_psi: None,
            tread_depth_mm: None,
            remarks: None,
        }
    }
    pub fn set_pressure(mut self, psi: f64) -> Self {
        self.pressure_psi = Some(psi);
        self
    }
    pub fn set_tread_depth(mut self, mm: f64) -> Self {
        self.tread_depth_mm = Some(mm);
        self
    }
    pub fn set_remarks(mut self, remarks: &str) -> Self {
        self.remarks = Some(remarks.to_string());
        self
    }
}

/// What recording an inspection produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectionOutcome {
    pub inspection_id: String,
    pub alignment_job_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementOrder {
    pub target_tyre_id: String,
    pub replacement_tyre_id: String,
    pub removal_reason: RemovalReason,
    pub destination: Destination,
}

/// Resulting spec of a successful retread.
#[derive(Debug, Clone, PartialEq)]
pub struct RetreadResult {
    pub cost: u64,
    pub model: String,
    pub tread_depth_mm: f64,
    pub process: RetreadProcess,
}

impl RetreadResult {
    pub fn new(cost: u64, model: &str, tread_depth_mm: f64) -> Self {
        Self {
            cost,
            model: model.to_string(),
            tread_depth_mm,
            process: RetreadProcess::Cold,
        }
    }
    pub fn set_process(mut self, process: RetreadProcess) -> Self {
        self.process = process;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapSale {
    pub tyre_ids: Vec<String>,
    pub buyer: String,
    pub total_amount: u64,
    pub invoice_ref: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairEntry {
    pub tyre_id: String,
    pub kind: String, // e.g. "Puncture", "Sidewall patch"
    pub cost: u64,
    pub vendor_id: String,
    pub remarks: Option<String>,
}

/// Details captured for one position during onboarding. Blank fields fall
/// back to the configured onboarding defaults.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TyreSpec {
    pub serial: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub size: Option<String>,
    pub purchase_cost: Option<u64>,
    /// Declared current tread. Recorded in the audit trail only; it does
    /// not change the life number or distance of the onboarded tyre.
    pub tread_depth_mm: Option<f64>,
}

/// A brownfield vehicle joining the fleet with its tyres already fitted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Onboarding {
    pub plate_number: String,
    pub type_id: String,
    pub odometer: u64,
    pub spare_count: u8,
    /// Position label (`L1`, `R2-IN`, `SP-1`, ...) -> tyre details.
    pub assignments: BTreeMap<String, TyreSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardedVehicle {
    pub vehicle_id: String,
    pub tyre_ids: Vec<String>,
}

struct StagedInspection {
    inspection: Inspection,
    alignment: Option<(JobCard, HistoryEvent)>,
    driver_event: Option<HistoryEvent>,
}

/// The tyre a job's audit events are filed under.
fn subject_tyre(kind: &JobKind) -> Option<&str> {
    match kind {
        JobKind::Replacement { target_tyre_id, .. } => Some(target_tyre_id),
        JobKind::Rotation { moves } => moves.first().map(|m| m.tyre_id.as_str()),
        JobKind::Inspection { target_tyre_id } => target_tyre_id.as_deref(),
        JobKind::Alignment { trigger_tyre_id } => Some(trigger_tyre_id),
    }
}

/// Per-unit price of a bulk sale, rounded half up.
pub fn unit_sale_price(total: u64, count: usize) -> u64 {
    let count = count.max(1) as u128;
    let unit = (total as u128 + count / 2) / count;
    u64::try_from(unit).unwrap_or(u64::MAX)
}

impl Fleet {
    // ---------------------------------------------------------------
    // Vehicle type master

    pub fn add_vehicle_type(&mut self, vehicle_type: VehicleType) -> Outcome<()> {
        let check = || -> Outcome<()> {
            require_text(&vehicle_type.id, "id")?;
            require_text(&vehicle_type.name, "name")?;
            if vehicle_type.axles.is_empty() {
                return Err(LifecycleError::MissingField("axles"));
            }
            if vehicle_type.axles.len() > u8::MAX as usize {
                return Err(LifecycleError::TooManyAxles(vehicle_type.axles.len()));
            }
            if self.vehicle_types.contains_key(&vehicle_type.id) {
                return Err(LifecycleError::DuplicateVehicleType(vehicle_type.id.clone()));
            }
            Ok(())
        };
        check().inspect_err(rejected("add_vehicle_type"))?;

        info!(vehicle_type = %vehicle_type.id, axles = vehicle_type.axles.len(), "vehicle type added");
        self.vehicle_types.insert(vehicle_type.id.clone(), vehicle_type);
        Ok(())
    }

    pub fn remove_vehicle_type(&mut self, type_id: &str) -> Outcome<VehicleType> {
        let check = || -> Outcome<()> {
            if !self.vehicle_types.contains_key(type_id) {
                return Err(LifecycleError::UnknownVehicleType(type_id.to_string()));
            }
            let in_use = self.vehicles.values().filter(|v| v.type_id == type_id).count();
            if in_use > 0 {
                return Err(LifecycleError::VehicleTypeInUse(type_id.to_string(), in_use));
            }
            Ok(())
        };
        check().inspect_err(rejected("remove_vehicle_type"))?;

        info!(vehicle_type = %type_id, "vehicle type removed");
        self.vehicle_types
            .remove(type_id)
            .ok_or_else(|| LifecycleError::UnknownVehicleType(type_id.to_string()))
    }

    // ---------------------------------------------------------------
    // Stock

    /// Receives `quantity` tyres against a GRN. Serials are `base-1..base-N`
    /// for more than one unit, otherwise `base`. No history is recorded.
    pub fn receive_stock(&mut self, grn: &GoodsReceipt) -> Outcome<Vec<String>> {
        let serials = self
            .stage_receipt(grn)
            .inspect_err(rejected("receive_stock"))?;

        let defaults = &self.config.receiving;
        let (life_no, expected_life_km, tread_mm) = match grn.stock {
            StockClass::New => (0, defaults.new_expected_life_km, defaults.new_tread_depth_mm),
            StockClass::Retread { life_no } => (
                life_no,
                defaults.retread_expected_life_km,
                defaults.retread_tread_depth_mm,
            ),
        };
        let oem_psi = defaults.oem_psi;
        let location = if grn.location_id.trim().is_empty() {
            self.config.locations.default_hub.clone()
        } else {
            grn.location_id.clone()
        };

        for serial in &serials {
            let tyre = Tyre::new(serial, &grn.brand, &grn.model, &grn.size)
                .set_purchase_cost(grn.unit_cost)
                .set_location(&location)
                .set_life_no(life_no)
                .set_expected_life_km(expected_life_km)
                .set_tread_depth(tread_mm)
                .set_oem_psi(oem_psi);
            self.tyres.insert(serial.clone(), tyre);
        }

        info!(
            po = %grn.po_ref,
            vendor = %grn.vendor_id,
            location = %location,
            count = serials.len(),
            "stock received"
        );
        Ok(serials)
    }

    fn stage_receipt(&self, grn: &GoodsReceipt) -> Outcome<Vec<String>> {
        let base = grn.base_serial.trim();
        require_text(base, "base_serial")?;
        require_text(&grn.po_ref, "po_ref")?;
        if grn.quantity == 0 {
            return Err(LifecycleError::ZeroQuantity);
        }

        let serials: Vec<String> = if grn.quantity > 1 {
            (1..=grn.quantity).map(|n| format!("{base}-{n}")).collect()
        } else {
            vec![base.to_string()]
        };
        if let Some(taken) = serials.iter().find(|s| self.tyres.contains_key(*s)) {
            return Err(LifecycleError::DuplicateTyre(taken.clone()));
        }
        Ok(serials)
    }

    /// Moves store tyres to `target_location`. Tyres already there are left
    /// alone. Returns the ids that actually moved.
    pub fn transfer_stock(
        &mut self,
        tyre_ids: &[String],
        target_location: &str,
        actor: &Actor,
    ) -> Outcome<Vec<String>> {
        let staged = self
            .stage_transfer(tyre_ids, target_location, actor)
            .inspect_err(rejected("transfer_stock"))?;

        let now = TimeStamp::new();
        let mut moved = Vec::with_capacity(staged.len());
        for (tyre_id, history) in staged {
            if let Some(tyre) = self.tyres.get_mut(&tyre_id) {
                tyre.location_id = target_location.to_string();
                tyre.touch(now);
            }
            self.history.push(history);
            moved.push(tyre_id);
        }

        info!(location = %target_location, count = moved.len(), "stock transferred");
        Ok(moved)
    }

    fn stage_transfer(
        &self,
        tyre_ids: &[String],
        target_location: &str,
        actor: &Actor,
    ) -> Outcome<Vec<(String, HistoryEvent)>> {
        if tyre_ids.is_empty() {
            return Err(LifecycleError::EmptySelection);
        }
        require_text(target_location, "target_location")?;

        let mut seen = BTreeSet::new();
        let mut staged = vec![];
        for id in tyre_ids {
            let tyre = self.require_tyre(id)?;
            if tyre.fitment.is_some() {
                return Err(LifecycleError::UnexpectedTyreStatus {
                    tyre: id.clone(),
                    actual: tyre.status,
                    expected: TyreStatus::InStore,
                });
            }
            if tyre.location_id == target_location || !seen.insert(id.as_str()) {
                continue;
            }
            let details = format!("Transferred from {} to {target_location}.", tyre.location_id);
            staged.push((id.clone(), event(id, ActionType::StockTransferred, details, actor)?));
        }
        Ok(staged)
    }

    // ---------------------------------------------------------------
    // Inspections and repairs

    /// Appends an inspection. Uneven wear on a fitted tyre raises an
    /// alignment job for its vehicle unless one is already outstanding.
    pub fn record_inspection(
        &mut self,
        report: &InspectionReport,
        actor: &Actor,
    ) -> Outcome<InspectionOutcome> {
        let staged = self
            .stage_inspection(report, actor, false, false)
            .inspect_err(rejected("record_inspection"))?;

        Ok(self.commit_inspection(staged))
    }

    /// Records a driver's walkaround of one vehicle. Every non-OK result
    /// also files an `Inspected` event on the tyre.
    pub fn record_walkaround(
        &mut self,
        vehicle_id: &str,
        reports: &[InspectionReport],
        actor: &Actor,
    ) -> Outcome<Vec<InspectionOutcome>> {
        let staged = self
            .stage_walkaround(vehicle_id, reports, actor)
            .inspect_err(rejected("record_walkaround"))?;

        let outcomes: Vec<InspectionOutcome> = staged
            .into_iter()
            .map(|s| self.commit_inspection(s))
            .collect();

        info!(vehicle = %vehicle_id, count = outcomes.len(), "walkaround recorded");
        Ok(outcomes)
    }

    fn stage_walkaround(
        &self,
        vehicle_id: &str,
        reports: &[InspectionReport],
        actor: &Actor,
    ) -> Outcome<Vec<StagedInspection>> {
        self.require_vehicle(vehicle_id)?;
        if reports.is_empty() {
            return Err(LifecycleError::EmptySelection);
        }

        let mut staged = Vec::with_capacity(reports.len());
        let mut alignment_staged = false;
        for report in reports {
            let tyre = self.require_tyre(&report.tyre_id)?;
            if !tyre.is_on_vehicle(vehicle_id) {
                return Err(LifecycleError::WrongVehicle {
                    tyre: tyre.id.clone(),
                    expected: vehicle_id.to_string(),
                    actual: tyre.current_vehicle_id().map(str::to_string),
                });
            }
            let s = self.stage_inspection(report, actor, alignment_staged, true)?;
            alignment_staged |= s.alignment.is_some();
            staged.push(s);
        }
        Ok(staged)
    }

    fn stage_inspection(
        &self,
        report: &InspectionReport,
        actor: &Actor,
        alignment_staged: bool,
        driver_report: bool,
    ) -> Outcome<StagedInspection> {
        let tyre = self.require_tyre(&report.tyre_id)?;
        let inspection = Inspection {
            id: mint_id(INSPECTION_HRP)?,
            tyre_id: tyre.id.clone(),
            condition: report.condition,
            pressure_psi: report.pressure_psi,
            tread_depth_mm: report.tread_depth_mm,
            remarks: report.remarks.clone(),
            timestamp: TimeStamp::new(),
            user: actor.name.clone(),
        };

        let mut alignment = None;
        if report.condition == InspectionCondition::Uneven
            && let Some(vehicle_id) = tyre.current_vehicle_id()
            && !alignment_staged
            && !self.job_cards.iter().any(|j| j.is_open_alignment_for(vehicle_id))
        {
            let job = JobCard::new(
                mint_id(JOB_HRP)?,
                vehicle_id,
                JobKind::Alignment {
                    trigger_tyre_id: tyre.id.clone(),
                },
                Priority::High,
                AUTO_TRIGGER_USER,
            );
            let details = format!(
                "Automated Alignment Job ({}) created due to Uneven wear detection on {vehicle_id}.",
                job.id
            );
            let history = event(&tyre.id, ActionType::AlignmentJobCreated, details, &Actor::system())?;
            alignment = Some((job, history));
        }

        let driver_event = if driver_report && !inspection.is_ok() {
            let details = format!(
                "Driver reported issue: {} ({})",
                inspection.condition,
                inspection.remarks.as_deref().unwrap_or_default()
            );
            Some(event(&tyre.id, ActionType::Inspected, details, actor)?)
        } else {
            None
        };

        Ok(StagedInspection {
            inspection,
            alignment,
            driver_event,
        })
    }

    fn commit_inspection(&mut self, staged: StagedInspection) -> InspectionOutcome {
        let StagedInspection {
            inspection,
            alignment,
            driver_event,
        } = staged;

        info!(
            tyre = %inspection.tyre_id,
            condition = %inspection.condition,
            "inspection recorded"
        );
        let outcome = InspectionOutcome {
            inspection_id: inspection.id.clone(),
            alignment_job_id: alignment.as_ref().map(|(job, _)| job.id.clone()),
        };
        self.inspections.push(inspection);
        if let Some(history) = driver_event {
            self.history.push(history);
        }
        if let Some((job, history)) = alignment {
            info!(job = %job.id, vehicle = %job.vehicle_id, "alignment job raised");
            self.job_cards.push(job);
            self.history.push(history);
        }
        outcome
    }

    pub fn log_repair(&mut self, entry: &RepairEntry, actor: &Actor) -> Outcome<String> {
        let stage = || -> Outcome<(Repair, HistoryEvent)> {
            self.require_tyre(&entry.tyre_id)?;
            require_text(&entry.kind, "kind")?;
            let repair = Repair {
                id: mint_id(REPAIR_HRP)?,
                tyre_id: entry.tyre_id.clone(),
                kind: entry.kind.clone(),
                cost: entry.cost,
                vendor_id: entry.vendor_id.clone(),
                date: TimeStamp::new(),
                remarks: entry.remarks.clone(),
            };
            let details = format!(
                "{} repaired by {} for ₹{}.",
                entry.kind, entry.vendor_id, entry.cost
            );
            let history = event(&entry.tyre_id, ActionType::RepairLogged, details, actor)?;
            Ok((repair, history))
        };
        let (repair, history) = stage().inspect_err(rejected("log_repair"))?;

        info!(tyre = %repair.tyre_id, repair = %repair.id, cost = repair.cost, "repair logged");
        let id = repair.id.clone();
        self.repairs.push(repair);
        self.history.push(history);
        Ok(id)
    }

    // ---------------------------------------------------------------
    // Job cards

    /// Raises a replacement job for a fitted tyre and allocates the
    /// replacement from store.
    pub fn create_replacement_job(
        &mut self,
        order: &ReplacementOrder,
        actor: &Actor,
    ) -> Outcome<String> {
        let (job, history) = self
            .stage_replacement_job(order, actor)
            .inspect_err(rejected("create_replacement_job"))?;

        let now = TimeStamp::new();
        if let Some(replacement) = self.tyres.get_mut(&order.replacement_tyre_id) {
            replacement.status = TyreStatus::Allocated;
            replacement.touch(now);
        }
        info!(
            job = %job.id,
            vehicle = %job.vehicle_id,
            tyre = %order.target_tyre_id,
            replacement = %order.replacement_tyre_id,
            "replacement job created"
        );
        let id = job.id.clone();
        self.job_cards.push(job);
        self.history.push(history);
        Ok(id)
    }

    fn stage_replacement_job(
        &self,
        order: &ReplacementOrder,
        actor: &Actor,
    ) -> Outcome<(JobCard, HistoryEvent)> {
        let target = self.require_tyre(&order.target_tyre_id)?;
        let Some(Fitment {
            vehicle_id,
            position,
        }) = target.fitment.as_ref()
        else {
            return Err(LifecycleError::NotFitted(target.id.clone()));
        };
        if order.replacement_tyre_id == order.target_tyre_id {
            return Err(LifecycleError::SelfReplacement(target.id.clone()));
        }
        let replacement = self.require_tyre(&order.replacement_tyre_id)?;
        replacement.expect_status(TyreStatus::InStore)?;
        replacement.check_transition(TyreStatus::Allocated)?;

        let job = JobCard::new(
            mint_id(JOB_HRP)?,
            vehicle_id,
            JobKind::Replacement {
                target_tyre_id: target.id.clone(),
                position: *position,
                replacement_tyre_id: replacement.id.clone(),
                removal_reason: order.removal_reason,
                destination: order.destination,
            },
            Priority::Medium,
            &actor.name,
        );
        let details = format!(
            "Replacement job {} raised for {vehicle_id} {position} ({}). Replacement: {}.",
            job.id, order.removal_reason, replacement.id
        );
        let history = event(&target.id, ActionType::JobCreated, details, actor)?;
        Ok((job, history))
    }

    /// Raises a rotation job from a planner move list.
    pub fn create_rotation_job(
        &mut self,
        vehicle_id: &str,
        moves: Vec<RotationMove>,
        actor: &Actor,
    ) -> Outcome<String> {
        let events = self
            .stage_rotation_job(vehicle_id, &moves, actor)
            .inspect_err(rejected("create_rotation_job"))?;
        let job_id = mint_id(JOB_HRP).inspect_err(rejected("create_rotation_job"))?;

        info!(job = %job_id, vehicle = %vehicle_id, moves = moves.len(), "rotation job created");
        let job = JobCard::new(
            job_id.clone(),
            vehicle_id,
            JobKind::Rotation { moves },
            Priority::Medium,
            &actor.name,
        );
        self.job_cards.push(job);
        self.history.extend(events);
        Ok(job_id)
    }

    fn stage_rotation_job(
        &self,
        vehicle_id: &str,
        moves: &[RotationMove],
        actor: &Actor,
    ) -> Outcome<Vec<HistoryEvent>> {
        let vehicle = self.require_vehicle(vehicle_id)?;
        if moves.is_empty() {
            return Err(LifecycleError::EmptySelection);
        }
        let vehicle_type = self
            .vehicle_type(&vehicle.type_id)
            .ok_or_else(|| LifecycleError::UnknownVehicleType(vehicle.type_id.clone()))?;

        let current = self.assignment(vehicle_id);
        let mut events = Vec::with_capacity(moves.len());
        for m in moves {
            self.check_at(vehicle_id, &m.tyre_id, &m.from)?;
            if !vehicle_type.is_valid_position(&m.to, vehicle.spare_count) {
                return Err(LifecycleError::InvalidPosition {
                    vehicle: vehicle_id.to_string(),
                    position: m.to.label(),
                });
            }
            let details = format!("Rotation planned: {} -> {}.", m.from, m.to);
            events.push(event(&m.tyre_id, ActionType::JobCreated, details, actor)?);
        }
        ensure_unique_positions(vehicle_id, &apply_moves(&current, moves))?;
        Ok(events)
    }

    /// Checks `tyre_id` is fitted to `vehicle_id` at `position`.
    fn check_at(&self, vehicle_id: &str, tyre_id: &str, position: &Position) -> Outcome<()> {
        let tyre = self.require_tyre(tyre_id)?;
        if !tyre.is_on_vehicle(vehicle_id) {
            return Err(LifecycleError::WrongVehicle {
                tyre: tyre_id.to_string(),
                expected: vehicle_id.to_string(),
                actual: tyre.current_vehicle_id().map(str::to_string),
            });
        }
        if tyre.position() != Some(position) {
            return Err(LifecycleError::PositionMismatch(
                tyre_id.to_string(),
                format_position(tyre.position()),
                position.label(),
            ));
        }
        Ok(())
    }

    /// OPEN -> IN_PROGRESS. Replacement jobs also hand the allocated tyre
    /// to the workshop.
    pub fn issue_stock(&mut self, job_id: &str, actor: &Actor) -> Outcome<()> {
        let idx = self
            .stage_issue(job_id)
            .inspect_err(rejected("issue_stock"))?;

        let now = TimeStamp::new();
        let workshop = self.config.locations.workshop.clone();
        let job = &mut self.job_cards[idx];
        job.issue(now)?;

        if let JobKind::Replacement {
            replacement_tyre_id,
            ..
        } = &job.kind
            && let Some(replacement) = self.tyres.get_mut(replacement_tyre_id)
        {
            replacement.status = TyreStatus::Issued;
            replacement.location_id = workshop;
            replacement.touch(now);
        }
        info!(job = %job_id, by = %actor.name, "stock issued");
        Ok(())
    }

    fn stage_issue(&self, job_id: &str) -> Outcome<usize> {
        let idx = self.require_job_index(job_id)?;
        let job = &self.job_cards[idx];
        job.check_transition(JobStatus::InProgress)?;
        if let JobKind::Replacement {
            replacement_tyre_id,
            ..
        } = &job.kind
        {
            let replacement = self.require_tyre(replacement_tyre_id)?;
            replacement.expect_status(TyreStatus::Allocated)?;
            replacement.check_transition(TyreStatus::Issued)?;
        }
        Ok(idx)
    }

    /// IN_PROGRESS -> COMPLETED, applying the job's physical work.
    pub fn complete_job(&mut self, job_id: &str, actor: &Actor) -> Outcome<()> {
        let (idx, events) = self
            .stage_completion(job_id, actor)
            .inspect_err(rejected("complete_job"))?;

        let now = TimeStamp::new();
        self.job_cards[idx].complete(now, &actor.name)?;
        let job = self.job_cards[idx].clone();

        match &job.kind {
            JobKind::Alignment { .. } | JobKind::Inspection { .. } => {}
            JobKind::Rotation { moves } => {
                for m in moves {
                    if let Some(tyre) = self.tyres.get_mut(&m.tyre_id) {
                        tyre.fitment = Some(Fitment {
                            vehicle_id: job.vehicle_id.clone(),
                            position: m.to,
                        });
                        tyre.touch(now);
                    }
                }
            }
            JobKind::Replacement {
                target_tyre_id,
                position,
                replacement_tyre_id,
                destination,
                ..
            } => {
                let (status, location) = self.destination_of(*destination);
                if let Some(removed) = self.tyres.get_mut(target_tyre_id) {
                    removed.status = status;
                    removed.location_id = location;
                    removed.fitment = None;
                    removed.touch(now);
                }
                if let Some(installed) = self.tyres.get_mut(replacement_tyre_id) {
                    installed.status = TyreStatus::Fitted;
                    installed.location_id = job.vehicle_id.clone();
                    installed.fitment = Some(Fitment {
                        vehicle_id: job.vehicle_id.clone(),
                        position: *position,
                    });
                    installed.touch(now);
                }
            }
        }
        self.history.extend(events);

        info!(job = %job.id, vehicle = %job.vehicle_id, by = %actor.name, "job completed");
        Ok(())
    }

    fn destination_of(&self, destination: Destination) -> (TyreStatus, String) {
        let locations = &self.config.locations;
        match destination {
            Destination::Inventory => (TyreStatus::InStore, locations.default_hub.clone()),
            Destination::Retread => (
                TyreStatus::RetreadInProgress,
                locations.retread_vendor.clone(),
            ),
            Destination::Scrap => (TyreStatus::Scrapped, locations.scrap_store.clone()),
        }
    }

    fn stage_completion(&self, job_id: &str, actor: &Actor) -> Outcome<(usize, Vec<HistoryEvent>)> {
        let idx = self.require_job_index(job_id)?;
        let job = &self.job_cards[idx];
        job.check_transition(JobStatus::Completed)?;

        let mut events = vec![];
        match &job.kind {
            JobKind::Alignment { .. } | JobKind::Inspection { .. } => {}
            JobKind::Rotation { moves } => {
                for m in moves {
                    let tyre = self.require_tyre(&m.tyre_id)?;
                    if !tyre.is_on_vehicle(&job.vehicle_id) {
                        return Err(LifecycleError::WrongVehicle {
                            tyre: tyre.id.clone(),
                            expected: job.vehicle_id.clone(),
                            actual: tyre.current_vehicle_id().map(str::to_string),
                        });
                    }
                    let details = format!("Rotated from {} to {} ({}).", m.from, m.to, job.id);
                    events.push(event(&m.tyre_id, ActionType::Rotation, details, actor)?);
                }
                let next = apply_moves(&self.assignment(&job.vehicle_id), moves);
                ensure_unique_positions(&job.vehicle_id, &next)?;
            }
            JobKind::Replacement {
                target_tyre_id,
                position,
                replacement_tyre_id,
                removal_reason,
                destination,
            } => {
                self.check_at(&job.vehicle_id, target_tyre_id, position)?;
                let (status, location) = self.destination_of(*destination);
                self.require_tyre(target_tyre_id)?.check_transition(status)?;

                let replacement = self.require_tyre(replacement_tyre_id)?;
                replacement.expect_status(TyreStatus::Issued)?;
                replacement.check_transition(TyreStatus::Fitted)?;

                if let Some(occupant) = self
                    .occupant(&job.vehicle_id, position)
                    .filter(|t| t.id != *target_tyre_id)
                {
                    return Err(LifecycleError::PositionOccupied {
                        vehicle: job.vehicle_id.clone(),
                        position: position.label(),
                        occupant: occupant.id.clone(),
                    });
                }

                let removed = format!(
                    "Removed from {} {position} ({removal_reason}). Sent to {location}.",
                    job.vehicle_id
                );
                events.push(event(target_tyre_id, ActionType::Removed, removed, actor)?);
                match destination {
                    Destination::Retread => {
                        let details = format!("Sent to {location} for retreading.");
                        events.push(event(target_tyre_id, ActionType::RetreadSent, details, actor)?);
                    }
                    Destination::Scrap => {
                        let details = format!("Scrapped after removal ({removal_reason}).");
                        events.push(event(target_tyre_id, ActionType::Scrapped, details, actor)?);
                    }
                    Destination::Inventory => {}
                }
                let fitted = format!("Fitted to {} at {position} ({}).", job.vehicle_id, job.id);
                events.push(event(replacement_tyre_id, ActionType::Fitted, fitted, actor)?);
            }
        }

        if let Some(subject) = subject_tyre(&job.kind) {
            let details = format!("Job card {} completed by {}.", job.id, actor.name);
            events.push(event(subject, ActionType::JobCompleted, details, actor)?);
        }
        Ok((idx, events))
    }

    /// OPEN/IN_PROGRESS -> CANCELLED. A replacement tyre held by the job
    /// goes back to store at the default hub.
    pub fn cancel_job(&mut self, job_id: &str, actor: &Actor) -> Outcome<()> {
        let stage = || -> Outcome<(usize, Option<HistoryEvent>)> {
            let idx = self.require_job_index(job_id)?;
            let job = &self.job_cards[idx];
            job.check_transition(JobStatus::Cancelled)?;
            let history = match subject_tyre(&job.kind) {
                Some(subject) => {
                    let details = format!("Job card {} cancelled by {}.", job.id, actor.name);
                    Some(event(subject, ActionType::JobCancelled, details, actor)?)
                }
                None => None,
            };
            Ok((idx, history))
        };
        let (idx, history) = stage().inspect_err(rejected("cancel_job"))?;

        let now = TimeStamp::new();
        let hub = self.config.locations.default_hub.clone();
        let job = &mut self.job_cards[idx];
        job.cancel(now)?;

        if let JobKind::Replacement {
            replacement_tyre_id,
            ..
        } = &job.kind
            && let Some(replacement) = self.tyres.get_mut(replacement_tyre_id)
            && matches!(replacement.status, TyreStatus::Allocated | TyreStatus::Issued)
        {
            replacement.status = TyreStatus::InStore;
            replacement.location_id = hub;
            replacement.touch(now);
        }
        self.history.extend(history);

        info!(job = %job_id, by = %actor.name, "job cancelled");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Retreading and disposal

    /// Brings a casing back from the retreader as a new life stage.
    pub fn complete_retread(
        &mut self,
        tyre_id: &str,
        result: &RetreadResult,
        actor: &Actor,
    ) -> Outcome<String> {
        let stage = || -> Outcome<(RetreadRecord, HistoryEvent)> {
            let tyre = self.require_tyre(tyre_id)?;
            tyre.expect_status(TyreStatus::RetreadInProgress)?;
            tyre.check_transition(TyreStatus::InStore)?;
            require_text(&result.model, "model")?;

            let now = TimeStamp::new();
            let vendor = &self.config.locations.retread_vendor;
            let record = RetreadRecord {
                id: mint_id(RETREAD_HRP)?,
                tyre_id: tyre.id.clone(),
                life_no: tyre.current_life_no,
                vendor_id: vendor.clone(),
                process: result.process,
                start_date: now,
                completion_date: Some(now),
                cost: Some(result.cost),
                status: RetreadStatus::Completed,
                rejection_reason: None,
            };
            let details = format!(
                "Retread completed by {vendor}: life {} -> {}, cost ₹{}.",
                tyre.current_life_no,
                tyre.current_life_no + 1,
                result.cost
            );
            let history = event(&tyre.id, ActionType::RetreadCompleted, details, actor)?;
            Ok((record, history))
        };
        let (record, history) = stage().inspect_err(rejected("complete_retread"))?;

        let hub = self.config.locations.default_hub.clone();
        if let Some(tyre) = self.tyres.get_mut(tyre_id) {
            tyre.status = TyreStatus::InStore;
            tyre.location_id = hub;
            tyre.current_life_no += 1;
            tyre.model = result.model.clone();
            tyre.initial_tread_depth_mm = Some(result.tread_depth_mm);
            tyre.touch(record.start_date);
            info!(tyre = %tyre_id, life_no = tyre.current_life_no, cost = result.cost, "retread completed");
        }
        let id = record.id.clone();
        self.retreads.push(record);
        self.history.push(history);
        Ok(id)
    }

    /// Scraps a casing the retreader turned down. The life number is kept.
    pub fn reject_retread(&mut self, tyre_id: &str, reason: &str, actor: &Actor) -> Outcome<String> {
        let stage = || -> Outcome<(RetreadRecord, HistoryEvent)> {
            let tyre = self.require_tyre(tyre_id)?;
            tyre.expect_status(TyreStatus::RetreadInProgress)?;
            tyre.check_transition(TyreStatus::Scrapped)?;
            require_text(reason, "reason")?;

            let record = RetreadRecord {
                id: mint_id(RETREAD_HRP)?,
                tyre_id: tyre.id.clone(),
                life_no: tyre.current_life_no,
                vendor_id: self.config.locations.retread_vendor.clone(),
                process: RetreadProcess::Cold,
                start_date: TimeStamp::new(),
                completion_date: None,
                cost: None,
                status: RetreadStatus::Rejected,
                rejection_reason: Some(reason.to_string()),
            };
            let details = format!("Retread rejected: {reason}.");
            let history = event(&tyre.id, ActionType::RetreadRejected, details, actor)?;
            Ok((record, history))
        };
        let (record, history) = stage().inspect_err(rejected("reject_retread"))?;

        let scrap_store = self.config.locations.scrap_store.clone();
        if let Some(tyre) = self.tyres.get_mut(tyre_id) {
            tyre.status = TyreStatus::Scrapped;
            tyre.location_id = scrap_store;
            tyre.touch(record.start_date);
        }
        info!(tyre = %tyre_id, reason, "retread rejected");
        let id = record.id.clone();
        self.retreads.push(record);
        self.history.push(history);
        Ok(id)
    }

    /// Sells a batch of scrapped tyres to one buyer. The total is spread
    /// evenly; returns the per-unit price.
    pub fn sell_scrap(&mut self, sale: &ScrapSale, actor: &Actor) -> Outcome<u64> {
        let stage = || -> Outcome<(Vec<String>, HistoryEvent)> {
            if sale.tyre_ids.is_empty() {
                return Err(LifecycleError::EmptySelection);
            }
            require_text(&sale.buyer, "buyer")?;

            let mut seen = BTreeSet::new();
            let mut units = vec![];
            for id in &sale.tyre_ids {
                let tyre = self.require_tyre(id)?;
                tyre.expect_status(TyreStatus::Scrapped)?;
                tyre.check_transition(TyreStatus::Sold)?;
                if seen.insert(id.as_str()) {
                    units.push(id.clone());
                }
            }
            let details = format!(
                "Sold {} scrapped units to {}. Ref: {}. Total: ₹{}.",
                units.len(),
                sale.buyer,
                sale.invoice_ref,
                sale.total_amount
            );
            let history = event(BULK_SALE_SUBJECT, ActionType::ScrapSold, details, actor)?;
            Ok((units, history))
        };
        let (units, history) = stage().inspect_err(rejected("sell_scrap"))?;

        let now = TimeStamp::new();
        let unit_price = unit_sale_price(sale.total_amount, units.len());
        let location = format!("SOLD: {}", sale.buyer);
        for id in &units {
            if let Some(tyre) = self.tyres.get_mut(id) {
                tyre.status = TyreStatus::Sold;
                tyre.sale_price = Some(unit_price);
                tyre.disposal_date = Some(now);
                tyre.location_id = location.clone();
                tyre.touch(now);
            }
        }
        self.history.push(history);

        info!(
            buyer = %sale.buyer,
            invoice = %sale.invoice_ref,
            count = units.len(),
            unit_price,
            "scrap sold"
        );
        Ok(unit_price)
    }

    // ---------------------------------------------------------------
    // Telemetry

    /// Links a freshly minted TPMS sensor and seeds a first reading.
    pub fn link_sensor(&mut self, tyre_id: &str, actor: &Actor) -> Outcome<String> {
        let sensor_id = new_sensor_id();
        let stage = || -> Outcome<HistoryEvent> {
            self.require_tyre(tyre_id)?;
            let details = format!("Linked new TPMS Sensor: {sensor_id}.");
            event(tyre_id, ActionType::SensorLinked, details, actor)
        };
        let history = stage().inspect_err(rejected("link_sensor"))?;

        let telemetry = &self.config.telemetry;
        let (offset, fallback, temp) = (
            telemetry.pressure_offset_psi,
            telemetry.fallback_pressure_psi,
            telemetry.initial_temp_c,
        );
        if let Some(tyre) = self.tyres.get_mut(tyre_id) {
            tyre.sensor_id = Some(sensor_id.clone());
            tyre.current_pressure = Some(tyre.oem_psi.map_or(fallback, |psi| psi - offset));
            tyre.current_temp = Some(temp);
            tyre.last_signal_time = Some(TimeStamp::new());
        }
        self.history.push(history);

        info!(tyre = %tyre_id, sensor = %sensor_id, "sensor linked");
        Ok(sensor_id)
    }

    // ---------------------------------------------------------------
    // Onboarding

    /// Brings an existing vehicle into the fleet, creating one fitted tyre
    /// per required position. Every tyre starts at life 0 with no distance.
    pub fn onboard_vehicle(
        &mut self,
        onboarding: &Onboarding,
        actor: &Actor,
    ) -> Outcome<OnboardedVehicle> {
        let (vehicle, tyres, events) = self
            .stage_onboarding(onboarding, actor)
            .inspect_err(rejected("onboard_vehicle"))?;

        let outcome = OnboardedVehicle {
            vehicle_id: vehicle.id.clone(),
            tyre_ids: tyres.iter().map(|t| t.id.clone()).collect(),
        };
        info!(
            vehicle = %vehicle.id,
            plate = %vehicle.plate_number,
            tyres = tyres.len(),
            "vehicle onboarded"
        );
        self.vehicles.insert(vehicle.id.clone(), vehicle);
        for tyre in tyres {
            self.tyres.insert(tyre.id.clone(), tyre);
        }
        self.history.extend(events);
        Ok(outcome)
    }

    fn stage_onboarding(
        &self,
        onboarding: &Onboarding,
        actor: &Actor,
    ) -> Outcome<(Vehicle, Vec<Tyre>, Vec<HistoryEvent>)> {
        require_text(&onboarding.plate_number, "plate_number")?;
        let vehicle_type = self
            .vehicle_type(&onboarding.type_id)
            .ok_or_else(|| LifecycleError::UnknownVehicleType(onboarding.type_id.clone()))?;
        let defaults = &self.config.onboarding;
        if onboarding.spare_count > defaults.max_spares {
            return Err(LifecycleError::TooManySpares {
                requested: onboarding.spare_count,
                max: defaults.max_spares,
            });
        }

        let positions = vehicle_type.required_positions(onboarding.spare_count);
        let labels: BTreeSet<String> = positions.iter().map(Position::label).collect();
        if let Some(stray) = onboarding.assignments.keys().find(|k| !labels.contains(*k)) {
            return Err(LifecycleError::InvalidPosition {
                vehicle: onboarding.plate_number.clone(),
                position: stray.clone(),
            });
        }

        let vehicle = Vehicle::new(&mint_id(VEHICLE_HRP)?, &onboarding.plate_number, &vehicle_type.id)
            .set_odometer(onboarding.odometer)
            .set_spare_count(onboarding.spare_count);

        let blank = TyreSpec::default();
        let mut ids = BTreeSet::new();
        let mut tyres = Vec::with_capacity(positions.len());
        let mut events = Vec::with_capacity(positions.len());
        for position in positions {
            let label = position.label();
            let spec = onboarding.assignments.get(&label).unwrap_or(&blank);

            let id = match spec.serial.as_deref().map(str::trim) {
                Some(serial) if !serial.is_empty() => serial.to_string(),
                _ => format!("T-{label}-{}", short_suffix()),
            };
            if self.tyres.contains_key(&id) || !ids.insert(id.clone()) {
                return Err(LifecycleError::DuplicateTyre(id));
            }

            let tyre = Tyre::new(
                &id,
                spec.brand.as_deref().unwrap_or(&defaults.brand),
                spec.model.as_deref().unwrap_or(&defaults.model),
                spec.size.as_deref().unwrap_or(&defaults.size),
            )
            .set_purchase_cost(spec.purchase_cost.unwrap_or(defaults.purchase_cost))
            .set_expected_life_km(defaults.expected_life_km)
            .set_tread_depth(defaults.tread_depth_mm)
            .fitted_to(&vehicle.id, position);

            let details = match spec.tread_depth_mm {
                Some(mm) => format!(
                    "Onboarded on {} at {label}. Declared tread {mm} mm.",
                    vehicle.plate_number
                ),
                None => format!("Onboarded on {} at {label}.", vehicle.plate_number),
            };
            events.push(event(&id, ActionType::Created, details, actor)?);
            tyres.push(tyre);
        }

        Ok((vehicle, tyres, events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackerConfig;
    use crate::error::Rejection;
    use crate::history::UserRole;
    use crate::position::{Side, WheelSlot};
    use crate::vehicle::AxleDefinition;

    fn admin() -> Actor {
        Actor::new("Admin User", UserRole::FleetAdmin)
    }

    fn fleet() -> Fleet {
        let mut fleet = Fleet::new(TrackerConfig::default());
        fleet
            .add_vehicle_type(VehicleType::new(
                "TYPE-6W",
                "Standard 6-Wheeler (4x2)",
                vec![AxleDefinition::steer(), AxleDefinition::dual()],
            ))
            .unwrap();
        fleet.insert_vehicle(Vehicle::new("V-101", "MH-04-AB-1234", "TYPE-6W"));
        fleet.insert_tyre(
            Tyre::new("T-1", "Michelin", "X Multi Z", "295/80 R22.5")
                .fitted_to("V-101", Position::single(1, Side::Left)),
        );
        fleet.insert_tyre(
            Tyre::new("T-2", "Michelin", "X Multi Z", "295/80 R22.5")
                .fitted_to("V-101", Position::single(1, Side::Right)),
        );
        fleet.insert_tyre(
            Tyre::new("S-1", "Apollo", "EnduRace", "295/80 R22.5").set_location("LOC-MUM-01"),
        );
        fleet
    }

    fn grn(quantity: u32, base: &str) -> GoodsReceipt {
        GoodsReceipt {
            po_ref: "PO-1".into(),
            vendor_id: "VND-002".into(),
            location_id: String::new(),
            quantity,
            base_serial: base.into(),
            brand: "Apollo".into(),
            model: "EnduRace".into(),
            size: "295/80 R22.5".into(),
            unit_cost: 28_000,
            stock: StockClass::New,
        }
    }

    #[test]
    fn receipt_serials() {
        let mut fleet = fleet();
        let ids = fleet.receive_stock(&grn(3, "AP-900")).unwrap();
        assert_eq!(ids, ["AP-900-1", "AP-900-2", "AP-900-3"]);

        let single = fleet.receive_stock(&grn(1, "AP-901")).unwrap();
        assert_eq!(single, ["AP-901"]);

        let tyre = fleet.tyre("AP-901").unwrap();
        assert_eq!(tyre.status, TyreStatus::InStore);
        assert_eq!(tyre.location_id, "LOC-MUM-01");
        assert_eq!(tyre.expected_life_km, 45_000);
        assert!(fleet.history().is_empty());
    }

    #[test]
    fn retread_receipt_uses_lower_defaults() {
        let mut fleet = fleet();
        let mut receipt = grn(1, "RT-1");
        receipt.stock = StockClass::Retread { life_no: 2 };
        fleet.receive_stock(&receipt).unwrap();

        let tyre = fleet.tyre("RT-1").unwrap();
        assert_eq!(tyre.current_life_no, 2);
        assert_eq!(tyre.expected_life_km, 35_000);
        assert_eq!(tyre.initial_tread_depth_mm, Some(12.0));
    }

    #[test]
    fn rejected_receipts_leave_store_untouched() {
        let mut fleet = fleet();
        let before = fleet.clone();

        let err = fleet.receive_stock(&grn(2, "  ")).unwrap_err();
        assert_eq!(err, LifecycleError::MissingField("base_serial"));
        assert_eq!(err.rejection(), Rejection::InvalidInput);

        let mut no_ref = grn(2, "X");
        no_ref.po_ref.clear();
        assert!(fleet.receive_stock(&no_ref).is_err());
        assert_eq!(fleet.receive_stock(&grn(0, "X")), Err(LifecycleError::ZeroQuantity));
        assert_eq!(
            fleet.receive_stock(&grn(1, "S-1")),
            Err(LifecycleError::DuplicateTyre("S-1".into()))
        );
        assert_eq!(fleet, before);
    }

    #[test]
    fn transfer_skips_tyres_already_there() {
        let mut fleet = fleet();
        let moved = fleet
            .transfer_stock(&["S-1".to_string()], "LOC-DEL-01", &admin())
            .unwrap();
        assert_eq!(moved, ["S-1"]);
        assert_eq!(fleet.tyre("S-1").unwrap().location_id, "LOC-DEL-01");
        assert_eq!(fleet.tyre("S-1").unwrap().status, TyreStatus::InStore);

        let again = fleet
            .transfer_stock(&["S-1".to_string()], "LOC-DEL-01", &admin())
            .unwrap();
        assert!(again.is_empty());
        assert_eq!(fleet.history_for("S-1").len(), 1);
    }

    #[test]
    fn fitted_tyres_cannot_be_transferred() {
        let mut fleet = fleet();
        let err = fleet
            .transfer_stock(&["T-1".to_string(), "S-1".to_string()], "LOC-DEL-01", &admin())
            .unwrap_err();
        assert_eq!(err.rejection(), Rejection::InvariantViolation);
        assert_eq!(fleet.tyre("S-1").unwrap().location_id, "LOC-MUM-01");
    }

    #[test]
    fn uneven_wear_raises_one_alignment_job() {
        let mut fleet = fleet();
        let report = InspectionReport::new("T-1", InspectionCondition::Uneven).set_tread_depth(7.5);

        let first = fleet.record_inspection(&report, &admin()).unwrap();
        let second = fleet.record_inspection(&report, &admin()).unwrap();
        let third = fleet
            .record_inspection(&InspectionReport::new("T-2", InspectionCondition::Uneven), &admin())
            .unwrap();

        assert!(first.alignment_job_id.is_some());
        assert!(second.alignment_job_id.is_none());
        assert!(third.alignment_job_id.is_none());
        assert_eq!(fleet.jobs().len(), 1);
        assert_eq!(fleet.inspections().len(), 3);

        let job = &fleet.jobs()[0];
        assert_eq!(job.priority, Priority::High);
        assert_eq!(job.created_by, "System (Auto-Trigger)");
        let history = fleet.history_for("T-1");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, ActionType::AlignmentJobCreated);
        assert_eq!(history[0].user, "System");
    }

    #[test]
    fn uneven_wear_in_store_raises_nothing() {
        let mut fleet = fleet();
        let outcome = fleet
            .record_inspection(&InspectionReport::new("S-1", InspectionCondition::Uneven), &admin())
            .unwrap();
        assert!(outcome.alignment_job_id.is_none());
        assert!(fleet.jobs().is_empty());
    }

    #[test]
    fn walkaround_logs_driver_issues() {
        let mut fleet = fleet();
        let driver = Actor::new("Ravi", UserRole::Driver);
        let reports = [
            InspectionReport::new("T-1", InspectionCondition::Ok),
            InspectionReport::new("T-2", InspectionCondition::Cut).set_remarks("gash on shoulder"),
        ];
        let outcomes = fleet.record_walkaround("V-101", &reports, &driver).unwrap();
        assert_eq!(outcomes.len(), 2);

        assert!(fleet.history_for("T-1").is_empty());
        let t2 = fleet.history_for("T-2");
        assert_eq!(t2.len(), 1);
        assert_eq!(t2[0].details, "Driver reported issue: Cut (gash on shoulder)");
        assert_eq!(t2[0].role, UserRole::Driver);
    }

    #[test]
    fn walkaround_of_foreign_tyre_is_rejected_whole() {
        let mut fleet = fleet();
        let reports = [
            InspectionReport::new("T-1", InspectionCondition::Ok),
            InspectionReport::new("S-1", InspectionCondition::Ok),
        ];
        assert!(matches!(
            fleet.record_walkaround("V-101", &reports, &admin()),
            Err(LifecycleError::WrongVehicle { .. })
        ));
        assert!(fleet.inspections().is_empty());
    }

    #[test]
    fn repairs_are_logged_with_history() {
        let mut fleet = fleet();
        let entry = RepairEntry {
            tyre_id: "T-1".into(),
            kind: "Puncture".into(),
            cost: 450,
            vendor_id: "VND-003".into(),
            remarks: None,
        };
        fleet.log_repair(&entry, &admin()).unwrap();
        assert_eq!(fleet.repairs().len(), 1);
        assert_eq!(fleet.history_for("T-1")[0].action, ActionType::RepairLogged);

        let unknown = RepairEntry {
            tyre_id: "T-404".into(),
            ..entry
        };
        assert_eq!(
            fleet.log_repair(&unknown, &admin()),
            Err(LifecycleError::UnknownTyre("T-404".into()))
        );
    }

    #[test]
    fn replacement_needs_fitted_target_and_store_tyre() {
        let mut fleet = fleet();
        let order = ReplacementOrder {
            target_tyre_id: "S-1".into(),
            replacement_tyre_id: "T-1".into(),
            removal_reason: RemovalReason::Wear,
            destination: Destination::Inventory,
        };
        assert_eq!(
            fleet.create_replacement_job(&order, &admin()),
            Err(LifecycleError::NotFitted("S-1".into()))
        );

        let self_swap = ReplacementOrder {
            target_tyre_id: "T-1".into(),
            replacement_tyre_id: "T-1".into(),
            ..order.clone()
        };
        assert_eq!(
            fleet.create_replacement_job(&self_swap, &admin()),
            Err(LifecycleError::SelfReplacement("T-1".into()))
        );

        let fitted_as_replacement = ReplacementOrder {
            target_tyre_id: "T-1".into(),
            replacement_tyre_id: "T-2".into(),
            ..order
        };
        assert!(matches!(
            fleet.create_replacement_job(&fitted_as_replacement, &admin()),
            Err(LifecycleError::UnexpectedTyreStatus { .. })
        ));
        assert!(fleet.jobs().is_empty());
    }

    #[test]
    fn cancelled_replacement_releases_stock() {
        let mut fleet = fleet();
        let order = ReplacementOrder {
            target_tyre_id: "T-1".into(),
            replacement_tyre_id: "S-1".into(),
            removal_reason: RemovalReason::Damage,
            destination: Destination::Scrap,
        };
        let job = fleet.create_replacement_job(&order, &admin()).unwrap();
        fleet.issue_stock(&job, &admin()).unwrap();
        assert_eq!(fleet.tyre("S-1").unwrap().location_id, "WORKSHOP");

        fleet.cancel_job(&job, &admin()).unwrap();
        let released = fleet.tyre("S-1").unwrap();
        assert_eq!(released.status, TyreStatus::InStore);
        assert_eq!(released.location_id, "LOC-MUM-01");
        assert_eq!(fleet.job(&job).unwrap().status, JobStatus::Cancelled);
        assert!(fleet.complete_job(&job, &admin()).is_err());
    }

    #[test]
    fn retread_outcomes() {
        let mut fleet = fleet();
        fleet.insert_tyre(
            Tyre::new("R-1", "Bridgestone", "M840", "295/80 R22.5")
                .set_status(TyreStatus::RetreadInProgress)
                .set_life_no(1),
        );
        fleet.insert_tyre(
            Tyre::new("R-2", "Bridgestone", "M840", "295/80 R22.5")
                .set_status(TyreStatus::RetreadInProgress)
                .set_life_no(1),
        );

        fleet
            .complete_retread("R-1", &RetreadResult::new(4_500, "Precured Lug", 13.0), &admin())
            .unwrap();
        let tyre = fleet.tyre("R-1").unwrap();
        assert_eq!(tyre.current_life_no, 2);
        assert_eq!(tyre.model, "Precured Lug");

        fleet.reject_retread("R-2", "Casing separation", &admin()).unwrap();
        let rejected = fleet.tyre("R-2").unwrap();
        assert_eq!(rejected.status, TyreStatus::Scrapped);
        assert_eq!(rejected.location_id, "STORE-SCRAP");
        assert_eq!(rejected.current_life_no, 1);
        assert_eq!(fleet.retreads()[1].status, RetreadStatus::Rejected);

        assert!(matches!(
            fleet.complete_retread("R-2", &RetreadResult::new(1, "x", 1.0), &admin()),
            Err(LifecycleError::UnexpectedTyreStatus { .. })
        ));
    }

    #[test]
    fn scrap_sale_spreads_total() {
        let mut fleet = fleet();
        for id in ["X-1", "X-2", "X-3"] {
            fleet.insert_tyre(Tyre::new(id, "MRF", "S", "10.00 R20").set_status(TyreStatus::Scrapped));
        }
        let sale = ScrapSale {
            tyre_ids: vec!["X-1".into(), "X-2".into(), "X-3".into()],
            buyer: "Shree Recyclers".into(),
            total_amount: 1_000,
            invoice_ref: "INV-77".into(),
        };
        assert_eq!(fleet.sell_scrap(&sale, &admin()).unwrap(), 333);

        let sold = fleet.tyre("X-2").unwrap();
        assert_eq!(sold.status, TyreStatus::Sold);
        assert_eq!(sold.location_id, "SOLD: Shree Recyclers");
        assert_eq!(
            fleet.history_for(BULK_SALE_SUBJECT)[0].details,
            "Sold 3 scrapped units to Shree Recyclers. Ref: INV-77. Total: ₹1000."
        );
        assert_eq!(fleet.history().len(), 1);
    }

    #[test]
    fn scrap_sale_requires_scrapped_selection() {
        let mut fleet = fleet();
        let empty = ScrapSale {
            tyre_ids: vec![],
            buyer: "B".into(),
            total_amount: 10,
            invoice_ref: "I".into(),
        };
        assert_eq!(fleet.sell_scrap(&empty, &admin()), Err(LifecycleError::EmptySelection));

        let in_store = ScrapSale {
            tyre_ids: vec!["S-1".into()],
            ..empty
        };
        assert!(fleet.sell_scrap(&in_store, &admin()).is_err());
        assert_eq!(fleet.tyre("S-1").unwrap().status, TyreStatus::InStore);
    }

    #[test]
    fn unit_price_rounds_half_up() {
        assert_eq!(unit_sale_price(10, 4), 3);
        assert_eq!(unit_sale_price(11, 4), 3);
        assert_eq!(unit_sale_price(1_000, 3), 333);
        assert_eq!(unit_sale_price(5, 2), 3);
        assert_eq!(unit_sale_price(u64::MAX, 1), u64::MAX);
        assert_eq!(unit_sale_price(u64::MAX, 2), 1 << 63);
    }

    #[test]
    fn sensor_link_seeds_reading() {
        let mut fleet = fleet();
        fleet.insert_tyre(Tyre::new("P-1", "MRF", "S", "10.00 R20").set_oem_psi(120.0));

        let sensor = fleet.link_sensor("P-1", &admin()).unwrap();
        let tyre = fleet.tyre("P-1").unwrap();
        assert_eq!(tyre.sensor_id.as_deref(), Some(sensor.as_str()));
        assert_eq!(tyre.current_pressure, Some(118.0));
        assert_eq!(tyre.current_temp, Some(42.0));

        fleet.link_sensor("S-1", &admin()).unwrap();
        assert_eq!(fleet.tyre("S-1").unwrap().current_pressure, Some(100.0));
    }

    #[test]
    fn rotation_into_held_spare_is_rejected() {
        let mut fleet = fleet();
        fleet.insert_vehicle(Vehicle::new("V-102", "MH-04-CD-5678", "TYPE-6W").set_spare_count(1));
        fleet.insert_tyre(
            Tyre::new("A", "MRF", "S", "295/80 R22.5").fitted_to("V-102", Position::single(1, Side::Left)),
        );
        fleet.insert_tyre(Tyre::new("SP", "MRF", "S", "295/80 R22.5").fitted_to("V-102", Position::spare(1)));

        let left_spare = Position {
            axle_index: 1,
            side: Side::Left,
            slot: WheelSlot::Spare,
        };
        let moves = |to| {
            vec![RotationMove {
                tyre_id: "A".into(),
                from: Position::single(1, Side::Left),
                to,
            }]
        };

        let err = fleet.create_rotation_job("V-102", moves(left_spare), &admin()).unwrap_err();
        assert!(matches!(err, LifecycleError::InvalidPosition { .. }));

        let err = fleet
            .create_rotation_job("V-102", moves(Position::new(1, Side::Left, WheelSlot::Spare)), &admin())
            .unwrap_err();
        assert!(matches!(err, LifecycleError::PositionOccupied { .. }));
        assert_eq!(err.rejection(), Rejection::InvariantViolation);
        assert!(fleet.jobs().is_empty());
        assert_eq!(fleet.tyre("A").unwrap().position(), Some(&Position::single(1, Side::Left)));
    }

    #[test]
    fn vehicle_type_master() {
        let mut fleet = fleet();
        assert_eq!(
            fleet.add_vehicle_type(VehicleType::new("TYPE-6W", "Dup", vec![AxleDefinition::steer()])),
            Err(LifecycleError::DuplicateVehicleType("TYPE-6W".into()))
        );
        assert_eq!(
            fleet.add_vehicle_type(VehicleType::new("TYPE-X", "Empty", vec![])),
            Err(LifecycleError::MissingField("axles"))
        );
        assert_eq!(
            fleet.add_vehicle_type(VehicleType::new(
                "TYPE-X",
                "Road train",
                vec![AxleDefinition::dual(); 256]
            )),
            Err(LifecycleError::TooManyAxles(256))
        );
        assert_eq!(
            fleet.remove_vehicle_type("TYPE-6W"),
            Err(LifecycleError::VehicleTypeInUse("TYPE-6W".into(), 1))
        );

        fleet
            .add_vehicle_type(VehicleType::new("TYPE-4W", "LCV", vec![AxleDefinition::steer(), AxleDefinition::single()]))
            .unwrap();
        assert!(fleet.remove_vehicle_type("TYPE-4W").is_ok());
        assert!(fleet.vehicle_type("TYPE-4W").is_none());
    }

    #[test]
    fn onboarding_rejects_bad_layouts() {
        let mut fleet = fleet();
        let mut onboarding = Onboarding {
            plate_number: "GJ-01-ZZ-0001".into(),
            type_id: "TYPE-6W".into(),
            spare_count: 3,
            ..Default::default()
        };
        assert_eq!(
            fleet.onboard_vehicle(&onboarding, &admin()),
            Err(LifecycleError::TooManySpares { requested: 3, max: 2 })
        );

        onboarding.spare_count = 0;
        onboarding.assignments.insert("SP-1".into(), TyreSpec::default());
        assert!(matches!(
            fleet.onboard_vehicle(&onboarding, &admin()),
            Err(LifecycleError::InvalidPosition { .. })
        ));

        onboarding.assignments.clear();
        onboarding.assignments.insert(
            "L1".into(),
            TyreSpec {
                serial: Some("T-1".into()),
                ..Default::default()
            },
        );
        assert_eq!(
            fleet.onboard_vehicle(&onboarding, &admin()),
            Err(LifecycleError::DuplicateTyre("T-1".into()))
        );
        assert_eq!(fleet.vehicles().count(), 1);
    }
}

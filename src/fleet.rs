//! In-memory fleet store
//!
//! `Fleet` owns every entity collection. Lifecycle transitions (see
//! `lifecycle.rs`) take `&mut Fleet`, validate against the current state and
//! only then mutate, so a rejected call leaves the store untouched.
use std::collections::BTreeMap;

use anyhow::Context;
use sled::{Batch, Db};

use super::config::{StockPolicy, TrackerConfig};
use super::error::LifecycleError;
use super::history::HistoryEvent;
use super::job::JobCard;
use super::position::Position;
use super::records::{Inspection, Repair, RetreadRecord, latest_inspection};
use super::rotation::{Assignment, RotationPlanner};
use super::tpi::{self, BrandStat, FleetSummary, TpiScore, TyreMetrics, VehicleSummary};
use super::tyre::{Tyre, TyreStatus};
use super::vehicle::{Vehicle, VehicleType};

const TYRE_PREFIX: &str = "tyre/";
const VEHICLE_PREFIX: &str = "vehicle/";
const VEHICLE_TYPE_PREFIX: &str = "vtype/";
const JOB_PREFIX: &str = "job/";
const INSPECTION_PREFIX: &str = "insp/";
const RETREAD_PREFIX: &str = "retread/";
const REPAIR_PREFIX: &str = "repair/";
const HISTORY_PREFIX: &str = "history/";

#[derive(Debug, Clone, PartialEq)]
pub struct Fleet {
    pub(crate) config: TrackerConfig,
    pub(crate) tyres: BTreeMap<String, Tyre>,
    pub(crate) vehicles: BTreeMap<String, Vehicle>,
    pub(crate) vehicle_types: BTreeMap<String, VehicleType>,
    pub(crate) job_cards: Vec<JobCard>,
    pub(crate) inspections: Vec<Inspection>,
    pub(crate) retreads: Vec<RetreadRecord>,
    pub(crate) repairs: Vec<Repair>,
    pub(crate) history: Vec<HistoryEvent>,
}

/// A size that has dropped below its policy minimum at a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAlert {
    pub size: String,
    pub available: usize,
    pub min_level: usize,
}

impl Fleet {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tyres: BTreeMap::new(),
            vehicles: BTreeMap::new(),
            vehicle_types: BTreeMap::new(),
            job_cards: vec![],
            inspections: vec![],
            retreads: vec![],
            repairs: vec![],
            history: vec![],
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Seeds a vehicle directly, bypassing onboarding. Meant for imports and fixtures.
    pub fn insert_vehicle(&mut self, vehicle: Vehicle) {
        self.vehicles.insert(vehicle.id.clone(), vehicle);
    }

    /// Seeds a tyre directly, bypassing the GRN. Meant for imports and fixtures.
    pub fn insert_tyre(&mut self, tyre: Tyre) {
        self.tyres.insert(tyre.id.clone(), tyre);
    }

    pub fn tyre(&self, id: &str) -> Option<&Tyre> {
        self.tyres.get(id)
    }
    pub fn tyres(&self) -> impl Iterator<Item = &Tyre> {
        self.tyres.values()
    }
    pub fn vehicle(&self, id: &str) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }
    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }
    pub fn vehicle_type(&self, id: &str) -> Option<&VehicleType> {
        self.vehicle_types.get(id)
    }
    pub fn vehicle_types(&self) -> impl Iterator<Item = &VehicleType> {
        self.vehicle_types.values()
    }
    pub fn job(&self, id: &str) -> Option<&JobCard> {
        self.job_cards.iter().find(|j| j.id == id)
    }
    pub fn jobs(&self) -> &[JobCard] {
        &self.job_cards
    }
    pub fn inspections(&self) -> &[Inspection] {
        &self.inspections
    }
    pub fn retreads(&self) -> &[RetreadRecord] {
        &self.retreads
    }
    pub fn repairs(&self) -> &[Repair] {
        &self.repairs
    }
    pub fn history(&self) -> &[HistoryEvent] {
        &self.history
    }

    pub fn history_for(&self, tyre_id: &str) -> Vec<&HistoryEvent> {
        self.history.iter().filter(|h| h.tyre_id == tyre_id).collect()
    }
    pub fn inspections_for(&self, tyre_id: &str) -> Vec<&Inspection> {
        self.inspections
            .iter()
            .filter(|i| i.tyre_id == tyre_id)
            .collect()
    }
    pub fn latest_inspection(&self, tyre_id: &str) -> Option<&Inspection> {
        latest_inspection(&self.inspections, tyre_id)
    }

    /// Tyres currently fitted to `vehicle_id`, in position order.
    pub fn vehicle_tyres(&self, vehicle_id: &str) -> Vec<&Tyre> {
        let mut tyres: Vec<&Tyre> = self
            .tyres
            .values()
            .filter(|t| t.is_on_vehicle(vehicle_id))
            .collect();
        tyres.sort_by_key(|t| t.position().copied());
        tyres
    }

    /// Current tyre -> position layout of a vehicle.
    pub fn assignment(&self, vehicle_id: &str) -> Assignment {
        self.tyres
            .values()
            .filter_map(|t| {
                let f = t.fitment.as_ref()?;
                (f.vehicle_id == vehicle_id).then(|| (t.id.clone(), f.position))
            })
            .collect()
    }

    /// The tyre occupying `position` on `vehicle_id`, if any.
    pub fn occupant(&self, vehicle_id: &str, position: &Position) -> Option<&Tyre> {
        self.tyres.values().find(|t| {
            t.fitment
                .as_ref()
                .is_some_and(|f| f.vehicle_id == vehicle_id && f.position == *position)
        })
    }

    /// Starts a rotation planning session seeded with the vehicle's layout.
    pub fn rotation_planner(&self, vehicle_id: &str) -> Result<RotationPlanner, LifecycleError> {
        self.require_vehicle(vehicle_id)?;
        Ok(RotationPlanner::new(vehicle_id, self.assignment(vehicle_id)))
    }

    pub fn tpi(&self, tyre_id: &str) -> Option<TpiScore> {
        let tyre = self.tyres.get(tyre_id)?;
        Some(tpi::score(
            tyre,
            &self.repairs,
            &self.retreads,
            &self.inspections,
        ))
    }

    pub fn tyre_metrics(&self, tyre_id: &str) -> Option<TyreMetrics> {
        let tyre = self.tyres.get(tyre_id)?;
        Some(tpi::fleet_metrics(
            tyre,
            &self.repairs,
            &self.retreads,
            &self.inspections,
        ))
    }

    pub fn vehicle_summary(&self, vehicle_id: &str) -> VehicleSummary {
        tpi::vehicle_summary(
            self.vehicle_tyres(vehicle_id),
            &self.repairs,
            &self.retreads,
            &self.inspections,
        )
    }

    pub fn fleet_summary(&self) -> FleetSummary {
        tpi::fleet_summary(
            self.tyres.values(),
            &self.repairs,
            &self.retreads,
            &self.inspections,
        )
    }

    pub fn brand_stats(&self) -> Vec<BrandStat> {
        tpi::brand_stats(self.tyres.values(), &self.repairs, &self.retreads)
    }

    /// In-store counts per size at `location_id` compared against the configured policies.
    pub fn stock_alerts(&self, location_id: &str) -> Vec<StockAlert> {
        self.stock_alerts_with(location_id, &self.config.stock_policies)
    }

    pub fn stock_alerts_with(&self, location_id: &str, policies: &[StockPolicy]) -> Vec<StockAlert> {
        policies
            .iter()
            .filter_map(|policy| {
                let available = self
                    .tyres
                    .values()
                    .filter(|t| {
                        t.location_id == location_id
                            && t.status == TyreStatus::InStore
                            && t.size == policy.size
                    })
                    .count();
                (available < policy.min_level).then(|| StockAlert {
                    size: policy.size.clone(),
                    available,
                    min_level: policy.min_level,
                })
            })
            .collect()
    }

    pub(crate) fn require_tyre(&self, id: &str) -> Result<&Tyre, LifecycleError> {
        self.tyres
            .get(id)
            .ok_or_else(|| LifecycleError::UnknownTyre(id.to_string()))
    }
    pub(crate) fn require_vehicle(&self, id: &str) -> Result<&Vehicle, LifecycleError> {
        self.vehicles
            .get(id)
            .ok_or_else(|| LifecycleError::UnknownVehicle(id.to_string()))
    }
    pub(crate) fn require_job_index(&self, id: &str) -> Result<usize, LifecycleError> {
        self.job_cards
            .iter()
            .position(|j| j.id == id)
            .ok_or_else(|| LifecycleError::UnknownJob(id.to_string()))
    }

    /// Loads every entity stored in `db`.
    pub fn load_from_db(db: &Db, config: TrackerConfig) -> anyhow::Result<Self> {
        let mut fleet = Fleet::new(config);

        for tyre in decode_prefix::<Tyre>(db, TYRE_PREFIX)? {
            fleet.tyres.insert(tyre.id.clone(), tyre);
        }
        for vehicle in decode_prefix::<Vehicle>(db, VEHICLE_PREFIX)? {
            fleet.vehicles.insert(vehicle.id.clone(), vehicle);
        }
        for vt in decode_prefix::<VehicleType>(db, VEHICLE_TYPE_PREFIX)? {
            fleet.vehicle_types.insert(vt.id.clone(), vt);
        }
        fleet.job_cards = decode_prefix(db, JOB_PREFIX)?;
        fleet.inspections = decode_prefix(db, INSPECTION_PREFIX)?;
        fleet.retreads = decode_prefix(db, RETREAD_PREFIX)?;
        fleet.repairs = decode_prefix(db, REPAIR_PREFIX)?;
        fleet.history = decode_prefix(db, HISTORY_PREFIX)?;

        Ok(fleet)
    }

    /// Replaces the stored snapshot with this one in a single atomic batch.
    pub fn save_to_db(&self, db: &Db) -> anyhow::Result<()> {
        let mut batch = Batch::default();

        for key in db.iter().keys() {
            batch.remove(key?);
        }

        for tyre in self.tyres.values() {
            batch.insert(format!("{TYRE_PREFIX}{}", tyre.id).as_bytes(), minicbor::to_vec(tyre)?);
        }
        for vehicle in self.vehicles.values() {
            batch.insert(
                format!("{VEHICLE_PREFIX}{}", vehicle.id).as_bytes(),
                minicbor::to_vec(vehicle)?,
            );
        }
        for vt in self.vehicle_types.values() {
            batch.insert(
                format!("{VEHICLE_TYPE_PREFIX}{}", vt.id).as_bytes(),
                minicbor::to_vec(vt)?,
            );
        }
        // ordered collections keep their insertion order through a zero-padded index
        for (idx, job) in self.job_cards.iter().enumerate() {
            batch.insert(format!("{JOB_PREFIX}{idx:010}").as_bytes(), minicbor::to_vec(job)?);
        }
        for (idx, insp) in self.inspections.iter().enumerate() {
            batch.insert(
                format!("{INSPECTION_PREFIX}{idx:010}").as_bytes(),
                minicbor::to_vec(insp)?,
            );
        }
        for (idx, rt) in self.retreads.iter().enumerate() {
            batch.insert(format!("{RETREAD_PREFIX}{idx:010}").as_bytes(), minicbor::to_vec(rt)?);
        }
        for (idx, repair) in self.repairs.iter().enumerate() {
            batch.insert(
                format!("{REPAIR_PREFIX}{idx:010}").as_bytes(),
                minicbor::to_vec(repair)?,
            );
        }
        for (idx, event) in self.history.iter().enumerate() {
            let (hash, cbor) = event.build()?;
            batch.insert(format!("{HISTORY_PREFIX}{idx:010}/{hash}").as_bytes(), cbor);
        }

        db.apply_batch(batch).context("failed to write fleet snapshot")?;
        Ok(())
    }
}

fn decode_prefix<T>(db: &Db, prefix: &str) -> anyhow::Result<Vec<T>>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    let mut items = vec![];
    for entry in db.scan_prefix(prefix.as_bytes()) {
        let (key, value) = entry?;
        let item = minicbor::decode(&value).with_context(|| {
            format!(
                "failed to decode record {}",
                String::from_utf8_lossy(&key)
            )
        })?;
        items.push(item);
    }
    Ok(items)
}

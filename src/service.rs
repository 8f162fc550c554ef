//! Service layer API over the sled-backed fleet store
use std::sync::{Arc, Mutex};

use anyhow::{Context, anyhow};
use tracing::debug;

use super::config::TrackerConfig;
use super::error::Outcome;
use super::fleet::Fleet;
use super::history::Actor;
use super::lifecycle::{
    GoodsReceipt, InspectionOutcome, InspectionReport, OnboardedVehicle, Onboarding,
    RepairEntry, ReplacementOrder, RetreadResult, ScrapSale,
};
use super::rotation::RotationMove;
use super::vehicle::VehicleType;

pub struct FleetService {
    instance: Arc<sled::Db>,
    config: TrackerConfig,
    // one transition at a time
    writer: Mutex<()>,
}

impl FleetService {
    pub fn new(instance: Arc<sled::Db>, config: TrackerConfig) -> Self {
        Self {
            instance,
            config,
            writer: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Load the current fleet snapshot from the database
    pub fn snapshot(&self) -> anyhow::Result<Fleet> {
        Fleet::load_from_db(&self.instance, self.config.clone())
            .context("failed to load fleet snapshot")
    }

    /// Apply one transition: load, mutate, write back in a single batch.
    ///
    /// A rejected transition writes nothing. The `LifecycleError` stays
    /// reachable through `anyhow::Error::downcast_ref`.
    pub fn apply<T>(&self, op: impl FnOnce(&mut Fleet) -> Outcome<T>) -> anyhow::Result<T> {
        let _guard = self
            .writer
            .lock()
            .map_err(|_| anyhow!("fleet writer lock poisoned"))?;

        let mut fleet = self.snapshot()?;
        let out = op(&mut fleet)?;
        fleet.save_to_db(&self.instance)?;
        self.instance.flush().context("failed to flush fleet store")?;

        debug!(tyres = fleet.tyres().count(), jobs = fleet.jobs().len(), "fleet snapshot saved");
        Ok(out)
    }

    /// Register a vehicle type in the master
    pub fn add_vehicle_type(&self, vehicle_type: VehicleType) -> anyhow::Result<()> {
        self.apply(|fleet| fleet.add_vehicle_type(vehicle_type))
    }

    /// Remove an unused vehicle type
    pub fn remove_vehicle_type(&self, type_id: &str) -> anyhow::Result<VehicleType> {
        self.apply(|fleet| fleet.remove_vehicle_type(type_id))
    }

    /// Receive inbound stock against a GRN
    pub fn receive_stock(&self, grn: &GoodsReceipt) -> anyhow::Result<Vec<String>> {
        self.apply(|fleet| fleet.receive_stock(grn))
    }

    pub fn transfer_stock(
        &self,
        tyre_ids: &[String],
        target_location: &str,
        actor: &Actor,
    ) -> anyhow::Result<Vec<String>> {
        self.apply(|fleet| fleet.transfer_stock(tyre_ids, target_location, actor))
    }

    pub fn record_inspection(
        &self,
        report: &InspectionReport,
        actor: &Actor,
    ) -> anyhow::Result<InspectionOutcome> {
        self.apply(|fleet| fleet.record_inspection(report, actor))
    }

    pub fn record_walkaround(
        &self,
        vehicle_id: &str,
        reports: &[InspectionReport],
        actor: &Actor,
    ) -> anyhow::Result<Vec<InspectionOutcome>> {
        self.apply(|fleet| fleet.record_walkaround(vehicle_id, reports, actor))
    }

    pub fn log_repair(&self, entry: &RepairEntry, actor: &Actor) -> anyhow::Result<String> {
        self.apply(|fleet| fleet.log_repair(entry, actor))
    }

    /// Raise a replacement job card
    pub fn create_replacement_job(
        &self,
        order: &ReplacementOrder,
        actor: &Actor,
    ) -> anyhow::Result<String> {
        self.apply(|fleet| fleet.create_replacement_job(order, actor))
    }

    /// Raise a rotation job card from a planner move list
    pub fn create_rotation_job(
        &self,
        vehicle_id: &str,
        moves: Vec<RotationMove>,
        actor: &Actor,
    ) -> anyhow::Result<String> {
        self.apply(|fleet| fleet.create_rotation_job(vehicle_id, moves, actor))
    }

    pub fn issue_stock(&self, job_id: &str, actor: &Actor) -> anyhow::Result<()> {
        self.apply(|fleet| fleet.issue_stock(job_id, actor))
    }

    pub fn complete_job(&self, job_id: &str, actor: &Actor) -> anyhow::Result<()> {
        self.apply(|fleet| fleet.complete_job(job_id, actor))
    }

    pub fn cancel_job(&self, job_id: &str, actor: &Actor) -> anyhow::Result<()> {
        self.apply(|fleet| fleet.cancel_job(job_id, actor))
    }

    pub fn complete_retread(
        &self,
        tyre_id: &str,
        result: &RetreadResult,
        actor: &Actor,
    ) -> anyhow::Result<String> {
        self.apply(|fleet| fleet.complete_retread(tyre_id, result, actor))
    }

    pub fn reject_retread(
        &self,
        tyre_id: &str,
        reason: &str,
        actor: &Actor,
    ) -> anyhow::Result<String> {
        self.apply(|fleet| fleet.reject_retread(tyre_id, reason, actor))
    }

    /// Sell scrapped tyres in bulk; returns the per-unit price
    pub fn sell_scrap(&self, sale: &ScrapSale, actor: &Actor) -> anyhow::Result<u64> {
        self.apply(|fleet| fleet.sell_scrap(sale, actor))
    }

    pub fn link_sensor(&self, tyre_id: &str, actor: &Actor) -> anyhow::Result<String> {
        self.apply(|fleet| fleet.link_sensor(tyre_id, actor))
    }

    /// Onboard a brownfield vehicle with its fitted tyres
    pub fn onboard_vehicle(
        &self,
        onboarding: &Onboarding,
        actor: &Actor,
    ) -> anyhow::Result<OnboardedVehicle> {
        self.apply(|fleet| fleet.onboard_vehicle(onboarding, actor))
    }
}

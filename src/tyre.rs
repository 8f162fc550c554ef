//! Core tyre asset and lifecycle status
use std::fmt;

use super::error::LifecycleError;
use super::position::Position;
use chrono::{DateTime, TimeZone, Utc};

#[derive(
    minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum TyreStatus {
    #[n(0)]
    InStore,
    #[n(1)]
    Allocated, // Reserved for a job card
    #[n(2)]
    Issued, // With the mechanic
    #[n(3)]
    Fitted,
    #[n(4)]
    RetreadInProgress,
    #[n(5)]
    Scrapped,
    #[n(6)]
    Sold,
}

impl TyreStatus {
    /// Edges of the tyre lifecycle graph.
    ///
    /// `Allocated`/`Issued` may fall back to `InStore` when their job card is
    /// cancelled. `Sold` has no outgoing edge.
    pub fn can_transition_to(self, next: TyreStatus) -> bool {
        use TyreStatus::*;

        matches!(
            (self, next),
            (InStore, Allocated)
                | (Allocated, Issued)
                | (Allocated, InStore)
                | (Issued, Fitted)
                | (Issued, InStore)
                | (Fitted, InStore)
                | (Fitted, RetreadInProgress)
                | (Fitted, Scrapped)
                | (RetreadInProgress, InStore)
                | (RetreadInProgress, Scrapped)
                | (Scrapped, Sold)
        )
    }
    pub fn is_terminal(self) -> bool {
        self == TyreStatus::Sold
    }
}

impl fmt::Display for TyreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TyreStatus::InStore => "In Store",
            TyreStatus::Allocated => "Allocated",
            TyreStatus::Issued => "Issued",
            TyreStatus::Fitted => "Fitted",
            TyreStatus::RetreadInProgress => "Retread In Progress",
            TyreStatus::Scrapped => "Scrapped",
            TyreStatus::Sold => "Sold / Disposed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct TimeStamp(DateTime<Utc>);

impl TimeStamp {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(TimeStamp)
            .unwrap_or_else(TimeStamp::new)
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp {
    fn default() -> Self {
        Self::new()
    }
}

impl From<DateTime<Utc>> for TimeStamp {
    fn from(value: DateTime<Utc>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// Where a fitted tyre sits. A tyre either has both a vehicle and a
/// position, or neither.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct Fitment {
    #[n(0)]
    pub vehicle_id: String,
    #[n(1)]
    pub position: Position,
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq)]
pub struct Tyre {
    #[n(0)]
    pub id: String, // serial number
    #[n(1)]
    pub brand: String,
    #[n(2)]
    pub model: String,
    #[n(3)]
    pub size: String,
    #[n(4)]
    pub purchase_date: TimeStamp,
    #[n(5)]
    pub purchase_cost: u64, // whole rupees
    #[n(6)]
    pub status: TyreStatus,
    #[n(7)]
    pub location_id: String, // a location id, or the vehicle id when fitted
    #[n(8)]
    pub fitment: Option<Fitment>,
    #[n(9)]
    pub sensor_id: Option<String>,
    #[n(10)]
    pub current_pressure: Option<f64>,
    #[n(11)]
    pub current_temp: Option<f64>,
    #[n(12)]
    pub last_signal_time: Option<TimeStamp>,
    #[n(13)]
    pub last_action_date: TimeStamp,
    #[n(14)]
    pub current_life_no: u32, // 0 = original tread
    #[n(15)]
    pub total_km: u64,
    #[n(16)]
    pub expected_life_km: u64,
    #[n(17)]
    pub oem_psi: Option<f64>,
    #[n(18)]
    pub initial_tread_depth_mm: Option<f64>,
    #[n(19)]
    pub sale_price: Option<u64>,
    #[n(20)]
    pub disposal_date: Option<TimeStamp>,
}

impl Tyre {
    /// A new in-store tyre with no usage, ready for the builder setters.
    pub fn new(id: &str, brand: &str, model: &str, size: &str) -> Self {
        let now = TimeStamp::new();
        Self {
            id: id.to_string(),
            brand: brand.to_string(),
            model: model.to_string(),
            size: size.to_string(),
            purchase_date: now,
            purchase_cost: 0,
            status: TyreStatus::InStore,
            location_id: String::new(),
            fitment: None,
            sensor_id: None,
            current_pressure: None,
            current_temp: None,
            last_signal_time: None,
            last_action_date: now,
            current_life_no: 0,
            total_km: 0,
            expected_life_km: 0,
            oem_psi: None,
            initial_tread_depth_mm: None,
            sale_price: None,
            disposal_date: None,
        }
    }
    pub fn set_purchase_cost(mut self, cost: u64) -> Self {
        self.purchase_cost = cost;
        self
    }
    pub fn set_location(mut self, location_id: &str) -> Self {
        self.location_id = location_id.to_string();
        self
    }
    pub fn set_life_no(mut self, life_no: u32) -> Self {
        self.current_life_no = life_no;
        self
    }
    pub fn set_total_km(mut self, km: u64) -> Self {
        self.total_km = km;
        self
    }
    pub fn set_expected_life_km(mut self, km: u64) -> Self {
        self.expected_life_km = km;
        self
    }
    pub fn set_oem_psi(mut self, psi: f64) -> Self {
        self.oem_psi = Some(psi);
        self
    }
    pub fn set_tread_depth(mut self, mm: f64) -> Self {
        self.initial_tread_depth_mm = Some(mm);
        self
    }
    pub fn set_status(mut self, status: TyreStatus) -> Self {
        self.status = status;
        self
    }
    /// Places the tyre on a vehicle. The location follows the vehicle.
    pub fn fitted_to(mut self, vehicle_id: &str, position: Position) -> Self {
        self.status = TyreStatus::Fitted;
        self.location_id = vehicle_id.to_string();
        self.fitment = Some(Fitment {
            vehicle_id: vehicle_id.to_string(),
            position,
        });
        self
    }

    pub fn current_vehicle_id(&self) -> Option<&str> {
        self.fitment.as_ref().map(|f| f.vehicle_id.as_str())
    }
    pub fn position(&self) -> Option<&Position> {
        self.fitment.as_ref().map(|f| &f.position)
    }
    pub fn is_on_vehicle(&self, vehicle_id: &str) -> bool {
        self.current_vehicle_id() == Some(vehicle_id)
    }

    /// Checks a status change against the lifecycle graph.
    pub fn check_transition(&self, next: TyreStatus) -> Result<(), LifecycleError> {
        if self.status.can_transition_to(next) {
            return Ok(());
        }
        Err(LifecycleError::IllegalTyreTransition {
            tyre: self.id.clone(),
            from: self.status,
            to: next,
        })
    }
    /// Checks the tyre is currently in `expected`.
    pub fn expect_status(&self, expected: TyreStatus) -> Result<(), LifecycleError> {
        if self.status == expected {
            return Ok(());
        }
        Err(LifecycleError::UnexpectedTyreStatus {
            tyre: self.id.clone(),
            actual: self.status,
            expected,
        })
    }
    pub(crate) fn touch(&mut self, at: TimeStamp) {
        self.last_action_date = at;
    }
}

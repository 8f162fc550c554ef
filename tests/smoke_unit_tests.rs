//! Smoke screen unit tests for the tyre lifecycle components
//!
//! Happy-path checks that span the public API, exercising each module in
//! isolation from the end-to-end scenarios.

use tyre_lifecycle::{
    config::{StockPolicy, TrackerConfig},
    error::{LifecycleError, Rejection},
    fleet::{Fleet, StockAlert},
    history::{ActionType, Actor, HistoryEvent, UserRole},
    job::{JobStatus, JobType},
    lifecycle::{InspectionReport, RepairEntry},
    position::{Position, Side},
    records::InspectionCondition,
    tpi::{RiskFlag, TpiBand},
    tyre::{Tyre, TyreStatus},
    utils::new_uuid_to_bech32,
    vehicle::{AxleDefinition, Vehicle, VehicleType},
};

fn admin() -> Actor {
    Actor::new("Admin User", UserRole::FleetAdmin)
}

// UTILS MODULE TESTS
#[cfg(test)]
mod utils_tests {
    use super::*;

    /// Ids carry their human-readable prefix
    #[test]
    fn generates_valid_bech32_with_hrp() {
        let encoded = new_uuid_to_bech32("jc").unwrap();
        assert!(encoded.starts_with("jc1"));
        assert!(encoded.len() > 10);
    }

    /// An empty prefix is not a valid bech32 hrp
    #[test]
    fn handles_empty_hrp() {
        assert!(new_uuid_to_bech32("").is_err());
    }
}

// CONFIG MODULE TESTS
#[cfg(test)]
mod config_tests {
    use super::*;
    use std::io::Write;

    /// A config file on disk overrides only what it names
    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [telemetry]
            initial_temp_c = 38.5

            [onboarding]
            max_spares = 1
            "#
        )
        .unwrap();

        let config = TrackerConfig::load(file.path()).unwrap();
        assert_eq!(config.telemetry.initial_temp_c, 38.5);
        assert_eq!(config.telemetry.fallback_pressure_psi, 100.0);
        assert_eq!(config.onboarding.max_spares, 1);
        assert_eq!(config.receiving.retread_expected_life_km, 35_000);
    }

    /// A missing file is reported rather than defaulted
    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TrackerConfig::load(dir.path().join("absent.toml")).is_err());
    }
}

// VEHICLE MODULE TESTS
#[cfg(test)]
mod vehicle_tests {
    use super::*;

    /// A 10 wheeler with two spares needs 2 + 4 + 4 + 2 positions
    #[test]
    fn ten_wheeler_positions() {
        let vt = VehicleType::new(
            "TYPE-10W",
            "10-Wheeler (6x4)",
            vec![
                AxleDefinition::steer(),
                AxleDefinition::dual(),
                AxleDefinition::dual(),
            ],
        );
        let positions = vt.required_positions(2);
        assert_eq!(positions.len(), 12);
        assert_eq!(vt.tyre_count(), 10);
        assert_eq!(positions[6], "L3-OUT".parse::<Position>().unwrap());
        assert_eq!(positions[11], Position::spare(2));
    }
}

// STATUS MACHINE TESTS
#[cfg(test)]
mod status_tests {
    use super::*;

    /// Tyres only reach a vehicle through the issue path
    #[test]
    fn store_to_fitted_goes_through_issue() {
        assert!(!TyreStatus::InStore.can_transition_to(TyreStatus::Fitted));
        assert!(TyreStatus::InStore.can_transition_to(TyreStatus::Allocated));
        assert!(TyreStatus::Allocated.can_transition_to(TyreStatus::Issued));
        assert!(TyreStatus::Issued.can_transition_to(TyreStatus::Fitted));
    }

    /// Jobs never move backwards
    #[test]
    fn jobs_do_not_regress() {
        assert!(!JobStatus::InProgress.can_transition_to(JobStatus::Open));
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::InProgress));
        assert!(!JobStatus::Cancelled.can_transition_to(JobStatus::Open));
        assert!(JobStatus::Completed.is_terminal());
    }

    /// Errors classify into the two rejection kinds
    #[test]
    fn rejection_classes() {
        assert_eq!(LifecycleError::EmptySelection.rejection(), Rejection::InvalidInput);
        assert_eq!(
            LifecycleError::UnknownTyre("T".into()).rejection(),
            Rejection::InvalidInput
        );
        assert_eq!(
            LifecycleError::IllegalTyreTransition {
                tyre: "T".into(),
                from: TyreStatus::Sold,
                to: TyreStatus::InStore,
            }
            .rejection(),
            Rejection::InvariantViolation
        );
        assert_eq!(
            LifecycleError::IllegalTyreTransition {
                tyre: "T-9".into(),
                from: TyreStatus::Sold,
                to: TyreStatus::InStore,
            }
            .to_string(),
            "Tyre T-9 cannot move from Sold / Disposed to In Store"
        );
    }
}

// HISTORY MODULE TESTS
#[cfg(test)]
mod history_tests {
    use super::*;

    /// Identical events hash identically; any change moves the hash
    #[test]
    fn history_hash_tracks_content() {
        let event = HistoryEvent::new(
            "hist-1".into(),
            "T-1",
            ActionType::Fitted,
            "Fitted to V-101 at L1.".into(),
            &admin(),
        );
        let mut edited = event.clone();
        edited.details.push('!');

        let (a, _) = event.build().unwrap();
        let (b, _) = edited.build().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }
}

// FLEET ANALYTICS TESTS
#[cfg(test)]
mod fleet_tests {
    use super::*;

    fn fleet() -> Fleet {
        let mut fleet = Fleet::new(TrackerConfig::default());
        fleet.insert_vehicle(Vehicle::new("V-101", "MH-04-AB-1234", "TYPE-6W"));
        fleet.insert_tyre(
            Tyre::new("T-1", "Michelin", "X Multi Z", "295/80 R22.5")
                .set_purchase_cost(30_000)
                .set_total_km(20_000)
                .set_expected_life_km(45_000)
                .fitted_to("V-101", Position::single(1, Side::Left)),
        );
        fleet.insert_tyre(
            Tyre::new("T-2", "Apollo", "EnduRace", "295/80 R22.5")
                .set_purchase_cost(30_000)
                .set_total_km(10_000)
                .set_expected_life_km(45_000)
                .fitted_to("V-101", Position::single(1, Side::Right)),
        );
        fleet
    }

    /// Brands rank cheapest per km first
    #[test]
    fn brand_ranking() {
        let stats = fleet().brand_stats();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].name, "Michelin");
        assert!((stats[0].cpk - 1.5).abs() < 1e-9);
        assert!((stats[1].cpk - 3.0).abs() < 1e-9);
    }

    /// Vehicle summary uses the per-tyre profile
    #[test]
    fn vehicle_summary_counts_watch_band() {
        let fleet = fleet();
        // T-2 sits at cpk 3.0: 100 - 30 = 70, Watch
        assert_eq!(fleet.tpi("T-2").unwrap().band, TpiBand::Watch);
        let summary = fleet.vehicle_summary("V-101");
        assert_eq!(summary.watch_count, 1);
        assert_eq!(summary.high_risk_count, 0);
        assert!((summary.avg_cpk - 2.25).abs() < 1e-9);
    }

    /// Repairs and worn tread surface as risk flags on the fleet profile
    #[test]
    fn risk_flags_follow_records() {
        let mut fleet = fleet();
        for cost in [500, 700, 900] {
            fleet
                .log_repair(
                    &RepairEntry {
                        tyre_id: "T-1".into(),
                        kind: "Sidewall patch".into(),
                        cost,
                        vendor_id: "VND-003".into(),
                        remarks: None,
                    },
                    &admin(),
                )
                .unwrap();
        }
        fleet
            .record_inspection(
                &InspectionReport::new("T-1", InspectionCondition::Ok).set_tread_depth(3.2),
                &admin(),
            )
            .unwrap();

        let metrics = fleet.tyre_metrics("T-1").unwrap();
        assert_eq!(metrics.total_cost, 32_100);
        assert!(metrics.risk_flags.contains(&RiskFlag::FrequentSidewallRepairs));
        assert!(metrics.risk_flags.contains(&RiskFlag::MinimumTreadDepth));
        assert!((metrics.repair_frequency - 0.75).abs() < 1e-9);

        let summary = fleet.fleet_summary();
        assert_eq!(summary.total_spend, 62_100);
    }

    /// Only in-store stock at the location counts toward the minimum
    #[test]
    fn stock_alerts_per_location() {
        let mut fleet = fleet();
        for i in 0..3 {
            fleet.insert_tyre(
                Tyre::new(&format!("S-{i}"), "JK", "Jet Steel", "10.00 R20").set_location("LOC-PUN-02"),
            );
        }
        let policies = [StockPolicy {
            size: "10.00 R20".into(),
            min_level: 4,
            max_level: 10,
        }];

        assert_eq!(
            fleet.stock_alerts_with("LOC-PUN-02", &policies),
            vec![StockAlert {
                size: "10.00 R20".into(),
                available: 3,
                min_level: 4,
            }]
        );
        assert!(fleet.stock_alerts_with("LOC-PUN-02", &policies[..0]).is_empty());
    }

    /// Job type follows the payload
    #[test]
    fn alignment_job_type() {
        let mut fleet = fleet();
        fleet
            .record_inspection(&InspectionReport::new("T-2", InspectionCondition::Uneven), &admin())
            .unwrap();
        assert_eq!(fleet.jobs()[0].job_type(), JobType::Alignment);
    }
}

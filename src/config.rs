//! Tracker configuration
//!
//! Every section falls back to the fleet defaults, so an empty TOML document
//! is a valid configuration.
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub locations: LocationConfig,
    pub receiving: ReceivingDefaults,
    pub onboarding: OnboardingDefaults,
    pub telemetry: TelemetryDefaults,
    pub stock_policies: Vec<StockPolicy>,
}

/// Well-known location ids that transitions move tyres to.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LocationConfig {
    pub default_hub: String,
    pub workshop: String,
    pub scrap_store: String,
    pub retread_vendor: String,
}

/// Figures stamped on tyres received through a GRN.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReceivingDefaults {
    pub new_expected_life_km: u64,
    pub retread_expected_life_km: u64,
    pub new_tread_depth_mm: f64,
    pub retread_tread_depth_mm: f64,
    pub oem_psi: f64,
}

/// Fallbacks for positions left blank when onboarding a vehicle.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OnboardingDefaults {
    pub brand: String,
    pub model: String,
    pub size: String,
    pub purchase_cost: u64,
    pub expected_life_km: u64,
    pub tread_depth_mm: f64,
    pub max_spares: u8,
}

/// Mock TPMS reading taken when a sensor is linked.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryDefaults {
    pub pressure_offset_psi: f64,
    pub fallback_pressure_psi: f64,
    pub initial_temp_c: f64,
}

/// Minimum and maximum in-store stock for one tyre size.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StockPolicy {
    pub size: String,
    pub min_level: usize,
    pub max_level: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            locations: LocationConfig::default(),
            receiving: ReceivingDefaults::default(),
            onboarding: OnboardingDefaults::default(),
            telemetry: TelemetryDefaults::default(),
            stock_policies: vec![
                StockPolicy {
                    size: "295/80 R22.5".to_string(),
                    min_level: 5,
                    max_level: 50,
                },
                StockPolicy {
                    size: "10.00 R20".to_string(),
                    min_level: 2,
                    max_level: 20,
                },
            ],
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            default_hub: "LOC-MUM-01".to_string(),
            workshop: "WORKSHOP".to_string(),
            scrap_store: "STORE-SCRAP".to_string(),
            retread_vendor: "VND-001".to_string(),
        }
    }
}

impl Default for ReceivingDefaults {
    fn default() -> Self {
        Self {
            new_expected_life_km: 45_000,
            retread_expected_life_km: 35_000,
            new_tread_depth_mm: 15.0,
            retread_tread_depth_mm: 12.0,
            oem_psi: 110.0,
        }
    }
}

impl Default for OnboardingDefaults {
    fn default() -> Self {
        Self {
            brand: "Generic".to_string(),
            model: "Road".to_string(),
            size: "295/80 R22.5".to_string(),
            purchase_cost: 35_000,
            expected_life_km: 45_000,
            tread_depth_mm: 15.0,
            max_spares: 2,
        }
    }
}

impl Default for TelemetryDefaults {
    fn default() -> Self {
        Self {
            pressure_offset_psi: 2.0,
            fallback_pressure_psi: 100.0,
            initial_temp_c: 42.0,
        }
    }
}

impl TrackerConfig {
    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        toml::from_str(contents).context("invalid tracker configuration")
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        Self::from_toml_str(&contents)
    }
}

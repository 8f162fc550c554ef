//! Tyre Performance Index scoring
//!
//! Two scoring profiles exist and deliberately disagree:
//!
//! * [`ScoringProfile::PerTyre`] drives the tyre detail and vehicle views. It
//!   nets recovered sale value out of the cost, penalises tyres near their
//!   expected life and bands at 50/75/90.
//! * [`ScoringProfile::FleetAggregate`] drives fleet analytics. It scores on
//!   gross cost, penalises repeated repairs and older casings, and bands at
//!   50/70/85.
//!
//! Both are pure functions of their inputs.
use std::collections::BTreeMap;
use std::fmt;

use super::records::{Inspection, Repair, RetreadRecord, RetreadStatus, latest_inspection};
use super::tyre::Tyre;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TpiBand {
    Excellent,
    Acceptable,
    Watch,
    Replace,
}

impl fmt::Display for TpiBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TpiBand::Excellent => "Excellent",
            TpiBand::Acceptable => "Acceptable",
            TpiBand::Watch => "Watch",
            TpiBand::Replace => "Replace",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringProfile {
    PerTyre,
    FleetAggregate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TpiScore {
    pub band: TpiBand,
    pub score: i32,
    pub cost_per_km: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskFlag {
    PoorCpkEfficiency,
    MinimumTreadDepth,
    FrequentSidewallRepairs,
}

impl fmt::Display for RiskFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RiskFlag::PoorCpkEfficiency => "Poor CPK Efficiency",
            RiskFlag::MinimumTreadDepth => "Minimum Tread Depth",
            RiskFlag::FrequentSidewallRepairs => "Frequent Sidewall Repairs",
        };
        f.write_str(label)
    }
}

/// Fleet-analytics view of a single tyre.
#[derive(Debug, Clone, PartialEq)]
pub struct TyreMetrics {
    pub total_cost: u64,
    pub cost_per_km: f64,
    pub repair_frequency: f64, // repairs per 5,000 km
    pub tpi_score: i32,
    pub tpi_band: TpiBand,
    pub risk_flags: Vec<RiskFlag>,
}

const END_OF_LIFE_RATIO: f64 = 0.9;
const MIN_TREAD_MM: f64 = 4.0;
const REPAIR_FREQUENCY_KM: f64 = 5_000.0;

struct CostBreakdown {
    gross: u64,
    repair_count: usize,
}

fn cost_breakdown(tyre: &Tyre, repairs: &[Repair], retreads: &[RetreadRecord]) -> CostBreakdown {
    let tyre_repairs: Vec<&Repair> = repairs.iter().filter(|r| r.tyre_id == tyre.id).collect();
    let repair_cost = tyre_repairs
        .iter()
        .map(|r| r.cost)
        .fold(0u64, u64::saturating_add);
    let retread_cost: u64 = retreads
        .iter()
        .filter(|r| r.tyre_id == tyre.id && r.status == RetreadStatus::Completed)
        .map(|r| r.cost.unwrap_or(0))
        .fold(0u64, u64::saturating_add);

    CostBreakdown {
        gross: tyre
            .purchase_cost
            .saturating_add(repair_cost)
            .saturating_add(retread_cost),
        repair_count: tyre_repairs.len(),
    }
}

fn per_km(cost: f64, km: u64) -> f64 {
    if km > 0 { cost / km as f64 } else { 0.0 }
}

fn last_inspection_flagged(inspections: &[Inspection], tyre_id: &str) -> bool {
    latest_inspection(inspections, tyre_id).is_some_and(|i| !i.is_ok())
}

/// Per-tyre TPI: the score shown on a tyre's detail card and vehicle layout.
pub fn score(
    tyre: &Tyre,
    repairs: &[Repair],
    retreads: &[RetreadRecord],
    inspections: &[Inspection],
) -> TpiScore {
    let costs = cost_breakdown(tyre, repairs, retreads);
    let net_cost = costs.gross as f64 - tyre.sale_price.unwrap_or(0) as f64;
    let cost_per_km = per_km(net_cost, tyre.total_km);

    let mut score = 100;
    if cost_per_km > 2.8 {
        score -= 30;
    } else if cost_per_km > 2.3 {
        score -= 15;
    }
    if tyre.total_km as f64 > tyre.expected_life_km as f64 * END_OF_LIFE_RATIO {
        score -= 25;
    }
    if last_inspection_flagged(inspections, &tyre.id) {
        score -= 20;
    }
    let score = score.clamp(0, 100);

    let band = if score < 50 {
        TpiBand::Replace
    } else if score < 75 {
        TpiBand::Watch
    } else if score < 90 {
        TpiBand::Acceptable
    } else {
        TpiBand::Excellent
    };

    TpiScore {
        band,
        score,
        cost_per_km,
    }
}

/// Fleet-aggregate TPI with the supporting analytics figures.
pub fn fleet_metrics(
    tyre: &Tyre,
    repairs: &[Repair],
    retreads: &[RetreadRecord],
    inspections: &[Inspection],
) -> TyreMetrics {
    let costs = cost_breakdown(tyre, repairs, retreads);
    let cost_per_km = per_km(costs.gross as f64, tyre.total_km);
    let repair_frequency = per_km(costs.repair_count as f64, tyre.total_km) * REPAIR_FREQUENCY_KM;

    let mut score = 100;
    if cost_per_km > 2.8 {
        score -= 40;
    } else if cost_per_km > 2.2 {
        score -= 15;
    }
    if costs.repair_count > 2 {
        score -= 15;
    }
    if tyre.current_life_no > 1 {
        score -= 10;
    }
    let last = latest_inspection(inspections, &tyre.id);
    if last.is_some_and(|i| !i.is_ok()) {
        score -= 20;
    }

    let band = if score < 50 {
        TpiBand::Replace
    } else if score < 70 {
        TpiBand::Watch
    } else if score < 85 {
        TpiBand::Acceptable
    } else {
        TpiBand::Excellent
    };

    let mut risk_flags = Vec::new();
    if score < 60 {
        risk_flags.push(RiskFlag::PoorCpkEfficiency);
    }
    if last
        .and_then(|i| i.tread_depth_mm)
        .is_some_and(|mm| mm > 0.0 && mm < MIN_TREAD_MM)
    {
        risk_flags.push(RiskFlag::MinimumTreadDepth);
    }
    if costs.repair_count > 2 {
        risk_flags.push(RiskFlag::FrequentSidewallRepairs);
    }

    TyreMetrics {
        total_cost: costs.gross,
        cost_per_km,
        repair_frequency,
        tpi_score: score.max(0),
        tpi_band: band,
        risk_flags,
    }
}

/// Scores a tyre under the named profile.
pub fn score_with(
    profile: ScoringProfile,
    tyre: &Tyre,
    repairs: &[Repair],
    retreads: &[RetreadRecord],
    inspections: &[Inspection],
) -> TpiScore {
    match profile {
        ScoringProfile::PerTyre => score(tyre, repairs, retreads, inspections),
        ScoringProfile::FleetAggregate => {
            let m = fleet_metrics(tyre, repairs, retreads, inspections);
            TpiScore {
                band: m.tpi_band,
                score: m.tpi_score,
                cost_per_km: m.cost_per_km,
            }
        }
    }
}

/// Headline figures for the tyres currently on one vehicle (per-tyre profile).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehicleSummary {
    pub high_risk_count: usize,
    pub watch_count: usize,
    pub avg_cpk: f64,
}

pub fn vehicle_summary<'a>(
    tyres: impl IntoIterator<Item = &'a Tyre>,
    repairs: &[Repair],
    retreads: &[RetreadRecord],
    inspections: &[Inspection],
) -> VehicleSummary {
    let mut summary = VehicleSummary::default();
    let mut total_cpk = 0.0;
    let mut count = 0usize;

    for tyre in tyres {
        let stats = score(tyre, repairs, retreads, inspections);
        match stats.band {
            TpiBand::Replace => summary.high_risk_count += 1,
            TpiBand::Watch => summary.watch_count += 1,
            _ => {}
        }
        total_cpk += stats.cost_per_km;
        count += 1;
    }
    if count > 0 {
        summary.avg_cpk = total_cpk / count as f64;
    }

    summary
}

/// Fleet-wide analytics (fleet-aggregate profile).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FleetSummary {
    pub avg_cpk: f64,
    pub total_spend: u64,
    pub healthy_count: usize,
    pub watch_count: usize,
    pub replace_count: usize,
    pub high_risk_count: usize,
}

pub fn fleet_summary<'a>(
    tyres: impl IntoIterator<Item = &'a Tyre>,
    repairs: &[Repair],
    retreads: &[RetreadRecord],
    inspections: &[Inspection],
) -> FleetSummary {
    let mut summary = FleetSummary::default();
    let mut total_cpk = 0.0;
    let mut count = 0usize;

    for tyre in tyres {
        let m = fleet_metrics(tyre, repairs, retreads, inspections);
        total_cpk += m.cost_per_km;
        summary.total_spend = summary.total_spend.saturating_add(m.total_cost);
        match m.tpi_band {
            TpiBand::Excellent | TpiBand::Acceptable => summary.healthy_count += 1,
            TpiBand::Watch => summary.watch_count += 1,
            TpiBand::Replace => summary.replace_count += 1,
        }
        count += 1;
    }
    summary.avg_cpk = total_cpk / count.max(1) as f64;
    summary.high_risk_count = summary.watch_count + summary.replace_count;

    summary
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrandStat {
    pub name: String,
    pub count: usize,
    pub cpk: f64,
}

/// Cost per km by brand, cheapest first.
pub fn brand_stats<'a>(
    tyres: impl IntoIterator<Item = &'a Tyre>,
    repairs: &[Repair],
    retreads: &[RetreadRecord],
) -> Vec<BrandStat> {
    // brand -> (count, total km, total cost)
    let mut brands: BTreeMap<&str, (usize, u64, u64)> = BTreeMap::new();
    for tyre in tyres {
        let costs = cost_breakdown(tyre, repairs, retreads);
        let entry = brands.entry(tyre.brand.as_str()).or_default();
        entry.0 += 1;
        entry.1 = entry.1.saturating_add(tyre.total_km);
        entry.2 = entry.2.saturating_add(costs.gross);
    }

    let mut stats: Vec<BrandStat> = brands
        .into_iter()
        .map(|(name, (count, km, cost))| BrandStat {
            name: name.to_string(),
            count,
            cpk: per_km(cost as f64, km),
        })
        .collect();
    stats.sort_by(|a, b| a.cpk.total_cmp(&b.cpk));

    stats
}

//! Period rollups: per-motorist consolidation, per-shift totals and the
//! company summary.
//!
//! Rollups only regroup shares that were already reconciled, and are checked
//! again against the driver-level grand total.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::error::ReconciliationError;
use crate::reconcile::{AllocationConfig, PeriodAllocation, Reconciler};
use crate::shifts::ShiftSchedule;
use crate::types::{CompanyId, DriverId, GroupKey, Quantities, ReportPeriod};

/// The shift or vehicle a driver covered the most distance in.
#[derive(Debug, Clone, PartialEq)]
pub struct TopEntry {
    pub name: String,
    pub distance: f64,
}

/// One driver's totals for the period.
#[derive(Debug, Clone, PartialEq)]
pub struct MotoristSummary {
    pub driver_id: DriverId,

    /// Sum of the driver's vehicle-day shares.
    pub totals: Quantities,

    /// Distinct calendar days with at least one work record.
    pub days_worked: usize,

    pub average_distance_per_day: f64,

    /// Distance per unit of fuel; 0 without fuel.
    pub efficiency: f64,

    /// The driver's portion of the company total, when the motorist level ran.
    pub period_share: Option<Quantities>,

    /// None when none of the driver's intervals has a shift breakdown.
    pub top_shift: Option<TopEntry>,

    pub top_vehicle: Option<TopEntry>,
}

/// Totals for one shift bucket name.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftTotal {
    pub name: String,

    /// Hour ranges covered by the name, e.g. `06:00-11:59`.
    pub hours: String,

    pub minutes: f64,
    pub totals: Quantities,
    pub efficiency: f64,
}

/// Company-wide figures for the period.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanySummary {
    pub company: CompanyId,
    pub period: ReportPeriod,
    pub totals: Quantities,
    pub efficiency: f64,
    pub motorists: usize,
    pub vehicle_days: usize,

    /// Part of `totals` recorded on vehicle-days without work records.
    pub unassigned: Quantities,
}

/// All rollups of one allocated period.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodRollup {
    pub summary: CompanySummary,
    pub motorists: Vec<MotoristSummary>,
    pub shifts: Vec<ShiftTotal>,
}

/// Builds every rollup of `allocation`.
pub fn rollup(
    allocation: &PeriodAllocation,
    config: &AllocationConfig,
) -> Result<PeriodRollup, ReconciliationError> {
    let reconciler = Reconciler::new(config.precision);
    Ok(PeriodRollup {
        summary: company_summary(allocation),
        motorists: consolidate_motorists(allocation, reconciler)?,
        shifts: shift_totals(allocation, &config.shifts, reconciler)?,
    })
}

fn period_key(allocation: &PeriodAllocation) -> GroupKey {
    GroupKey::CompanyPeriod {
        company: allocation.company.clone(),
        period: allocation.period,
    }
}

/// Consolidates driver-level shares per driver.
///
/// Sorted by distance descending, then driver ID.
#[allow(clippy::cast_precision_loss)]
pub fn consolidate_motorists(
    allocation: &PeriodAllocation,
    reconciler: Reconciler,
) -> Result<Vec<MotoristSummary>, ReconciliationError> {
    let mut per_driver: BTreeMap<&DriverId, DriverTally> = BTreeMap::new();
    for driver in allocation.driver_shares() {
        let tally = per_driver.entry(&driver.interval.driver_id).or_default();
        tally.totals += driver.share;
        tally.days.insert(driver.interval.calendar_day);
        tally.add_vehicle(driver.interval.vehicle_id.as_str(), driver.share.distance);
        for shift in &driver.shifts {
            tally.add_shift(&shift.bucket, shift.share.distance);
        }
    }

    let mut summaries: Vec<MotoristSummary> = per_driver
        .into_iter()
        .map(|(driver_id, tally)| {
            let totals = tally.totals;
            let days_worked = tally.days.len();
            MotoristSummary {
                driver_id: driver_id.clone(),
                totals,
                days_worked,
                average_distance_per_day: if days_worked > 0 {
                    totals.distance / days_worked as f64
                } else {
                    0.0
                },
                efficiency: totals.efficiency(),
                period_share: allocation
                    .motorists
                    .iter()
                    .find(|m| m.driver_id == *driver_id)
                    .map(|m| m.share),
                top_shift: top_entry(&tally.shifts),
                top_vehicle: top_entry(&tally.vehicles),
            }
        })
        .collect();

    reconciler.check_quantities(
        &period_key(allocation),
        allocation.assigned_total(),
        summaries.iter().map(|s| s.totals),
    )?;

    summaries.sort_by(|a, b| {
        b.totals
            .distance
            .total_cmp(&a.totals.distance)
            .then_with(|| a.driver_id.cmp(&b.driver_id))
    });
    Ok(summaries)
}

/// Per-driver accumulator; shifts and vehicles keep first-seen order.
#[derive(Default)]
struct DriverTally {
    totals: Quantities,
    days: BTreeSet<NaiveDate>,
    shifts: Vec<(String, f64)>,
    vehicles: Vec<(String, f64)>,
}

impl DriverTally {
    fn add_shift(&mut self, name: &str, distance: f64) {
        add_distance(&mut self.shifts, name, distance);
    }

    fn add_vehicle(&mut self, name: &str, distance: f64) {
        add_distance(&mut self.vehicles, name, distance);
    }
}

fn add_distance(entries: &mut Vec<(String, f64)>, name: &str, distance: f64) {
    match entries.iter_mut().find(|(n, _)| n == name) {
        Some((_, total)) => *total += distance,
        None => entries.push((name.to_string(), distance)),
    }
}

/// Largest distance; the first seen wins ties.
fn top_entry(entries: &[(String, f64)]) -> Option<TopEntry> {
    let mut top: Option<&(String, f64)> = None;
    for entry in entries {
        if top.is_none_or(|(_, best)| entry.1 > *best) {
            top = Some(entry);
        }
    }
    top.map(|(name, distance)| TopEntry {
        name: name.clone(),
        distance: *distance,
    })
}

/// Sums shift-level shares per bucket name, in schedule order.
pub fn shift_totals(
    allocation: &PeriodAllocation,
    schedule: &ShiftSchedule,
    reconciler: Reconciler,
) -> Result<Vec<ShiftTotal>, ReconciliationError> {
    let mut totals: Vec<ShiftTotal> = schedule
        .names()
        .iter()
        .map(|name| ShiftTotal {
            name: name.clone(),
            hours: schedule
                .buckets()
                .iter()
                .filter(|b| b.name == *name)
                .map(|b| b.label())
                .collect::<Vec<_>>()
                .join(", "),
            minutes: 0.0,
            totals: Quantities::ZERO,
            efficiency: 0.0,
        })
        .collect();

    let mut expected = Quantities::ZERO;
    for driver in allocation.driver_shares().filter(|d| !d.shifts.is_empty()) {
        expected += driver.share;
        for shift in &driver.shifts {
            if let Some(total) = totals.iter_mut().find(|t| t.name == shift.bucket) {
                total.minutes += shift.minutes;
                total.totals += shift.share;
            }
        }
    }
    for total in &mut totals {
        total.efficiency = total.totals.efficiency();
    }

    reconciler.check_quantities(&period_key(allocation), expected, totals.iter().map(|t| t.totals))?;
    Ok(totals)
}

pub fn company_summary(allocation: &PeriodAllocation) -> CompanySummary {
    let drivers: BTreeSet<&DriverId> = allocation
        .driver_shares()
        .map(|d| &d.interval.driver_id)
        .collect();
    CompanySummary {
        company: allocation.company.clone(),
        period: allocation.period,
        totals: allocation.company_total,
        efficiency: allocation.company_total.efficiency(),
        motorists: drivers.len(),
        vehicle_days: allocation.vehicle_days.len(),
        unassigned: allocation.unassigned.iter().map(|row| row.quantities()).sum(),
    }
}

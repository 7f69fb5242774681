//! Multi-level allocation of a company-period and its sum checks.
//!
//! # Algorithm Summary
//!
//! 1. Driver level: each vehicle-day's totals are split across its work
//!    intervals by worked minutes
//! 2. Shift level: each interval's share is split across the shift buckets
//!    it overlaps, by minutes in each bucket
//! 3. Motorist level: the company's period totals are split across drivers,
//!    weighted by what each driver received at the driver level
//!
//! After every level the [`Reconciler`] re-adds the shares and compares them
//! with their source. A group that fails validation or reconciliation is
//! reported in [`PeriodAllocation::failures`] and the rest of the batch goes on.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::distribute::{AllocationGroup, DEFAULT_PRECISION, distribute_in, tolerance};
use crate::error::{AllocationError, DistributionError, ReconciliationError};
use crate::record::{VehicleDayTotals, WorkInterval};
use crate::shifts::{ShiftSchedule, allocate_to_buckets};
use crate::types::{CompanyId, DriverId, GroupKey, Quantities, Quantity, ReportPeriod, VehicleId};

/// Relative slack for accumulated floating-point error, on top of the
/// precision tolerance.
const FLOAT_SLACK: f64 = 1e-9;

/// Verifies that breakdowns add back up to their source totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciler {
    precision: u32,
}

impl Reconciler {
    pub const fn new(precision: u32) -> Self {
        Self { precision }
    }

    pub const fn precision(self) -> u32 {
        self.precision
    }

    /// Largest accepted gap between `expected` and the sum of its parts.
    pub fn allowance(self, expected: f64) -> f64 {
        tolerance(self.precision) + FLOAT_SLACK * expected.abs().max(1.0)
    }

    /// Checks that `parts` sum to `expected` within the allowance.
    pub fn check(
        self,
        group: &GroupKey,
        quantity: Option<Quantity>,
        expected: f64,
        parts: impl IntoIterator<Item = f64>,
    ) -> Result<(), ReconciliationError> {
        let actual: f64 = parts.into_iter().sum();
        let residual = expected - actual;
        // A NaN residual compares false, so it has to be rejected on its own.
        if !residual.is_finite() || residual.abs() > self.allowance(expected) {
            return Err(ReconciliationError::ShareSum {
                group: group.clone(),
                quantity,
                expected,
                actual,
                residual,
            });
        }
        Ok(())
    }

    /// Checks distance and fuel separately.
    pub fn check_quantities(
        self,
        group: &GroupKey,
        expected: Quantities,
        parts: impl IntoIterator<Item = Quantities>,
    ) -> Result<(), ReconciliationError> {
        let actual: Quantities = parts.into_iter().sum();
        for quantity in Quantity::ALL {
            self.check(group, Some(quantity), expected.get(quantity), [actual.get(quantity)])?;
        }
        Ok(())
    }
}

/// Configuration for period allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// Decimal places every share is rounded to.
    /// Default: 2.
    pub precision: u32,

    /// Partition of the day used for the shift level.
    /// Default: Madrugada, Manhã, Intervalo, Tarde, Noite.
    pub shifts: ShiftSchedule,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            shifts: ShiftSchedule::standard(),
        }
    }
}

/// Everything known about one company in one period.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodInput {
    pub company: CompanyId,
    pub period: ReportPeriod,
    pub intervals: Vec<WorkInterval>,
    pub totals: Vec<VehicleDayTotals>,
}

/// An interval's portion of one shift bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct ShiftShare {
    pub bucket: String,

    /// Minutes worked in the bucket; 0 for a zero-length interval.
    pub minutes: f64,

    pub first_start: Option<NaiveDateTime>,
    pub last_end: Option<NaiveDateTime>,
    pub share: Quantities,
}

/// A work interval's portion of its vehicle-day.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverShare {
    pub interval: WorkInterval,
    pub minutes: f64,
    pub share: Quantities,

    /// Split of `share` across shift buckets, in schedule order.
    /// Empty when the interval's shift split failed.
    pub shifts: Vec<ShiftShare>,
}

/// One vehicle-day and the drivers it was split across.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleDayAllocation {
    pub vehicle_id: VehicleId,
    pub calendar_day: NaiveDate,

    /// Source totals; zero when the vehicle-day had no totals row.
    pub totals: Quantities,

    pub drivers: Vec<DriverShare>,
}

impl VehicleDayAllocation {
    pub fn key(&self) -> GroupKey {
        GroupKey::VehicleDay {
            vehicle: self.vehicle_id.clone(),
            day: self.calendar_day,
        }
    }
}

/// A driver's consolidated portion of the company-period.
#[derive(Debug, Clone, PartialEq)]
pub struct MotoristShare {
    pub driver_id: DriverId,

    /// Sum of the driver's vehicle-day shares.
    pub assigned: Quantities,

    /// Portion of the company total, including vehicle-days nobody was
    /// recorded on.
    pub share: Quantities,
}

/// A group that could not be allocated.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupFailure {
    pub key: GroupKey,
    pub error: DistributionError,
}

/// Result of allocating one company-period.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodAllocation {
    pub company: CompanyId,
    pub period: ReportPeriod,

    /// Sum of every vehicle-day totals row.
    pub company_total: Quantities,

    /// Successfully allocated vehicle-days, ordered by vehicle then day.
    pub vehicle_days: Vec<VehicleDayAllocation>,

    /// Ordered by driver ID. Empty when the motorist level was skipped.
    pub motorists: Vec<MotoristShare>,

    /// Vehicle-day totals with no work records.
    pub unassigned: Vec<VehicleDayTotals>,

    pub failures: Vec<GroupFailure>,
}

impl PeriodAllocation {
    pub fn driver_shares(&self) -> impl Iterator<Item = &DriverShare> {
        self.vehicle_days.iter().flat_map(|day| &day.drivers)
    }

    /// Sum of all driver-level shares.
    pub fn assigned_total(&self) -> Quantities {
        self.driver_shares().map(|d| d.share).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

fn work_shift_key(interval: &WorkInterval) -> GroupKey {
    GroupKey::WorkShift {
        driver: interval.driver_id.clone(),
        vehicle: interval.vehicle_id.clone(),
        day: interval.calendar_day,
        start: interval.start,
    }
}

/// Allocates a company-period at the driver, shift and motorist levels.
pub fn allocate_period(input: &PeriodInput, config: &AllocationConfig) -> PeriodAllocation {
    let reconciler = Reconciler::new(config.precision);
    let mut failures = Vec::new();

    let mut totals: BTreeMap<(VehicleId, NaiveDate), Quantities> = BTreeMap::new();
    for row in &input.totals {
        *totals
            .entry((row.vehicle_id.clone(), row.calendar_day))
            .or_default() += row.quantities();
    }
    let company_total: Quantities = totals.values().copied().sum();

    let mut intervals: BTreeMap<(VehicleId, NaiveDate), Vec<&WorkInterval>> = BTreeMap::new();
    for interval in &input.intervals {
        intervals
            .entry((interval.vehicle_id.clone(), interval.calendar_day))
            .or_default()
            .push(interval);
    }

    let unassigned: Vec<VehicleDayTotals> = totals
        .iter()
        .filter(|(key, _)| !intervals.contains_key(*key))
        .map(|((vehicle_id, day), quantities)| VehicleDayTotals {
            vehicle_id: vehicle_id.clone(),
            calendar_day: *day,
            total_distance: quantities.distance,
            total_fuel_volume: quantities.fuel,
        })
        .collect();
    for row in &unassigned {
        tracing::warn!(
            vehicle = %row.vehicle_id,
            day = %row.calendar_day,
            distance = row.total_distance,
            fuel = row.total_fuel_volume,
            "vehicle-day totals have no work records"
        );
    }

    let groups: Vec<(VehicleDayAllocation, Vec<&WorkInterval>)> = intervals
        .into_iter()
        .map(|((vehicle_id, calendar_day), members)| {
            let source = totals.get(&(vehicle_id.clone(), calendar_day)).copied().unwrap_or_else(|| {
                tracing::debug!(vehicle = %vehicle_id, day = %calendar_day, "work records without vehicle-day totals");
                Quantities::ZERO
            });
            let group = VehicleDayAllocation {
                vehicle_id,
                calendar_day,
                totals: source,
                drivers: Vec::new(),
            };
            (group, members)
        })
        .collect();

    // Driver level
    let level_one: Vec<Result<VehicleDayAllocation, GroupFailure>> = groups
        .into_par_iter()
        .map(|(group, members)| {
            let key = group.key();
            split_vehicle_day(group, &members, reconciler).map_err(|error| GroupFailure { key, error })
        })
        .collect();

    let mut vehicle_days = Vec::with_capacity(level_one.len());
    for outcome in level_one {
        match outcome {
            Ok(day) => vehicle_days.push(day),
            Err(failure) => failures.push(failure),
        }
    }
    let failed_vehicle_days = failures.len();

    // Shift level
    let shift_failures: Vec<GroupFailure> = vehicle_days
        .par_iter_mut()
        .flat_map(|day| day.drivers.par_iter_mut())
        .filter_map(|driver| match split_shifts(driver, &config.shifts, reconciler) {
            Ok(shifts) => {
                driver.shifts = shifts;
                None
            }
            Err(error) => Some(GroupFailure {
                key: work_shift_key(&driver.interval),
                error,
            }),
        })
        .collect();
    let shifts_complete = shift_failures.is_empty();
    failures.extend(shift_failures);

    // Shift level against the source totals
    for day in &mut vehicle_days {
        if day.drivers.iter().any(|d| d.shifts.is_empty()) {
            continue;
        }
        let shift_shares = day.drivers.iter().flat_map(|d| &d.shifts).map(|s| s.share);
        if let Err(error) = reconciler.check_quantities(&day.key(), day.totals, shift_shares) {
            failures.push(GroupFailure {
                key: day.key(),
                error: error.into(),
            });
            for driver in &mut day.drivers {
                driver.shifts.clear();
            }
        }
    }

    // Motorist level
    let company_key = GroupKey::CompanyPeriod {
        company: input.company.clone(),
        period: input.period,
    };
    let motorists = if failed_vehicle_days > 0 {
        failures.push(GroupFailure {
            key: company_key,
            error: AllocationError::IncompleteUpstream {
                failed: failed_vehicle_days,
            }
            .into(),
        });
        Vec::new()
    } else {
        split_motorists(&company_key, &vehicle_days, company_total, reconciler).unwrap_or_else(
            |error| {
                failures.push(GroupFailure {
                    key: company_key.clone(),
                    error,
                });
                Vec::new()
            },
        )
    };

    for failure in &failures {
        tracing::error!(group = %failure.key, error = %failure.error, "allocation group failed");
    }
    tracing::info!(
        company = %input.company,
        period = %input.period,
        vehicle_days = vehicle_days.len(),
        motorists = motorists.len(),
        unassigned = unassigned.len(),
        failures = failures.len(),
        shifts_complete,
        "allocated period"
    );

    PeriodAllocation {
        company: input.company.clone(),
        period: input.period,
        company_total,
        vehicle_days,
        motorists,
        unassigned,
        failures,
    }
}

fn split_vehicle_day(
    mut group: VehicleDayAllocation,
    members: &[&WorkInterval],
    reconciler: Reconciler,
) -> Result<VehicleDayAllocation, DistributionError> {
    let key = group.key();
    let weights = members
        .iter()
        .enumerate()
        .map(|(index, interval)| (index, interval.duration_minutes()))
        .collect();
    let shares = AllocationGroup::new(key.clone(), weights, group.totals).distribute(reconciler.precision())?;

    let drivers: Vec<DriverShare> = shares
        .iter()
        .map(|share| {
            let interval = members[share.member_id];
            DriverShare {
                interval: interval.clone(),
                minutes: interval.duration_minutes(),
                share: share.quantities(),
                shifts: Vec::new(),
            }
        })
        .collect();
    reconciler.check_quantities(&key, group.totals, drivers.iter().map(|d| d.share))?;
    tracing::debug!(group = %key, drivers = drivers.len(), "split vehicle-day");

    group.drivers = drivers;
    Ok(group)
}

fn split_shifts(
    driver: &DriverShare,
    schedule: &ShiftSchedule,
    reconciler: Reconciler,
) -> Result<Vec<ShiftShare>, DistributionError> {
    let key = work_shift_key(&driver.interval);
    let minutes = allocate_to_buckets(&driver.interval, schedule)?;
    let entries = minutes.entries();

    let mut weights: Vec<(usize, f64)> = entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.minutes > 0.0)
        .map(|(index, entry)| (index, entry.minutes))
        .collect();
    if weights.is_empty() {
        // Zero-length interval: the bucket it starts in takes everything.
        if let Some(name) = schedule.name_at(driver.interval.start.time()) {
            weights.extend(entries.iter().position(|e| e.name == name).map(|index| (index, 1.0)));
        }
    }

    let shares = AllocationGroup::new(key.clone(), weights, driver.share).distribute(reconciler.precision())?;
    let shifts: Vec<ShiftShare> = shares
        .iter()
        .map(|share| {
            let entry = &entries[share.member_id];
            ShiftShare {
                bucket: entry.name.clone(),
                minutes: entry.minutes,
                first_start: entry.first_start,
                last_end: entry.last_end,
                share: share.quantities(),
            }
        })
        .collect();
    reconciler.check_quantities(&key, driver.share, shifts.iter().map(|s| s.share))?;

    Ok(shifts)
}

fn split_motorists(
    key: &GroupKey,
    vehicle_days: &[VehicleDayAllocation],
    company_total: Quantities,
    reconciler: Reconciler,
) -> Result<Vec<MotoristShare>, DistributionError> {
    let mut assigned: BTreeMap<DriverId, Quantities> = BTreeMap::new();
    for driver in vehicle_days.iter().flat_map(|day| &day.drivers) {
        *assigned.entry(driver.interval.driver_id.clone()).or_default() += driver.share;
    }

    let weights_for = |quantity: Quantity| -> Vec<(DriverId, f64)> {
        assigned
            .iter()
            .map(|(id, totals)| (id.clone(), totals.get(quantity)))
            .collect()
    };
    let precision = reconciler.precision();
    let distance = distribute_in(
        key,
        Some(Quantity::Distance),
        company_total.distance,
        &weights_for(Quantity::Distance),
        precision,
    )?;
    let fuel = distribute_in(
        key,
        Some(Quantity::Fuel),
        company_total.fuel,
        &weights_for(Quantity::Fuel),
        precision,
    )?;

    let motorists: Vec<MotoristShare> = assigned
        .into_iter()
        .zip(distance.into_iter().zip(fuel))
        .map(|((driver_id, assigned), (distance, fuel))| MotoristShare {
            driver_id,
            assigned,
            share: Quantities::new(distance.amount, fuel.amount),
        })
        .collect();
    reconciler.check_quantities(key, company_total, motorists.iter().map(|m| m.share))?;

    Ok(motorists)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn at(d: u32, hour: u32, minute: u32) -> NaiveDateTime {
        day(d).and_hms_opt(hour, minute, 0).unwrap()
    }

    fn work(driver: &str, vehicle: &str, d: u32, start: NaiveDateTime, end: NaiveDateTime) -> WorkInterval {
        WorkInterval::new(
            DriverId::new(driver).unwrap(),
            VehicleId::new(vehicle).unwrap(),
            day(d),
            start,
            end,
        )
    }

    fn totals(vehicle: &str, d: u32, distance: f64, fuel: f64) -> VehicleDayTotals {
        VehicleDayTotals {
            vehicle_id: VehicleId::new(vehicle).unwrap(),
            calendar_day: day(d),
            total_distance: distance,
            total_fuel_volume: fuel,
        }
    }

    fn input(intervals: Vec<WorkInterval>, totals: Vec<VehicleDayTotals>) -> PeriodInput {
        PeriodInput {
            company: CompanyId::new("ACME").unwrap(),
            period: ReportPeriod::new(2025, 1).unwrap(),
            intervals,
            totals,
        }
    }

    fn close(actual: Quantities, distance: f64, fuel: f64) -> bool {
        (actual.distance - distance).abs() < 1e-9 && (actual.fuel - fuel).abs() < 1e-9
    }

    /// A worked 200 minutes and B 100 minutes on one vehicle-day.
    fn shared_vehicle_day() -> PeriodInput {
        input(
            vec![
                work("A", "V1", 15, at(15, 8, 0), at(15, 11, 20)),
                work("B", "V1", 15, at(15, 13, 0), at(15, 14, 40)),
            ],
            vec![totals("V1", 15, 900.0, 90.0)],
        )
    }

    // ========== Reconciler Tests ==========

    #[test]
    fn reconciler_accepts_within_tolerance() {
        let reconciler = Reconciler::new(2);
        assert!(reconciler.check(&GroupKey::Unkeyed, None, 10.0, [3.33, 6.67]).is_ok());
        assert!(reconciler.check(&GroupKey::Unkeyed, None, 10.0, [3.33, 6.66]).is_ok());
    }

    #[test]
    fn reconciler_rejects_mismatch() {
        let reconciler = Reconciler::new(2);
        let err = reconciler
            .check_quantities(
                &GroupKey::Unkeyed,
                Quantities::new(10.0, 5.0),
                [Quantities::new(10.0, 4.0)],
            )
            .unwrap_err();
        assert!(matches!(
            err,
            ReconciliationError::ShareSum {
                quantity: Some(Quantity::Fuel),
                ..
            }
        ));
    }

    #[test]
    fn reconciler_rejects_non_finite_parts() {
        let reconciler = Reconciler::new(2);
        assert!(reconciler.check(&GroupKey::Unkeyed, None, 10.0, [f64::NAN, 5.0]).is_err());
        assert!(reconciler.check(&GroupKey::Unkeyed, None, 10.0, [f64::INFINITY]).is_err());
        assert!(reconciler.check(&GroupKey::Unkeyed, None, 1e200, [f64::INFINITY, f64::NEG_INFINITY]).is_err());
    }

    // ========== Driver Level Tests ==========

    #[test]
    fn splits_vehicle_day_by_minutes() {
        let allocation = allocate_period(&shared_vehicle_day(), &AllocationConfig::default());
        assert!(allocation.is_complete());

        let drivers: Vec<&DriverShare> = allocation.driver_shares().collect();
        assert_eq!(drivers.len(), 2);
        assert!(close(drivers[0].share, 600.0, 60.0));
        assert!(close(drivers[1].share, 300.0, 30.0));
        assert!((drivers[0].minutes - 200.0).abs() < 1e-9);
    }

    #[test]
    fn sums_multiple_totals_rows() {
        let mut period = shared_vehicle_day();
        period.totals.push(totals("V1", 15, 300.0, 30.0));
        let allocation = allocate_period(&period, &AllocationConfig::default());

        assert!(close(allocation.vehicle_days[0].totals, 1200.0, 120.0));
        assert!(close(allocation.assigned_total(), 1200.0, 120.0));
    }

    #[test]
    fn records_without_totals_get_zero() {
        let period = input(vec![work("A", "V1", 15, at(15, 8, 0), at(15, 9, 0))], vec![]);
        let allocation = allocate_period(&period, &AllocationConfig::default());

        assert!(allocation.is_complete());
        assert!(close(allocation.vehicle_days[0].drivers[0].share, 0.0, 0.0));
        assert!(close(allocation.motorists[0].share, 0.0, 0.0));
    }

    // ========== Shift Level Tests ==========

    #[test]
    fn splits_interval_across_shifts() {
        let allocation = allocate_period(&shared_vehicle_day(), &AllocationConfig::default());
        let drivers: Vec<&DriverShare> = allocation.driver_shares().collect();

        let morning = &drivers[0].shifts;
        assert_eq!(morning.len(), 1);
        assert_eq!(morning[0].bucket, "Manhã");
        assert!(close(morning[0].share, 600.0, 60.0));

        let afternoon = &drivers[1].shifts;
        assert_eq!(afternoon.len(), 2);
        assert_eq!(afternoon[0].bucket, "Intervalo");
        assert!(close(afternoon[0].share, 180.0, 18.0));
        assert_eq!(afternoon[1].bucket, "Tarde");
        assert!(close(afternoon[1].share, 120.0, 12.0));
        assert_eq!(afternoon[1].first_start, Some(at(15, 14, 0)));
        assert_eq!(afternoon[1].last_end, Some(at(15, 14, 40)));
    }

    #[test]
    fn overnight_interval_reaches_both_days() {
        let period = input(
            vec![work("A", "V1", 15, at(15, 22, 0), at(16, 2, 0))],
            vec![totals("V1", 15, 100.0, 40.0)],
        );
        let allocation = allocate_period(&period, &AllocationConfig::default());
        assert!(allocation.is_complete());

        let shifts = &allocation.vehicle_days[0].drivers[0].shifts;
        let names: Vec<&str> = shifts.iter().map(|s| s.bucket.as_str()).collect();
        assert_eq!(names, ["Madrugada", "Noite"]);
        assert!(close(shifts[0].share, 50.0, 20.0));
        assert!(close(shifts[1].share, 50.0, 20.0));
    }

    #[test]
    fn zero_length_interval_goes_to_start_bucket() {
        let period = input(
            vec![work("A", "V1", 15, at(15, 15, 30), at(15, 15, 30))],
            vec![totals("V1", 15, 50.0, 5.0)],
        );
        let allocation = allocate_period(&period, &AllocationConfig::default());
        assert!(allocation.is_complete());

        let driver = &allocation.vehicle_days[0].drivers[0];
        assert!(close(driver.share, 50.0, 5.0));
        assert_eq!(driver.shifts.len(), 1);
        assert_eq!(driver.shifts[0].bucket, "Tarde");
        assert!(driver.shifts[0].minutes.abs() < f64::EPSILON);
        assert!(close(driver.shifts[0].share, 50.0, 5.0));
    }

    // ========== Motorist Level Tests ==========

    #[test]
    fn motorists_share_company_total() {
        let allocation = allocate_period(&shared_vehicle_day(), &AllocationConfig::default());
        assert_eq!(allocation.motorists.len(), 2);
        assert_eq!(allocation.motorists[0].driver_id.as_str(), "A");
        assert!(close(allocation.motorists[0].share, 600.0, 60.0));
        assert!(close(allocation.motorists[1].share, 300.0, 30.0));
    }

    #[test]
    fn unassigned_totals_reach_motorists_proportionally() {
        let mut period = shared_vehicle_day();
        period.totals.push(totals("V2", 16, 300.0, 30.0));
        let allocation = allocate_period(&period, &AllocationConfig::default());

        assert!(allocation.is_complete());
        assert_eq!(allocation.unassigned.len(), 1);
        assert_eq!(allocation.unassigned[0].vehicle_id.as_str(), "V2");
        assert!(close(allocation.company_total, 1200.0, 120.0));
        assert!(close(allocation.assigned_total(), 900.0, 90.0));

        let a = &allocation.motorists[0];
        assert!(close(a.assigned, 600.0, 60.0));
        assert!(close(a.share, 800.0, 80.0));
        assert!(close(allocation.motorists[1].share, 400.0, 40.0));
    }

    #[test]
    fn driver_on_several_vehicles_is_consolidated() {
        let period = input(
            vec![
                work("A", "V1", 15, at(15, 6, 0), at(15, 10, 0)),
                work("A", "V2", 16, at(16, 6, 0), at(16, 10, 0)),
                work("B", "V2", 16, at(16, 14, 0), at(16, 18, 0)),
            ],
            vec![totals("V1", 15, 100.0, 10.0), totals("V2", 16, 200.0, 20.0)],
        );
        let allocation = allocate_period(&period, &AllocationConfig::default());

        assert!(close(allocation.motorists[0].assigned, 200.0, 20.0));
        assert!(close(allocation.motorists[1].assigned, 100.0, 10.0));
    }

    // ========== Failure Tests ==========

    #[test]
    fn failed_group_is_isolated_and_blocks_motorists() {
        let mut period = shared_vehicle_day();
        period.intervals.push(work("C", "V2", 16, at(16, 8, 0), at(16, 9, 0)));
        period.totals.push(totals("V2", 16, -5.0, 1.0));
        let allocation = allocate_period(&period, &AllocationConfig::default());

        assert_eq!(allocation.vehicle_days.len(), 1);
        assert!(allocation.motorists.is_empty());
        assert_eq!(allocation.failures.len(), 2);

        assert_eq!(
            allocation.failures[0],
            GroupFailure {
                key: GroupKey::VehicleDay {
                    vehicle: VehicleId::new("V2").unwrap(),
                    day: day(16),
                },
                error: AllocationError::NegativeTotal { total: -5.0 }.into(),
            }
        );
        assert_eq!(
            allocation.failures[1].error,
            AllocationError::IncompleteUpstream { failed: 1 }.into()
        );
    }

    #[test]
    fn invalid_precision_fails_every_group() {
        let config = AllocationConfig {
            precision: 12,
            ..AllocationConfig::default()
        };
        let allocation = allocate_period(&shared_vehicle_day(), &config);
        assert!(allocation.vehicle_days.is_empty());
        assert!(matches!(
            allocation.failures[0].error,
            DistributionError::Allocation(AllocationError::PrecisionOutOfRange { .. })
        ));
    }

    #[test]
    fn output_is_deterministic() {
        let mut intervals = Vec::new();
        let mut rows = Vec::new();
        for d in 1..=20 {
            for v in 0..4 {
                let vehicle = format!("V{v}");
                rows.push(totals(&vehicle, d, 123.45 * f64::from(v + 1), 17.3 + f64::from(d)));
                for driver in 0..3 {
                    let start = at(d, 5 + driver * 6, 15);
                    let end = start + chrono::Duration::minutes(i64::from(200 + d * 7 + driver * 31));
                    intervals.push(work(&format!("D{driver}{v}"), &vehicle, d, start, end));
                }
            }
        }
        let period = input(intervals, rows);
        let first = allocate_period(&period, &AllocationConfig::default());
        assert!(first.is_complete());
        for _ in 0..5 {
            assert_eq!(allocate_period(&period, &AllocationConfig::default()), first);
        }
    }
}

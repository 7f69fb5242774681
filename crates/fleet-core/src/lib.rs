//! Core allocation logic for fleet distance and fuel reports.
//!
//! This crate contains the fundamental types and logic for:
//! - Normalization: turning raw shift sheet times into work intervals
//! - Shifts: splitting an interval's minutes across named time-of-day buckets
//! - Distribution: proportional shares that add back up to their total
//! - Reconciliation: driver, shift and motorist levels for a company-period
//! - Rollups: motorist consolidation, shift totals and the company summary

pub mod distribute;
pub mod error;
pub mod normalize;
pub mod reconcile;
pub mod record;
pub mod rollup;
pub mod shifts;
pub mod types;

pub use distribute::{AllocationGroup, DistributedShare, Share, distribute};
pub use error::{
    AllocationError, DistributionError, NormalizationError, ReconciliationError, ScheduleError,
};
pub use normalize::{
    NormalizedBatch, NormalizerConfig, normalize, normalize_records, normalize_with,
};
pub use reconcile::{AllocationConfig, PeriodAllocation, PeriodInput, Reconciler, allocate_period};
pub use record::{RawWorkRecord, VehicleDayTotals, WorkInterval};
pub use rollup::{PeriodRollup, rollup};
pub use shifts::{BucketMinutes, ShiftBucket, ShiftSchedule, allocate_to_buckets};
pub use types::{
    CompanyId, DriverId, GroupKey, Quantities, Quantity, ReportPeriod, ValidationError, VehicleId,
};

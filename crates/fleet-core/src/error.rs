//! Error taxonomy for normalization, allocation and reconciliation.

use std::fmt;

use thiserror::Error;

use crate::types::{GroupKey, Quantity, ValidationError};

/// Which time column of a work record a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeField {
    Start,
    End,
}

impl fmt::Display for TimeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::End => "end",
        })
    }
}

/// A raw work record that could not be turned into an interval.
///
/// Non-fatal: the record is excluded from allocation and reported.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NormalizationError {
    /// The value was blank or a "no data" marker.
    #[error("{field} time is missing")]
    Missing { field: TimeField },

    /// No known pattern, fallback, or regex extraction matched.
    #[error("could not parse {field} time: {value:?}")]
    Unparseable { field: TimeField, value: String },

    /// The record's calendar day could not be read.
    #[error("invalid calendar day: {value:?}")]
    InvalidDay { value: String },

    /// The driver or vehicle identifier was empty.
    #[error(transparent)]
    Identifier(#[from] ValidationError),
}

/// An invalid group definition, rejected before any computation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AllocationError {
    #[error("total must be non-negative, got {total}")]
    NegativeTotal { total: f64 },

    #[error("total must be finite, got {total}")]
    NonFiniteTotal { total: f64 },

    #[error("weight of member {index} must be finite and non-negative, got {weight}")]
    InvalidWeight { index: usize, weight: f64 },

    #[error("cannot distribute {total} across an empty group")]
    EmptyGroup { total: f64 },

    #[error("precision must be at most {max} decimal places, got {precision}")]
    PrecisionOutOfRange { precision: u32, max: u32 },

    /// A level that consumes another level's output while part of it failed.
    #[error("{failed} upstream group(s) failed; refusing to consolidate a partial total")]
    IncompleteUpstream { failed: usize },
}

/// A breakdown that does not add back up to its source.
///
/// Signals a bug rather than bad data; the affected group is aborted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReconciliationError {
    #[error(
        "{} shares for {group} sum to {actual} instead of {expected} (residual {residual})",
        .quantity.map_or("member", Quantity::as_str)
    )]
    ShareSum {
        group: GroupKey,
        /// `None` for single-quantity calls.
        quantity: Option<Quantity>,
        expected: f64,
        actual: f64,
        residual: f64,
    },

    #[error("shift buckets cover {bucket_minutes} minutes of a {interval_minutes} minute interval")]
    BucketPartition {
        interval_minutes: f64,
        bucket_minutes: f64,
    },
}

/// Anything that can stop a group from being distributed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DistributionError {
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Reconciliation(#[from] ReconciliationError),
}

/// An invalid shift configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("shift schedule has no buckets")]
    Empty,

    #[error("shift {name:?} has invalid hours {start_hour}..={end_hour}")]
    InvalidHours {
        name: String,
        start_hour: u32,
        end_hour: u32,
    },

    #[error("shifts {first:?} and {second:?} both cover hour {hour}")]
    Overlap {
        first: String,
        second: String,
        hour: u32,
    },

    #[error("no shift covers hour {hour}")]
    Gap { hour: u32 },
}

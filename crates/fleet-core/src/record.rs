//! Work records and vehicle-day totals.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::types::{DriverId, Quantities, VehicleId};

/// Canonical textual form of an interval boundary.
///
/// It is one of the ranked input patterns, so rendered values normalize back
/// to the same instants.
pub const RENDER_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// A work record as delivered by the ingestion layer, before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawWorkRecord {
    /// Driver registration number.
    pub driver_id: String,

    /// Vehicle plate or fleet number.
    pub vehicle_id: String,

    /// Calendar day, `dd/mm/yyyy` or `yyyy-mm-dd`.
    pub day: String,

    /// Start of the shift in any supported time format.
    pub start: String,

    /// End of the shift in any supported time format.
    pub end: String,
}

/// A driver's continuous on-duty span for one vehicle on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkInterval {
    pub driver_id: DriverId,
    pub vehicle_id: VehicleId,

    /// The day the record was filed under; the day used to group it with its
    /// vehicle's totals, even when the span crosses midnight.
    pub calendar_day: NaiveDate,

    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl WorkInterval {
    pub const fn new(
        driver_id: DriverId,
        vehicle_id: VehicleId,
        calendar_day: NaiveDate,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Self {
        Self {
            driver_id,
            vehicle_id,
            calendar_day,
            start,
            end,
        }
    }

    /// Worked minutes, clamped at zero.
    pub fn duration_minutes(&self) -> f64 {
        minutes_between(self.start, self.end).max(0.0)
    }

    pub fn render_start(&self) -> String {
        self.start.format(RENDER_FORMAT).to_string()
    }

    pub fn render_end(&self) -> String {
        self.end.format(RENDER_FORMAT).to_string()
    }
}

/// Distance and fuel recorded for one vehicle on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleDayTotals {
    pub vehicle_id: VehicleId,
    pub calendar_day: NaiveDate,
    pub total_distance: f64,
    pub total_fuel_volume: f64,
}

impl VehicleDayTotals {
    pub const fn quantities(&self) -> Quantities {
        Quantities::new(self.total_distance, self.total_fuel_volume)
    }
}

/// Signed minutes from `from` to `to`, at second resolution.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn minutes_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_seconds() as f64 / 60.0
}

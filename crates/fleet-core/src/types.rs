//! Core type definitions with validation.

use std::fmt;
use std::ops::{Add, AddAssign};

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A period label that is neither `YYYY-MM` nor `MM_YYYY`.
    #[error("invalid report period: {value}")]
    InvalidPeriod { value: String },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated driver identifier (the driver's registration number).
    DriverId, "driver ID"
);

define_string_id!(
    /// A validated vehicle identifier (plate or fleet number).
    VehicleId, "vehicle ID"
);

define_string_id!(
    /// A validated company identifier.
    CompanyId, "company ID"
);

/// Width registration numbers are padded to.
const REGISTRATION_WIDTH: usize = 6;

impl DriverId {
    /// Builds a driver ID from a raw registration number.
    ///
    /// Surrounding whitespace is trimmed and purely numeric registrations are
    /// left-padded with zeros to six digits, so `"4521"` and `"004521"` name
    /// the same driver. Non-numeric registrations are kept as trimmed.
    pub fn from_registration(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Self::new(format!("{trimmed:0>width$}", width = REGISTRATION_WIDTH));
        }
        Self::new(trimmed)
    }
}

/// A calendar month that a company's records belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ReportPeriod {
    year: i32,
    month: u32,
}

impl ReportPeriod {
    /// Creates a period, rejecting months outside 1..=12.
    pub fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(ValidationError::InvalidPeriod {
                value: format!("{year}-{month}"),
            });
        }
        Ok(Self { year, month })
    }

    /// The period containing `day`.
    pub fn of_day(day: NaiveDate) -> Self {
        Self {
            year: day.year(),
            month: day.month(),
        }
    }

    pub const fn year(self) -> i32 {
        self.year
    }

    pub const fn month(self) -> u32 {
        self.month
    }

    /// Returns true if `day` falls inside this month.
    pub fn contains(self, day: NaiveDate) -> bool {
        day.year() == self.year && day.month() == self.month
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for ReportPeriod {
    type Err = ValidationError;

    /// Accepts `YYYY-MM` and the legacy `MM_YYYY` label.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidPeriod {
            value: s.to_string(),
        };
        let (year, month) = if let Some((year, month)) = s.split_once('-') {
            (year, month)
        } else if let Some((month, year)) = s.split_once('_') {
            (year, month)
        } else {
            return Err(invalid());
        };
        let year: i32 = year.trim().parse().map_err(|_| invalid())?;
        let month: u32 = month.trim().parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl TryFrom<String> for ReportPeriod {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ReportPeriod> for String {
    fn from(period: ReportPeriod) -> Self {
        period.to_string()
    }
}

/// The two quantities carried through every allocation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quantity {
    Distance,
    Fuel,
}

impl Quantity {
    pub const ALL: [Self; 2] = [Self::Distance, Self::Fuel];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Distance => "distance",
            Self::Fuel => "fuel",
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A (distance, fuel volume) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Quantities {
    pub distance: f64,
    pub fuel: f64,
}

impl Quantities {
    pub const ZERO: Self = Self {
        distance: 0.0,
        fuel: 0.0,
    };

    pub const fn new(distance: f64, fuel: f64) -> Self {
        Self { distance, fuel }
    }

    pub const fn get(self, quantity: Quantity) -> f64 {
        match quantity {
            Quantity::Distance => self.distance,
            Quantity::Fuel => self.fuel,
        }
    }

    /// Distance per unit of fuel, or 0 when no fuel was used.
    pub fn efficiency(self) -> f64 {
        if self.fuel > 0.0 {
            self.distance / self.fuel
        } else {
            0.0
        }
    }
}

impl Add for Quantities {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            distance: self.distance + rhs.distance,
            fuel: self.fuel + rhs.fuel,
        }
    }
}

impl AddAssign for Quantities {
    fn add_assign(&mut self, rhs: Self) {
        self.distance += rhs.distance;
        self.fuel += rhs.fuel;
    }
}

impl std::iter::Sum for Quantities {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

/// Identifies one allocation group in errors and logs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum GroupKey {
    /// Drivers sharing one vehicle on one calendar day.
    VehicleDay { vehicle: VehicleId, day: NaiveDate },
    /// Shift buckets covered by one work interval.
    WorkShift {
        driver: DriverId,
        vehicle: VehicleId,
        day: NaiveDate,
        start: NaiveDateTime,
    },
    /// Motorists of one company in one period.
    CompanyPeriod {
        company: CompanyId,
        period: ReportPeriod,
    },
    /// An ad hoc call with no surrounding group.
    Unkeyed,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VehicleDay { vehicle, day } => write!(f, "vehicle {vehicle} on {day}"),
            Self::WorkShift {
                driver,
                vehicle,
                day,
                start,
            } => write!(
                f,
                "driver {driver} on vehicle {vehicle} on {day} from {}",
                start.format("%H:%M")
            ),
            Self::CompanyPeriod { company, period } => write!(f, "company {company} for {period}"),
            Self::Unkeyed => f.write_str("unkeyed group"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_id_rejects_empty() {
        assert!(DriverId::new("").is_err());
        assert!(DriverId::new("   ").is_err());
        assert!(DriverId::new("004521").is_ok());
    }

    #[test]
    fn vehicle_id_rejects_empty() {
        assert!(VehicleId::new("").is_err());
        assert!(VehicleId::new("ABC1D23").is_ok());
    }

    #[test]
    fn driver_id_serde_roundtrip() {
        let id = DriverId::new("004521").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"004521\"");
        let parsed: DriverId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn driver_id_serde_rejects_empty() {
        let result: Result<DriverId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn registration_is_zero_padded() {
        assert_eq!(DriverId::from_registration("4521").unwrap().as_str(), "004521");
        assert_eq!(DriverId::from_registration(" 004521 ").unwrap().as_str(), "004521");
        assert_eq!(DriverId::from_registration("1234567").unwrap().as_str(), "1234567");
        assert_eq!(DriverId::from_registration("MOT-7").unwrap().as_str(), "MOT-7");
        assert!(DriverId::from_registration("  ").is_err());
    }

    #[test]
    fn vehicle_id_as_ref() {
        let id = VehicleId::new("BUS-1002").unwrap();
        let s: &str = id.as_ref();
        assert_eq!(s, "BUS-1002");
    }

    // ========== ReportPeriod Tests ==========

    #[test]
    fn period_parses_both_labels() {
        let iso: ReportPeriod = "2025-01".parse().unwrap();
        let legacy: ReportPeriod = "01_2025".parse().unwrap();
        assert_eq!(iso, legacy);
        assert_eq!(iso.year(), 2025);
        assert_eq!(iso.month(), 1);
        assert_eq!(iso.to_string(), "2025-01");
    }

    #[test]
    fn period_rejects_bad_month() {
        assert!("2025-13".parse::<ReportPeriod>().is_err());
        assert!("2025".parse::<ReportPeriod>().is_err());
        assert!(ReportPeriod::new(2025, 0).is_err());
    }

    #[test]
    fn period_contains_its_days() {
        let period = ReportPeriod::new(2025, 1).unwrap();
        assert!(period.contains(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()));
        assert!(!period.contains(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()));
        assert_eq!(
            ReportPeriod::of_day(NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()),
            period
        );
    }

    #[test]
    fn period_serde_roundtrip() {
        let period = ReportPeriod::new(2024, 11).unwrap();
        let json = serde_json::to_string(&period).unwrap();
        assert_eq!(json, "\"2024-11\"");
        let parsed: ReportPeriod = serde_json::from_str("\"11_2024\"").unwrap();
        assert_eq!(parsed, period);
    }

    // ========== Quantities Tests ==========

    #[test]
    fn quantities_sum_and_efficiency() {
        let total: Quantities = [Quantities::new(600.0, 200.0), Quantities::new(300.0, 100.0)]
            .into_iter()
            .sum();
        assert!((total.distance - 900.0).abs() < 1e-9);
        assert!((total.fuel - 300.0).abs() < 1e-9);
        assert!((total.efficiency() - 3.0).abs() < 1e-9);
        assert!(Quantities::new(10.0, 0.0).efficiency().abs() < f64::EPSILON);
    }

    #[test]
    fn group_key_display() {
        let key = GroupKey::VehicleDay {
            vehicle: VehicleId::new("BUS-1").unwrap(),
            day: NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        };
        assert_eq!(key.to_string(), "vehicle BUS-1 on 2025-01-15");
        assert_eq!(GroupKey::Unkeyed.to_string(), "unkeyed group");
    }
}

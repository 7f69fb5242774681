//! Interval normalization.
//!
//! Turns the heterogeneous time values found in driver shift sheets into
//! canonical start/end instants.
//!
//! # Algorithm Summary
//!
//! 1. Detect one format per column by scoring a sample of its values against
//!    a ranked list of patterns
//! 2. Parse each value with the detected pattern, then the fallback list, then
//!    a bare `HH:MM[:SS]` extractor
//! 3. Anchor time-of-day values to the record's calendar day and push the end
//!    past midnight when it is earlier than the start

use std::fmt;
use std::sync::LazyLock;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{NormalizationError, TimeField};
use crate::record::{RawWorkRecord, WorkInterval};
use crate::types::{DriverId, VehicleId};

/// Bare clock time anywhere in a value, the last resort for odd exports.
static CLOCK_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2}):(\d{2})(?::(\d{2}))?").unwrap());

/// Configuration for time normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Values meaning "no data". Blank values are always treated as missing.
    /// Default: `-----`, `0m`, `nan`, `NaT`.
    pub sentinels: Vec<String>,

    /// How many non-missing values are sampled when detecting a column's format.
    /// Default: 10.
    pub detection_sample: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            sentinels: ["-----", "0m", "nan", "NaT"]
                .into_iter()
                .map(String::from)
                .collect(),
            detection_sample: 10,
        }
    }
}

impl NormalizerConfig {
    /// Returns true if the value is blank or a configured "no data" marker.
    pub fn is_sentinel(&self, value: &str) -> bool {
        let value = value.trim();
        value.is_empty() || self.sentinels.iter().any(|s| s == value)
    }
}

/// A supported textual time layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    HourMinuteSecond,
    HourMinute,
    UsDateTime,
    DayFirstDateTimeSeconds,
    DayFirstDateTime,
    IsoDateTimeSeconds,
    IsoDateTime,
    Meridiem,
    MeridiemSeconds,
    IsoDateTimeT,
    CompactHourMinute,
    CompactHourMinuteSecond,
}

impl TimeFormat {
    /// Patterns scored during column detection, in preference order.
    pub const RANKED: [Self; 10] = [
        Self::HourMinuteSecond,
        Self::HourMinute,
        Self::UsDateTime,
        Self::DayFirstDateTimeSeconds,
        Self::DayFirstDateTime,
        Self::IsoDateTimeSeconds,
        Self::IsoDateTime,
        Self::Meridiem,
        Self::MeridiemSeconds,
        Self::IsoDateTimeT,
    ];

    /// Patterns tried per value when the detected one does not match.
    pub const FALLBACK: [Self; 12] = [
        Self::HourMinuteSecond,
        Self::HourMinute,
        Self::UsDateTime,
        Self::DayFirstDateTimeSeconds,
        Self::DayFirstDateTime,
        Self::IsoDateTimeSeconds,
        Self::IsoDateTime,
        Self::Meridiem,
        Self::MeridiemSeconds,
        Self::IsoDateTimeT,
        Self::CompactHourMinute,
        Self::CompactHourMinuteSecond,
    ];

    /// The chrono format string.
    pub const fn pattern(self) -> &'static str {
        match self {
            Self::HourMinuteSecond => "%H:%M:%S",
            Self::HourMinute => "%H:%M",
            Self::UsDateTime => "%m-%d-%Y %H:%M:%S",
            Self::DayFirstDateTimeSeconds => "%d/%m/%Y %H:%M:%S",
            Self::DayFirstDateTime => "%d/%m/%Y %H:%M",
            Self::IsoDateTimeSeconds => "%Y-%m-%d %H:%M:%S",
            Self::IsoDateTime => "%Y-%m-%d %H:%M",
            Self::Meridiem => "%I:%M %p",
            Self::MeridiemSeconds => "%I:%M:%S %p",
            Self::IsoDateTimeT => "%Y-%m-%dT%H:%M:%S",
            Self::CompactHourMinute => "%H%M",
            Self::CompactHourMinuteSecond => "%H%M%S",
        }
    }

    /// Whether values in this layout carry their own date.
    pub const fn has_date(self) -> bool {
        matches!(
            self,
            Self::UsDateTime
                | Self::DayFirstDateTimeSeconds
                | Self::DayFirstDateTime
                | Self::IsoDateTimeSeconds
                | Self::IsoDateTime
                | Self::IsoDateTimeT
        )
    }

    /// Parses a trimmed value, returning None if it does not match exactly.
    pub fn parse(self, value: &str) -> Option<ParsedTime> {
        if self.has_date() {
            NaiveDateTime::parse_from_str(value, self.pattern())
                .ok()
                .map(ParsedTime::Instant)
        } else {
            NaiveTime::parse_from_str(value, self.pattern())
                .ok()
                .map(ParsedTime::TimeOfDay)
        }
    }
}

impl fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pattern())
    }
}

/// The outcome of column format detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectedFormat {
    /// A ranked pattern with the best success rate on the sample.
    Pattern(TimeFormat),
    /// No ranked pattern matched; values go through the fallbacks only.
    Regex,
}

impl fmt::Display for DetectedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern(format) => write!(f, "{format}"),
            Self::Regex => f.write_str("regex"),
        }
    }
}

/// A parsed time value, with or without its own date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParsedTime {
    TimeOfDay(NaiveTime),
    Instant(NaiveDateTime),
}

impl ParsedTime {
    /// Anchors a time of day to `day`; full instants are kept as-is.
    pub fn on(self, day: NaiveDate) -> NaiveDateTime {
        match self {
            Self::TimeOfDay(time) => day.and_time(time),
            Self::Instant(instant) => instant,
        }
    }
}

/// A canonical start/end pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// A raw record excluded from allocation, with its context for audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedRecord {
    /// Position of the record in the input.
    pub index: usize,
    pub driver_id: String,
    pub vehicle_id: String,
    pub day: String,
    pub error: NormalizationError,
}

/// Result of normalizing one input source.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    pub intervals: Vec<WorkInterval>,
    pub excluded: Vec<ExcludedRecord>,
    pub start_format: Option<DetectedFormat>,
    pub end_format: Option<DetectedFormat>,
}

/// Detects the format of one column from a sample of its values.
///
/// Missing values are skipped. Returns None if nothing is left to sample.
/// Ties go to the earlier pattern in [`TimeFormat::RANKED`].
pub fn detect_format<'a, I>(values: I, config: &NormalizerConfig) -> Option<DetectedFormat>
where
    I: IntoIterator<Item = &'a str>,
{
    let sample: Vec<&str> = values
        .into_iter()
        .map(str::trim)
        .filter(|v| !config.is_sentinel(v))
        .take(config.detection_sample.max(1))
        .collect();

    if sample.is_empty() {
        return None;
    }

    let mut best: Option<(TimeFormat, usize)> = None;
    for format in TimeFormat::RANKED {
        let successes = sample.iter().filter(|v| format.parse(v).is_some()).count();
        if successes > 0 && best.is_none_or(|(_, top)| successes > top) {
            best = Some((format, successes));
        }
    }

    if let Some((format, successes)) = best {
        #[allow(clippy::cast_precision_loss)]
        let success_rate = successes as f64 / sample.len() as f64;
        tracing::info!(%format, success_rate, "detected time format");
        Some(DetectedFormat::Pattern(format))
    } else {
        tracing::warn!(
            sample_size = sample.len(),
            "no known time format matched; using regex extraction"
        );
        Some(DetectedFormat::Regex)
    }
}

/// Parses one time value.
///
/// Tries the detected format, then every fallback pattern, then a bare
/// `HH:MM[:SS]` anywhere in the value.
pub fn parse_time(
    value: &str,
    field: TimeField,
    detected: Option<DetectedFormat>,
    config: &NormalizerConfig,
) -> Result<ParsedTime, NormalizationError> {
    let value = value.trim();
    if config.is_sentinel(value) {
        return Err(NormalizationError::Missing { field });
    }

    if let Some(DetectedFormat::Pattern(format)) = detected {
        if let Some(parsed) = format.parse(value) {
            return Ok(parsed);
        }
        tracing::debug!(%format, value, "detected format did not match, trying fallbacks");
    }

    TimeFormat::FALLBACK
        .iter()
        .find_map(|format| format.parse(value))
        .or_else(|| extract_clock_time(value))
        .ok_or_else(|| NormalizationError::Unparseable {
            field,
            value: value.to_string(),
        })
}

fn extract_clock_time(value: &str) -> Option<ParsedTime> {
    let caps = CLOCK_TIME_RE.captures(value)?;
    let hour = caps[1].parse().ok()?;
    let minute = caps[2].parse().ok()?;
    let second = caps.get(3).map_or(Some(0), |s| s.as_str().parse().ok())?;
    NaiveTime::from_hms_opt(hour, minute, second).map(ParsedTime::TimeOfDay)
}

/// Parses a record's calendar day (`dd/mm/yyyy`, `yyyy-mm-dd`, or a
/// midnight timestamp as spreadsheets export dates).
pub fn parse_calendar_day(value: &str) -> Result<NaiveDate, NormalizationError> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y-%m-%d"))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date())
        })
        .map_err(|_| NormalizationError::InvalidDay {
            value: value.to_string(),
        })
}

/// Combines parsed start and end values into a span on `day`.
///
/// An end strictly earlier than the start is a shift crossing midnight and is
/// moved to the following day. Equal values give a zero-length span.
pub fn resolve_span(start: ParsedTime, end: ParsedTime, day: NaiveDate) -> Span {
    let start = start.on(day);
    let mut end = end.on(day);
    if end < start {
        end += Duration::days(1);
    }
    Span { start, end }
}

/// Normalizes a single start/end pair without column detection, using the
/// default sentinels.
pub fn normalize(
    raw_start: &str,
    raw_end: &str,
    day: NaiveDate,
) -> Result<Span, NormalizationError> {
    normalize_with(raw_start, raw_end, day, &NormalizerConfig::default())
}

/// Like [`normalize`], with caller-supplied sentinels.
pub fn normalize_with(
    raw_start: &str,
    raw_end: &str,
    day: NaiveDate,
    config: &NormalizerConfig,
) -> Result<Span, NormalizationError> {
    let start = parse_time(raw_start, TimeField::Start, None, config)?;
    let end = parse_time(raw_end, TimeField::End, None, config)?;
    Ok(resolve_span(start, end, day))
}

fn normalize_record(
    record: &RawWorkRecord,
    start_format: Option<DetectedFormat>,
    end_format: Option<DetectedFormat>,
    config: &NormalizerConfig,
) -> Result<WorkInterval, NormalizationError> {
    let driver_id = DriverId::from_registration(&record.driver_id)?;
    let vehicle_id = VehicleId::new(record.vehicle_id.trim())?;
    let day = parse_calendar_day(&record.day)?;
    let start = parse_time(&record.start, TimeField::Start, start_format, config)?;
    let end = parse_time(&record.end, TimeField::End, end_format, config)?;
    let span = resolve_span(start, end, day);
    Ok(WorkInterval::new(
        driver_id, vehicle_id, day, span.start, span.end,
    ))
}

/// Normalizes every record of one input source.
///
/// Start and end columns get their own detected format. Records that cannot
/// be normalized are excluded and logged, never fatal.
pub fn normalize_records(records: &[RawWorkRecord], config: &NormalizerConfig) -> NormalizedBatch {
    let start_format = detect_format(records.iter().map(|r| r.start.as_str()), config);
    let end_format = detect_format(records.iter().map(|r| r.end.as_str()), config);

    let mut batch = NormalizedBatch {
        start_format,
        end_format,
        ..NormalizedBatch::default()
    };

    for (index, record) in records.iter().enumerate() {
        match normalize_record(record, start_format, end_format, config) {
            Ok(interval) => batch.intervals.push(interval),
            Err(error) => {
                tracing::warn!(
                    index,
                    driver = %record.driver_id,
                    vehicle = %record.vehicle_id,
                    day = %record.day,
                    %error,
                    "excluding work record"
                );
                batch.excluded.push(ExcludedRecord {
                    index,
                    driver_id: record.driver_id.clone(),
                    vehicle_id: record.vehicle_id.clone(),
                    day: record.day.clone(),
                    error,
                });
            }
        }
    }

    tracing::info!(
        total = records.len(),
        valid = batch.intervals.len(),
        excluded = batch.excluded.len(),
        "normalized work records"
    );

    batch
}

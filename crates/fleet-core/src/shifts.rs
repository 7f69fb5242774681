//! Shift buckets and time-bucket allocation.
//!
//! A [`ShiftSchedule`] partitions the day into named, half-open hour ranges.
//! [`allocate_to_buckets`] splits a work interval's minutes across them,
//! walking every calendar day the interval touches so overnight shifts land
//! in both days' buckets.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::error::{ReconciliationError, ScheduleError};
use crate::record::{WorkInterval, minutes_between};

/// Allowed gap between bucket minutes and interval minutes.
const PARTITION_EPSILON: f64 = 1e-6;

const HOURS_PER_DAY: u32 = 24;

/// A named time-of-day range.
///
/// `end_hour` is the last whole hour included, so the range is
/// `[start_hour:00, end_hour+1:00)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftBucket {
    pub name: String,
    pub start_hour: u32,
    pub end_hour: u32,
}

impl ShiftBucket {
    pub fn new(name: impl Into<String>, start_hour: u32, end_hour: u32) -> Self {
        Self {
            name: name.into(),
            start_hour,
            end_hour,
        }
    }

    /// Inclusive start of the bucket on `day`.
    pub fn start_on(&self, day: NaiveDate) -> NaiveDateTime {
        day.and_time(NaiveTime::MIN) + Duration::hours(i64::from(self.start_hour))
    }

    /// Exclusive end of the bucket on `day`; midnight of the next day for the
    /// last bucket.
    pub fn end_on(&self, day: NaiveDate) -> NaiveDateTime {
        day.and_time(NaiveTime::MIN) + Duration::hours(i64::from(self.end_hour) + 1)
    }

    pub const fn contains_hour(&self, hour: u32) -> bool {
        self.start_hour <= hour && hour <= self.end_hour
    }

    /// Human-readable range, e.g. `06:00-11:59`.
    pub fn label(&self) -> String {
        format!("{:02}:00-{:02}:59", self.start_hour, self.end_hour)
    }
}

/// A validated list of buckets covering every hour of the day exactly once.
///
/// Several buckets may share a name (e.g. a night shift split around
/// midnight); their minutes accumulate under that name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ShiftBucket>", into = "Vec<ShiftBucket>")]
pub struct ShiftSchedule {
    buckets: Vec<ShiftBucket>,
    /// Distinct bucket names in order of first appearance.
    names: Vec<String>,
    /// Index into `names` for each bucket.
    slots: Vec<usize>,
}

impl ShiftSchedule {
    /// Validates that the buckets partition the day.
    pub fn new(buckets: Vec<ShiftBucket>) -> Result<Self, ScheduleError> {
        if buckets.is_empty() {
            return Err(ScheduleError::Empty);
        }

        let mut owner: [Option<usize>; HOURS_PER_DAY as usize] = [None; HOURS_PER_DAY as usize];
        for (index, bucket) in buckets.iter().enumerate() {
            if bucket.name.trim().is_empty()
                || bucket.start_hour > bucket.end_hour
                || bucket.end_hour >= HOURS_PER_DAY
            {
                return Err(ScheduleError::InvalidHours {
                    name: bucket.name.clone(),
                    start_hour: bucket.start_hour,
                    end_hour: bucket.end_hour,
                });
            }
            for hour in bucket.start_hour..=bucket.end_hour {
                if let Some(previous) = owner[hour as usize] {
                    return Err(ScheduleError::Overlap {
                        first: buckets[previous].name.clone(),
                        second: bucket.name.clone(),
                        hour,
                    });
                }
                owner[hour as usize] = Some(index);
            }
        }

        if let Some(hour) = (0..HOURS_PER_DAY).find(|&h| owner[h as usize].is_none()) {
            return Err(ScheduleError::Gap { hour });
        }

        let mut names: Vec<String> = Vec::new();
        let slots = buckets
            .iter()
            .map(|bucket| {
                names.iter().position(|n| *n == bucket.name).unwrap_or_else(|| {
                    names.push(bucket.name.clone());
                    names.len() - 1
                })
            })
            .collect();

        Ok(Self {
            buckets,
            names,
            slots,
        })
    }

    /// Madrugada, Manhã, Intervalo, Tarde and Noite.
    pub fn standard() -> Self {
        let buckets = vec![
            ShiftBucket::new("Madrugada", 0, 5),
            ShiftBucket::new("Manhã", 6, 11),
            ShiftBucket::new("Intervalo", 12, 13),
            ShiftBucket::new("Tarde", 14, 19),
            ShiftBucket::new("Noite", 20, 23),
        ];
        Self {
            names: buckets.iter().map(|b| b.name.clone()).collect(),
            slots: (0..buckets.len()).collect(),
            buckets,
        }
    }

    pub fn buckets(&self) -> &[ShiftBucket] {
        &self.buckets
    }

    /// Distinct bucket names in schedule order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Name of the bucket containing a clock time.
    pub fn name_at(&self, time: NaiveTime) -> Option<&str> {
        let hour = time.hour();
        self.buckets
            .iter()
            .zip(&self.slots)
            .find(|(bucket, _)| bucket.contains_hour(hour))
            .map(|(_, &slot)| self.names[slot].as_str())
    }
}

impl Default for ShiftSchedule {
    fn default() -> Self {
        Self::standard()
    }
}

impl TryFrom<Vec<ShiftBucket>> for ShiftSchedule {
    type Error = ScheduleError;

    fn try_from(buckets: Vec<ShiftBucket>) -> Result<Self, Self::Error> {
        Self::new(buckets)
    }
}

impl From<ShiftSchedule> for Vec<ShiftBucket> {
    fn from(schedule: ShiftSchedule) -> Self {
        schedule.buckets
    }
}

/// Minutes an interval spent in one named bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketOverlap {
    pub name: String,
    pub minutes: f64,

    /// Earliest instant worked inside the bucket.
    pub first_start: Option<NaiveDateTime>,

    /// Latest instant worked inside the bucket.
    pub last_end: Option<NaiveDateTime>,
}

/// Per-bucket minutes for one interval, in schedule order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct BucketMinutes {
    entries: Vec<BucketOverlap>,
}

impl BucketMinutes {
    pub fn entries(&self) -> &[BucketOverlap] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &BucketOverlap> {
        self.entries.iter()
    }

    /// Minutes in the named bucket, 0 for unknown names.
    pub fn get(&self, name: &str) -> f64 {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map_or(0.0, |e| e.minutes)
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.minutes).sum()
    }
}

/// Splits an interval's minutes across the schedule's buckets.
///
/// Every calendar day from the start's date to the end's date is visited, so
/// a span crossing midnight accumulates minutes in both days' buckets. The
/// bucket minutes always add up to the interval duration; a mismatch is a
/// [`ReconciliationError::BucketPartition`].
pub fn allocate_to_buckets(
    interval: &WorkInterval,
    schedule: &ShiftSchedule,
) -> Result<BucketMinutes, ReconciliationError> {
    let mut entries: Vec<BucketOverlap> = schedule
        .names()
        .iter()
        .map(|name| BucketOverlap {
            name: name.clone(),
            minutes: 0.0,
            first_start: None,
            last_end: None,
        })
        .collect();

    let duration = interval.duration_minutes();
    if duration > 0.0 {
        let mut day = interval.start.date();
        let last_day = interval.end.date();
        while day <= last_day {
            for (bucket, &slot) in schedule.buckets().iter().zip(&schedule.slots) {
                let from = interval.start.max(bucket.start_on(day));
                let to = interval.end.min(bucket.end_on(day));
                if to > from {
                    let entry = &mut entries[slot];
                    entry.minutes += minutes_between(from, to);
                    entry.first_start = Some(entry.first_start.map_or(from, |s| s.min(from)));
                    entry.last_end = Some(entry.last_end.map_or(to, |e| e.max(to)));
                }
            }
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
    }

    let minutes = BucketMinutes { entries };
    let bucket_minutes = minutes.total();
    if (bucket_minutes - duration).abs() > PARTITION_EPSILON {
        return Err(ReconciliationError::BucketPartition {
            interval_minutes: duration,
            bucket_minutes,
        });
    }

    Ok(minutes)
}

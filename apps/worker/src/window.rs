//! Time-window resolution in the reference zone
//!
//! All arithmetic is done on naive local date-times in a fixed UTC offset and
//! converted back to `DateTime<Utc>` before leaving this module. A fixed
//! offset has no DST gaps, so every local time maps to exactly one instant.

use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::Serialize;

use crate::error::{WorkerError, WorkerResult};

/// A wall-clock time of day in a reference zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTime {
    time: NaiveTime,
    zone: FixedOffset,
}

impl DailyTime {
    pub fn new(hour: u32, minute: u32, zone: FixedOffset) -> WorkerResult<Self> {
        let time = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| {
            WorkerError::Configuration(format!("{:02}:{:02} is not a time of day", hour, minute))
        })?;
        Ok(Self { time, zone })
    }

    /// Build from an offset in seconds east of UTC
    pub fn with_offset_secs(hour: u32, minute: u32, offset_secs: i32) -> WorkerResult<Self> {
        let zone = FixedOffset::east_opt(offset_secs).ok_or_else(|| {
            WorkerError::Configuration(format!("{} seconds is not a valid UTC offset", offset_secs))
        })?;
        Self::new(hour, minute, zone)
    }

    pub fn zone(&self) -> FixedOffset {
        self.zone
    }

    /// Most recent occurrence of this time that is `<= now`
    pub fn latest_at_or_before(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let local_day = now.with_timezone(&self.zone).date_naive();
        let today = local_to_utc(local_day.and_time(self.time), self.zone);
        if today <= now {
            today
        } else {
            today - Duration::days(1)
        }
    }

    /// First occurrence of this time strictly after `now`
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.latest_at_or_before(now) + Duration::days(1)
    }
}

impl std::fmt::Display for DailyTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.time.format("%H:%M"), self.zone)
    }
}

/// Closed interval `[start, end]` of share timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShareWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ShareWindow {
    /// Window opened by the most recent anchor and closed at `now`
    pub fn anchored(now: DateTime<Utc>, anchor: &DailyTime) -> Self {
        Self {
            start: anchor.latest_at_or_before(now),
            end: now,
        }
    }

    /// Both bounds are inclusive
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

/// Chart aggregation period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartPeriod {
    Daily,
    /// ISO week, starting Monday
    Weekly,
    Monthly,
    Yearly,
}

impl ChartPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// From the start of the current local period up to `now`
    pub fn window(&self, now: DateTime<Utc>, zone: FixedOffset) -> ShareWindow {
        let today = now.with_timezone(&zone).date_naive();
        let back = match self {
            Self::Daily => 0,
            Self::Weekly => today.weekday().num_days_from_monday(),
            Self::Monthly => today.day0(),
            Self::Yearly => today.ordinal0(),
        };
        let first_day = today - Duration::days(i64::from(back));

        ShareWindow {
            start: local_to_utc(first_day.and_time(NaiveTime::MIN), zone),
            end: now,
        }
    }
}

impl FromStr for ChartPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(format!(
                "unknown chart period '{}', expected daily, weekly, monthly or yearly",
                other
            )),
        }
    }
}

impl std::fmt::Display for ChartPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn local_to_utc(local: NaiveDateTime, zone: FixedOffset) -> DateTime<Utc> {
    Utc.from_utc_datetime(&(local - Duration::seconds(i64::from(zone.local_minus_utc()))))
}

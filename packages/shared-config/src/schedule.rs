//! Daily playlist scheduling configuration
//!
//! Two instants matter for the daily playlist: the *anchor* that opens a
//! sharing window, and the *fire time* at which the scheduler runs the
//! recompute job. Both are wall-clock times in a single reference zone,
//! expressed as a fixed UTC offset.
//!
//! Each run covers the shares from the latest anchor up to the moment it
//! fires, so the fire time sits just before the anchor. Whatever lies between
//! a fire and the next anchor is never part of any window.

use chrono::format::{self, Parsed, StrftimeItems};

use crate::{get_env_or_default, parse_env, ConfigError, ConfigResult};

/// Largest UTC offset accepted for the reference zone (18 hours)
const MAX_OFFSET_SECS: i32 = 18 * 3600;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Largest stretch of the day allowed to fall outside every window
pub const MAX_UNCOVERED_MINUTES: u32 = 60;

const DEFAULT_ANCHOR_HOUR: u32 = 18;
const DEFAULT_RUN_HOUR: u32 = 17;
const DEFAULT_RUN_MINUTE: u32 = 59;

/// Scheduling configuration for the daily playlist job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Hour (0-23, reference zone) at which a sharing window opens
    pub anchor_hour: u32,

    /// Reference zone offset from UTC, in seconds east of Greenwich
    pub utc_offset_secs: i32,

    /// Hour (0-23, reference zone) at which the scheduler fires the job
    pub run_hour: u32,

    /// Minute (0-59) at which the scheduler fires the job
    pub run_minute: u32,

    /// Run deadline in seconds (0 disables the deadline)
    pub deadline_secs: u64,

    /// Name given to newly created daily playlists
    pub playlist_name: String,
}

impl ScheduleConfig {
    /// Load scheduling configuration from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        let offset = get_env_or_default("REFERENCE_UTC_OFFSET", "+09:00");
        let utc_offset_secs = parse_utc_offset(&offset)
            .map_err(|reason| ConfigError::InvalidValue("REFERENCE_UTC_OFFSET".into(), reason))?;

        let config = Self {
            anchor_hour: parse_env("DAILY_PLAYLIST_ANCHOR_HOUR", DEFAULT_ANCHOR_HOUR)?,
            utc_offset_secs,
            run_hour: parse_env("SCHEDULER_CRON_HOUR", DEFAULT_RUN_HOUR)?,
            run_minute: parse_env("SCHEDULER_CRON_MINUTE", DEFAULT_RUN_MINUTE)?,
            deadline_secs: parse_env("DAILY_PLAYLIST_DEADLINE_SECS", 600)?,
            playlist_name: get_env_or_default("DAILY_PLAYLIST_NAME", "Today's Playlist"),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check ranges that the type system does not enforce
    pub fn validate(&self) -> ConfigResult<()> {
        if self.anchor_hour > 23 {
            return Err(ConfigError::InvalidValue(
                "DAILY_PLAYLIST_ANCHOR_HOUR".into(),
                format!("{} is not an hour of the day", self.anchor_hour),
            ));
        }
        if self.run_hour > 23 {
            return Err(ConfigError::InvalidValue(
                "SCHEDULER_CRON_HOUR".into(),
                format!("{} is not an hour of the day", self.run_hour),
            ));
        }
        if self.run_minute > 59 {
            return Err(ConfigError::InvalidValue(
                "SCHEDULER_CRON_MINUTE".into(),
                format!("{} is not a minute of the hour", self.run_minute),
            ));
        }
        if self.utc_offset_secs.abs() > MAX_OFFSET_SECS {
            return Err(ConfigError::InvalidValue(
                "REFERENCE_UTC_OFFSET".into(),
                format!("{} seconds is outside +/-18h", self.utc_offset_secs),
            ));
        }
        if self.playlist_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "DAILY_PLAYLIST_NAME must not be blank".to_string(),
            ));
        }

        let uncovered = self.uncovered_minutes();
        if uncovered > MAX_UNCOVERED_MINUTES {
            return Err(ConfigError::ValidationError(format!(
                "firing at {:02}:{:02} leaves {} minutes before the {:02}:00 anchor \
                 outside every window (at most {} allowed)",
                self.run_hour, self.run_minute, uncovered, self.anchor_hour, MAX_UNCOVERED_MINUTES
            )));
        }
        Ok(())
    }

    /// Minutes between a fire and the next anchor, missed by every window
    ///
    /// Firing exactly at the anchor yields an empty window, so that counts as
    /// the whole day.
    pub fn uncovered_minutes(&self) -> u32 {
        let anchor = (self.anchor_hour % 24) * 60;
        let fire = (self.run_hour % 24) * 60 + self.run_minute % 60;
        match (anchor + MINUTES_PER_DAY - fire) % MINUTES_PER_DAY {
            0 => MINUTES_PER_DAY,
            gap => gap,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            anchor_hour: DEFAULT_ANCHOR_HOUR,
            utc_offset_secs: 9 * 3600,
            run_hour: DEFAULT_RUN_HOUR,
            run_minute: DEFAULT_RUN_MINUTE,
            deadline_secs: 600,
            playlist_name: "Today's Playlist".to_string(),
        }
    }
}

/// Parse an offset such as `+09:00`, `-0330` or `Z` into seconds east of UTC
pub fn parse_utc_offset(raw: &str) -> Result<i32, String> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return Ok(0);
    }

    // The whole input must be consumed, unlike `FixedOffset::from_str`
    let mut parsed = Parsed::new();
    let offset = format::parse(&mut parsed, raw, StrftimeItems::new("%:z"))
        .and_then(|()| parsed.to_fixed_offset())
        .map_err(|e| format!("'{}' is not a UTC offset: {}", raw, e))?;

    let secs = offset.local_minus_utc();
    if secs.abs() > MAX_OFFSET_SECS {
        return Err(format!("'{}' is outside +/-18h", raw));
    }
    Ok(secs)
}

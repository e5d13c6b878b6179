//! Worker configuration loaded from environment variables
//!
//! The worker needs nothing beyond the shared configuration; this module
//! turns the raw schedule values into the time types the job and runner use.

use anyhow::Result;
use dailyjam_shared_config::{CommonConfig, DatabaseConfig, Environment, ScheduleConfig};

use crate::error::WorkerResult;
use crate::jobs::DailyPlaylistSettings;
use crate::window::DailyTime;

/// Worker configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Common configuration shared with other services
    pub common: CommonConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let common = CommonConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        Ok(Self { common })
    }

    /// Settings for the daily playlist job
    pub fn daily_playlist_settings(&self) -> WorkerResult<DailyPlaylistSettings> {
        DailyPlaylistSettings::from_schedule(&self.common.schedule)
    }

    /// Time of day at which the scheduler fires the daily playlist job
    pub fn run_time(&self) -> WorkerResult<DailyTime> {
        let schedule = &self.common.schedule;
        DailyTime::with_offset_secs(
            schedule.run_hour,
            schedule.run_minute,
            schedule.utc_offset_secs,
        )
    }

    // Convenience accessors for common config fields

    /// Get database configuration
    pub fn database(&self) -> &DatabaseConfig {
        &self.common.database
    }

    /// Get schedule configuration
    pub fn schedule(&self) -> &ScheduleConfig {
        &self.common.schedule
    }

    /// Get environment mode
    pub fn environment(&self) -> Environment {
        self.common.environment
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.common.environment.is_production()
    }
}

//! Business logic services for Daily Jam
//!
//! - Playlist reads
//! - Share charts
//! - Health checks

pub mod chart;
pub mod health;
pub mod playlist;

pub use chart::{rank_entries, ChartService, CHART_SIZE};
pub use health::HealthService;
pub use playlist::PlaylistService;

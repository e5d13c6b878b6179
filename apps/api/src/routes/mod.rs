//! HTTP route handlers for the Daily Jam API
//!
//! - Daily playlist triggers and playlist reads
//! - Share charts
//! - Health check and status endpoints

pub mod charts;
pub mod health;
pub mod playlists;

pub use charts::{charts_router, ChartState};
pub use health::{health_router, HealthState};
pub use playlists::{playlist_jobs_router, playlists_router, JobState, PlaylistState};

//! Background job definitions
//!
//! Jobs are plain structs with an async `run` method. Anything the scheduler
//! should trigger also implements [`crate::scheduler::ScheduledJob`].

pub mod daily_playlist;

pub use daily_playlist::{
    dedup_songs, recompute_user, DailyPlaylistJob, DailyPlaylistSettings, RunMode, RunSummary,
    UserOutcome, JOB_NAME,
};

//! Response models for the Daily Jam API
//!
//! Row types shared with the worker (users, songs, playlists) live in
//! `dailyjam_worker::models` and are re-exported here; this module adds the
//! shapes that only the HTTP surface needs.

pub mod chart;
pub mod job;
pub mod playlist;

pub use chart::{ChartEntry, ChartRow};
pub use job::{DryRunDetails, DryRunResponse, JobRunResponse};
pub use playlist::PlaylistWithSongs;

pub use dailyjam_worker::models::{Playlist, PlaylistId, PlaylistKind, Song, UserId};

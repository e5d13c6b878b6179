//! Database repository layer for Daily Jam
//!
//! Read-side queries used by the HTTP handlers live here. Writes to
//! playlists go through the worker's store so that every replace happens
//! under the same per-user lock.

pub mod chart;
pub mod playlist;
pub mod utils;

pub use chart::ChartRepository;
pub use playlist::PlaylistRepository;

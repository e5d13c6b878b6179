//! Daily Jam worker library
//!
//! Domain models, the persistence contract and its PostgreSQL implementation,
//! time-window resolution, the daily playlist recompute job and the job
//! runner that fires it. The `dailyjam-worker` binary and the API both build
//! on this crate.

pub mod config;
pub mod error;
pub mod jobs;
pub mod models;
pub mod scheduler;
pub mod store;
pub mod window;

pub use error::{WorkerError, WorkerResult};

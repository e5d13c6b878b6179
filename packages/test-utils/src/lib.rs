//! Shared test utilities for Daily Jam workspace
//!
//! This crate provides in-memory doubles for the worker's collaborators so
//! the recompute job, the scheduler and the HTTP triggers can be tested
//! without PostgreSQL or real time.
//!
//! - [`MemoryStore`] - In-memory playlist store with transactions, savepoints
//!   and fault injection
//! - [`FixedClock`] - Clock set by hand
//! - [`TokioClock`] - Clock driven by (possibly paused) tokio time
//!
//! # Example
//!
//! ```rust,ignore
//! use dailyjam_test_utils::MemoryStore;
//!
//! let store = MemoryStore::new();
//! let mina = store.add_user("Mina");
//! store.share_song(mina.id, "Song X", "Artist Y", shared_at);
//! ```

mod clock;
mod store;

pub use clock::{FixedClock, TokioClock};
pub use store::{MemoryStore, MemoryTransaction};

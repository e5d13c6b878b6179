//! Test fixtures for worker integration tests
//!
//! All scenarios run in the +09:00 reference zone with an 18:00 anchor. The
//! default `now` is 17:59 local, when the scheduler fires in production, so
//! the window spans from 18:00 the previous day to 17:59.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};
use fake::faker::name::en::Name;
use fake::Fake;

use dailyjam_test_utils::MemoryStore;
use dailyjam_worker::jobs::{DailyPlaylistJob, DailyPlaylistSettings};
use dailyjam_worker::window::DailyTime;

/// Parse an RFC 3339 instant
pub fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("valid RFC 3339 timestamp")
        .with_timezone(&Utc)
}

pub fn reference_zone() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).expect("valid offset")
}

/// 2024-03-11 17:59 +09:00
pub fn run_at() -> DateTime<Utc> {
    utc("2024-03-11T08:59:00Z")
}

/// 2024-03-10 18:00 +09:00, the anchor opening the window that ends at [`run_at`]
pub fn anchor_instant() -> DateTime<Utc> {
    utc("2024-03-10T09:00:00Z")
}

/// Length of the window ending at [`run_at`]
pub fn window_length() -> chrono::Duration {
    run_at() - anchor_instant()
}

/// A share time `minutes` after the anchor
pub fn in_window(minutes: i64) -> DateTime<Utc> {
    anchor_instant() + chrono::Duration::minutes(minutes)
}

pub fn anchor() -> DailyTime {
    DailyTime::new(18, 0, reference_zone()).expect("valid anchor")
}

/// Default fire time, one minute before the anchor
pub fn fire_time() -> DailyTime {
    DailyTime::new(17, 59, reference_zone()).expect("valid fire time")
}

/// Default job settings: 18:00 anchor, no deadline
pub fn settings() -> DailyPlaylistSettings {
    DailyPlaylistSettings {
        anchor: anchor(),
        playlist_name: "Today's Playlist".to_string(),
        deadline: None,
    }
}

pub fn job(store: &MemoryStore) -> DailyPlaylistJob<MemoryStore> {
    DailyPlaylistJob::new(store.clone(), settings())
}

pub fn job_with_deadline(store: &MemoryStore, deadline: Duration) -> DailyPlaylistJob<MemoryStore> {
    DailyPlaylistJob::new(
        store.clone(),
        DailyPlaylistSettings {
            deadline: Some(deadline),
            ..settings()
        },
    )
}

/// A random display name
pub fn random_name() -> String {
    Name().fake()
}

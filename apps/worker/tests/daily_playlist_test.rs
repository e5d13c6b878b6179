//! Integration tests for the daily playlist recompute job
//!
//! Tests cover:
//! - Membership contents (scope, self-inclusion, deduplication, window bounds)
//! - Replace semantics and idempotence across runs
//! - Dry runs leaving the store untouched
//! - Per-user failure isolation and job-wide failures
//! - Run deadline and concurrent run rejection

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use chrono::Duration as ChronoDuration;
use rstest::rstest;
use tracing_test::traced_test;

use common::*;
use dailyjam_test_utils::MemoryStore;
use dailyjam_worker::jobs::RunMode;
use dailyjam_worker::models::PlaylistKind;
use dailyjam_worker::scheduler::ScheduledJob;
use dailyjam_worker::WorkerError;

// =============================================================================
// Membership
// =============================================================================

#[tokio::test]
async fn test_follower_receives_followee_share() {
    let store = MemoryStore::new();
    let a = store.add_user("A");
    let b = store.add_user("B");
    store.follow(a.id, b.id);
    let x = store.share_song(b.id, "Song X", "Artist Y", in_window(30));

    let job = job(&store);
    job.run(run_at(), RunMode::Commit).await.unwrap();
    assert_eq!(store.daily_song_ids(a.id), vec![x.id]);

    job.run(run_at(), RunMode::Commit).await.unwrap();
    assert_eq!(store.daily_song_ids(a.id), vec![x.id]);
}

#[tokio::test]
async fn test_follow_is_directed() {
    let store = MemoryStore::new();
    let a = store.add_user("A");
    let b = store.add_user("B");
    store.follow(a.id, b.id);
    let mine = store.share_song(a.id, "Mine", "Me", in_window(10));

    job(&store).run(run_at(), RunMode::Commit).await.unwrap();

    // B does not follow A
    assert!(store.daily_song_ids(b.id).is_empty());
    assert_eq!(store.daily_song_ids(a.id), vec![mine.id]);
}

#[tokio::test]
async fn test_own_shares_are_included() {
    let store = MemoryStore::new();
    let loner = store.add_user(&random_name());
    let own = store.share_song(loner.id, "Solo", "Someone", in_window(5));

    job(&store).run(run_at(), RunMode::Commit).await.unwrap();

    assert_eq!(store.daily_song_ids(loner.id), vec![own.id]);
}

#[tokio::test]
async fn test_strangers_never_appear() {
    let store = MemoryStore::new();
    let a = store.add_user("A");
    let b = store.add_user("B");
    let stranger = store.add_user("Stranger");
    store.follow(a.id, b.id);
    // The stranger follows A, which must not matter for A
    store.follow(stranger.id, a.id);

    let from_b = store.share_song(b.id, "Followed", "X", in_window(1));
    store.share_song(stranger.id, "Unrelated", "X", in_window(2));

    job(&store).run(run_at(), RunMode::Commit).await.unwrap();

    assert_eq!(store.daily_song_ids(a.id), vec![from_b.id]);
}

#[tokio::test]
async fn test_duplicates_collapse_to_first_share() {
    let store = MemoryStore::new();
    let a = store.add_user("A");
    let b = store.add_user("B");
    store.follow(a.id, b.id);

    let first = store.share_song(b.id, "Song A", "The Band", in_window(1));
    store.share_song(a.id, " song a ", "THE BAND", in_window(2));
    let other = store.share_song(a.id, "Song A", "Another Band", in_window(3));

    let summary = job(&store).run(run_at(), RunMode::Commit).await.unwrap();

    assert_eq!(store.daily_song_ids(a.id), vec![first.id, other.id]);
    // A sees three candidates, B sees only its own share
    assert_eq!(summary.shared_songs, 3 + 1);
    assert_eq!(summary.unique_songs, 2 + 1);
}

#[rstest]
#[case::exactly_at_anchor(ChronoDuration::zero(), true)]
#[case::exactly_at_now(window_length(), true)]
#[case::one_second_before_anchor(ChronoDuration::seconds(-1), false)]
#[case::a_day_and_a_second_before_anchor(-ChronoDuration::days(1) - ChronoDuration::seconds(1), false)]
#[case::one_microsecond_after_now(window_length() + ChronoDuration::microseconds(1), false)]
#[tokio::test]
async fn test_window_bounds(#[case] offset: ChronoDuration, #[case] included: bool) {
    let store = MemoryStore::new();
    let user = store.add_user("Edge");
    let song = store.share_song(user.id, "Edge", "Case", anchor_instant() + offset);

    job(&store).run(run_at(), RunMode::Commit).await.unwrap();

    assert_eq!(store.daily_song_ids(user.id).contains(&song.id), included);
}

#[tokio::test]
async fn test_consecutive_runs_cover_the_local_day() {
    let store = MemoryStore::new();
    let user = store.add_user("AllDay");
    // 2024-03-11 12:00 and 23:00 +09:00
    let midday = store.share_song(user.id, "Midday", "X", utc("2024-03-11T03:00:00Z"));
    let late = store.share_song(user.id, "Late", "X", utc("2024-03-11T14:00:00Z"));

    let job = job(&store);
    job.run(run_at(), RunMode::Commit).await.unwrap();
    assert_eq!(store.daily_song_ids(user.id), vec![midday.id]);

    job.run(run_at() + ChronoDuration::days(1), RunMode::Commit)
        .await
        .unwrap();
    assert_eq!(store.daily_song_ids(user.id), vec![late.id]);
}

#[tokio::test]
async fn test_user_without_shares_gets_empty_playlist() {
    let store = MemoryStore::new();
    let quiet = store.add_user("Quiet");

    let summary = job(&store).run(run_at(), RunMode::Commit).await.unwrap();

    let playlist = store.daily_playlist(quiet.id).expect("daily playlist created");
    assert_eq!(playlist.name, "Today's Playlist");
    assert_eq!(playlist.created_at, run_at());
    assert!(store.playlist_song_ids(playlist.id).is_empty());
    assert_eq!(summary.created_playlists, vec![playlist.id]);
}

// =============================================================================
// Replace semantics
// =============================================================================

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let store = MemoryStore::new();
    let a = store.add_user("A");
    let b = store.add_user("B");
    store.follow(a.id, b.id);
    store.share_song(a.id, "One", "X", in_window(1));
    store.share_song(b.id, "Two", "Y", in_window(2));

    let job = job(&store);
    let first = job.run(run_at(), RunMode::Commit).await.unwrap();
    let memberships = store.memberships();
    let playlists = store.playlists();

    let second = job.run(run_at(), RunMode::Commit).await.unwrap();

    assert_eq!(store.memberships(), memberships);
    assert_eq!(store.playlists(), playlists);
    assert_eq!(first.created_playlists.len(), 2);
    assert!(second.created_playlists.is_empty());
    assert_eq!(second.processed_users, vec![a.id, b.id]);
    assert_ne!(first.run_id, second.run_id);
}

#[tokio::test]
async fn test_songs_leaving_the_window_are_removed() {
    let store = MemoryStore::new();
    let user = store.add_user("Daily");
    let yesterday = store.share_song(user.id, "Yesterday", "X", in_window(30));

    let job = job(&store);
    job.run(run_at(), RunMode::Commit).await.unwrap();
    assert_eq!(store.daily_song_ids(user.id), vec![yesterday.id]);

    let today = store.share_song(user.id, "Today", "X", in_window(30) + ChronoDuration::days(1));
    job.run(run_at() + ChronoDuration::days(1), RunMode::Commit)
        .await
        .unwrap();

    assert_eq!(store.daily_song_ids(user.id), vec![today.id]);
}

#[tokio::test]
async fn test_existing_daily_playlist_is_reused() {
    let store = MemoryStore::new();
    let user = store.add_user("Returning");
    let existing = store.add_playlist(user.id, PlaylistKind::Daily, "Custom Name");
    let stale = store.share_song(user.id, "Stale", "X", in_window(-600));
    store.add_membership(existing.id, stale.id);
    let fresh = store.share_song(user.id, "Fresh", "X", in_window(60));

    let summary = job(&store).run(run_at(), RunMode::Commit).await.unwrap();

    assert!(summary.created_playlists.is_empty());
    let playlist = store.daily_playlist(user.id).unwrap();
    assert_eq!(playlist.id, existing.id);
    assert_eq!(playlist.name, "Custom Name");
    assert_eq!(store.playlist_song_ids(existing.id), vec![fresh.id]);
}

#[tokio::test]
async fn test_my_playlist_is_untouched() {
    let store = MemoryStore::new();
    let user = store.add_user("Curator");
    let my = store.add_playlist(user.id, PlaylistKind::My, "My Playlist");
    let kept = store.share_song(user.id, "Favourite", "X", in_window(-6000));
    store.add_membership(my.id, kept.id);
    store.share_song(user.id, "New", "X", in_window(10));

    job(&store).run(run_at(), RunMode::Commit).await.unwrap();

    assert_eq!(store.playlist_song_ids(my.id), vec![kept.id]);
    assert_ne!(store.daily_playlist(user.id).unwrap().id, my.id);
}

// =============================================================================
// Dry run
// =============================================================================

#[tokio::test]
async fn test_dry_run_leaves_store_unchanged() {
    let store = MemoryStore::new();
    let a = store.add_user("A");
    let b = store.add_user("B");
    store.follow(a.id, b.id);
    store.share_song(b.id, "Song X", "Artist Y", in_window(30));
    store.share_song(b.id, "song x", "artist y", in_window(31));

    let summary = job(&store).run(run_at(), RunMode::DryRun).await.unwrap();

    assert!(store.playlists().is_empty());
    assert!(store.memberships().is_empty());
    assert_eq!(summary.mode, RunMode::DryRun);
    assert_eq!(summary.processed_users, vec![a.id, b.id]);
    assert_eq!(summary.created_playlists.len(), 2);
    assert_eq!(summary.shared_songs, 4);
    assert_eq!(summary.unique_songs, 2);
    assert_eq!(store.commit_count(), 0);
}

#[tokio::test]
async fn test_dry_run_isolates_failing_user() {
    let store = MemoryStore::new();
    let a = store.add_user("A");
    let b = store.add_user("B");
    store.fail_followees_for(a.id);

    let summary = job(&store).run(run_at(), RunMode::DryRun).await.unwrap();

    assert_eq!(summary.failed_users, vec![a.id]);
    assert_eq!(summary.processed_users, vec![b.id]);
    assert!(store.playlists().is_empty());
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_failing_user_does_not_stop_the_run() {
    let store = MemoryStore::new();
    let a = store.add_user("A");
    let b = store.add_user("B");
    let c = store.add_user("C");
    store.fail_followees_for(b.id);
    let song = store.share_song(c.id, "Keeps", "Going", in_window(1));

    let summary = job(&store).run(run_at(), RunMode::Commit).await.unwrap();

    assert_eq!(summary.processed_users, vec![a.id, c.id]);
    assert_eq!(summary.failed_users, vec![b.id]);
    assert!(store.daily_playlist(b.id).is_none());
    assert_eq!(store.daily_song_ids(c.id), vec![song.id]);
}

#[tokio::test]
async fn test_malformed_song_fails_only_affected_users() {
    let store = MemoryStore::new();
    let a = store.add_user("A");
    let b = store.add_user("B");
    let c = store.add_user("C");
    store.follow(a.id, b.id);
    store.share_song(b.id, "   ", "Nobody", in_window(5));
    let fine = store.share_song(c.id, "Fine", "Artist", in_window(5));

    let summary = job(&store).run(run_at(), RunMode::Commit).await.unwrap();

    assert_eq!(summary.failed_users, vec![a.id, b.id]);
    assert_eq!(summary.processed_users, vec![c.id]);
    assert_eq!(store.daily_song_ids(c.id), vec![fine.id]);
}

#[tokio::test]
async fn test_failed_user_keeps_previous_membership() {
    let store = MemoryStore::new();
    let user = store.add_user("Unlucky");
    let playlist = store.add_playlist(user.id, PlaylistKind::Daily, "Today's Playlist");
    let old = store.share_song(user.id, "Old", "X", in_window(-6000));
    store.add_membership(playlist.id, old.id);
    store.fail_followees_for(user.id);

    let summary = job(&store).run(run_at(), RunMode::Commit).await.unwrap();

    assert_eq!(summary.failed_users, vec![user.id]);
    assert_eq!(store.playlist_song_ids(playlist.id), vec![old.id]);
    assert_eq!(store.rollback_count(), 1);
}

#[tokio::test]
#[traced_test]
async fn test_user_failure_is_logged() {
    let store = MemoryStore::new();
    let user = store.add_user("Logged");
    store.fail_followees_for(user.id);

    job(&store).run(run_at(), RunMode::Commit).await.unwrap();

    assert!(logs_contain("Daily playlist recompute failed"));
}

#[tokio::test]
#[traced_test]
async fn test_finished_run_logs_elapsed_duration() {
    let store = MemoryStore::new();
    store.add_user("Timed");

    job(&store).run(run_at(), RunMode::Commit).await.unwrap();

    assert!(logs_contain("Daily playlist run finished"));
    assert!(logs_contain("elapsed="));
    assert!(!logs_contain("elapsed_ms="));
}

#[tokio::test]
async fn test_begin_failure_aborts_the_run() {
    let store = MemoryStore::new();
    store.add_user("A");
    store.fail_begin(true);

    let result = job(&store).run(run_at(), RunMode::Commit).await;
    assert_matches!(result, Err(WorkerError::Transaction(_)));

    let result = job(&store).run(run_at(), RunMode::DryRun).await;
    assert_matches!(result, Err(WorkerError::Transaction(_)));
}

#[test_log::test(tokio::test)]
async fn test_scheduled_fire_swallows_errors() {
    let store = MemoryStore::new();
    let user = store.add_user("A");
    let job = job(&store);

    store.fail_begin(true);
    job.fire(run_at()).await;
    assert!(store.playlists().is_empty());

    store.fail_begin(false);
    job.fire(run_at()).await;
    assert!(store.daily_playlist(user.id).is_some());
    assert_eq!(job.name(), "daily_playlist");
}

// =============================================================================
// Deadline and concurrency
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_deadline_skips_remaining_users() {
    let store = MemoryStore::new();
    let users: Vec<_> = (0..4).map(|i| store.add_user(&format!("User {}", i))).collect();
    // Every transaction takes two seconds to open
    store.set_begin_delay(Duration::from_secs(2));

    let job = job_with_deadline(&store, Duration::from_secs(5));
    let summary = job.run(run_at(), RunMode::Commit).await.unwrap();

    // Listing users ends at 2s, user 0 at 4s, user 1 at 6s
    assert!(summary.deadline_exceeded);
    assert_eq!(summary.processed_users, vec![users[0].id, users[1].id]);
    assert_eq!(summary.skipped_users, vec![users[2].id, users[3].id]);
    assert!(store.daily_playlist(users[2].id).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_deadline_not_reached() {
    let store = MemoryStore::new();
    store.add_user("A");
    store.add_user("B");
    store.set_begin_delay(Duration::from_secs(1));

    let summary = job_with_deadline(&store, Duration::from_secs(60))
        .run(run_at(), RunMode::Commit)
        .await
        .unwrap();

    assert!(!summary.deadline_exceeded);
    assert!(summary.skipped_users.is_empty());
    assert_eq!(summary.processed_users.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_run_is_rejected() {
    let store = MemoryStore::new();
    store.add_user("A");
    store.set_begin_delay(Duration::from_secs(1));

    let job = Arc::new(job(&store));
    let first = {
        let job = Arc::clone(&job);
        tokio::spawn(async move { job.run(run_at(), RunMode::Commit).await })
    };

    // Let the first run take the lock and block in `begin`
    tokio::time::sleep(Duration::from_millis(10)).await;

    let second = job.run(run_at(), RunMode::DryRun).await;
    assert_matches!(second, Err(WorkerError::AlreadyRunning("daily_playlist")));

    let first = first.await.unwrap();
    assert!(first.is_ok());

    // The lock is released once the first run finishes
    assert!(job.run(run_at(), RunMode::DryRun).await.is_ok());
}

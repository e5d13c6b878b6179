//! Daily playlist recompute job
//!
//! Rebuilds every user's "daily" playlist from the songs shared by the user
//! and the people they follow since the most recent anchor. Membership is
//! replaced wholesale on each run, so the playlist always reflects exactly
//! one window.
//!
//! In commit mode each user is processed in its own transaction, so readers
//! never see a half-replaced playlist and one bad user cannot take the rest
//! of the run down with it. A dry run uses a single transaction with one
//! savepoint per user and rolls everything back at the end.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::instrument;
use uuid::Uuid;

use dailyjam_shared_config::ScheduleConfig;

use crate::error::{WorkerError, WorkerResult};
use crate::models::{NewPlaylist, PlaylistId, PlaylistKind, Song, User, UserId};
use crate::scheduler::ScheduledJob;
use crate::store::{PlaylistStore, StoreTransaction};
use crate::window::{DailyTime, ShareWindow};

/// Name used for the run lock and in logs
pub const JOB_NAME: &str = "daily_playlist";

/// Whether a run persists its writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Commit,
    /// Compute everything, then roll back
    DryRun,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Commit => write!(f, "commit"),
            Self::DryRun => write!(f, "dry_run"),
        }
    }
}

/// Tunables for the job
#[derive(Debug, Clone)]
pub struct DailyPlaylistSettings {
    /// Local time at which a sharing window opens
    pub anchor: DailyTime,

    /// Name given to newly created daily playlists
    pub playlist_name: String,

    /// Users not started before this much time has elapsed are skipped
    pub deadline: Option<Duration>,
}

impl DailyPlaylistSettings {
    pub fn from_schedule(schedule: &ScheduleConfig) -> WorkerResult<Self> {
        Ok(Self {
            anchor: DailyTime::with_offset_secs(
                schedule.anchor_hour,
                0,
                schedule.utc_offset_secs,
            )?,
            playlist_name: schedule.playlist_name.clone(),
            deadline: match schedule.deadline_secs {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        })
    }
}

/// Result of recomputing one user's playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserOutcome {
    pub playlist_id: PlaylistId,
    /// The playlist did not exist before this run
    pub created: bool,
    /// Candidate songs found in the window
    pub shared_songs: usize,
    /// Songs left after deduplication (the new membership size)
    pub unique_songs: usize,
}

/// Report of one run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub mode: RunMode,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub processed_users: Vec<UserId>,
    pub created_playlists: Vec<PlaylistId>,
    pub failed_users: Vec<UserId>,
    pub skipped_users: Vec<UserId>,
    /// Candidate songs summed over processed users
    pub shared_songs: usize,
    /// Deduplicated songs summed over processed users
    pub unique_songs: usize,
    pub deadline_exceeded: bool,
}

impl RunSummary {
    fn new(mode: RunMode, window: &ShareWindow) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            mode,
            window_start: window.start,
            window_end: window.end,
            processed_users: Vec::new(),
            created_playlists: Vec::new(),
            failed_users: Vec::new(),
            skipped_users: Vec::new(),
            shared_songs: 0,
            unique_songs: 0,
            deadline_exceeded: false,
        }
    }

    fn record(&mut self, user_id: UserId, outcome: &UserOutcome) {
        self.processed_users.push(user_id);
        if outcome.created {
            self.created_playlists.push(outcome.playlist_id);
        }
        self.shared_songs += outcome.shared_songs;
        self.unique_songs += outcome.unique_songs;
    }

    fn skip_remaining(&mut self, users: &[User]) {
        self.deadline_exceeded = true;
        self.skipped_users.extend(users.iter().map(|u| u.id));
    }
}

/// The recompute job, safe to share between the scheduler and HTTP handlers
pub struct DailyPlaylistJob<S> {
    store: S,
    settings: DailyPlaylistSettings,
    /// Held for the duration of a run; a second caller is turned away
    run_lock: Mutex<()>,
}

impl<S: PlaylistStore> DailyPlaylistJob<S> {
    pub fn new(store: S, settings: DailyPlaylistSettings) -> Self {
        Self {
            store,
            settings,
            run_lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &DailyPlaylistSettings {
        &self.settings
    }

    /// Recompute every user's daily playlist for the window ending at `now`
    ///
    /// Fails with [`WorkerError::AlreadyRunning`] if another run is in
    /// progress, and with the underlying error if a transaction cannot be
    /// opened or the user list cannot be read. Per-user failures are
    /// reported in [`RunSummary::failed_users`] instead.
    #[instrument(skip(self), fields(job = JOB_NAME))]
    pub async fn run(&self, now: DateTime<Utc>, mode: RunMode) -> WorkerResult<RunSummary> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| WorkerError::AlreadyRunning(JOB_NAME))?;

        let started = Instant::now();
        let window = ShareWindow::anchored(now, &self.settings.anchor);
        let mut summary = RunSummary::new(mode, &window);

        tracing::info!(
            run_id = %summary.run_id,
            window_start = %window.start,
            window_end = %window.end,
            "Recomputing daily playlists"
        );

        match mode {
            RunMode::Commit => self.run_committed(&window, started, &mut summary).await?,
            RunMode::DryRun => self.run_dry(&window, started, &mut summary).await?,
        }

        tracing::info!(
            run_id = %summary.run_id,
            processed = summary.processed_users.len(),
            created = summary.created_playlists.len(),
            failed = summary.failed_users.len(),
            skipped = summary.skipped_users.len(),
            shared_songs = summary.shared_songs,
            unique_songs = summary.unique_songs,
            elapsed = ?started.elapsed(),
            "Daily playlist run finished"
        );

        Ok(summary)
    }

    fn deadline_passed(&self, started: Instant) -> bool {
        self.settings
            .deadline
            .is_some_and(|deadline| started.elapsed() >= deadline)
    }

    async fn run_committed(
        &self,
        window: &ShareWindow,
        started: Instant,
        summary: &mut RunSummary,
    ) -> WorkerResult<()> {
        let users = {
            let mut tx = self.store.begin().await?;
            let users = tx.list_users().await?;
            tx.commit().await?;
            users
        };

        for (idx, user) in users.iter().enumerate() {
            if self.deadline_passed(started) {
                tracing::warn!(
                    run_id = %summary.run_id,
                    remaining = users.len() - idx,
                    "Run deadline exceeded, skipping remaining users"
                );
                summary.skip_remaining(&users[idx..]);
                break;
            }

            let mut tx = self.store.begin().await?;
            let result =
                recompute_user(&mut tx, user, window, &self.settings.playlist_name).await;

            match result {
                Ok(outcome) => match tx.commit().await {
                    Ok(()) => summary.record(user.id, &outcome),
                    Err(e) => {
                        e.log("commit daily playlist");
                        summary.failed_users.push(user.id);
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        user_id = user.id,
                        error = %e,
                        "Daily playlist recompute failed"
                    );
                    if let Err(rollback_err) = tx.rollback().await {
                        rollback_err.log("rollback daily playlist");
                    }
                    summary.failed_users.push(user.id);
                }
            }
        }

        Ok(())
    }

    async fn run_dry(
        &self,
        window: &ShareWindow,
        started: Instant,
        summary: &mut RunSummary,
    ) -> WorkerResult<()> {
        let mut tx = self.store.begin().await?;
        let users = tx.list_users().await?;

        for (idx, user) in users.iter().enumerate() {
            if self.deadline_passed(started) {
                summary.skip_remaining(&users[idx..]);
                break;
            }

            let savepoint = format!("user_{}", user.id);
            tx.savepoint(&savepoint).await?;

            match recompute_user(&mut tx, user, window, &self.settings.playlist_name).await {
                Ok(outcome) => {
                    tx.release_savepoint(&savepoint).await?;
                    summary.record(user.id, &outcome);
                }
                Err(e) => {
                    tracing::warn!(
                        user_id = user.id,
                        error = %e,
                        "Daily playlist dry run failed for user"
                    );
                    tx.rollback_to_savepoint(&savepoint).await?;
                    summary.failed_users.push(user.id);
                }
            }
        }

        tx.rollback().await?;
        tracing::debug!(run_id = %summary.run_id, "Dry run rolled back");
        Ok(())
    }
}

#[async_trait]
impl<S: PlaylistStore> ScheduledJob for DailyPlaylistJob<S> {
    fn name(&self) -> &'static str {
        JOB_NAME
    }

    async fn fire(&self, now: DateTime<Utc>) {
        match self.run(now, RunMode::Commit).await {
            Ok(summary) if !summary.failed_users.is_empty() => {
                tracing::warn!(
                    run_id = %summary.run_id,
                    failed_users = ?summary.failed_users,
                    "Scheduled daily playlist run finished with failures"
                );
            }
            Ok(_) => {}
            Err(e) => e.log("scheduled daily playlist run"),
        }
    }
}

/// Replace one user's daily playlist membership inside `tx`
///
/// The playlist is created (named `playlist_name`, stamped with the window
/// end) if the user has none yet.
pub async fn recompute_user<T: StoreTransaction>(
    tx: &mut T,
    user: &User,
    window: &ShareWindow,
    playlist_name: &str,
) -> WorkerResult<UserOutcome> {
    tx.lock_user(user.id).await?;

    let mut sharers = vec![user.id];
    sharers.extend(tx.followee_ids(user.id).await?);

    let shared = tx.songs_shared_in(&sharers, window).await?;
    let shared_count = shared.len();
    let unique = dedup_songs(shared)?;

    let (playlist_id, created) = match tx.find_playlist(user.id, PlaylistKind::Daily).await? {
        Some(playlist) => (playlist.id, false),
        None => {
            let new = NewPlaylist::daily(user.id, playlist_name, window.end);
            let playlist = tx.create_playlist(&new).await?;
            tracing::debug!(
                user_id = user.id,
                playlist_id = playlist.id,
                "Created daily playlist"
            );
            (playlist.id, true)
        }
    };

    let song_ids: Vec<_> = unique.iter().map(|s| s.id).collect();
    let removed = tx.clear_playlist(playlist_id).await?;
    tx.add_playlist_songs(playlist_id, &song_ids).await?;

    tracing::debug!(
        user_id = user.id,
        playlist_id,
        sharers = sharers.len(),
        shared = shared_count,
        unique = song_ids.len(),
        removed,
        "Replaced daily playlist membership"
    );

    Ok(UserOutcome {
        playlist_id,
        created,
        shared_songs: shared_count,
        unique_songs: song_ids.len(),
    })
}

/// Keep the first song for each (title, artist), compared trimmed and
/// case-insensitively
///
/// Input order is preserved. A song whose title or artist is blank after
/// trimming is rejected.
pub fn dedup_songs(songs: Vec<Song>) -> WorkerResult<Vec<Song>> {
    let mut seen = HashSet::with_capacity(songs.len());
    let mut unique = Vec::with_capacity(songs.len());

    for song in songs {
        let title = song.title.trim().to_lowercase();
        let artist = song.artist.trim().to_lowercase();
        if title.is_empty() {
            return Err(WorkerError::invalid_record("song", song.id, "blank title"));
        }
        if artist.is_empty() {
            return Err(WorkerError::invalid_record("song", song.id, "blank artist"));
        }
        if seen.insert((title, artist)) {
            unique.push(song);
        }
    }

    Ok(unique)
}

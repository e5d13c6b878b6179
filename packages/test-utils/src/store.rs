//! In-memory playlist store for testing the recompute job
//!
//! Provides a [`MemoryStore`] that implements the worker's store traits on
//! plain vectors. A transaction works on a private copy of the tables and
//! publishes it on commit; savepoints are further copies. That gives the
//! same visibility rules the job relies on in PostgreSQL: nothing a
//! transaction writes is seen by anyone else until it commits.
//!
//! # Lock Poisoning Recovery
//!
//! Locks are acquired with `unwrap_or_else(|e| e.into_inner())` so a test
//! that panics while holding one does not poison the store for the rest.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use dailyjam_worker::models::{
    Follow, NewPlaylist, Playlist, PlaylistId, PlaylistKind, Song, SongId, User, UserId,
};
use dailyjam_worker::store::{PlaylistStore, StoreTransaction};
use dailyjam_worker::window::ShareWindow;
use dailyjam_worker::{WorkerError, WorkerResult};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: Vec<User>,
    follows: Vec<Follow>,
    songs: Vec<Song>,
    playlists: Vec<Playlist>,
    memberships: BTreeSet<(PlaylistId, SongId)>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Debug, Default)]
struct Faults {
    fail_begin: bool,
    begin_delay: Option<Duration>,
    failing_followees: HashSet<UserId>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: Tables,
    faults: Faults,
    commits: usize,
    rollbacks: usize,
}

/// In-memory store shared by all clones
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

fn lock(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(|e| e.into_inner())
}

/// Fixed creation time for seeded rows
fn seeded_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Seeding ==========

    /// Insert a user named `name`
    pub fn add_user(&self, name: &str) -> User {
        let mut inner = lock(&self.inner);
        let user = User {
            id: inner.tables.next_id(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            name: name.to_string(),
            created_at: seeded_at(),
        };
        inner.tables.users.push(user.clone());
        user
    }

    /// `follower` starts following `following`
    pub fn follow(&self, follower: UserId, following: UserId) {
        let mut inner = lock(&self.inner);
        inner.tables.follows.push(Follow {
            follower_id: follower,
            following_id: following,
            followed_at: seeded_at(),
        });
    }

    /// `sharer` shares a song at `shared_at`
    pub fn share_song(
        &self,
        sharer: UserId,
        title: &str,
        artist: &str,
        shared_at: DateTime<Utc>,
    ) -> Song {
        let mut inner = lock(&self.inner);
        let id = inner.tables.next_id();
        let song = Song {
            id,
            title: title.to_string(),
            artist: artist.to_string(),
            album: format!("{} - Single", title.trim()),
            spotify_url: format!("https://open.spotify.com/track/{}", id),
            album_cover_url: Some(format!("https://i.scdn.co/image/{}", id)),
            uri: Some(format!("spotify:track:{}", id)),
            shared_by: sharer,
            shared_at,
            reaction: 0,
        };
        inner.tables.songs.push(song.clone());
        song
    }

    /// Insert a playlist directly, bypassing the job
    pub fn add_playlist(&self, user_id: UserId, kind: PlaylistKind, name: &str) -> Playlist {
        let mut inner = lock(&self.inner);
        let playlist = Playlist {
            id: inner.tables.next_id(),
            user_id,
            name: name.to_string(),
            playlist_type: kind,
            created_at: seeded_at(),
        };
        inner.tables.playlists.push(playlist.clone());
        playlist
    }

    /// Put `song_id` in `playlist_id`
    pub fn add_membership(&self, playlist_id: PlaylistId, song_id: SongId) {
        lock(&self.inner).tables.memberships.insert((playlist_id, song_id));
    }

    // ========== Inspection ==========

    /// The committed daily playlist of `user_id`
    pub fn daily_playlist(&self, user_id: UserId) -> Option<Playlist> {
        lock(&self.inner)
            .tables
            .playlists
            .iter()
            .find(|p| p.user_id == user_id && p.playlist_type == PlaylistKind::Daily)
            .cloned()
    }

    /// Committed members of `playlist_id`, ascending
    pub fn playlist_song_ids(&self, playlist_id: PlaylistId) -> Vec<SongId> {
        lock(&self.inner)
            .tables
            .memberships
            .iter()
            .filter(|(p, _)| *p == playlist_id)
            .map(|(_, s)| *s)
            .collect()
    }

    /// Committed members of the daily playlist of `user_id`; empty if it has none
    pub fn daily_song_ids(&self, user_id: UserId) -> Vec<SongId> {
        self.daily_playlist(user_id)
            .map(|p| self.playlist_song_ids(p.id))
            .unwrap_or_default()
    }

    pub fn playlists(&self) -> Vec<Playlist> {
        lock(&self.inner).tables.playlists.clone()
    }

    pub fn memberships(&self) -> Vec<(PlaylistId, SongId)> {
        lock(&self.inner).tables.memberships.iter().copied().collect()
    }

    /// Number of transactions committed so far
    pub fn commit_count(&self) -> usize {
        lock(&self.inner).commits
    }

    /// Number of transactions rolled back so far
    pub fn rollback_count(&self) -> usize {
        lock(&self.inner).rollbacks
    }

    // ========== Fault injection ==========

    /// Make every subsequent `begin` fail
    pub fn fail_begin(&self, fail: bool) {
        lock(&self.inner).faults.fail_begin = fail;
    }

    /// Sleep for `delay` (tokio time) in every `begin`
    pub fn set_begin_delay(&self, delay: Duration) {
        lock(&self.inner).faults.begin_delay = Some(delay);
    }

    /// Fail the followee lookup for `user_id` with a database error
    pub fn fail_followees_for(&self, user_id: UserId) {
        lock(&self.inner).faults.failing_followees.insert(user_id);
    }
}

#[async_trait]
impl PlaylistStore for MemoryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> WorkerResult<MemoryTransaction> {
        let delay = lock(&self.inner).faults.begin_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let inner = lock(&self.inner);
        if inner.faults.fail_begin {
            return Err(WorkerError::Transaction("begin: injected failure".to_string()));
        }

        Ok(MemoryTransaction {
            store: Arc::clone(&self.inner),
            working: inner.tables.clone(),
            savepoints: Vec::new(),
            dirty: false,
        })
    }
}

/// A transaction over a private copy of the tables
#[derive(Debug)]
pub struct MemoryTransaction {
    store: Arc<Mutex<Inner>>,
    working: Tables,
    savepoints: Vec<(String, Tables)>,
    dirty: bool,
}

fn constraint_violation(message: impl Into<String>) -> WorkerError {
    WorkerError::Database(sqlx::Error::Protocol(message.into()))
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn list_users(&mut self) -> WorkerResult<Vec<User>> {
        let mut users = self.working.users.clone();
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    async fn find_playlist(
        &mut self,
        user_id: UserId,
        kind: PlaylistKind,
    ) -> WorkerResult<Option<Playlist>> {
        Ok(self
            .working
            .playlists
            .iter()
            .find(|p| p.user_id == user_id && p.playlist_type == kind)
            .cloned())
    }

    async fn followee_ids(&mut self, follower_id: UserId) -> WorkerResult<Vec<UserId>> {
        if lock(&self.store)
            .faults
            .failing_followees
            .contains(&follower_id)
        {
            return Err(WorkerError::Database(sqlx::Error::PoolTimedOut));
        }

        let mut ids: Vec<_> = self
            .working
            .follows
            .iter()
            .filter(|f| f.follower_id == follower_id)
            .map(|f| f.following_id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn songs_shared_in(
        &mut self,
        sharers: &[UserId],
        window: &ShareWindow,
    ) -> WorkerResult<Vec<Song>> {
        let mut songs: Vec<_> = self
            .working
            .songs
            .iter()
            .filter(|s| sharers.contains(&s.shared_by) && window.contains(s.shared_at))
            .cloned()
            .collect();
        songs.sort_by_key(|s| s.id);
        Ok(songs)
    }

    async fn lock_user(&mut self, _user_id: UserId) -> WorkerResult<()> {
        Ok(())
    }

    async fn create_playlist(&mut self, playlist: &NewPlaylist) -> WorkerResult<Playlist> {
        let exists = self
            .working
            .playlists
            .iter()
            .any(|p| p.user_id == playlist.user_id && p.playlist_type == playlist.playlist_type);
        if exists {
            return Err(constraint_violation(format!(
                "duplicate {} playlist for user {}",
                playlist.playlist_type, playlist.user_id
            )));
        }

        let created = Playlist {
            id: self.working.next_id(),
            user_id: playlist.user_id,
            name: playlist.name.clone(),
            playlist_type: playlist.playlist_type,
            created_at: playlist.created_at,
        };
        self.working.playlists.push(created.clone());
        self.dirty = true;
        Ok(created)
    }

    async fn clear_playlist(&mut self, playlist_id: PlaylistId) -> WorkerResult<u64> {
        let before = self.working.memberships.len();
        self.working.memberships.retain(|(p, _)| *p != playlist_id);
        self.dirty = true;
        Ok((before - self.working.memberships.len()) as u64)
    }

    async fn add_playlist_songs(
        &mut self,
        playlist_id: PlaylistId,
        song_ids: &[SongId],
    ) -> WorkerResult<()> {
        for &song_id in song_ids {
            if !self.working.songs.iter().any(|s| s.id == song_id) {
                return Err(constraint_violation(format!("song {} does not exist", song_id)));
            }
            if !self.working.memberships.insert((playlist_id, song_id)) {
                return Err(constraint_violation(format!(
                    "song {} already in playlist {}",
                    song_id, playlist_id
                )));
            }
        }
        self.dirty = true;
        Ok(())
    }

    async fn savepoint(&mut self, name: &str) -> WorkerResult<()> {
        self.savepoints.push((name.to_string(), self.working.clone()));
        Ok(())
    }

    async fn release_savepoint(&mut self, name: &str) -> WorkerResult<()> {
        match self.savepoints.iter().rposition(|(n, _)| n == name) {
            Some(idx) => {
                self.savepoints.truncate(idx);
                Ok(())
            }
            None => Err(constraint_violation(format!("savepoint {} does not exist", name))),
        }
    }

    async fn rollback_to_savepoint(&mut self, name: &str) -> WorkerResult<()> {
        match self.savepoints.iter().rposition(|(n, _)| n == name) {
            Some(idx) => {
                // The savepoint survives a rollback to it, as in PostgreSQL
                self.savepoints.truncate(idx + 1);
                self.working = self.savepoints[idx].1.clone();
                Ok(())
            }
            None => Err(constraint_violation(format!("savepoint {} does not exist", name))),
        }
    }

    async fn commit(self) -> WorkerResult<()> {
        let mut inner = lock(&self.store);
        if self.dirty {
            inner.tables = self.working;
        }
        inner.commits += 1;
        Ok(())
    }

    async fn rollback(self) -> WorkerResult<()> {
        lock(&self.store).rollbacks += 1;
        Ok(())
    }
}

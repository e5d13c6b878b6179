//! Persistence contract for the daily playlist job
//!
//! The job only talks to the database through these traits. Everything a run
//! does happens inside a [`StoreTransaction`]; nothing is visible to readers
//! until [`StoreTransaction::commit`] succeeds.

mod postgres;

pub use postgres::{PgPlaylistStore, PgStoreTransaction};

use async_trait::async_trait;

use crate::error::WorkerResult;
use crate::models::{NewPlaylist, Playlist, PlaylistId, PlaylistKind, Song, SongId, User, UserId};
use crate::window::ShareWindow;

/// Entry point to the store: hands out transactions
#[async_trait]
pub trait PlaylistStore: Send + Sync {
    type Tx: StoreTransaction;

    /// Begin a new transaction
    async fn begin(&self) -> WorkerResult<Self::Tx>;
}

/// Operations available inside one transaction
///
/// Dropping a transaction without calling [`commit`](Self::commit) discards
/// its writes.
#[async_trait]
pub trait StoreTransaction: Send {
    // ========================================================================
    // Reads
    // ========================================================================

    /// All users, ordered by id
    async fn list_users(&mut self) -> WorkerResult<Vec<User>>;

    /// The playlist of `kind` owned by `user_id`, if any
    async fn find_playlist(
        &mut self,
        user_id: UserId,
        kind: PlaylistKind,
    ) -> WorkerResult<Option<Playlist>>;

    /// Ids of the users `follower_id` follows
    async fn followee_ids(&mut self, follower_id: UserId) -> WorkerResult<Vec<UserId>>;

    /// Songs shared by any of `sharers` inside `window` (both bounds
    /// inclusive), in insertion order
    async fn songs_shared_in(
        &mut self,
        sharers: &[UserId],
        window: &ShareWindow,
    ) -> WorkerResult<Vec<Song>>;

    // ========================================================================
    // Writes
    // ========================================================================

    /// Serialize writers of this user's playlists until the transaction ends
    async fn lock_user(&mut self, user_id: UserId) -> WorkerResult<()>;

    async fn create_playlist(&mut self, playlist: &NewPlaylist) -> WorkerResult<Playlist>;

    /// Remove every membership row of a playlist, returning how many were removed
    async fn clear_playlist(&mut self, playlist_id: PlaylistId) -> WorkerResult<u64>;

    async fn add_playlist_songs(
        &mut self,
        playlist_id: PlaylistId,
        song_ids: &[SongId],
    ) -> WorkerResult<()>;

    // ========================================================================
    // Savepoints
    // ========================================================================

    async fn savepoint(&mut self, name: &str) -> WorkerResult<()>;

    async fn release_savepoint(&mut self, name: &str) -> WorkerResult<()>;

    async fn rollback_to_savepoint(&mut self, name: &str) -> WorkerResult<()>;

    // ========================================================================
    // Completion
    // ========================================================================

    async fn commit(self) -> WorkerResult<()>;

    async fn rollback(self) -> WorkerResult<()>;
}

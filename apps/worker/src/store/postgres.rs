//! PostgreSQL implementation of the playlist store

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use super::{PlaylistStore, StoreTransaction};
use crate::error::{WorkerError, WorkerResult};
use crate::models::{NewPlaylist, Playlist, PlaylistId, PlaylistKind, Song, SongId, User, UserId};
use crate::window::ShareWindow;

const USER_COLUMNS: &str = "id, email, name, created_at";

const SONG_COLUMNS: &str = "id, title, artist, album, spotify_url, album_cover_url, uri, \
                            shared_by, shared_at, reaction";

const PLAYLIST_COLUMNS: &str = "id, user_id, name, playlist_type, created_at";

/// Namespace for the per-user advisory lock key
const USER_LOCK_NAMESPACE: &str = "daily_playlist";

/// Store backed by a PostgreSQL connection pool
#[derive(Clone)]
pub struct PgPlaylistStore {
    pool: PgPool,
}

impl PgPlaylistStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlaylistStore for PgPlaylistStore {
    type Tx = PgStoreTransaction;

    async fn begin(&self) -> WorkerResult<PgStoreTransaction> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| WorkerError::Transaction(format!("begin: {}", e)))?;
        Ok(PgStoreTransaction { tx })
    }
}

/// An open PostgreSQL transaction
pub struct PgStoreTransaction {
    tx: Transaction<'static, Postgres>,
}

/// Savepoint names are interpolated into SQL, so only identifiers are allowed
fn checked_savepoint(name: &str) -> WorkerResult<&str> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(name)
    } else {
        Err(WorkerError::Internal(format!("invalid savepoint name '{}'", name)))
    }
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn list_users(&mut self) -> WorkerResult<Vec<User>> {
        let sql = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(users)
    }

    async fn find_playlist(
        &mut self,
        user_id: UserId,
        kind: PlaylistKind,
    ) -> WorkerResult<Option<Playlist>> {
        let sql = format!(
            "SELECT {} FROM playlists WHERE user_id = $1 AND playlist_type = $2",
            PLAYLIST_COLUMNS
        );
        let playlist = sqlx::query_as::<_, Playlist>(&sql)
            .bind(user_id)
            .bind(kind)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(playlist)
    }

    async fn followee_ids(&mut self, follower_id: UserId) -> WorkerResult<Vec<UserId>> {
        let ids = sqlx::query_scalar::<_, UserId>(
            "SELECT following_id FROM follows WHERE follower_id = $1 ORDER BY following_id",
        )
        .bind(follower_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(ids)
    }

    async fn songs_shared_in(
        &mut self,
        sharers: &[UserId],
        window: &ShareWindow,
    ) -> WorkerResult<Vec<Song>> {
        if sharers.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT {}
            FROM songs
            WHERE shared_by = ANY($1)
              AND shared_at >= $2
              AND shared_at <= $3
            ORDER BY id
            "#,
            SONG_COLUMNS
        );
        let songs = sqlx::query_as::<_, Song>(&sql)
            .bind(sharers)
            .bind(window.start)
            .bind(window.end)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(songs)
    }

    async fn lock_user(&mut self, user_id: UserId) -> WorkerResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("{}:{}", USER_LOCK_NAMESPACE, user_id))
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn create_playlist(&mut self, playlist: &NewPlaylist) -> WorkerResult<Playlist> {
        let sql = format!(
            r#"
            INSERT INTO playlists (user_id, name, playlist_type, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            PLAYLIST_COLUMNS
        );
        let created = sqlx::query_as::<_, Playlist>(&sql)
            .bind(playlist.user_id)
            .bind(&playlist.name)
            .bind(playlist.playlist_type)
            .bind(playlist.created_at)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(created)
    }

    async fn clear_playlist(&mut self, playlist_id: PlaylistId) -> WorkerResult<u64> {
        let result = sqlx::query("DELETE FROM playlist_songs WHERE playlist_id = $1")
            .bind(playlist_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn add_playlist_songs(
        &mut self,
        playlist_id: PlaylistId,
        song_ids: &[SongId],
    ) -> WorkerResult<()> {
        if song_ids.is_empty() {
            return Ok(());
        }

        // One round trip regardless of playlist size
        sqlx::query(
            "INSERT INTO playlist_songs (playlist_id, song_id) SELECT $1, UNNEST($2::bigint[])",
        )
        .bind(playlist_id)
        .bind(song_ids)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn savepoint(&mut self, name: &str) -> WorkerResult<()> {
        let sql = format!("SAVEPOINT {}", checked_savepoint(name)?);
        sqlx::query(&sql).execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn release_savepoint(&mut self, name: &str) -> WorkerResult<()> {
        let sql = format!("RELEASE SAVEPOINT {}", checked_savepoint(name)?);
        sqlx::query(&sql).execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn rollback_to_savepoint(&mut self, name: &str) -> WorkerResult<()> {
        let sql = format!("ROLLBACK TO SAVEPOINT {}", checked_savepoint(name)?);
        sqlx::query(&sql).execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn commit(self) -> WorkerResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| WorkerError::Transaction(format!("commit: {}", e)))
    }

    async fn rollback(self) -> WorkerResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| WorkerError::Transaction(format!("rollback: {}", e)))
    }
}

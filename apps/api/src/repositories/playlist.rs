//! Playlist repository
//!
//! Read access to a user's playlists and their members.

use sqlx::PgPool;

use super::utils::{PLAYLIST_COLUMNS, SONG_COLUMNS};
use crate::models::{Playlist, PlaylistId, PlaylistKind, Song, UserId};

/// Repository for playlist database operations
#[derive(Clone)]
pub struct PlaylistRepository {
    pool: PgPool,
}

impl PlaylistRepository {
    /// Create a new PlaylistRepository instance
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find the playlist of the given kind owned by a user
    ///
    /// Each user has at most one playlist per kind, enforced by a unique
    /// constraint on `(user_id, playlist_type)`.
    pub async fn find_by_user_and_kind(
        &self,
        user_id: UserId,
        kind: PlaylistKind,
    ) -> Result<Option<Playlist>, sqlx::Error> {
        let sql = format!(
            "SELECT {} FROM playlists WHERE user_id = $1 AND playlist_type = $2",
            PLAYLIST_COLUMNS
        );
        sqlx::query_as::<_, Playlist>(&sql)
            .bind(user_id)
            .bind(kind)
            .fetch_optional(&self.pool)
            .await
    }

    /// Get the songs in a playlist, ordered by song id
    pub async fn songs_in_playlist(
        &self,
        playlist_id: PlaylistId,
    ) -> Result<Vec<Song>, sqlx::Error> {
        let sql = format!(
            r#"SELECT {}
            FROM playlist_songs ps
            JOIN songs s ON s.id = ps.song_id
            WHERE ps.playlist_id = $1
            ORDER BY s.id ASC"#,
            SONG_COLUMNS
        );
        sqlx::query_as::<_, Song>(&sql)
            .bind(playlist_id)
            .fetch_all(&self.pool)
            .await
    }
}

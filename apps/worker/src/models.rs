//! Database models shared by the worker and the API
//!
//! Rows map one-to-one onto the `users`, `follows`, `songs` and `playlists`
//! tables. Every timestamp is a `DateTime<Utc>`; local-time arithmetic
//! happens only in [`crate::window`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub type UserId = i64;
pub type SongId = i64;
pub type PlaylistId = i64;

/// User account (credentials are never loaded by the worker)
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// Display name
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Directed follow edge: `follower_id` follows `following_id`
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Follow {
    pub follower_id: UserId,
    pub following_id: UserId,
    pub followed_at: DateTime<Utc>,
}

/// A shared track
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Song {
    pub id: SongId,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// External (Spotify) track page
    pub spotify_url: String,
    pub album_cover_url: Option<String>,
    /// External (Spotify) URI
    pub uri: Option<String>,
    /// User who shared the track
    pub shared_by: UserId,
    pub shared_at: DateTime<Utc>,
    /// Reaction counter, never negative
    pub reaction: i32,
}

/// Playlist type enum matching PostgreSQL `playlist_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "playlist_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PlaylistKind {
    /// Materialized by the daily playlist job, fully replaced every run
    Daily,
    /// Curated by the user
    My,
}

impl PlaylistKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::My => "my",
        }
    }
}

impl std::fmt::Display for PlaylistKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Playlist record from the playlists table
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Playlist {
    pub id: PlaylistId,
    pub user_id: UserId,
    pub name: String,
    pub playlist_type: PlaylistKind,
    pub created_at: DateTime<Utc>,
}

/// Values for inserting a playlist row
#[derive(Debug, Clone)]
pub struct NewPlaylist {
    pub user_id: UserId,
    pub name: String,
    pub playlist_type: PlaylistKind,
    pub created_at: DateTime<Utc>,
}

impl NewPlaylist {
    /// A daily playlist for `user_id`, created at `created_at`
    pub fn daily(user_id: UserId, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            name: name.into(),
            playlist_type: PlaylistKind::Daily,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_kind_strings() {
        assert_eq!(PlaylistKind::Daily.as_str(), "daily");
        assert_eq!(PlaylistKind::My.to_string(), "my");
        assert_eq!(
            serde_json::to_string(&PlaylistKind::Daily).unwrap(),
            "\"daily\""
        );
    }

    #[test]
    fn test_new_daily_playlist() {
        let now = Utc::now();
        let new = NewPlaylist::daily(7, "Today's Playlist", now);
        assert_eq!(new.user_id, 7);
        assert_eq!(new.playlist_type, PlaylistKind::Daily);
        assert_eq!(new.created_at, now);
    }
}

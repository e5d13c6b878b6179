//! Playlist read service
//!
//! Looks up a user's daily or curated playlist together with its songs.

use tracing::instrument;

use crate::error::{ApiError, ApiResult};
use crate::models::{PlaylistKind, PlaylistWithSongs, UserId};
use crate::repositories::PlaylistRepository;

/// Service for reading playlists
#[derive(Clone)]
pub struct PlaylistService {
    playlist_repo: PlaylistRepository,
}

impl PlaylistService {
    pub fn new(playlist_repo: PlaylistRepository) -> Self {
        Self { playlist_repo }
    }

    /// Fetch the `kind` playlist of `user_id` with its current members
    ///
    /// Returns [`ApiError::NotFound`] when the user has no such playlist,
    /// which for daily playlists means the job has not run for them yet.
    #[instrument(skip(self))]
    pub async fn playlist_with_songs(
        &self,
        user_id: UserId,
        kind: PlaylistKind,
    ) -> ApiResult<PlaylistWithSongs> {
        let playlist = self
            .playlist_repo
            .find_by_user_and_kind(user_id, kind)
            .await?
            .ok_or_else(|| ApiError::not_found(resource_name(kind), user_id.to_string()))?;

        let songs = self.playlist_repo.songs_in_playlist(playlist.id).await?;

        Ok(PlaylistWithSongs { playlist, songs })
    }
}

fn resource_name(kind: PlaylistKind) -> &'static str {
    match kind {
        PlaylistKind::Daily => "daily playlist",
        PlaylistKind::My => "playlist",
    }
}

//! Playlist response models

use serde::Serialize;

use dailyjam_worker::models::{Playlist, Song};

/// A playlist together with its current members
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistWithSongs {
    #[serde(flatten)]
    pub playlist: Playlist,
    pub songs: Vec<Song>,
}

//! Shared SQL fragments for repositories

// ============================================================================
// SQL Column Constants
//
// SELECT column lists for each entity type, in the order the matching
// `FromRow` structs expect.
// ============================================================================

/// SQL columns for playlist queries
pub const PLAYLIST_COLUMNS: &str = "id, user_id, name, playlist_type, created_at";

/// SQL columns for song queries, qualified with the `s` alias
pub const SONG_COLUMNS: &str = r#"
    s.id, s.title, s.artist, s.album, s.spotify_url,
    s.album_cover_url, s.uri, s.shared_by, s.shared_at, s.reaction
"#;

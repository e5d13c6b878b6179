//! Job trigger response models

use serde::Serialize;

use dailyjam_worker::jobs::RunSummary;

/// Body of a committed daily playlist run
#[derive(Debug, Serialize)]
pub struct JobRunResponse {
    pub message: &'static str,
    pub summary: RunSummary,
}

/// Counters reported by a dry run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DryRunDetails {
    pub total_users_processed: usize,
    pub playlists_created: usize,
    pub shared_songs_processed: usize,
    pub unique_songs_processed: usize,
}

impl From<&RunSummary> for DryRunDetails {
    fn from(summary: &RunSummary) -> Self {
        Self {
            total_users_processed: summary.processed_users.len(),
            playlists_created: summary.created_playlists.len(),
            shared_songs_processed: summary.shared_songs,
            unique_songs_processed: summary.unique_songs,
        }
    }
}

/// Body of a dry run
#[derive(Debug, Serialize)]
pub struct DryRunResponse {
    pub message: &'static str,
    pub details: DryRunDetails,
}

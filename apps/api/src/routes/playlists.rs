//! Daily playlist HTTP route handlers
//!
//! - `POST /playlists/today` - recompute every daily playlist now
//! - `POST /playlists/today/test` - dry run, nothing is written
//! - `GET /playlists/today/:user_id` - a user's daily playlist with songs
//! - `GET /playlists/my/:user_id` - a user's curated playlist with songs
//!
//! The triggers run the job synchronously and answer once it has finished.
//! A trigger that arrives while a run is in progress gets 409 Conflict.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

use crate::error::{ApiError, ApiResult};
use crate::models::{DryRunResponse, JobRunResponse, PlaylistKind, PlaylistWithSongs, UserId};
use crate::services::PlaylistService;
use dailyjam_worker::jobs::{DailyPlaylistJob, RunMode};
use dailyjam_worker::scheduler::Clock;
use dailyjam_worker::store::PlaylistStore;

const RECREATED_MESSAGE: &str = "Daily playlists recreated successfully.";
const DRY_RUN_MESSAGE: &str = "Daily playlists recreated successfully for testing.";

/// State for the job trigger handlers
pub struct JobState<S> {
    pub job: Arc<DailyPlaylistJob<S>>,
    pub clock: Arc<dyn Clock>,
}

impl<S> JobState<S> {
    pub fn new(job: Arc<DailyPlaylistJob<S>>, clock: Arc<dyn Clock>) -> Self {
        Self { job, clock }
    }
}

// Derived Clone would require `S: Clone`
impl<S> Clone for JobState<S> {
    fn clone(&self) -> Self {
        Self {
            job: Arc::clone(&self.job),
            clock: Arc::clone(&self.clock),
        }
    }
}

/// State for the playlist read handlers
#[derive(Clone)]
pub struct PlaylistState {
    pub playlist_service: PlaylistService,
}

/// Routes that trigger the daily playlist job
pub fn playlist_jobs_router<S>(state: JobState<S>) -> Router
where
    S: PlaylistStore + 'static,
{
    Router::new()
        .route("/playlists/today", post(recreate_daily_playlists::<S>))
        .route("/playlists/today/test", post(test_daily_playlists::<S>))
        .with_state(state)
}

/// Routes that read playlists
pub fn playlists_router(state: PlaylistState) -> Router {
    Router::new()
        .route("/playlists/today/:user_id", get(get_daily_playlist))
        .route("/playlists/my/:user_id", get(get_my_playlist))
        .with_state(state)
}

async fn recreate_daily_playlists<S>(
    State(state): State<JobState<S>>,
) -> ApiResult<Json<JobRunResponse>>
where
    S: PlaylistStore + 'static,
{
    let summary = state.job.run(state.clock.now(), RunMode::Commit).await?;

    Ok(Json(JobRunResponse {
        message: RECREATED_MESSAGE,
        summary,
    }))
}

async fn test_daily_playlists<S>(
    State(state): State<JobState<S>>,
) -> ApiResult<Json<DryRunResponse>>
where
    S: PlaylistStore + 'static,
{
    let summary = state.job.run(state.clock.now(), RunMode::DryRun).await?;

    Ok(Json(DryRunResponse {
        message: DRY_RUN_MESSAGE,
        details: (&summary).into(),
    }))
}

async fn get_daily_playlist(
    State(state): State<PlaylistState>,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<PlaylistWithSongs>> {
    get_playlist(&state, user_id, PlaylistKind::Daily).await
}

async fn get_my_playlist(
    State(state): State<PlaylistState>,
    Path(user_id): Path<UserId>,
) -> ApiResult<Json<PlaylistWithSongs>> {
    get_playlist(&state, user_id, PlaylistKind::My).await
}

async fn get_playlist(
    state: &PlaylistState,
    user_id: UserId,
    kind: PlaylistKind,
) -> ApiResult<Json<PlaylistWithSongs>> {
    validate_user_id(user_id)?;
    let playlist = state
        .playlist_service
        .playlist_with_songs(user_id, kind)
        .await?;
    Ok(Json(playlist))
}

fn validate_user_id(user_id: UserId) -> ApiResult<()> {
    if user_id <= 0 {
        return Err(ApiError::ValidationError(format!(
            "user id must be positive, got {}",
            user_id
        )));
    }
    Ok(())
}

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dailyjam_api::build_cors_layer;
use dailyjam_api::config::Config;
use dailyjam_api::repositories::{ChartRepository, PlaylistRepository};
use dailyjam_api::routes::{
    charts_router, health_router, playlist_jobs_router, playlists_router, ChartState, HealthState,
    JobState, PlaylistState,
};
use dailyjam_api::services::{ChartService, HealthService, PlaylistService};
use dailyjam_worker::jobs::{DailyPlaylistJob, DailyPlaylistSettings};
use dailyjam_worker::scheduler::{Clock, SystemClock};
use dailyjam_worker::store::PgPlaylistStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dailyjam_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    tracing::info!("Starting Daily Jam API server on port {}", config.port);

    let database = config.database();
    tracing::info!(database = %database.redacted_url(), "Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(database.max_connections)
        .min_connections(database.min_connections)
        .acquire_timeout(database.acquire_timeout())
        .idle_timeout(database.idle_timeout())
        .connect(&database.url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Database connection established");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations completed successfully");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let settings = DailyPlaylistSettings::from_schedule(config.schedule())?;
    tracing::info!(
        anchor = %settings.anchor,
        playlist_name = %settings.playlist_name,
        "Daily playlist job configured"
    );
    // Chart periods start in the same zone the playlist window is anchored in
    let zone = settings.anchor.zone();
    let job = Arc::new(DailyPlaylistJob::new(
        PgPlaylistStore::new(pool.clone()),
        settings,
    ));

    let health_state = HealthState::new(HealthService::new(pool.clone()));
    let job_state = JobState::new(job, clock.clone());
    let playlist_state = PlaylistState {
        playlist_service: PlaylistService::new(PlaylistRepository::new(pool.clone())),
    };
    let chart_state = ChartState {
        chart_service: ChartService::new(ChartRepository::new(pool.clone()), zone),
        clock,
    };

    let cors_layer = build_cors_layer(&config);

    let app = Router::new()
        .route("/", get(root))
        // Nested health routes: /health, /health/live, /health/ready
        .nest("/health", health_router(health_state))
        // /playlists/today, /playlists/today/test
        .merge(playlist_jobs_router(job_state))
        // /playlists/today/:user_id, /playlists/my/:user_id
        .merge(playlists_router(playlist_state))
        // /charts/:period
        .merge(charts_router(chart_state))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    tracing::info!("Daily Jam API stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}

async fn root() -> &'static str {
    "Welcome to Daily Jam - today's songs from the people you follow"
}

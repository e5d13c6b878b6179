use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dailyjam_worker::config::Config;
use dailyjam_worker::jobs::{DailyPlaylistJob, RunMode};
use dailyjam_worker::scheduler::{Clock, JobRunner, SystemClock};
use dailyjam_worker::store::PgPlaylistStore;

#[derive(Parser)]
#[command(name = "dailyjam-worker")]
#[command(about = "Daily Jam playlist recompute worker", long_about = None)]
struct Cli {
    /// Run the daily playlist job once and exit instead of scheduling it
    #[arg(long)]
    once: bool,

    /// Roll back all changes and print the summary (implies --once)
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dailyjam_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing::info!(
        environment = %config.environment(),
        database = %config.database().redacted_url(),
        "Starting Daily Jam worker"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.database().max_connections)
        .min_connections(config.database().min_connections)
        .acquire_timeout(config.database().acquire_timeout())
        .idle_timeout(config.database().idle_timeout())
        .connect(&config.database().url)
        .await
        .context("Failed to connect to database")?;

    let settings = config.daily_playlist_settings()?;
    let job = Arc::new(DailyPlaylistJob::new(PgPlaylistStore::new(pool.clone()), settings));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    if cli.once || cli.dry_run {
        let mode = if cli.dry_run {
            RunMode::DryRun
        } else {
            RunMode::Commit
        };
        let summary = job.run(clock.now(), mode).await?;
        println!("{}", serde_json::to_string_pretty(&summary)?);
        pool.close().await;
        return Ok(());
    }

    let mut runner = JobRunner::new(clock);
    runner.register(job, config.run_time()?);
    runner.start();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    runner.stop().await;
    pool.close().await;

    Ok(())
}

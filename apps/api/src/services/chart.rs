//! Share charts
//!
//! Ranks the most shared tracks of the current day, week, month or year in
//! the reference zone.

use chrono::{DateTime, FixedOffset, Utc};
use tracing::instrument;

use crate::error::ApiResult;
use crate::models::{ChartEntry, ChartRow};
use crate::repositories::ChartRepository;
use dailyjam_worker::window::ChartPeriod;

/// Number of entries in a chart
pub const CHART_SIZE: i64 = 10;

/// Service computing share charts
#[derive(Clone)]
pub struct ChartService {
    chart_repo: ChartRepository,
    zone: FixedOffset,
}

impl ChartService {
    /// Create a chart service whose periods start in `zone`
    pub fn new(chart_repo: ChartRepository, zone: FixedOffset) -> Self {
        Self { chart_repo, zone }
    }

    /// The chart for `period` as of `now`
    #[instrument(skip(self, period), fields(period = %period))]
    pub async fn chart(
        &self,
        period: ChartPeriod,
        now: DateTime<Utc>,
    ) -> ApiResult<Vec<ChartEntry>> {
        let window = period.window(now, self.zone);
        let rows = self.chart_repo.top_shared(&window, CHART_SIZE).await?;

        tracing::debug!(
            start = %window.start,
            end = %window.end,
            entries = rows.len(),
            "Chart computed"
        );

        Ok(rank_entries(rows))
    }
}

/// Assign ranks 1..N to rows already in chart order
pub fn rank_entries(rows: Vec<ChartRow>) -> Vec<ChartEntry> {
    rows.into_iter()
        .zip(1u32..)
        .map(|(row, rank)| ChartEntry {
            rank,
            title: row.title,
            artist: row.artist,
            uri: row.uri,
            album_cover_url: row.album_cover_url,
            share_count: row.share_count,
        })
        .collect()
}

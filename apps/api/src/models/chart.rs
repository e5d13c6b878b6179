//! Chart models

use serde::Serialize;
use sqlx::FromRow;

/// One aggregated group as returned by the chart query
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ChartRow {
    pub title: String,
    pub artist: String,
    pub uri: Option<String>,
    pub album_cover_url: Option<String>,
    pub share_count: i64,
}

/// A ranked chart position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartEntry {
    /// 1-based position in the chart
    pub rank: u32,
    pub title: String,
    pub artist: String,
    pub uri: Option<String>,
    pub album_cover_url: Option<String>,
    pub share_count: i64,
}

//! Chart repository
//!
//! Aggregates song shares into per-track counts for a time window.

use sqlx::PgPool;

use crate::models::ChartRow;
use dailyjam_worker::window::ShareWindow;

/// Repository for chart aggregation queries
#[derive(Clone)]
pub struct ChartRepository {
    pool: PgPool,
}

impl ChartRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Most shared tracks within `window`, at most `limit` rows
    ///
    /// A track is the `(title, artist, uri, album_cover_url)` tuple; two
    /// shares of the same Spotify track by different users count together.
    /// Ties on the count are broken by title and then artist so that the
    /// result is stable between calls.
    pub async fn top_shared(
        &self,
        window: &ShareWindow,
        limit: i64,
    ) -> Result<Vec<ChartRow>, sqlx::Error> {
        sqlx::query_as::<_, ChartRow>(
            r#"
            SELECT
                title, artist, uri, album_cover_url,
                COUNT(*) AS share_count
            FROM songs
            WHERE shared_at >= $1 AND shared_at <= $2
            GROUP BY title, artist, uri, album_cover_url
            ORDER BY share_count DESC, title ASC, artist ASC
            LIMIT $3
            "#,
        )
        .bind(window.start)
        .bind(window.end)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}

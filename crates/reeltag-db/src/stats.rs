//! Dashboard aggregation queries.

use serde::Serialize;
use sqlx::{Pool, Postgres, Row};

use reeltag_core::defaults::{TOP_TAGS_LIMIT, VIDEO_COMPLETED_SEGMENTS, VIDEO_STARTED_SEGMENTS};
use reeltag_core::{Error, Result};

/// One entry of the most-used tags list.
#[derive(Debug, Clone, Serialize)]
pub struct TopTag {
    pub name: String,
    pub segment_count: i64,
}

/// Aggregate numbers for the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    /// Live segments across all videos.
    pub segments_created: i64,

    /// Videos with at least one live segment.
    pub videos_started: i64,

    /// Videos with enough live segments to count as fully annotated.
    pub videos_completed: i64,

    /// Sum of live segment durations, in hours.
    pub hours_processed: f64,

    /// Sum of view counters over live segments.
    pub total_views: i64,

    /// Most-used tags by live segment count.
    pub top_tags: Vec<TopTag>,
}

/// Read-only dashboard statistics over the segment and tag tables.
pub struct PgStatsRepository {
    pool: Pool<Postgres>,
}

impl PgStatsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn dashboard(&self) -> Result<DashboardStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS segments_created,
                COALESCE(SUM(end_sec - start_sec) / 3600.0, 0)::DOUBLE PRECISION AS hours_processed,
                COALESCE(SUM(views), 0)::BIGINT AS total_views
            FROM segment
            WHERE deleted_at IS NULL
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        let segments_created: i64 = row.get("segments_created");
        let hours_processed: f64 = row.get("hours_processed");
        let total_views: i64 = row.get("total_views");

        let (videos_started, videos_completed) = self.video_progress().await?;

        let top_rows = sqlx::query(
            "SELECT name, segment_count FROM tag \
             WHERE segment_count > 0 \
             ORDER BY segment_count DESC, name \
             LIMIT $1",
        )
        .bind(TOP_TAGS_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let top_tags = top_rows
            .into_iter()
            .map(|r| TopTag {
                name: r.get("name"),
                segment_count: r.get("segment_count"),
            })
            .collect();

        Ok(DashboardStats {
            segments_created,
            videos_started,
            videos_completed,
            hours_processed,
            total_views,
            top_tags,
        })
    }

    async fn video_progress(&self) -> Result<(i64, i64)> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE n >= $1) AS started,
                COUNT(*) FILTER (WHERE n >= $2) AS completed
            FROM (
                SELECT video_id, COUNT(*) AS n
                FROM segment
                WHERE deleted_at IS NULL
                GROUP BY video_id
            ) per_video
            "#,
        )
        .bind(VIDEO_STARTED_SEGMENTS)
        .bind(VIDEO_COMPLETED_SEGMENTS)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok((row.get("started"), row.get("completed")))
    }
}

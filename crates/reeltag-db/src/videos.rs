//! Video repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use reeltag_core::{Error, Result, Video, VideoStore};

/// PostgreSQL implementation of [`VideoStore`].
pub struct PgVideoStore {
    pool: Pool<Postgres>,
}

impl PgVideoStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Register a video by its external platform id. Idempotent; returns
    /// the existing row when the id is already known.
    pub async fn register(&self, yt_id: &str, title: &str, duration: f64) -> Result<Video> {
        let row = sqlx::query(
            r#"
            INSERT INTO video (id, yt_id, title, duration, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (yt_id) DO UPDATE SET title = EXCLUDED.title
            RETURNING id, yt_id, title, duration, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(yt_id)
        .bind(title)
        .bind(duration)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(video_from_row(&row))
    }
}

fn video_from_row(row: &sqlx::postgres::PgRow) -> Video {
    Video {
        id: row.get("id"),
        yt_id: row.get("yt_id"),
        title: row.get("title"),
        duration: row.get("duration"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl VideoStore for PgVideoStore {
    async fn find_by_yt_id(&self, yt_id: &str) -> Result<Option<Video>> {
        let row = sqlx::query(
            "SELECT id, yt_id, title, duration, created_at FROM video WHERE yt_id = $1",
        )
        .bind(yt_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(video_from_row))
    }
}

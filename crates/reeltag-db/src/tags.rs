//! Tag repository implementation.
//!
//! Tag names are canonical on arrival (the engine normalizes before
//! resolution); `name` carries a unique constraint.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use reeltag_core::{Error, Result, Tag, TagStore};

/// PostgreSQL implementation of [`TagStore`].
pub struct PgTagStore {
    pool: Pool<Postgres>,
}

impl PgTagStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn tag_from_row(row: &sqlx::postgres::PgRow) -> Tag {
    Tag {
        id: row.get("id"),
        name: row.get("name"),
        segment_count: row.get("segment_count"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl TagStore for PgTagStore {
    async fn find_by_names(&self, names: &[String]) -> Result<Vec<Tag>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT id, name, segment_count, created_at FROM tag WHERE name = ANY($1)",
        )
        .bind(names)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(tag_from_row).collect())
    }

    async fn create_many(&self, names: &[String]) -> Result<Vec<Tag>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut created = Vec::with_capacity(names.len());
        for name in names {
            // A concurrent call may have created the same name; the no-op
            // update turns the conflict into a plain RETURNING.
            let row = sqlx::query(
                r#"
                INSERT INTO tag (id, name, segment_count, created_at)
                VALUES ($1, $2, 0, $3)
                ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
                RETURNING id, name, segment_count, created_at
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(Error::Database)?;
            created.push(tag_from_row(&row));
        }
        tx.commit().await.map_err(Error::Database)?;

        Ok(created)
    }

    async fn live_segment_count(&self, tag_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM segment_tag st
            JOIN segment s ON s.id = st.segment_id AND s.deleted_at IS NULL
            WHERE st.tag_id = $1
            "#,
        )
        .bind(tag_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(count)
    }

    async fn set_segment_count(&self, tag_id: Uuid, count: i64) -> Result<()> {
        sqlx::query("UPDATE tag SET segment_count = $2 WHERE id = $1")
            .bind(tag_id)
            .bind(count)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn hard_delete(&self, tag_id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        sqlx::query("DELETE FROM segment_tag WHERE tag_id = $1")
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        sqlx::query("DELETE FROM tag WHERE id = $1")
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query(
            "SELECT id, name, segment_count, created_at FROM tag ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(tag_from_row).collect())
    }
}

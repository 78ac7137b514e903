//! Segment repository implementation.
//!
//! Segments are soft-deleted (`deleted_at` tombstone); tag links live in
//! `segment_tag` with one ranked row per (segment, tag) pair.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use reeltag_core::{
    CreateSegment, Error, Result, Segment, SegmentDocument, SegmentPatch, SegmentStore,
    SegmentWithTags, TagLink,
};

/// PostgreSQL implementation of [`SegmentStore`].
pub struct PgSegmentStore {
    pool: Pool<Postgres>,
}

impl PgSegmentStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// One page of index documents over all live segments, ordered by row
    /// id for a stable full-reindex walk.
    pub async fn index_documents_page(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<SegmentDocument>> {
        let rows = sqlx::query(&format!(
            "SELECT {SEGMENT_COLUMNS_QUALIFIED}, v.yt_id AS video_yt_id \
             FROM segment s JOIN video v ON v.id = s.video_id \
             WHERE s.deleted_at IS NULL \
             ORDER BY s.id \
             LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in &rows {
            let segment = segment_from_row(row);
            let yt_id: String = row.get("video_yt_id");
            let tags = self.links_for(segment.id).await?;
            docs.push(SegmentDocument::from_segment(
                &SegmentWithTags { segment, tags },
                &yt_id,
            ));
        }
        Ok(docs)
    }

    async fn links_for(&self, segment_id: Uuid) -> Result<Vec<TagLink>> {
        let rows = sqlx::query(
            "SELECT st.tag_id, t.name, st.rank \
             FROM segment_tag st JOIN tag t ON t.id = st.tag_id \
             WHERE st.segment_id = $1",
        )
        .bind(segment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| TagLink {
                tag_id: row.get("tag_id"),
                name: row.get("name"),
                rank: row.get("rank"),
            })
            .collect())
    }
}

const SEGMENT_COLUMNS: &str = "id, segment_id, video_id, owner, start_sec, end_sec, title, \
                               description, views, captions, created_at, updated_at, deleted_at";

const SEGMENT_COLUMNS_QUALIFIED: &str =
    "s.id, s.segment_id, s.video_id, s.owner, s.start_sec, s.end_sec, s.title, s.description, \
     s.views, s.captions, s.created_at, s.updated_at, s.deleted_at";

fn segment_from_row(row: &sqlx::postgres::PgRow) -> Segment {
    Segment {
        id: row.get("id"),
        segment_id: row.get("segment_id"),
        video_id: row.get("video_id"),
        owner: row.get("owner"),
        start: row.get("start_sec"),
        end: row.get("end_sec"),
        title: row.get("title"),
        description: row.get("description"),
        views: row.get("views"),
        captions: row.get("captions"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get::<Option<DateTime<Utc>>, _>("deleted_at"),
    }
}

#[async_trait]
impl SegmentStore for PgSegmentStore {
    async fn list_for_video(&self, video_id: Uuid) -> Result<Vec<SegmentWithTags>> {
        let rows = sqlx::query(&format!(
            "SELECT {SEGMENT_COLUMNS} FROM segment \
             WHERE video_id = $1 AND deleted_at IS NULL \
             ORDER BY start_sec"
        ))
        .bind(video_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let segments: Vec<Segment> = rows.iter().map(segment_from_row).collect();
        if segments.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = segments.iter().map(|s| s.id).collect();
        let link_rows = sqlx::query(
            r#"
            SELECT st.segment_id, st.tag_id, t.name, st.rank
            FROM segment_tag st
            JOIN tag t ON t.id = st.tag_id
            WHERE st.segment_id = ANY($1)
            ORDER BY st.rank DESC, t.name
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut links_by_segment: HashMap<Uuid, Vec<TagLink>> = HashMap::new();
        for row in link_rows {
            links_by_segment
                .entry(row.get("segment_id"))
                .or_default()
                .push(TagLink {
                    tag_id: row.get("tag_id"),
                    name: row.get("name"),
                    rank: row.get("rank"),
                });
        }

        Ok(segments
            .into_iter()
            .map(|segment| {
                let tags = links_by_segment.remove(&segment.id).unwrap_or_default();
                SegmentWithTags { segment, tags }
            })
            .collect())
    }

    async fn create_many(&self, payloads: Vec<CreateSegment>) -> Result<Vec<Segment>> {
        if payloads.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut created = Vec::with_capacity(payloads.len());
        for p in payloads {
            let row = sqlx::query(&format!(
                "INSERT INTO segment \
                 (id, segment_id, video_id, owner, start_sec, end_sec, title, description, \
                  views, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, $9) \
                 RETURNING {SEGMENT_COLUMNS}"
            ))
            .bind(Uuid::new_v4())
            .bind(&p.segment_id)
            .bind(p.video_id)
            .bind(p.owner)
            .bind(p.start)
            .bind(p.end)
            .bind(&p.title)
            .bind(&p.description)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(Error::Database)?;
            created.push(segment_from_row(&row));
        }
        tx.commit().await.map_err(Error::Database)?;

        Ok(created)
    }

    async fn update_one(&self, id: Uuid, patch: SegmentPatch) -> Result<()> {
        let result = sqlx::query(
            "UPDATE segment \
             SET start_sec = $2, end_sec = $3, title = $4, description = $5, updated_at = $6 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(patch.start)
        .bind(patch.end)
        .bind(&patch.title)
        .bind(&patch.description)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("segment {id}")));
        }
        Ok(())
    }

    async fn delete_many(&self, ids: &[Uuid], hard: bool) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        if hard {
            let mut tx = self.pool.begin().await.map_err(Error::Database)?;
            sqlx::query("DELETE FROM segment_tag WHERE segment_id = ANY($1)")
                .bind(ids)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
            sqlx::query("DELETE FROM segment WHERE id = ANY($1)")
                .bind(ids)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
            tx.commit().await.map_err(Error::Database)?;
        } else {
            sqlx::query("UPDATE segment SET deleted_at = $2 WHERE id = ANY($1) AND deleted_at IS NULL")
                .bind(ids)
                .bind(Utc::now())
                .execute(&self.pool)
                .await
                .map_err(Error::Database)?;
        }
        Ok(())
    }

    async fn add_tag_links(&self, segment_id: Uuid, links: &[(Uuid, i32)]) -> Result<()> {
        if links.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        for &(tag_id, rank) in links {
            // Replace semantics: an add for an already-linked tag lands as
            // a fresh row with the new rank.
            sqlx::query("DELETE FROM segment_tag WHERE segment_id = $1 AND tag_id = $2")
                .bind(segment_id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
            sqlx::query("INSERT INTO segment_tag (segment_id, tag_id, rank) VALUES ($1, $2, $3)")
                .bind(segment_id)
                .bind(tag_id)
                .bind(rank)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
        }
        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn remove_tag_links(&self, segment_id: Uuid, tag_ids: &[Uuid]) -> Result<()> {
        if tag_ids.is_empty() {
            return Ok(());
        }

        sqlx::query("DELETE FROM segment_tag WHERE segment_id = $1 AND tag_id = ANY($2)")
            .bind(segment_id)
            .bind(tag_ids)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn increment_views(&self, id: Uuid) -> Result<i64> {
        let views: Option<i64> = sqlx::query_scalar(
            "UPDATE segment SET views = views + 1 WHERE id = $1 AND deleted_at IS NULL RETURNING views",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        views.ok_or_else(|| Error::NotFound(format!("segment {id}")))
    }
}

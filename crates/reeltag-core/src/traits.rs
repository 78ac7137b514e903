//! Core traits for reeltag abstractions.
//!
//! These traits define the narrow interfaces the reconciliation engine
//! consumes, enabling pluggable backends and testability. The Postgres
//! implementations live in `reeltag-db`; the engine test suite runs
//! against in-memory implementations.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::search::SegmentDocument;

// =============================================================================
// VIDEO STORE
// =============================================================================

/// Read access to videos.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Look up a video by its external platform id.
    async fn find_by_yt_id(&self, yt_id: &str) -> Result<Option<Video>>;
}

// =============================================================================
// SEGMENT STORE
// =============================================================================

/// Store for segments and their tag links.
#[async_trait]
pub trait SegmentStore: Send + Sync {
    /// List the live (non-deleted) segments of a video with tag links
    /// embedded. This is the authoritative read the engine re-issues after
    /// every mutation phase.
    async fn list_for_video(&self, video_id: Uuid) -> Result<Vec<SegmentWithTags>>;

    /// Insert new segment rows in one batch. Returns the created rows.
    async fn create_many(&self, payloads: Vec<CreateSegment>) -> Result<Vec<Segment>>;

    /// Patch one existing segment row.
    async fn update_one(&self, id: Uuid, patch: SegmentPatch) -> Result<()>;

    /// Delete segment rows. Soft by default (tombstone); `hard` removes
    /// the rows and their tag links outright.
    async fn delete_many(&self, ids: &[Uuid], hard: bool) -> Result<()>;

    /// Add segment↔tag links for one segment, each with its rank.
    async fn add_tag_links(&self, segment_id: Uuid, links: &[(Uuid, i32)]) -> Result<()>;

    /// Remove the links between one segment and the given tags.
    async fn remove_tag_links(&self, segment_id: Uuid, tag_ids: &[Uuid]) -> Result<()>;

    /// Bump the view counter for a segment. Returns the new count.
    async fn increment_views(&self, id: Uuid) -> Result<i64>;
}

// =============================================================================
// TAG STORE
// =============================================================================

/// Store for tags and their derived counts.
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Fetch the tags whose canonical names are in `names`. Missing names
    /// are simply absent from the result.
    async fn find_by_names(&self, names: &[String]) -> Result<Vec<Tag>>;

    /// Create tags for the given canonical names in one batch.
    /// Returns the created rows.
    async fn create_many(&self, names: &[String]) -> Result<Vec<Tag>>;

    /// Count the live (non-deleted) segments currently linked to a tag.
    /// Reads current state; the orphan collector relies on this not being
    /// a stale snapshot.
    async fn live_segment_count(&self, tag_id: Uuid) -> Result<i64>;

    /// Persist a recomputed `segment_count`.
    async fn set_segment_count(&self, tag_id: Uuid, count: i64) -> Result<()>;

    /// Remove a tag entity outright (orphan collection).
    async fn hard_delete(&self, tag_id: Uuid) -> Result<()>;

    /// List all tags.
    async fn list(&self) -> Result<Vec<Tag>>;
}

// =============================================================================
// SEARCH INDEX
// =============================================================================

/// External full-text index holding a derived view of the segments.
///
/// All operations are best-effort from the engine's perspective: failures
/// are reported but must never fail a reconciliation call.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Upsert documents in one bulk request.
    async fn bulk_upsert(&self, docs: &[SegmentDocument]) -> Result<()>;

    /// Delete documents in one bulk request.
    async fn bulk_delete(&self, ids: &[Uuid]) -> Result<()>;
}

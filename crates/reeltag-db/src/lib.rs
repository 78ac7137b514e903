//! reeltag-db: PostgreSQL implementations of the reeltag store traits.
//!
//! Expected schema:
//!
//! - `video (id, yt_id UNIQUE, title, duration, created_at)`
//! - `segment (id, segment_id, video_id, owner, start_sec, end_sec, title,
//!   description, views, captions, created_at, updated_at, deleted_at)`
//! - `tag (id, name UNIQUE, segment_count, created_at)`
//! - `segment_tag (segment_id, tag_id, rank)`
//!
//! Deletion of segments is a `deleted_at` tombstone; every read filters on
//! `deleted_at IS NULL`. Tags and their links are hard-deleted.

pub mod locks;
pub mod pool;
pub mod segments;
pub mod stats;
pub mod tags;
pub mod videos;

pub use locks::{lock_video, try_lock_video, video_lock_key};
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use segments::PgSegmentStore;
pub use stats::{DashboardStats, PgStatsRepository, TopTag};
pub use tags::PgTagStore;
pub use videos::PgVideoStore;

#[cfg(test)]
mod tests;

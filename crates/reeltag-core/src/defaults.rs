//! Centralized default constants for the reeltag system.
//!
//! **This module is the single source of truth** for shared default values.
//! All crates should reference these constants instead of defining their own
//! magic numbers.

// =============================================================================
// TAG RANKS
// =============================================================================

/// Lowest allowed tag rank.
pub const RANK_MIN: i32 = 1;

/// Highest allowed tag rank.
pub const RANK_MAX: i32 = 11;

/// Rank assigned when the caller does not specify one.
pub const RANK_DEFAULT: i32 = 6;

/// Upper bound (inclusive) of the low-salience bucket used for indexing.
pub const RANK_LOW_MAX: i32 = 4;

/// Upper bound (inclusive) of the mid-salience bucket used for indexing.
pub const RANK_MID_MAX: i32 = 7;

// =============================================================================
// SEARCH INDEX SYNC
// =============================================================================

/// Maximum delivery attempts for one index sync batch.
pub const INDEX_SYNC_MAX_RETRIES: u32 = 3;

/// Base backoff between index sync retries, in milliseconds.
pub const INDEX_SYNC_BACKOFF_MS: u64 = 500;

/// Capacity of the channel between the engine and the sync worker.
pub const INDEX_SYNC_QUEUE_DEPTH: usize = 64;

/// Page size when walking all live segments for a full reindex.
pub const REINDEX_PAGE_SIZE: i64 = 500;

// =============================================================================
// PAGINATION
// =============================================================================

/// Default page size for list endpoints (tags, segments).
pub const PAGE_LIMIT: i64 = 50;

/// Default number of tag suggestions returned by similarity matching.
pub const TAG_MATCH_LIMIT: usize = 30;

// =============================================================================
// DASHBOARD STATS
// =============================================================================

/// A video counts as "started" once it has at least this many segments.
pub const VIDEO_STARTED_SEGMENTS: i64 = 1;

/// A video counts as "completed" once it has at least this many segments.
pub const VIDEO_COMPLETED_SEGMENTS: i64 = 3;

/// Number of entries in the "most used tags" dashboard list.
pub const TOP_TAGS_LIMIT: i64 = 10;

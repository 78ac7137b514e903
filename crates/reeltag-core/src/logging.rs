//! Structured logging schema and field name constants for reeltag.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events, reconciliation completions |
//! | DEBUG | Decision points, plan contents, config choices |
//! | TRACE | Per-item iteration (tag links, index documents) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "engine", "db", "search", "sync"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "reconcile", "update_associations", "bulk_upsert"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// External platform id of the video being reconciled.
pub const VIDEO_ID: &str = "video_id";

/// Client-generated segment id.
pub const SEGMENT_ID: &str = "segment_id";

/// Canonical tag name.
pub const TAG_NAME: &str = "tag_name";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Segments created by a reconciliation call.
pub const CREATED_COUNT: &str = "created_count";

/// Segments updated by a reconciliation call.
pub const UPDATED_COUNT: &str = "updated_count";

/// Segments deleted by a reconciliation call.
pub const DELETED_COUNT: &str = "deleted_count";

/// Tags whose counts were recomputed.
pub const TOUCHED_TAGS: &str = "touched_tags";

/// Tags hard-deleted as orphans.
pub const ORPHANED_TAGS: &str = "orphaned_tags";

/// Documents in an index sync batch.
pub const BATCH_SIZE: &str = "batch_size";

/// Delivery attempt number for an index sync batch.
pub const ATTEMPT: &str = "attempt";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

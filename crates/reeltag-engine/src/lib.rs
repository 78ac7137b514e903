//! reeltag-engine: segment/tag reconciliation.
//!
//! The engine takes a caller's complete desired segment state for one
//! video and converges the store to it. Pipeline per call:
//!
//! 1. validate and normalize the request ([`reeltag_core::normalize_tag`]),
//! 2. plan the create/update/delete partition ([`plan`]),
//! 3. authorize every planned mutation ([`authz`]),
//! 4. apply segment row mutations, then per-segment tag association
//!    updates ([`assoc`]),
//! 5. after the barrier, recompute tag aggregates and collect orphans
//!    ([`aggregate`]),
//! 6. hand the detached index synchronizer its batch ([`sync`]).
//!
//! Store and index access goes through the traits in [`reeltag_core`];
//! in-memory implementations for tests live in [`testing`].

pub mod aggregate;
pub mod assoc;
pub mod authz;
pub mod engine;
pub mod plan;
pub mod resolve;
pub mod sync;
pub mod testing;

pub use engine::{ReconcileEngine, ReconcileOutcome};
pub use plan::{plan_changes, PlannedUpdate, ReconcilePlan};
pub use sync::{spawn as spawn_index_sync, IndexSyncConfig, IndexSyncHandle, SyncBatch};

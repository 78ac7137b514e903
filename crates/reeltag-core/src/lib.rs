//! # reeltag-core
//!
//! Core types, traits, and abstractions for reeltag.
//!
//! This crate provides the foundational data structures and trait
//! definitions that the other reeltag crates depend on: the segment/tag
//! data model, the reconciliation request shape, the store and search
//! index traits, and the shared error type.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod search;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use normalize::normalize_tag;
pub use search::{SearchHit, SegmentDocument};
pub use traits::*;

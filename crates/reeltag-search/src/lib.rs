//! reeltag-search: Elasticsearch client and tag suggestions.
//!
//! [`EsClient`] implements [`reeltag_core::SearchIndex`] over the bulk
//! API and exposes the boosted multi-field segment search. [`suggest`]
//! ranks tags for typeahead without touching the cluster, and
//! [`reindex`] rebuilds the index from the store.

pub mod client;
pub mod reindex;
pub mod suggest;

pub use client::{EsClient, DEFAULT_ES_INDEX, DEFAULT_ES_URL};
pub use reindex::reindex_all;
pub use suggest::suggest_tags;

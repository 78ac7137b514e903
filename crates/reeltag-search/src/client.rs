//! Elasticsearch index client.
//!
//! Talks to the cluster over its bulk and search HTTP APIs. The engine
//! treats this backend as best-effort: the detached synchronizer retries
//! and ultimately drops failed batches, and a full reindex repairs drift.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, instrument};
use uuid::Uuid;

use reeltag_core::{Error, Result, SearchHit, SegmentDocument};

/// Default Elasticsearch endpoint.
pub const DEFAULT_ES_URL: &str = "http://localhost:9200";

/// Default index name for segment documents.
pub const DEFAULT_ES_INDEX: &str = "segments";

/// Request timeout in seconds.
pub const ES_TIMEOUT_SECS: u64 = 30;

/// Field boosts for the segment search query. Title dominates, then
/// high-salience tags, then description, then the lower tag buckets.
const SEARCH_FIELDS: [&str; 5] = [
    "title^5",
    "high_tags^4",
    "description^3",
    "mid_tags^2",
    "low_tags",
];

/// HTTP client for the segment index.
pub struct EsClient {
    client: Client,
    base_url: String,
    index: String,
}

impl EsClient {
    pub fn new(base_url: impl Into<String>, index: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(ES_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            index: index.into(),
        })
    }

    /// Create from `REELTAG_ES_URL` and `REELTAG_ES_INDEX`.
    pub fn from_env() -> Result<Self> {
        let base_url =
            std::env::var("REELTAG_ES_URL").unwrap_or_else(|_| DEFAULT_ES_URL.to_string());
        let index =
            std::env::var("REELTAG_ES_INDEX").unwrap_or_else(|_| DEFAULT_ES_INDEX.to_string());
        Self::new(base_url, index)
    }

    /// Full-text search over indexed segments.
    #[instrument(skip(self), fields(subsystem = "search", operation = "query"))]
    pub async fn search(&self, term: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let body = search_body(term, limit);
        let response: Value = self
            .client
            .post(format!("{}/{}/_search", self.base_url, self.index))
            .json(&body)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::IndexSync(format!("search failed: {e}")))?
            .json()
            .await?;

        let hits = response["hits"]["hits"]
            .as_array()
            .map(|hits| {
                hits.iter()
                    .filter_map(|hit| {
                        let id = hit["_id"].as_str()?.parse().ok()?;
                        let score = hit["_score"].as_f64().unwrap_or(0.0);
                        Some(SearchHit { id, score })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(hits)
    }

    async fn bulk(&self, body: String) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/_bulk", self.base_url))
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::IndexSync(format!("bulk request failed: {e}")))?;

        let result: Value = response.json().await?;
        if result["errors"].as_bool().unwrap_or(false) {
            return Err(Error::IndexSync(
                "bulk request reported item errors".to_string(),
            ));
        }
        Ok(())
    }
}

/// Build the newline-delimited body for a bulk upsert.
fn bulk_upsert_body(index: &str, docs: &[SegmentDocument]) -> Result<String> {
    let mut body = String::new();
    for doc in docs {
        let action = json!({ "update": { "_index": index, "_id": doc.id } });
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
        let payload = json!({ "doc": doc, "doc_as_upsert": true });
        body.push_str(&serde_json::to_string(&payload)?);
        body.push('\n');
    }
    Ok(body)
}

/// Build the newline-delimited body for a bulk delete.
fn bulk_delete_body(index: &str, ids: &[Uuid]) -> Result<String> {
    let mut body = String::new();
    for id in ids {
        let action = json!({ "delete": { "_index": index, "_id": id } });
        body.push_str(&serde_json::to_string(&action)?);
        body.push('\n');
    }
    Ok(body)
}

fn search_body(term: &str, limit: usize) -> Value {
    json!({
        "size": limit,
        "query": {
            "multi_match": {
                "query": term,
                "type": "most_fields",
                "fields": SEARCH_FIELDS,
            }
        }
    })
}

#[async_trait]
impl reeltag_core::SearchIndex for EsClient {
    async fn bulk_upsert(&self, docs: &[SegmentDocument]) -> Result<()> {
        if docs.is_empty() {
            return Ok(());
        }
        debug!(batch_size = docs.len(), "bulk upsert");
        self.bulk(bulk_upsert_body(&self.index, docs)?).await
    }

    async fn bulk_delete(&self, ids: &[Uuid]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        debug!(batch_size = ids.len(), "bulk delete");
        self.bulk(bulk_delete_body(&self.index, ids)?).await
    }
}

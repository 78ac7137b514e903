//! Detached search index synchronization.
//!
//! Index writes run on a background worker fed through a bounded channel.
//! The reconciliation path only enqueues; a full queue or a failing index
//! degrades search freshness but never fails or delays the store write.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reeltag_core::{defaults, SearchIndex, SegmentDocument};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Worker configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct IndexSyncConfig {
    /// Attempts per batch before giving up (`REELTAG_SYNC_MAX_RETRIES`).
    pub max_retries: u32,

    /// Base backoff between attempts in milliseconds
    /// (`REELTAG_SYNC_BACKOFF_MS`); doubles per attempt with jitter.
    pub backoff_ms: u64,

    /// Bounded queue depth (`REELTAG_SYNC_QUEUE_DEPTH`).
    pub queue_depth: usize,

    /// Disable enqueueing entirely (`REELTAG_SYNC_ENABLED=false`).
    pub enabled: bool,
}

impl Default for IndexSyncConfig {
    fn default() -> Self {
        Self {
            max_retries: defaults::INDEX_SYNC_MAX_RETRIES,
            backoff_ms: defaults::INDEX_SYNC_BACKOFF_MS,
            queue_depth: defaults::INDEX_SYNC_QUEUE_DEPTH,
            enabled: true,
        }
    }
}

impl IndexSyncConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_retries: env_parse("REELTAG_SYNC_MAX_RETRIES", defaults.max_retries),
            backoff_ms: env_parse("REELTAG_SYNC_BACKOFF_MS", defaults.backoff_ms),
            queue_depth: env_parse("REELTAG_SYNC_QUEUE_DEPTH", defaults.queue_depth),
            enabled: env_parse("REELTAG_SYNC_ENABLED", defaults.enabled),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// One unit of index work produced by a reconciliation call.
#[derive(Debug, Clone, Default)]
pub struct SyncBatch {
    /// Documents to create or overwrite.
    pub upserts: Vec<SegmentDocument>,

    /// Segment ids to drop from the index.
    pub deletes: Vec<Uuid>,
}

impl SyncBatch {
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty()
    }
}

/// Cheap cloneable handle for enqueueing batches.
#[derive(Clone)]
pub struct IndexSyncHandle {
    tx: mpsc::Sender<SyncBatch>,
}

impl IndexSyncHandle {
    /// Enqueue a batch without blocking.
    ///
    /// A full queue drops the batch with a warning; the next full reindex
    /// repairs whatever was lost.
    pub fn enqueue(&self, batch: SyncBatch) {
        if batch.is_empty() {
            return;
        }
        let size = batch.upserts.len() + batch.deletes.len();
        if let Err(err) = self.tx.try_send(batch) {
            warn!(batch_size = size, error = %err, "index sync queue full, dropping batch");
        }
    }
}

/// Spawn the index sync worker.
///
/// The worker drains the channel and applies each batch with bounded
/// retries and exponential backoff. Failures are logged and swallowed;
/// nothing downstream of this worker can fail a reconciliation call.
pub fn spawn(index: Arc<dyn SearchIndex>, config: IndexSyncConfig) -> (IndexSyncHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<SyncBatch>(config.queue_depth.max(1));
    let handle = IndexSyncHandle { tx };

    let worker = tokio::spawn(async move {
        info!(
            max_retries = config.max_retries,
            queue_depth = config.queue_depth,
            "index sync worker started"
        );
        while let Some(batch) = rx.recv().await {
            apply_batch(index.as_ref(), &config, batch).await;
        }
        info!("index sync worker stopped");
    });

    (handle, worker)
}

async fn apply_batch(index: &dyn SearchIndex, config: &IndexSyncConfig, batch: SyncBatch) {
    let size = batch.upserts.len() + batch.deletes.len();
    for attempt in 1..=config.max_retries.max(1) {
        match apply_once(index, &batch).await {
            Ok(()) => {
                debug!(batch_size = size, attempt, "index batch applied");
                return;
            }
            Err(err) if attempt < config.max_retries.max(1) => {
                let delay = backoff_with_jitter(config.backoff_ms, attempt);
                warn!(attempt, error = %err, delay_ms = delay.as_millis() as u64, "index batch failed, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                warn!(batch_size = size, error = %err, "index batch dropped after retries");
            }
        }
    }
}

async fn apply_once(index: &dyn SearchIndex, batch: &SyncBatch) -> reeltag_core::Result<()> {
    if !batch.upserts.is_empty() {
        index.bulk_upsert(&batch.upserts).await?;
    }
    if !batch.deletes.is_empty() {
        index.bulk_delete(&batch.deletes).await?;
    }
    Ok(())
}

fn backoff_with_jitter(base_ms: u64, attempt: u32) -> Duration {
    let exp = base_ms.saturating_mul(1u64 << (attempt - 1).min(16));
    let jitter = rand::thread_rng().gen_range(0..=exp / 4 + 1);
    Duration::from_millis(exp + jitter)
}

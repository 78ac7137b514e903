//! End-to-end reconciliation scenarios against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reeltag_engine::testing::{MemoryStore, RecordingIndex};
use reeltag_engine::{spawn_index_sync, IndexSyncConfig, ReconcileEngine};
use reeltag_core::{
    Error, Identity, ReconcileRequest, Result, SegmentSpec, Tag, TagAssignment, TagStore,
};
use uuid::Uuid;

fn engine(store: &MemoryStore) -> ReconcileEngine {
    ReconcileEngine::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
    )
}

fn spec(segment_id: &str, tags: Vec<TagAssignment>) -> SegmentSpec {
    SegmentSpec {
        segment_id: segment_id.to_string(),
        start: 0.0,
        end: 5.0,
        title: format!("Segment {segment_id}"),
        description: None,
        pristine: false,
        tags,
    }
}

fn tag(name: &str, rank: i32) -> TagAssignment {
    TagAssignment {
        rank,
        tag_name: name.to_string(),
    }
}

fn request(video_id: &str, segments: Vec<SegmentSpec>) -> ReconcileRequest {
    ReconcileRequest {
        video_id: video_id.to_string(),
        segments,
    }
}

#[tokio::test]
async fn test_create_segment_with_tag_sets_count() {
    let store = MemoryStore::new();
    store.insert_video("yt1");
    let me = Identity::contributor(Uuid::new_v4());

    let outcome = engine(&store)
        .reconcile(&me, request("yt1", vec![spec("s1", vec![tag("#Love", 9)])]))
        .await
        .expect("reconcile");

    assert_eq!(outcome.created, 1);
    assert_eq!(outcome.segments.len(), 1);
    let seg = &outcome.segments[0];
    assert_eq!(seg.segment.owner, me.user_id);
    assert_eq!(seg.tags.len(), 1);
    assert_eq!(seg.tags[0].name, "love");
    assert_eq!(seg.tags[0].rank, 9);

    let tags = store.list_tags();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].segment_count, 1);
}

#[tokio::test]
async fn test_empty_desired_state_deletes_and_orphans() {
    let store = MemoryStore::new();
    store.insert_video("yt1");
    let me = Identity::contributor(Uuid::new_v4());
    let eng = engine(&store);

    eng.reconcile(&me, request("yt1", vec![spec("s1", vec![tag("love", 6)])]))
        .await
        .expect("create");

    let outcome = eng
        .reconcile(&me, request("yt1", vec![]))
        .await
        .expect("delete");

    assert_eq!(outcome.deleted, 1);
    assert!(outcome.segments.is_empty());
    assert_eq!(outcome.orphaned_tags, 1);
    assert!(store.list_tags().is_empty());

    // Soft delete: the row survives as a tombstone.
    let rows = store.all_segments();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].is_live());
}

#[tokio::test]
async fn test_shared_tag_survives_single_segment_delete() {
    let store = MemoryStore::new();
    store.insert_video("yt1");
    let me = Identity::contributor(Uuid::new_v4());
    let eng = engine(&store);

    eng.reconcile(
        &me,
        request(
            "yt1",
            vec![
                spec("s1", vec![tag("love", 6)]),
                spec("s2", vec![tag("love", 9)]),
            ],
        ),
    )
    .await
    .expect("create");
    assert_eq!(store.list_tags()[0].segment_count, 2);

    eng.reconcile(&me, request("yt1", vec![spec("s1", vec![tag("love", 6)])]))
        .await
        .expect("drop s2");

    let tags = store.list_tags();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].segment_count, 1);
}

#[tokio::test]
async fn test_foreign_segment_mutation_is_forbidden() {
    let store = MemoryStore::new();
    let video = store.insert_video("yt1");
    let other = Uuid::new_v4();
    store.insert_segment(video.id, other, "s1", 0.0, 5.0);
    let me = Identity::contributor(Uuid::new_v4());

    let err = engine(&store)
        .reconcile(&me, request("yt1", vec![spec("s1", vec![])]))
        .await
        .expect_err("should reject");
    assert!(matches!(err, Error::Forbidden(_)));

    // Nothing was written.
    let rows = store.all_segments();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].is_live());
}

#[tokio::test]
async fn test_pristine_foreign_segment_allows_own_addition() {
    let store = MemoryStore::new();
    let video = store.insert_video("yt1");
    let other = Uuid::new_v4();
    let foreign = store.insert_segment(video.id, other, "s1", 0.0, 5.0);
    let me = Identity::contributor(Uuid::new_v4());

    let mut untouched = spec("s1", vec![]);
    untouched.pristine = true;
    let outcome = engine(&store)
        .reconcile(
            &me,
            request("yt1", vec![untouched, spec("s2", vec![tag("fear", 3)])]),
        )
        .await
        .expect("reconcile");

    assert_eq!(outcome.created, 1);
    assert_eq!(outcome.segments.len(), 2);

    // The foreign segment is byte-for-byte untouched.
    let settled = store.segment_with_tags(foreign.id).expect("segment");
    assert_eq!(settled.segment.owner, other);
    assert_eq!(settled.segment.title, foreign.title);
    assert!(settled.tags.is_empty());
}

#[tokio::test]
async fn test_rank_change_replaces_link() {
    let store = MemoryStore::new();
    store.insert_video("yt1");
    let me = Identity::contributor(Uuid::new_v4());
    let eng = engine(&store);

    eng.reconcile(&me, request("yt1", vec![spec("s1", vec![tag("love", 6)])]))
        .await
        .expect("create");

    let outcome = eng
        .reconcile(&me, request("yt1", vec![spec("s1", vec![tag("love", 11)])]))
        .await
        .expect("rank change");

    let seg = &outcome.segments[0];
    assert_eq!(seg.tags.len(), 1);
    assert_eq!(seg.tags[0].rank, 11);

    // Same tag entity, same count.
    let tags = store.list_tags();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].segment_count, 1);
}

#[tokio::test]
async fn test_tag_swap_updates_both_counts() {
    let store = MemoryStore::new();
    store.insert_video("yt1");
    let me = Identity::contributor(Uuid::new_v4());
    let eng = engine(&store);

    eng.reconcile(
        &me,
        request(
            "yt1",
            vec![
                spec("s1", vec![tag("love", 6)]),
                spec("s2", vec![tag("love", 6)]),
            ],
        ),
    )
    .await
    .expect("create");

    // s1 swaps love for fear; love stays on s2.
    eng.reconcile(
        &me,
        request(
            "yt1",
            vec![
                spec("s1", vec![tag("fear", 3)]),
                spec("s2", vec![tag("love", 6)]),
            ],
        ),
    )
    .await
    .expect("swap");

    let mut tags = store.list_tags();
    tags.sort_by(|a, b| a.name.cmp(&b.name));
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0].name, "fear");
    assert_eq!(tags[0].segment_count, 1);
    assert_eq!(tags[1].name, "love");
    assert_eq!(tags[1].segment_count, 1);
}

#[tokio::test]
async fn test_duplicate_raw_tags_collapse_to_one_link() {
    let store = MemoryStore::new();
    store.insert_video("yt1");
    let me = Identity::contributor(Uuid::new_v4());

    let outcome = engine(&store)
        .reconcile(
            &me,
            request(
                "yt1",
                vec![spec("s1", vec![tag("#Love", 6), tag("love", 9), tag("LOVE", 2)])],
            ),
        )
        .await
        .expect("reconcile");

    let seg = &outcome.segments[0];
    assert_eq!(seg.tags.len(), 1);
    assert_eq!(seg.tags[0].name, "love");
    // First occurrence wins.
    assert_eq!(seg.tags[0].rank, 6);
    assert_eq!(store.list_tags().len(), 1);
}

#[tokio::test]
async fn test_admin_mutates_foreign_segment() {
    let store = MemoryStore::new();
    let video = store.insert_video("yt1");
    store.insert_segment(video.id, Uuid::new_v4(), "s1", 0.0, 5.0);
    let admin = Identity::admin(Uuid::new_v4());

    let mut changed = spec("s1", vec![]);
    changed.title = "retitled".to_string();
    let outcome = engine(&store)
        .reconcile(&admin, request("yt1", vec![changed]))
        .await
        .expect("reconcile");

    assert_eq!(outcome.updated, 1);
    assert_eq!(outcome.segments[0].segment.title, "retitled");
}

#[tokio::test]
async fn test_index_receives_mutations_and_deletes() {
    let store = MemoryStore::new();
    store.insert_video("yt1");
    let me = Identity::contributor(Uuid::new_v4());

    let index = Arc::new(RecordingIndex::new());
    let (handle, _worker) = spawn_index_sync(
        index.clone(),
        IndexSyncConfig {
            max_retries: 1,
            backoff_ms: 1,
            queue_depth: 8,
            enabled: true,
        },
    );
    let eng = engine(&store).with_index_sync(handle);

    eng.reconcile(&me, request("yt1", vec![spec("s1", vec![tag("love", 9)])]))
        .await
        .expect("create");
    eng.reconcile(&me, request("yt1", vec![]))
        .await
        .expect("delete");

    // The worker is detached; give it a moment to drain.
    for _ in 0..100 {
        if !index.deleted().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let upserts = index.upserted();
    assert_eq!(upserts.len(), 1);
    assert_eq!(upserts[0].video_yt_id, "yt1");
    assert_eq!(upserts[0].high_tags, vec!["love".to_string()]);
    assert_eq!(index.deleted().len(), 1);
}

/// Tag store that fails when counts are persisted, for error-path tests.
struct BrokenCountTags {
    inner: MemoryStore,
}

#[async_trait]
impl TagStore for BrokenCountTags {
    async fn find_by_names(&self, names: &[String]) -> Result<Vec<Tag>> {
        self.inner.find_by_names(names).await
    }

    async fn create_many(&self, names: &[String]) -> Result<Vec<Tag>> {
        self.inner.create_many(names).await
    }

    async fn live_segment_count(&self, tag_id: Uuid) -> Result<i64> {
        self.inner.live_segment_count(tag_id).await
    }

    async fn set_segment_count(&self, _tag_id: Uuid, _count: i64) -> Result<()> {
        Err(Error::Internal("count write refused".to_string()))
    }

    async fn hard_delete(&self, tag_id: Uuid) -> Result<()> {
        self.inner.hard_delete(tag_id).await
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        self.inner.list().await
    }
}

#[tokio::test]
async fn test_store_failure_carries_phase_context() {
    let store = MemoryStore::new();
    store.insert_video("yt1");
    let me = Identity::contributor(Uuid::new_v4());

    let eng = ReconcileEngine::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(BrokenCountTags {
            inner: store.clone(),
        }),
    );

    let err = eng
        .reconcile(&me, request("yt1", vec![spec("s1", vec![tag("love", 6)])]))
        .await
        .expect_err("count write should fail");

    assert!(matches!(err, Error::Context { .. }));
    let msg = err.to_string();
    assert!(
        msg.starts_with("aggregate maintenance:"),
        "missing phase context: {msg}"
    );
    assert!(msg.contains("count write refused"), "lost source: {msg}");
}

#[tokio::test]
async fn test_noop_call_settles_cleanly() {
    let store = MemoryStore::new();
    store.insert_video("yt1");
    let me = Identity::contributor(Uuid::new_v4());
    let eng = engine(&store);

    eng.reconcile(&me, request("yt1", vec![spec("s1", vec![tag("love", 6)])]))
        .await
        .expect("create");
    let outcome = eng
        .reconcile(&me, request("yt1", vec![spec("s1", vec![tag("love", 6)])]))
        .await
        .expect("noop");

    assert_eq!(outcome.created, 0);
    assert_eq!(outcome.updated, 1);
    assert_eq!(outcome.deleted, 0);
    assert_eq!(store.list_tags()[0].segment_count, 1);
}

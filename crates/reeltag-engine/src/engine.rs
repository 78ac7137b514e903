//! The reconciliation engine.
//!
//! One call takes a caller's complete desired segment state for a video
//! and converges the store to it: plan, authorize, mutate, then settle
//! tag associations, aggregates, and orphans before handing the index
//! synchronizer its batch. The call is all-or-nothing up to the point of
//! authorization; after that, phases run in order with a barrier between
//! per-segment work and cross-segment maintenance.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;
use reeltag_core::{
    CreateSegment, Error, Identity, ReconcileRequest, Result, SegmentDocument, SegmentPatch,
    SegmentStore, SegmentWithTags, TagStore, VideoStore,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::aggregate::{collect_orphans, maintain_counts};
use crate::assoc::update_associations;
use crate::authz::authorize_plan;
use crate::plan::plan_changes;
use crate::sync::{IndexSyncHandle, SyncBatch};

/// Result of one reconciliation call.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// The video's live segments after the call settled.
    pub segments: Vec<SegmentWithTags>,

    pub created: usize,
    pub updated: usize,
    pub deleted: usize,

    /// Tags hard-deleted by the orphan collector.
    pub orphaned_tags: usize,
}

/// Converges persisted segment state to a caller's desired state.
pub struct ReconcileEngine {
    videos: Arc<dyn VideoStore>,
    segments: Arc<dyn SegmentStore>,
    tags: Arc<dyn TagStore>,
    sync: Option<IndexSyncHandle>,
}

impl ReconcileEngine {
    pub fn new(
        videos: Arc<dyn VideoStore>,
        segments: Arc<dyn SegmentStore>,
        tags: Arc<dyn TagStore>,
    ) -> Self {
        Self {
            videos,
            segments,
            tags,
            sync: None,
        }
    }

    /// Attach an index synchronizer handle. Without one, index updates are
    /// skipped entirely (the next full reindex catches up).
    pub fn with_index_sync(mut self, sync: IndexSyncHandle) -> Self {
        self.sync = Some(sync);
        self
    }

    /// Reconcile one video's segments to the desired state.
    #[instrument(skip_all, fields(subsystem = "engine", operation = "reconcile", video_id = %request.video_id))]
    pub async fn reconcile(
        &self,
        identity: &Identity,
        request: ReconcileRequest,
    ) -> Result<ReconcileOutcome> {
        let started = Instant::now();
        request.validate()?;

        let video = self
            .videos
            .find_by_yt_id(&request.video_id)
            .await
            .map_err(|e| e.context("loading video"))?
            .ok_or_else(|| Error::VideoNotFound(request.video_id.clone()))?;

        let persisted = self
            .segments
            .list_for_video(video.id)
            .await
            .map_err(|e| e.context("reading persisted segments"))?;
        let plan = plan_changes(&request.segments, &persisted);
        authorize_plan(identity, &plan)?;

        // Phase 1: segment rows. The three sets are disjoint, so the
        // mutations can run concurrently.
        let delete_ids: Vec<Uuid> = plan.deleted.iter().map(|s| s.segment.id).collect();
        let creates: Vec<CreateSegment> = plan
            .created
            .iter()
            .map(|spec| CreateSegment {
                segment_id: spec.segment_id.clone(),
                video_id: video.id,
                owner: identity.user_id,
                start: spec.start,
                end: spec.end,
                title: spec.title.clone(),
                description: spec.description.clone(),
            })
            .collect();
        let updates = plan
            .updated
            .iter()
            .map(|u| {
                let patch = SegmentPatch {
                    start: u.spec.start,
                    end: u.spec.end,
                    title: u.spec.title.clone(),
                    description: u.spec.description.clone(),
                };
                async move {
                    self.segments.update_one(u.id, patch).await.map_err(|e| {
                        e.context(format!("updating segment '{}'", u.spec.segment_id))
                    })
                }
            })
            .collect::<Vec<_>>();

        futures::try_join!(
            async {
                self.segments
                    .delete_many(&delete_ids, false)
                    .await
                    .map_err(|e| e.context("deleting segments"))
            },
            async {
                self.segments
                    .create_many(creates)
                    .await
                    .map_err(|e| e.context("creating segments"))
            },
            try_join_all(updates),
        )?;

        // Phase 2: per-segment association updates, against the settled
        // rows. Pristine entries carry desired tags too, but the caller
        // marked them untouchable, so only created and updated segments
        // get theirs applied.
        let settled = self
            .segments
            .list_for_video(video.id)
            .await
            .map_err(|e| e.context("reading settled segments"))?;
        let settled_by_id: HashMap<&str, &SegmentWithTags> = settled
            .iter()
            .map(|s| (s.segment.segment_id.as_str(), s))
            .collect();

        let mut assoc_work = Vec::new();
        for spec in plan.created.iter().chain(plan.updated.iter().map(|u| &u.spec)) {
            match settled_by_id.get(spec.segment_id.as_str()) {
                Some(segment) => {
                    assoc_work.push(async move {
                        update_associations(
                            self.segments.as_ref(),
                            self.tags.as_ref(),
                            segment,
                            &spec.tags,
                        )
                        .await
                        .map_err(|e| {
                            e.context(format!(
                                "updating associations for segment '{}'",
                                spec.segment_id
                            ))
                        })
                    });
                }
                None => {
                    return Err(Error::Internal(format!(
                        "segment '{}' missing after mutation",
                        spec.segment_id
                    )))
                }
            }
        }
        let outcomes = try_join_all(assoc_work).await?;

        // Phase 3 (post-barrier): aggregates and orphans, once per call.
        // Deleted segments contribute their links too: their tags lose a
        // live segment and may be left orphaned.
        let mut touched_names = BTreeSet::new();
        let mut removed_tag_ids = HashSet::new();
        for outcome in &outcomes {
            touched_names.extend(outcome.touched_names.iter().cloned());
            removed_tag_ids.extend(outcome.removed_tag_ids.iter().copied());
        }
        for deleted in &plan.deleted {
            for link in &deleted.tags {
                if !link.name.is_empty() {
                    touched_names.insert(link.name.clone());
                }
                removed_tag_ids.insert(link.tag_id);
            }
        }

        maintain_counts(self.tags.as_ref(), &touched_names)
            .await
            .map_err(|e| e.context("aggregate maintenance"))?;
        let removed: Vec<Uuid> = removed_tag_ids.into_iter().collect();
        let orphaned = collect_orphans(self.tags.as_ref(), &removed)
            .await
            .map_err(|e| e.context("orphan collection"))?;

        // Phase 4: final read and detached index handoff.
        let final_segments = self
            .segments
            .list_for_video(video.id)
            .await
            .map_err(|e| e.context("reading settled segments"))?;
        self.enqueue_index_batch(&plan, &final_segments, &delete_ids, &video.yt_id);

        info!(
            created_count = plan.created.len(),
            updated_count = plan.updated.len(),
            deleted_count = plan.deleted.len(),
            touched_tags = touched_names.len(),
            orphaned_tags = orphaned.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "reconciliation settled"
        );

        Ok(ReconcileOutcome {
            segments: final_segments,
            created: plan.created.len(),
            updated: plan.updated.len(),
            deleted: plan.deleted.len(),
            orphaned_tags: orphaned.len(),
        })
    }

    /// Bump a segment's view counter. Returns the new count.
    pub async fn record_view(&self, segment_id: Uuid) -> Result<i64> {
        self.segments.increment_views(segment_id).await
    }

    fn enqueue_index_batch(
        &self,
        plan: &crate::plan::ReconcilePlan,
        final_segments: &[SegmentWithTags],
        deleted_ids: &[Uuid],
        video_yt_id: &str,
    ) {
        let Some(sync) = &self.sync else {
            return;
        };

        let mutated: HashSet<&str> = plan
            .created
            .iter()
            .map(|s| s.segment_id.as_str())
            .chain(plan.updated.iter().map(|u| u.spec.segment_id.as_str()))
            .collect();

        let upserts: Vec<SegmentDocument> = final_segments
            .iter()
            .filter(|s| mutated.contains(s.segment.segment_id.as_str()))
            .map(|s| SegmentDocument::from_segment(s, video_yt_id))
            .collect();

        if upserts.len() < mutated.len() {
            warn!(
                expected = mutated.len(),
                actual = upserts.len(),
                "some mutated segments vanished before index handoff"
            );
        }

        sync.enqueue(SyncBatch {
            upserts,
            deletes: deleted_ids.to_vec(),
        });
    }
}

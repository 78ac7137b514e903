//! In-memory store and index implementations for tests.
//!
//! Always compiled so integration tests and downstream crates can exercise
//! the engine without Postgres or a search cluster. Not for production use.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use reeltag_core::{
    CreateSegment, Error, Result, SearchIndex, Segment, SegmentDocument, SegmentPatch,
    SegmentStore, SegmentWithTags, Tag, TagLink, TagStore, Video, VideoStore,
};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
struct LinkRow {
    segment: Uuid,
    tag: Uuid,
    rank: i32,
}

#[derive(Default)]
struct State {
    videos: Vec<Video>,
    segments: Vec<Segment>,
    tags: Vec<Tag>,
    links: Vec<LinkRow>,
}

/// In-memory implementation of [`VideoStore`], [`SegmentStore`], and
/// [`TagStore`] backed by one mutex-guarded state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("store lock poisoned")
    }

    pub fn insert_video(&self, yt_id: &str) -> Video {
        let video = Video {
            id: Uuid::new_v4(),
            yt_id: yt_id.to_string(),
            title: format!("Video {yt_id}"),
            duration: 600.0,
            created_at: Utc::now(),
        };
        self.lock().videos.push(video.clone());
        video
    }

    pub fn insert_segment(
        &self,
        video_id: Uuid,
        owner: Uuid,
        segment_id: &str,
        start: f64,
        end: f64,
    ) -> Segment {
        let now = Utc::now();
        let segment = Segment {
            id: Uuid::new_v4(),
            segment_id: segment_id.to_string(),
            video_id,
            owner,
            start,
            end,
            title: format!("Segment {segment_id}"),
            description: None,
            views: 0,
            captions: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.lock().segments.push(segment.clone());
        segment
    }

    pub fn insert_tag(&self, name: &str) -> Tag {
        let tag = Tag {
            id: Uuid::new_v4(),
            name: name.to_string(),
            segment_count: 0,
            created_at: Utc::now(),
        };
        self.lock().tags.push(tag.clone());
        tag
    }

    pub fn link_tag(&self, segment: Uuid, tag: Uuid, rank: i32) {
        self.lock().links.push(LinkRow { segment, tag, rank });
    }

    pub fn soft_delete(&self, segment_id: Uuid) {
        let mut state = self.lock();
        if let Some(s) = state.segments.iter_mut().find(|s| s.id == segment_id) {
            s.deleted_at = Some(Utc::now());
        }
    }

    pub fn segment_with_tags(&self, segment_id: Uuid) -> Option<SegmentWithTags> {
        let state = self.lock();
        let segment = state.segments.iter().find(|s| s.id == segment_id)?.clone();
        Some(with_tags(&state, segment))
    }

    pub fn list_tags(&self) -> Vec<Tag> {
        self.lock().tags.clone()
    }

    /// All segment rows including tombstoned ones.
    pub fn all_segments(&self) -> Vec<Segment> {
        self.lock().segments.clone()
    }
}

fn with_tags(state: &State, segment: Segment) -> SegmentWithTags {
    let tags = state
        .links
        .iter()
        .filter(|l| l.segment == segment.id)
        .map(|l| TagLink {
            tag_id: l.tag,
            name: state
                .tags
                .iter()
                .find(|t| t.id == l.tag)
                .map(|t| t.name.clone())
                .unwrap_or_default(),
            rank: l.rank,
        })
        .collect();
    SegmentWithTags { segment, tags }
}

#[async_trait]
impl VideoStore for MemoryStore {
    async fn find_by_yt_id(&self, yt_id: &str) -> Result<Option<Video>> {
        Ok(self.lock().videos.iter().find(|v| v.yt_id == yt_id).cloned())
    }
}

#[async_trait]
impl SegmentStore for MemoryStore {
    async fn list_for_video(&self, video_id: Uuid) -> Result<Vec<SegmentWithTags>> {
        let state = self.lock();
        let mut rows: Vec<SegmentWithTags> = state
            .segments
            .iter()
            .filter(|s| s.video_id == video_id && s.is_live())
            .cloned()
            .map(|s| with_tags(&state, s))
            .collect();
        rows.sort_by(|a, b| a.segment.start.total_cmp(&b.segment.start));
        Ok(rows)
    }

    async fn create_many(&self, payloads: Vec<CreateSegment>) -> Result<Vec<Segment>> {
        let now = Utc::now();
        let mut state = self.lock();
        let mut created = Vec::with_capacity(payloads.len());
        for p in payloads {
            let segment = Segment {
                id: Uuid::new_v4(),
                segment_id: p.segment_id,
                video_id: p.video_id,
                owner: p.owner,
                start: p.start,
                end: p.end,
                title: p.title,
                description: p.description,
                views: 0,
                captions: None,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };
            state.segments.push(segment.clone());
            created.push(segment);
        }
        Ok(created)
    }

    async fn update_one(&self, id: Uuid, patch: SegmentPatch) -> Result<()> {
        let mut state = self.lock();
        let segment = state
            .segments
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::NotFound(format!("segment {id}")))?;
        segment.start = patch.start;
        segment.end = patch.end;
        segment.title = patch.title;
        segment.description = patch.description;
        segment.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_many(&self, ids: &[Uuid], hard: bool) -> Result<()> {
        let mut state = self.lock();
        if hard {
            state.segments.retain(|s| !ids.contains(&s.id));
            state.links.retain(|l| !ids.contains(&l.segment));
        } else {
            let now = Utc::now();
            for s in state.segments.iter_mut().filter(|s| ids.contains(&s.id)) {
                s.deleted_at = Some(now);
            }
        }
        Ok(())
    }

    async fn add_tag_links(&self, segment_id: Uuid, links: &[(Uuid, i32)]) -> Result<()> {
        let mut state = self.lock();
        for &(tag, rank) in links {
            // Replace semantics for the (segment, tag) pair: an add for an
            // already-linked tag lands as a fresh link with the new rank.
            state
                .links
                .retain(|l| !(l.segment == segment_id && l.tag == tag));
            state.links.push(LinkRow {
                segment: segment_id,
                tag,
                rank,
            });
        }
        Ok(())
    }

    async fn remove_tag_links(&self, segment_id: Uuid, tag_ids: &[Uuid]) -> Result<()> {
        self.lock()
            .links
            .retain(|l| !(l.segment == segment_id && tag_ids.contains(&l.tag)));
        Ok(())
    }

    async fn increment_views(&self, id: Uuid) -> Result<i64> {
        let mut state = self.lock();
        let segment = state
            .segments
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::NotFound(format!("segment {id}")))?;
        segment.views += 1;
        Ok(segment.views)
    }
}

#[async_trait]
impl TagStore for MemoryStore {
    async fn find_by_names(&self, names: &[String]) -> Result<Vec<Tag>> {
        Ok(self
            .lock()
            .tags
            .iter()
            .filter(|t| names.contains(&t.name))
            .cloned()
            .collect())
    }

    async fn create_many(&self, names: &[String]) -> Result<Vec<Tag>> {
        let now = Utc::now();
        let mut state = self.lock();
        let mut created = Vec::with_capacity(names.len());
        for name in names {
            let tag = Tag {
                id: Uuid::new_v4(),
                name: name.clone(),
                segment_count: 0,
                created_at: now,
            };
            state.tags.push(tag.clone());
            created.push(tag);
        }
        Ok(created)
    }

    async fn live_segment_count(&self, tag_id: Uuid) -> Result<i64> {
        let state = self.lock();
        let count = state
            .links
            .iter()
            .filter(|l| l.tag == tag_id)
            .filter(|l| {
                state
                    .segments
                    .iter()
                    .any(|s| s.id == l.segment && s.is_live())
            })
            .count();
        Ok(count as i64)
    }

    async fn set_segment_count(&self, tag_id: Uuid, count: i64) -> Result<()> {
        let mut state = self.lock();
        let tag = state
            .tags
            .iter_mut()
            .find(|t| t.id == tag_id)
            .ok_or_else(|| Error::NotFound(format!("tag {tag_id}")))?;
        tag.segment_count = count;
        Ok(())
    }

    async fn hard_delete(&self, tag_id: Uuid) -> Result<()> {
        let mut state = self.lock();
        state.tags.retain(|t| t.id != tag_id);
        state.links.retain(|l| l.tag != tag_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        Ok(self.lock().tags.clone())
    }
}

#[derive(Default)]
struct IndexState {
    upserted: Vec<SegmentDocument>,
    deleted: Vec<Uuid>,
    fail_remaining: u32,
    attempts: u32,
}

/// [`SearchIndex`] double that records every call and can inject failures.
#[derive(Default)]
pub struct RecordingIndex {
    state: Mutex<IndexState>,
}

impl RecordingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, IndexState> {
        self.state.lock().expect("index lock poisoned")
    }

    /// Make the next `n` calls fail.
    pub fn fail_next(&self, n: u32) {
        self.lock().fail_remaining = n;
    }

    /// Total calls received, failed ones included.
    pub fn attempts(&self) -> u32 {
        self.lock().attempts
    }

    pub fn upserted(&self) -> Vec<SegmentDocument> {
        self.lock().upserted.clone()
    }

    pub fn deleted(&self) -> Vec<Uuid> {
        self.lock().deleted.clone()
    }

    fn check_failure(state: &mut IndexState) -> Result<()> {
        state.attempts += 1;
        if state.fail_remaining > 0 {
            state.fail_remaining -= 1;
            return Err(Error::IndexSync("injected index failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for RecordingIndex {
    async fn bulk_upsert(&self, docs: &[SegmentDocument]) -> Result<()> {
        let mut state = self.lock();
        Self::check_failure(&mut state)?;
        state.upserted.extend(docs.iter().cloned());
        Ok(())
    }

    async fn bulk_delete(&self, ids: &[Uuid]) -> Result<()> {
        let mut state = self.lock();
        Self::check_failure(&mut state)?;
        state.deleted.extend_from_slice(ids);
        Ok(())
    }
}

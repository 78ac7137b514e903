//! Post-barrier maintenance: tag aggregates and orphan collection.
//!
//! Both passes run once per reconciliation call, after every segment's
//! association updates have settled. Counts are recomputed from the live
//! link rows rather than adjusted incrementally, so a tag touched by
//! several segments in one call still ends up with the true count.

use std::collections::{BTreeSet, HashSet};

use reeltag_core::{Result, TagStore};
use tracing::{debug, instrument};
use uuid::Uuid;

/// Recompute `segment_count` for every touched tag.
///
/// The touched set is the union of pre-call and post-call tag names
/// across all mutated segments. Names that no longer resolve to a tag
/// (already collected as orphans by a concurrent call) are skipped.
#[instrument(skip_all, fields(touched_tags = touched_names.len()))]
pub async fn maintain_counts(tags: &dyn TagStore, touched_names: &BTreeSet<String>) -> Result<()> {
    if touched_names.is_empty() {
        return Ok(());
    }

    let names: Vec<String> = touched_names.iter().cloned().collect();
    let touched = tags.find_by_names(&names).await?;

    for tag in touched {
        let count = tags.live_segment_count(tag.id).await?;
        if count != tag.segment_count {
            debug!(tag_name = %tag.name, old = tag.segment_count, new = count, "segment count updated");
            tags.set_segment_count(tag.id, count).await?;
        }
    }

    Ok(())
}

/// Hard-delete tags left with zero live segments.
///
/// Only tags whose links were removed in this call are candidates. The
/// live count is rechecked at delete time, so a tag re-linked by another
/// segment between removal and collection survives. Returns the ids that
/// were actually deleted.
#[instrument(skip_all, fields(candidates = removed_tag_ids.len()))]
pub async fn collect_orphans(tags: &dyn TagStore, removed_tag_ids: &[Uuid]) -> Result<Vec<Uuid>> {
    let candidates: HashSet<Uuid> = removed_tag_ids.iter().copied().collect();
    let mut orphaned = Vec::new();

    for tag_id in candidates {
        if tags.live_segment_count(tag_id).await? == 0 {
            tags.hard_delete(tag_id).await?;
            orphaned.push(tag_id);
        }
    }

    if !orphaned.is_empty() {
        debug!(orphaned_tags = orphaned.len(), "orphaned tags deleted");
    }

    Ok(orphaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    #[tokio::test]
    async fn test_counts_recomputed_from_live_links() {
        let store = MemoryStore::new();
        let video = store.insert_video("yt1");
        let owner = Uuid::new_v4();
        let s1 = store.insert_segment(video.id, owner, "s1", 0.0, 5.0);
        let s2 = store.insert_segment(video.id, owner, "s2", 5.0, 10.0);
        let love = store.insert_tag("love");
        store.link_tag(s1.id, love.id, 6);
        store.link_tag(s2.id, love.id, 9);

        let touched: BTreeSet<String> = ["love".to_string()].into_iter().collect();
        maintain_counts(&store, &touched).await.expect("maintain");

        let tags = store.list_tags();
        assert_eq!(tags[0].segment_count, 2);
    }

    #[tokio::test]
    async fn test_soft_deleted_segments_do_not_count() {
        let store = MemoryStore::new();
        let video = store.insert_video("yt1");
        let owner = Uuid::new_v4();
        let s1 = store.insert_segment(video.id, owner, "s1", 0.0, 5.0);
        let s2 = store.insert_segment(video.id, owner, "s2", 5.0, 10.0);
        let love = store.insert_tag("love");
        store.link_tag(s1.id, love.id, 6);
        store.link_tag(s2.id, love.id, 9);
        store.soft_delete(s2.id);

        let touched: BTreeSet<String> = ["love".to_string()].into_iter().collect();
        maintain_counts(&store, &touched).await.expect("maintain");

        assert_eq!(store.list_tags()[0].segment_count, 1);
    }

    #[tokio::test]
    async fn test_vanished_touched_name_is_skipped() {
        let store = MemoryStore::new();
        let touched: BTreeSet<String> = ["gone".to_string()].into_iter().collect();
        maintain_counts(&store, &touched).await.expect("maintain");
    }

    #[tokio::test]
    async fn test_orphan_with_no_live_links_is_deleted() {
        let store = MemoryStore::new();
        let love = store.insert_tag("love");

        let orphaned = collect_orphans(&store, &[love.id]).await.expect("collect");
        assert_eq!(orphaned, vec![love.id]);
        assert!(store.list_tags().is_empty());
    }

    #[tokio::test]
    async fn test_relinked_tag_survives_collection() {
        let store = MemoryStore::new();
        let video = store.insert_video("yt1");
        let seg = store.insert_segment(video.id, Uuid::new_v4(), "s1", 0.0, 5.0);
        let love = store.insert_tag("love");
        store.link_tag(seg.id, love.id, 6);

        // The tag was removed from some segment in this call but is still
        // linked elsewhere, so it must not be collected.
        let orphaned = collect_orphans(&store, &[love.id]).await.expect("collect");
        assert!(orphaned.is_empty());
        assert_eq!(store.list_tags().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_candidates_are_collapsed() {
        let store = MemoryStore::new();
        let love = store.insert_tag("love");

        let orphaned = collect_orphans(&store, &[love.id, love.id])
            .await
            .expect("collect");
        assert_eq!(orphaned.len(), 1);
    }
}

//! Association updates for one segment's tag links.
//!
//! A rank change on an existing tag is a remove + add of the link, never
//! an in-place update; the store replaces the link for the (segment, tag)
//! pair when an add arrives for a pair that already exists.

use std::collections::{BTreeSet, HashSet};

use reeltag_core::{
    normalize_tag, Error, Result, SegmentStore, SegmentWithTags, TagAssignment, TagLink, TagStore,
};
use tracing::{instrument, trace};
use uuid::Uuid;

use crate::resolve::TagResolver;

/// The link-level diff for one segment.
#[derive(Debug, Clone, Default)]
pub struct AssocDelta {
    /// Desired assignments (canonical names) with no exact `(name, rank)`
    /// match among the old links.
    pub to_add: Vec<TagAssignment>,

    /// Old links whose name is absent from the desired set.
    pub to_remove: Vec<TagLink>,
}

/// What one association update touched, fed to the aggregate maintainer
/// and orphan collector after the per-call barrier.
#[derive(Debug, Clone, Default)]
pub struct AssocOutcome {
    /// Union of pre-call and post-call tag names for this segment.
    pub touched_names: BTreeSet<String>,

    /// Tags whose link to this segment was removed.
    pub removed_tag_ids: Vec<Uuid>,
}

/// Compute the link diff between persisted links and desired assignments.
///
/// Desired names are normalized first; entries that normalize to nothing
/// are discarded, as are old links with a blank name (dangling tag
/// references). Duplicate desired names keep their first occurrence.
pub fn diff_tag_assignments(old: &[TagLink], desired: &[TagAssignment]) -> AssocDelta {
    let old: Vec<&TagLink> = old.iter().filter(|l| !l.name.is_empty()).collect();

    let mut seen = HashSet::new();
    let desired: Vec<TagAssignment> = desired
        .iter()
        .map(|t| TagAssignment {
            rank: t.rank,
            tag_name: normalize_tag(&t.tag_name),
        })
        .filter(|t| !t.tag_name.is_empty() && seen.insert(t.tag_name.clone()))
        .collect();

    let desired_names: HashSet<&str> = desired.iter().map(|t| t.tag_name.as_str()).collect();
    let old_pairs: HashSet<(&str, i32)> = old.iter().map(|l| (l.name.as_str(), l.rank)).collect();

    let to_remove = old
        .iter()
        .filter(|l| !desired_names.contains(l.name.as_str()))
        .map(|l| (*l).clone())
        .collect();

    let to_add = desired
        .into_iter()
        .filter(|t| !old_pairs.contains(&(t.tag_name.as_str(), t.rank)))
        .collect();

    AssocDelta { to_add, to_remove }
}

/// Apply the desired tag assignments to one segment.
///
/// Resolves missing tags, then applies adds and removes as two distinct
/// bulk operations. Does not touch `segment_count`; that runs once per
/// call after every segment's associations have settled.
#[instrument(skip_all, fields(segment_id = %segment.segment.segment_id))]
pub async fn update_associations(
    segments: &dyn SegmentStore,
    tags: &dyn TagStore,
    segment: &SegmentWithTags,
    desired: &[TagAssignment],
) -> Result<AssocOutcome> {
    let delta = diff_tag_assignments(&segment.tags, desired);

    let mut touched_names: BTreeSet<String> = segment
        .tags
        .iter()
        .filter(|l| !l.name.is_empty())
        .map(|l| l.name.clone())
        .collect();
    for t in desired {
        let name = normalize_tag(&t.tag_name);
        if !name.is_empty() {
            touched_names.insert(name);
        }
    }

    if !delta.to_add.is_empty() {
        let names: Vec<String> = delta.to_add.iter().map(|t| t.tag_name.clone()).collect();
        let resolved = TagResolver::new(tags).resolve(&names).await?;
        let mut links = Vec::with_capacity(delta.to_add.len());
        for t in &delta.to_add {
            let tag = resolved.get(&t.tag_name).ok_or_else(|| {
                Error::Internal(format!("tag '{}' missing after resolution", t.tag_name))
            })?;
            links.push((tag.id, t.rank));
        }
        trace!(count = links.len(), "adding tag links");
        segments
            .add_tag_links(segment.segment.id, &links)
            .await?;
    }

    let removed_tag_ids: Vec<Uuid> = delta.to_remove.iter().map(|l| l.tag_id).collect();
    if !removed_tag_ids.is_empty() {
        trace!(count = removed_tag_ids.len(), "removing tag links");
        segments
            .remove_tag_links(segment.segment.id, &removed_tag_ids)
            .await?;
    }

    Ok(AssocOutcome {
        touched_names,
        removed_tag_ids,
    })
}

//! Diff planning: partition desired vs persisted segments.
//!
//! The plan joins the client's desired state with the persisted state on
//! `segment_id` and produces three disjoint sets. Pristine entries are an
//! explicit "do not touch" marker from the caller, not an absence signal:
//! they are excluded from create/update planning even when their content
//! differs from the persisted record.

use std::collections::{HashMap, HashSet};

use reeltag_core::{SegmentSpec, SegmentWithTags};
use uuid::Uuid;

/// An update mapped to its persisted row, carrying the owner so the
/// authorization filter can check it without another store read.
#[derive(Debug, Clone)]
pub struct PlannedUpdate {
    /// Persisted row id (the payload has no store id).
    pub id: Uuid,

    /// Owner of the persisted segment.
    pub owner: Uuid,

    pub spec: SegmentSpec,
}

/// The create/update/delete partition for one reconciliation call.
#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
    /// Desired segments with no persisted counterpart, not pristine.
    pub created: Vec<SegmentSpec>,

    /// Desired segments with a persisted counterpart, not pristine.
    pub updated: Vec<PlannedUpdate>,

    /// Persisted segments absent from the desired set.
    pub deleted: Vec<SegmentWithTags>,
}

impl ReconcilePlan {
    /// Whether the plan contains no mutations at all.
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// Compute the mutation plan for one call.
///
/// Joins on `segment_id`:
/// - `deleted`: persisted but not desired,
/// - `created`: desired but not persisted, and explicitly not pristine,
/// - `updated`: present on both sides and not pristine.
pub fn plan_changes(desired: &[SegmentSpec], persisted: &[SegmentWithTags]) -> ReconcilePlan {
    let persisted_by_id: HashMap<&str, &SegmentWithTags> = persisted
        .iter()
        .map(|s| (s.segment.segment_id.as_str(), s))
        .collect();
    let desired_ids: HashSet<&str> = desired.iter().map(|s| s.segment_id.as_str()).collect();

    let deleted = persisted
        .iter()
        .filter(|s| !desired_ids.contains(s.segment.segment_id.as_str()))
        .cloned()
        .collect();

    let mut created = Vec::new();
    let mut updated = Vec::new();
    for spec in desired {
        if spec.pristine {
            continue;
        }
        match persisted_by_id.get(spec.segment_id.as_str()) {
            Some(existing) => updated.push(PlannedUpdate {
                id: existing.segment.id,
                owner: existing.segment.owner,
                spec: spec.clone(),
            }),
            None => created.push(spec.clone()),
        }
    }

    ReconcilePlan {
        created,
        updated,
        deleted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reeltag_core::Segment;

    fn spec(segment_id: &str, pristine: bool) -> SegmentSpec {
        SegmentSpec {
            segment_id: segment_id.to_string(),
            start: 0.0,
            end: 5.0,
            title: "t".to_string(),
            description: None,
            pristine,
            tags: vec![],
        }
    }

    fn persisted(segment_id: &str) -> SegmentWithTags {
        let now = Utc::now();
        SegmentWithTags {
            segment: Segment {
                id: Uuid::new_v4(),
                segment_id: segment_id.to_string(),
                video_id: Uuid::new_v4(),
                owner: Uuid::new_v4(),
                start: 0.0,
                end: 5.0,
                title: "t".to_string(),
                description: None,
                views: 0,
                captions: None,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            },
            tags: vec![],
        }
    }

    #[test]
    fn test_new_segment_is_created() {
        let plan = plan_changes(&[spec("s1", false)], &[]);
        assert_eq!(plan.created.len(), 1);
        assert!(plan.updated.is_empty());
        assert!(plan.deleted.is_empty());
    }

    #[test]
    fn test_pristine_new_segment_is_ignored() {
        let plan = plan_changes(&[spec("s1", true)], &[]);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_existing_segment_is_updated() {
        let p = persisted("s1");
        let plan = plan_changes(&[spec("s1", false)], std::slice::from_ref(&p));
        assert!(plan.created.is_empty());
        assert_eq!(plan.updated.len(), 1);
        assert_eq!(plan.updated[0].id, p.segment.id);
        assert_eq!(plan.updated[0].owner, p.segment.owner);
    }

    #[test]
    fn test_pristine_existing_segment_is_untouched() {
        // Pristine wins even when content differs from the persisted row.
        let mut s = spec("s1", true);
        s.title = "completely different".to_string();
        let plan = plan_changes(&[s], &[persisted("s1")]);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_omitted_segment_is_deleted() {
        let plan = plan_changes(&[spec("s1", false)], &[persisted("s1"), persisted("s2")]);
        assert_eq!(plan.deleted.len(), 1);
        assert_eq!(plan.deleted[0].segment.segment_id, "s2");
        assert_eq!(plan.updated.len(), 1);
    }

    #[test]
    fn test_empty_desired_deletes_everything() {
        let plan = plan_changes(&[], &[persisted("s1"), persisted("s2")]);
        assert_eq!(plan.deleted.len(), 2);
        assert!(plan.created.is_empty());
        assert!(plan.updated.is_empty());
    }

    #[test]
    fn test_sets_are_disjoint() {
        let plan = plan_changes(
            &[spec("s1", false), spec("s2", true), spec("s3", false)],
            &[persisted("s1"), persisted("s4")],
        );
        // s1 updated, s2 pristine no-op, s3 created, s4 deleted.
        assert_eq!(plan.created.len(), 1);
        assert_eq!(plan.created[0].segment_id, "s3");
        assert_eq!(plan.updated.len(), 1);
        assert_eq!(plan.updated[0].spec.segment_id, "s1");
        assert_eq!(plan.deleted.len(), 1);
        assert_eq!(plan.deleted[0].segment.segment_id, "s4");
    }

    #[test]
    fn test_pristine_segment_still_blocks_deletion() {
        // A pristine entry is present in desired, so its persisted row
        // must not land in the deleted set.
        let plan = plan_changes(&[spec("s1", true)], &[persisted("s1")]);
        assert!(plan.deleted.is_empty());
    }
}

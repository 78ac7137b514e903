//! Core data model for reeltag.
//!
//! Entities follow the persisted shape: videos own segments, segments link
//! to tags through ranked associations, and tags carry a derived
//! `segment_count` that the reconciliation engine keeps consistent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults::{RANK_DEFAULT, RANK_MAX, RANK_MIN};
use crate::error::{Error, Result};
use crate::normalize::normalize_tag;

// =============================================================================
// PERSISTED ENTITIES
// =============================================================================

/// A video whose timeline is being annotated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub id: Uuid,

    /// External platform id (YouTube video id).
    pub yt_id: String,

    /// Video title as cached from the platform.
    pub title: String,

    /// Video length in seconds.
    pub duration: f64,

    pub created_at: DateTime<Utc>,
}

/// An annotated slice of a video timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Store-assigned row id.
    pub id: Uuid,

    /// Stable client-generated id. Immutable once created; this is the join
    /// key between a client's desired state and the persisted record.
    pub segment_id: String,

    pub video_id: Uuid,

    /// User who created the segment. Assigned by the engine, never taken
    /// from a payload.
    pub owner: Uuid,

    /// Start offset in seconds. Always `start < end`.
    pub start: f64,

    /// End offset in seconds.
    pub end: f64,

    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// How many times this segment has been viewed. Monotonic.
    pub views: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub captions: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Soft-delete tombstone. Deleted segments are excluded from listings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Segment {
    /// Whether the segment is live (not soft-deleted).
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// A normalized tag with its derived usage count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,

    /// Canonical name, unique. Always the output of
    /// [`normalize_tag`](crate::normalize::normalize_tag).
    pub name: String,

    /// Number of non-deleted segments currently linked to this tag.
    /// Recomputed from truth by the reconciliation engine.
    pub segment_count: i64,

    pub created_at: DateTime<Utc>,
}

/// A live segment↔tag association as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagLink {
    pub tag_id: Uuid,

    /// Canonical tag name, embedded so callers need no second lookup.
    pub name: String,

    /// Salience of the tag for this segment, 1–11.
    pub rank: i32,
}

/// A segment together with its resolved tag links.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentWithTags {
    #[serde(flatten)]
    pub segment: Segment,

    pub tags: Vec<TagLink>,
}

// =============================================================================
// RECONCILIATION INPUT
// =============================================================================

/// A desired tag assignment inside a [`SegmentSpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagAssignment {
    /// Salience rank, 1–11. Defaults to 6.
    #[serde(default = "default_rank")]
    pub rank: i32,

    /// Raw tag name; normalized by the engine before resolution.
    pub tag_name: String,
}

fn default_rank() -> i32 {
    RANK_DEFAULT
}

/// Client-submitted desired state for one segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentSpec {
    /// Stable client-generated id, the reconciliation join key.
    pub segment_id: String,

    pub start: f64,
    pub end: f64,
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Explicit "do not touch" marker. Pristine entries are excluded from
    /// create/update planning even when their fields differ from the
    /// persisted record.
    pub pristine: bool,

    #[serde(default)]
    pub tags: Vec<TagAssignment>,
}

impl SegmentSpec {
    /// Validate the desired segment before any mutation is planned.
    pub fn validate(&self) -> Result<()> {
        if self.segment_id.trim().is_empty() {
            return Err(Error::InvalidInput("segment_id must not be empty".into()));
        }
        if self.title.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "segment {}: title must not be empty",
                self.segment_id
            )));
        }
        if !self.start.is_finite() || !self.end.is_finite() || self.start < 0.0 {
            return Err(Error::InvalidInput(format!(
                "segment {}: start/end must be finite and non-negative",
                self.segment_id
            )));
        }
        if self.start >= self.end {
            return Err(Error::InvalidInput(format!(
                "segment {}: start ({}) must be before end ({})",
                self.segment_id, self.start, self.end
            )));
        }
        for tag in &self.tags {
            if !(RANK_MIN..=RANK_MAX).contains(&tag.rank) {
                return Err(Error::InvalidInput(format!(
                    "segment {}: tag '{}' rank {} outside [{}, {}]",
                    self.segment_id, tag.tag_name, tag.rank, RANK_MIN, RANK_MAX
                )));
            }
            if normalize_tag(&tag.tag_name).is_empty() {
                return Err(Error::InvalidInput(format!(
                    "segment {}: tag name '{}' is empty after normalization",
                    self.segment_id, tag.tag_name
                )));
            }
        }
        Ok(())
    }
}

/// One reconciliation call: the full desired segment state for a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileRequest {
    /// External platform id of the video (YouTube id).
    pub video_id: String,

    pub segments: Vec<SegmentSpec>,
}

impl ReconcileRequest {
    /// Validate every spec and check for duplicate segment ids.
    pub fn validate(&self) -> Result<()> {
        if self.video_id.trim().is_empty() {
            return Err(Error::InvalidInput("video_id must not be empty".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for spec in &self.segments {
            spec.validate()?;
            if !seen.insert(spec.segment_id.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "duplicate segment_id '{}' in request",
                    spec.segment_id
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// STORE-LEVEL PAYLOADS
// =============================================================================

/// Payload for creating a segment row.
#[derive(Debug, Clone)]
pub struct CreateSegment {
    pub segment_id: String,
    pub video_id: Uuid,
    pub owner: Uuid,
    pub start: f64,
    pub end: f64,
    pub title: String,
    pub description: Option<String>,
}

/// Patch applied to an existing segment row.
#[derive(Debug, Clone)]
pub struct SegmentPatch {
    pub start: f64,
    pub end: f64,
    pub title: String,
    pub description: Option<String>,
}

// =============================================================================
// CALLER IDENTITY
// =============================================================================

/// Caller role as supplied by the surrounding auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Regular user; may only mutate their own segments.
    Contributor,
    /// May mutate any segment.
    Admin,
    /// May mutate any segment.
    Root,
}

impl Role {
    /// Whether the role bypasses per-segment ownership checks.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Role::Admin | Role::Root)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Contributor => write!(f, "contributor"),
            Role::Admin => write!(f, "admin"),
            Role::Root => write!(f, "root"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "contributor" | "user" => Ok(Role::Contributor),
            "admin" => Ok(Role::Admin),
            "root" => Ok(Role::Root),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Verified caller identity, supplied by the surrounding auth layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
}

impl Identity {
    /// A contributor identity with no email.
    pub fn contributor(user_id: Uuid) -> Self {
        Self {
            user_id,
            email: None,
            role: Role::Contributor,
        }
    }

    /// An admin identity with no email.
    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            email: None,
            role: Role::Admin,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(segment_id: &str) -> SegmentSpec {
        SegmentSpec {
            segment_id: segment_id.to_string(),
            start: 10.0,
            end: 20.0,
            title: "a".to_string(),
            description: None,
            pristine: false,
            tags: vec![],
        }
    }

    #[test]
    fn test_spec_valid() {
        assert!(spec("s1").validate().is_ok());
    }

    #[test]
    fn test_spec_rejects_start_after_end() {
        let mut s = spec("s1");
        s.start = 20.0;
        s.end = 10.0;
        assert!(matches!(s.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_spec_rejects_start_equal_end() {
        let mut s = spec("s1");
        s.start = 10.0;
        s.end = 10.0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_spec_rejects_empty_title() {
        let mut s = spec("s1");
        s.title = "  ".to_string();
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_spec_rejects_rank_out_of_range() {
        let mut s = spec("s1");
        s.tags = vec![TagAssignment {
            rank: 12,
            tag_name: "love".to_string(),
        }];
        assert!(s.validate().is_err());

        s.tags[0].rank = 0;
        assert!(s.validate().is_err());

        s.tags[0].rank = 11;
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_spec_rejects_blank_tag() {
        let mut s = spec("s1");
        s.tags = vec![TagAssignment {
            rank: 6,
            tag_name: "#".to_string(),
        }];
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_request_rejects_duplicate_segment_ids() {
        let req = ReconcileRequest {
            video_id: "yt1".to_string(),
            segments: vec![spec("s1"), spec("s1")],
        };
        assert!(matches!(req.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_default_rank_applied() {
        let assignment: TagAssignment =
            serde_json::from_str(r#"{"tag_name": "love"}"#).expect("parse");
        assert_eq!(assignment.rank, RANK_DEFAULT);
    }

    #[test]
    fn test_role_elevation() {
        assert!(!Role::Contributor.is_elevated());
        assert!(Role::Admin.is_elevated());
        assert!(Role::Root.is_elevated());
    }

    #[test]
    fn test_role_round_trip() {
        for role in [Role::Contributor, Role::Admin, Role::Root] {
            let parsed: Role = role.to_string().parse().expect("parse role");
            assert_eq!(parsed, role);
        }
    }
}

//! Search document shape shared between the engine and the index client.
//!
//! The index holds a flattened view of each segment. Tag names are split
//! into three salience buckets by rank so the query side can boost
//! high-salience tags over incidental ones.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults::{RANK_LOW_MAX, RANK_MID_MAX};
use crate::models::SegmentWithTags;

/// Flattened segment document as stored in the search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDocument {
    /// Store row id, used as the index document id.
    pub id: Uuid,

    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub start: f64,
    pub end: f64,

    /// Tag names with rank 1–4.
    pub low_tags: Vec<String>,

    /// Tag names with rank 5–7.
    pub mid_tags: Vec<String>,

    /// Tag names with rank 8–11.
    pub high_tags: Vec<String>,

    /// External platform id of the owning video.
    #[serde(rename = "videoYtId")]
    pub video_yt_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub captions: Option<String>,
}

impl SegmentDocument {
    /// Build the index document for a settled segment.
    pub fn from_segment(segment: &SegmentWithTags, video_yt_id: &str) -> Self {
        let mut low_tags = Vec::new();
        let mut mid_tags = Vec::new();
        let mut high_tags = Vec::new();
        for link in &segment.tags {
            let bucket = if link.rank <= RANK_LOW_MAX {
                &mut low_tags
            } else if link.rank <= RANK_MID_MAX {
                &mut mid_tags
            } else {
                &mut high_tags
            };
            bucket.push(link.name.clone());
        }

        Self {
            id: segment.segment.id,
            title: segment.segment.title.clone(),
            description: segment.segment.description.clone(),
            start: segment.segment.start,
            end: segment.segment.end,
            low_tags,
            mid_tags,
            high_tags,
            video_yt_id: video_yt_id.to_string(),
            captions: segment.segment.captions.clone(),
        }
    }
}

/// A single hit returned by a segment search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Store row id of the matching segment.
    pub id: Uuid,

    /// Relevance score as reported by the index.
    pub score: f64,
}

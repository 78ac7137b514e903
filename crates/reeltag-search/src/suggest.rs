//! Similarity-ranked tag suggestions for typeahead.

use similar::TextDiff;

use reeltag_core::{defaults::TAG_MATCH_LIMIT, normalize_tag, Tag};

/// Minimum character-level similarity for a non-prefix match.
const MIN_RATIO: f32 = 0.5;

/// Rank tags against a partial query.
///
/// Prefix matches come first, then fuzzy matches by character similarity;
/// ties break on usage count, then name. The query is normalized the same
/// way stored names are, so `#Lov` matches `love`.
pub fn suggest_tags(tags: &[Tag], query: &str, limit: Option<usize>) -> Vec<Tag> {
    let query = normalize_tag(query);
    if query.is_empty() {
        return Vec::new();
    }
    let limit = limit.unwrap_or(TAG_MATCH_LIMIT);

    let mut scored: Vec<(bool, f32, &Tag)> = tags
        .iter()
        .filter_map(|tag| {
            let prefix = tag.name.starts_with(&query);
            let ratio = TextDiff::from_chars(query.as_str(), tag.name.as_str()).ratio();
            if prefix || ratio >= MIN_RATIO {
                Some((prefix, ratio, tag))
            } else {
                None
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then(b.1.total_cmp(&a.1))
            .then(b.2.segment_count.cmp(&a.2.segment_count))
            .then(a.2.name.cmp(&b.2.name))
    });

    scored
        .into_iter()
        .take(limit)
        .map(|(_, _, t)| t.clone())
        .collect()
}

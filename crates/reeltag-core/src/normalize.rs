//! Tag name normalization.
//!
//! Users type tags with stray prefixes and inconsistent casing
//! (`#Love`, `$money`, `.Net` vs `net`). Every tag name entering the
//! system passes through [`normalize_tag`] so that the `tag` table only
//! ever holds one canonical row per concept.

/// Reduce raw tag text to its canonical form.
///
/// Trims surrounding whitespace, strips a single leading `#`, `$`, or `.`,
/// and lowercases the result. Pure and total; idempotent by construction:
/// `normalize_tag(normalize_tag(x)) == normalize_tag(x)`.
pub fn normalize_tag(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = trimmed
        .strip_prefix('#')
        .or_else(|| trimmed.strip_prefix('$'))
        .or_else(|| trimmed.strip_prefix('.'))
        .unwrap_or(trimmed);
    stripped.to_lowercase()
}

//! Tag resolution: map normalized names to tag entities, creating
//! missing ones in a single batch.

use std::collections::HashMap;

use reeltag_core::{Error, Result, Tag, TagStore};
use tracing::debug;

/// Resolver turning normalized tag names into tag entities.
pub struct TagResolver<'a> {
    tags: &'a dyn TagStore,
}

impl<'a> TagResolver<'a> {
    pub fn new(tags: &'a dyn TagStore) -> Self {
        Self { tags }
    }

    /// Resolve every name to an existing or freshly created tag.
    ///
    /// Names are expected to be canonical already (see
    /// [`normalize_tag`](reeltag_core::normalize_tag)). Looks up the whole
    /// set, batch-creates the missing subset, and returns the union keyed
    /// by name. Never silently drops a requested name.
    pub async fn resolve(&self, names: &[String]) -> Result<HashMap<String, Tag>> {
        if names.is_empty() {
            return Ok(HashMap::new());
        }

        let existing = self.tags.find_by_names(names).await?;
        let mut resolved: HashMap<String, Tag> =
            existing.into_iter().map(|t| (t.name.clone(), t)).collect();

        let missing: Vec<String> = names
            .iter()
            .filter(|n| !resolved.contains_key(*n))
            .cloned()
            .collect();

        if !missing.is_empty() {
            debug!(count = missing.len(), "creating missing tags");
            let created = self.tags.create_many(&missing).await?;
            for tag in created {
                resolved.insert(tag.name.clone(), tag);
            }
        }

        for name in names {
            if !resolved.contains_key(name) {
                return Err(Error::Internal(format!(
                    "tag '{}' missing after batch create",
                    name
                )));
            }
        }

        Ok(resolved)
    }
}

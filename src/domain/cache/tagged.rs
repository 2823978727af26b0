//! Tag-scoped view over a taggable backend

use sha2::{Digest, Sha256};

use crate::domain::DomainError;

use super::repository::TaggableCache;
use super::tags::TagSet;

/// Maps keys into the namespace of a tag set
#[derive(Debug, Clone, Copy)]
pub struct TaggedCache<'a> {
    store: &'a dyn TaggableCache,
    tags: &'a TagSet,
}

impl<'a> TaggedCache<'a> {
    pub fn new(store: &'a dyn TaggableCache, tags: &'a TagSet) -> Self {
        Self { store, tags }
    }

    /// Hash of the current tag versions, in tag order
    async fn namespace(&self) -> Result<String, DomainError> {
        let mut hasher = Sha256::new();

        for tag in self.tags.iter() {
            let version = self.store.tag_version(tag).await?;
            hasher.update(tag.as_bytes());
            hasher.update(b"=");
            hasher.update(version.as_bytes());
            hasher.update(b"|");
        }

        Ok(hex::encode(hasher.finalize()))
    }

    /// Key under which `key` is stored for the current tag versions.
    ///
    /// Resolve it once per read-through and reuse it for the write.
    pub async fn scoped_key(&self, key: &str) -> Result<String, DomainError> {
        Ok(format!("{}:{}", self.namespace().await?, key))
    }

    /// Invalidates everything stored under these tags
    pub async fn flush(&self) -> Result<(), DomainError> {
        self.store.flush_tags(self.tags).await
    }
}

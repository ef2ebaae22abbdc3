//! In-memory blob registry backing generated documents and scripts.
//!
//! Plays the role of a browser's object-URL table: `create` stores a
//! resource and mints a unique `blob:` URL for it, `revoke` releases it.
//! The executor revokes a run's document and script before installing the
//! next run's, so the table never grows past the live realm's two entries.

use std::collections::HashMap;
use uuid::Uuid;

/// Releasable reference to one stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobHandle {
    url: String,
}

impl BlobHandle {
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// One stored resource.
#[derive(Debug, Clone)]
pub struct Blob {
    pub mime: String,
    pub data: String,
}

#[derive(Debug, Default)]
pub struct BlobStore {
    entries: HashMap<String, Blob>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `data` under a freshly minted unique `blob:` URL.
    pub fn create(&mut self, data: impl Into<String>, mime: impl Into<String>) -> BlobHandle {
        let url = format!("blob:sandbox/{}", Uuid::new_v4());
        self.entries.insert(
            url.clone(),
            Blob {
                mime: mime.into(),
                data: data.into(),
            },
        );
        BlobHandle { url }
    }

    /// Release the blob behind `handle`. False when already revoked.
    pub fn revoke(&mut self, handle: &BlobHandle) -> bool {
        self.entries.remove(&handle.url).is_some()
    }

    pub fn get(&self, url: &str) -> Option<&Blob> {
        self.entries.get(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get() {
        let mut store = BlobStore::new();
        let handle = store.create("log(1)", "text/javascript");
        assert!(handle.url().starts_with("blob:sandbox/"));

        let blob = store.get(handle.url()).unwrap();
        assert_eq!(blob.data, "log(1)");
        assert_eq!(blob.mime, "text/javascript");
    }

    #[test]
    fn test_urls_are_unique() {
        let mut store = BlobStore::new();
        let a = store.create("a", "text/plain");
        let b = store.create("a", "text/plain");
        assert_ne!(a.url(), b.url());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_revoke_releases_entry() {
        let mut store = BlobStore::new();
        let handle = store.create("a", "text/plain");
        assert!(store.revoke(&handle));
        assert!(store.get(handle.url()).is_none());
        assert!(store.is_empty());

        // Revoking twice is a no-op.
        assert!(!store.revoke(&handle));
    }
}

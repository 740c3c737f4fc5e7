//! In-memory asset store for testing.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::assets::{AssetStore, hash_bytes};
use crate::error::SourceError;

/// Asset store holding its content in memory.
///
/// Counts calls to [`AssetStore::read`] so tests can assert how often the
/// build touched the store.
///
/// # Example
///
/// ```ignore
/// use tome_sources::{AssetStore, MockAssetStore};
///
/// let store = MockAssetStore::new().with_asset("img/logo.png", b"png");
/// assert!(store.contains("img/logo.png"));
/// ```
#[derive(Debug, Default)]
pub struct MockAssetStore {
    assets: RwLock<HashMap<String, Vec<u8>>>,
    reads: AtomicUsize,
}

impl MockAssetStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset.
    #[must_use]
    pub fn with_asset(self, key: &str, bytes: &[u8]) -> Self {
        self.insert(key, bytes);
        self
    }

    /// Add or replace an asset.
    pub fn insert(&self, key: &str, bytes: &[u8]) {
        self.assets
            .write()
            .unwrap()
            .insert(key.to_owned(), bytes.to_vec());
    }

    /// Number of `read` calls so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl AssetStore for MockAssetStore {
    fn contains(&self, key: &str) -> bool {
        self.assets.read().unwrap().contains_key(key)
    }

    fn content_hash(&self, key: &str) -> Result<String, SourceError> {
        self.assets
            .read()
            .unwrap()
            .get(key)
            .map(|bytes| hash_bytes(bytes))
            .ok_or_else(|| SourceError::MissingAsset(key.to_owned()))
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, SourceError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.assets
            .read()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| SourceError::MissingAsset(key.to_owned()))
    }
}

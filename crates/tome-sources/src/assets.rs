//! Content-addressed asset store.

use std::path::{Component, Path, PathBuf};

use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::error::SourceError;

/// Read-only store of binary assets addressed by slash-separated keys.
///
/// Every asset has a stable content hash. Identical content under different
/// keys yields the same hash, which is what lets the site build store such
/// assets once.
pub trait AssetStore: Send + Sync {
    /// Whether an asset exists under `key`.
    fn contains(&self, key: &str) -> bool;

    /// Hex-encoded SHA-256 of the asset's bytes.
    fn content_hash(&self, key: &str) -> Result<String, SourceError>;

    /// The asset's bytes.
    fn read(&self, key: &str) -> Result<Vec<u8>, SourceError>;
}

/// Compute the content hash used by all asset stores.
pub(crate) fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Asset store backed by a directory tree.
///
/// Keys are paths relative to the root, using `/` as separator. Hashes are
/// computed on first request and memoized for the lifetime of the store.
#[derive(Debug)]
pub struct DirAssetStore {
    root: PathBuf,
    hashes: DashMap<String, String>,
}

impl DirAssetStore {
    /// Create a store rooted at `root`. The directory is not scanned up front.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            hashes: DashMap::new(),
        }
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a file path, rejecting keys that would escape the root.
    fn resolve(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if key.is_empty() || escapes {
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl AssetStore for DirAssetStore {
    fn contains(&self, key: &str) -> bool {
        self.resolve(key).is_some_and(|path| path.is_file())
    }

    fn content_hash(&self, key: &str) -> Result<String, SourceError> {
        if let Some(hash) = self.hashes.get(key) {
            return Ok(hash.clone());
        }
        let hash = hash_bytes(&self.read(key)?);
        self.hashes.insert(key.to_owned(), hash.clone());
        Ok(hash)
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, SourceError> {
        let path = self
            .resolve(key)
            .filter(|path| path.is_file())
            .ok_or_else(|| SourceError::MissingAsset(key.to_owned()))?;
        std::fs::read(&path).map_err(|e| SourceError::io(path, e))
    }
}

//! Process-wide registry of output files that documents depend on.

use std::sync::Arc;

use dashmap::DashMap;
use tome_sources::Sources;

use crate::error::ResourceError;

/// Deferred computation of a dependency's bytes.
pub type Producer = Arc<dyn Fn(&Sources) -> Result<Vec<u8>, ResourceError> + Send + Sync>;

/// Wrap a closure as a [`Producer`].
pub fn producer<F>(f: F) -> Producer
where
    F: Fn(&Sources) -> Result<Vec<u8>, ResourceError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Map from archive path to the producer of that file's bytes.
///
/// Shared by every render session of a run. The first registration for a
/// path wins; callers registering the same path guarantee the producers
/// yield identical bytes, so later registrations are dropped.
#[derive(Default)]
pub struct DependencyRegistry {
    entries: DashMap<String, Producer>,
}

impl DependencyRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `producer` for `path` unless the path is already present.
    ///
    /// Returns `true` if this call inserted the entry.
    pub fn register(&self, path: &str, producer: Producer) -> bool {
        let mut inserted = false;
        self.entries.entry(path.to_owned()).or_insert_with(|| {
            inserted = true;
            producer
        });
        inserted
    }

    /// Whether `path` is registered.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of distinct paths.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, sorted by path.
    pub fn snapshot(&self) -> Vec<(String, Producer)> {
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}

impl std::fmt::Debug for DependencyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyRegistry")
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::testing::sources;

    fn constant(bytes: &'static [u8]) -> Producer {
        producer(move |_| Ok(bytes.to_vec()))
    }

    #[test]
    fn test_first_registration_wins() {
        let registry = DependencyRegistry::new();

        assert!(registry.register("rsc/a.png", constant(b"first")));
        assert!(!registry.register("rsc/a.png", constant(b"second")));

        let entries = registry.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!((entries[0].1)(&sources()).unwrap(), b"first");
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let registry = DependencyRegistry::new();
        registry.register("rsc/b.png", constant(b""));
        registry.register("rsc/a.png", constant(b""));

        let paths: Vec<_> = registry
            .snapshot()
            .into_iter()
            .map(|(path, _)| path)
            .collect();

        assert_eq!(paths, vec!["rsc/a.png", "rsc/b.png"]);
        assert!(registry.contains("rsc/a.png"));
    }
}

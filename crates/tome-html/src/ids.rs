//! Per-document id allocation.

use std::collections::{HashMap, HashSet};

use crate::error::StructuralError;

/// Issues element ids that are unique within one document.
#[derive(Debug, Default)]
pub struct IdRegistry {
    issued: HashSet<String>,
    counters: HashMap<String, usize>,
}

impl IdRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a unique id derived from `base`.
    ///
    /// The first request for a base returns it unchanged; later requests
    /// append `1`, `2`, ... skipping anything already issued.
    pub fn id_for(&mut self, base: &str) -> String {
        if self.issued.insert(base.to_owned()) {
            return base.to_owned();
        }
        let counter = self.counters.entry(base.to_owned()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{base}{counter}");
            if self.issued.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// Issue exactly `id`, failing if it was issued before.
    pub fn try_id(&mut self, id: &str) -> Result<String, StructuralError> {
        if self.issued.insert(id.to_owned()) {
            Ok(id.to_owned())
        } else {
            Err(StructuralError::DuplicateId(id.to_owned()))
        }
    }

    /// Issue one id per base, all sharing the same numeric suffix.
    ///
    /// The suffix starts at the highest counter among the bases and is
    /// raised until every `base + suffix` is free.
    pub fn ids_with_shared_suffix(&mut self, bases: &[&str]) -> Vec<String> {
        let mut suffix = bases
            .iter()
            .filter_map(|base| self.counters.get(*base))
            .copied()
            .max()
            .unwrap_or(0);
        while bases
            .iter()
            .any(|base| self.issued.contains(&format!("{base}{suffix}")))
        {
            suffix += 1;
        }
        bases
            .iter()
            .map(|base| {
                let id = format!("{base}{suffix}");
                self.issued.insert(id.clone());
                self.counters.insert((*base).to_owned(), suffix);
                id
            })
            .collect()
    }
}

//! Insertion-ordered set of text fragments.

use std::collections::HashSet;

/// Keeps the first occurrence of each distinct string, in insertion order.
///
/// Used for stylesheet and script fragments: equality is exact text.
#[derive(Debug, Default, Clone)]
pub struct OrderedSet {
    seen: HashSet<String>,
    items: Vec<String>,
}

impl OrderedSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `item` unless an identical string is already present.
    ///
    /// Returns `true` if the item was new.
    pub fn insert(&mut self, item: &str) -> bool {
        if self.seen.contains(item) {
            return false;
        }
        self.seen.insert(item.to_owned());
        self.items.push(item.to_owned());
        true
    }

    /// Insert every item of `items`, in order.
    pub fn extend<I, S>(&mut self, items: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for item in items {
            self.insert(item.as_ref());
        }
    }

    /// Items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    /// Number of distinct items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Consume the set, returning the items in insertion order.
    pub fn into_vec(self) -> Vec<String> {
        self.items
    }
}

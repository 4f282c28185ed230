//! Set of collected product page URLs.

use std::collections::BTreeSet;

/// Product page URLs deduplicated by exact string equality.
///
/// Backed by a `BTreeSet` so iteration (and therefore the persisted JSON
/// array) is always sorted ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedUrlSet {
    urls: BTreeSet<String>,
}

impl CollectedUrlSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a URL, returning true if it was not already present.
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        self.urls.insert(url.into())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// URLs in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.urls.iter()
    }

    /// Sorted URLs as a pretty-printed JSON array (2-space indent).
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.urls)
    }
}

impl Extend<String> for CollectedUrlSet {
    fn extend<T: IntoIterator<Item = String>>(&mut self, iter: T) {
        self.urls.extend(iter);
    }
}

impl FromIterator<String> for CollectedUrlSet {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self {
            urls: iter.into_iter().collect(),
        }
    }
}

use crate::model::tag::normalize_tags;
use crate::model::Store;

/// Client-side restriction of a fetched store list.
///
/// Stores must carry every selected tag (AND), and their name must contain the
/// query case-insensitively. Empty selection or query restricts nothing. Input
/// order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreFilter {
    pub tags: Vec<String>,
    pub name_query: String,
}

impl StoreFilter {
    pub fn new(tags: Vec<String>, name_query: impl Into<String>) -> Self {
        Self {
            tags: normalize_tags(&tags),
            name_query: name_query.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.name_query.is_empty()
    }

    pub fn matches(&self, store: &Store) -> bool {
        if !store.has_all_tags(&self.tags) {
            return false;
        }
        if self.name_query.is_empty() {
            return true;
        }
        store
            .name
            .to_lowercase()
            .contains(&self.name_query.to_lowercase())
    }

    pub fn apply<'a>(&self, stores: &'a [Store]) -> Vec<&'a Store> {
        if self.is_empty() {
            return stores.iter().collect();
        }
        stores.iter().filter(|s| self.matches(s)).collect()
    }
}

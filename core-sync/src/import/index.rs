//! Name lookup for linking albums and tracks to artists

use core_library::models::normalize_name;
use core_library::Artist;
use std::collections::HashMap;

/// Artist id lookup by name: exact spelling first, then case-insensitive.
///
/// The first artist inserted under a key wins, so build it in a stable order.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    exact: HashMap<String, String>,
    folded: HashMap<String, String>,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, id: &str) {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return;
        }
        self.exact
            .entry(trimmed.to_string())
            .or_insert_with(|| id.to_string());
        self.folded
            .entry(normalize_name(trimmed))
            .or_insert_with(|| id.to_string());
    }

    pub fn insert_artist(&mut self, artist: &Artist) {
        self.insert(&artist.name, &artist.id);
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return None;
        }
        self.exact
            .get(trimmed)
            .or_else(|| self.folded.get(&normalize_name(trimmed)))
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_beats_case_insensitive() {
        let mut index = NameIndex::new();
        index.insert("Pink Floyd", "a");
        index.insert("PINK FLOYD", "b");

        assert_eq!(index.resolve("Pink Floyd"), Some("a"));
        assert_eq!(index.resolve("PINK FLOYD"), Some("b"));
        assert_eq!(index.resolve("pink floyd"), Some("a"));
        assert_eq!(index.resolve("  pink floyd "), Some("a"));
    }

    #[test]
    fn test_unknown_and_blank_names() {
        let mut index = NameIndex::new();
        index.insert("   ", "blank");
        index.insert("Björk", "bjork");

        assert_eq!(index.len(), 1);
        assert_eq!(index.resolve("BJÖRK"), Some("bjork"));
        assert_eq!(index.resolve("Bjork"), None);
        assert_eq!(index.resolve(""), None);
        assert!(!index.contains("Sigur Rós"));
    }
}

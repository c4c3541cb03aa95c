//! Commit message table.
//!
//! Operations name *why* they commit with a short reason key (`writeFile`,
//! `save`). The table maps those keys to human-readable messages; a key
//! without an entry is used verbatim.

use std::collections::BTreeMap;

use crate::constants::{REASON_COMMIT, REASON_SAVE, REASON_WRITE_FILE};

/// Reason key → commit message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTable {
    entries: BTreeMap<String, String>,
}

impl Default for MessageTable {
    fn default() -> Self {
        let mut table = Self {
            entries: BTreeMap::new(),
        };
        table
            .set(REASON_WRITE_FILE, "Wrote file")
            .set(REASON_SAVE, "Saved document")
            .set(REASON_COMMIT, "Committed changes");
        table
    }
}

impl MessageTable {
    /// A table with no entries; every key resolves to itself.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Add or replace an entry.
    pub fn set(&mut self, key: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.entries.insert(key.into(), message.into());
        self
    }

    /// The entry for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// The message for `key`, falling back to `key` itself.
    pub fn resolve<'a>(&'a self, key: &'a str) -> &'a str {
        self.get(key).unwrap_or(key)
    }

    /// Iterate entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for MessageTable {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, message) in iter {
            self.set(key, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_entries() {
        let table = MessageTable::default();
        assert_eq!(table.resolve("writeFile"), "Wrote file");
        assert_eq!(table.resolve("save"), "Saved document");
    }

    #[test]
    fn test_unknown_key_is_used_verbatim() {
        let table = MessageTable::default();
        assert_eq!(table.resolve("Rename locale"), "Rename locale");
        assert_eq!(MessageTable::empty().resolve("writeFile"), "writeFile");
    }

    #[test]
    fn test_override_and_extend() {
        let mut table = MessageTable::default();
        table.set("writeFile", "Update file");
        table.extend([("import", "Imported records")]);
        assert_eq!(table.resolve("writeFile"), "Update file");
        assert_eq!(table.get("import"), Some("Imported records"));
        assert_eq!(table.iter().count(), 4);
    }
}

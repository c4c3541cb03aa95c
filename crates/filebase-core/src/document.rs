//! In-memory document for one namespace.
//!
//! The [`DocumentStore`] is a flat JSON object: `set("a.b", v)` stores a member
//! literally named `a.b`. The `*_path` accessors treat the key as a dotted
//! path instead (see [`split_key`]) and address nested objects, so
//! `set_path("a.b", v)` produces `{"a": {"b": v}}`.

use serde_json::{Map, Value};

use crate::errors::FilebaseError;
use crate::keys::split_key;

/// Operation applied by [`DocumentStore::visit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitOp {
    /// `set(key, value)` for every member.
    Set,
    /// `delete(key)` for every member or key.
    Delete,
}

impl std::str::FromStr for VisitOp {
    type Err = FilebaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "set" => Ok(Self::Set),
            "delete" | "del" => Ok(Self::Delete),
            _ => Err(FilebaseError::InvalidArgument(format!(
                "unknown visit operation `{}`",
                s
            ))),
        }
    }
}

/// Key → value entries of one namespace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentStore {
    entries: Map<String, Value>,
}

impl DocumentStore {
    /// An empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from a JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self, FilebaseError> {
        match value {
            Value::Object(entries) => Ok(Self { entries }),
            other => Err(FilebaseError::InvalidArgument(format!(
                "document must be a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Insert or replace `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// The value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Whether `key` is present.
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Remove `key`. Absent keys are ignored.
    pub fn delete(&mut self, key: &str) -> &mut Self {
        self.entries.remove(key);
        self
    }

    /// Remove every entry.
    pub fn clear(&mut self) -> &mut Self {
        self.entries.clear();
        self
    }

    /// Top-level keys in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of top-level entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the document has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.entries
    }

    /// The document as a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.entries.clone())
    }

    /// Apply `op` across a bulk input.
    ///
    /// - an object applies to each member (`Set` uses the member value)
    /// - an array applies to each element in order
    /// - for `Delete`, a string names one key
    ///
    /// # Errors
    ///
    /// Returns [`FilebaseError::InvalidArgument`] for any other shape. Entries
    /// before the offending element have already been applied.
    pub fn visit(&mut self, op: VisitOp, input: Value) -> Result<&mut Self, FilebaseError> {
        match (op, input) {
            (VisitOp::Set, Value::Object(members)) => {
                for (key, value) in members {
                    self.set(key, value);
                }
            }
            (VisitOp::Delete, Value::Object(members)) => {
                for key in members.keys() {
                    self.delete(key);
                }
            }
            (VisitOp::Delete, Value::String(key)) => {
                self.delete(&key);
            }
            (op, Value::Array(items)) => {
                for item in items {
                    self.visit(op, item)?;
                }
            }
            (op, other) => {
                return Err(FilebaseError::InvalidArgument(format!(
                    "cannot visit {:?} over {}",
                    op,
                    json_kind(&other)
                )))
            }
        }
        Ok(self)
    }

    // -------------------------------------------------------------------------
    // Dotted-path accessors
    // -------------------------------------------------------------------------

    /// The value at dotted path `key`.
    pub fn get_path(&self, key: &str) -> Option<&Value> {
        let segments = split_key(key);
        let (first, rest) = segments.split_first()?;
        let mut current = self.entries.get(first)?;
        for segment in rest {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Whether dotted path `key` resolves to a value.
    pub fn has_path(&self, key: &str) -> bool {
        self.get_path(key).is_some()
    }

    /// Store `value` at dotted path `key`, creating intermediate objects.
    ///
    /// Non-object values in the way are replaced by objects.
    ///
    /// # Errors
    ///
    /// Returns [`FilebaseError::InvalidArgument`] if `key` is empty.
    pub fn set_path(
        &mut self,
        key: &str,
        value: impl Into<Value>,
    ) -> Result<&mut Self, FilebaseError> {
        if key.is_empty() {
            return Err(FilebaseError::InvalidArgument(
                "path key must not be empty".to_string(),
            ));
        }

        let segments = split_key(key);
        let Some((last, parents)) = segments.split_last() else {
            return Ok(self);
        };

        insert_nested(&mut self.entries, parents, last, value.into());
        Ok(self)
    }

    /// Remove the value at dotted path `key`. Missing paths are ignored.
    pub fn delete_path(&mut self, key: &str) -> &mut Self {
        let segments = split_key(key);
        if let Some((last, parents)) = segments.split_last() {
            let mut current = Some(&mut self.entries);
            for segment in parents {
                current = current
                    .and_then(|object| object.get_mut(segment))
                    .and_then(Value::as_object_mut);
            }
            if let Some(object) = current {
                object.remove(last);
            }
        }
        self
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Insert `value` at `parents` + `last` below `object`, replacing any
/// non-object value met on the way with a fresh object.
fn insert_nested(object: &mut Map<String, Value>, parents: &[String], last: &str, value: Value) {
    let Some((head, rest)) = parents.split_first() else {
        object.insert(last.to_string(), value);
        return;
    };
    match object.entry(head.clone()).or_insert_with(|| Value::Object(Map::new())) {
        Value::Object(child) => insert_nested(child, rest, last, value),
        slot => {
            let mut child = Map::new();
            insert_nested(&mut child, rest, last, value);
            *slot = Value::Object(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_get_has_delete() {
        let mut store = DocumentStore::new();
        store.set("a.b", 1).set("title", "hello");
        assert_eq!(store.get("a.b"), Some(&json!(1)));
        assert!(store.has("title"));
        assert_eq!(store.len(), 2);

        store.delete("title");
        assert!(!store.has("title"));
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn test_delete_absent_is_noop() {
        let mut store = DocumentStore::new();
        store.set("kept", true);
        store.delete("never-set");
        assert!(!store.has("never-set"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_flat_keys_are_not_split() {
        let mut store = DocumentStore::new();
        store.set("a.b", 1);
        assert_eq!(store.to_value(), json!({"a.b": 1}));
        assert_eq!(store.get_path("a.b"), None);
    }

    #[test]
    fn test_set_path_nests() {
        let mut store = DocumentStore::new();
        store.set_path("a.b", 1).unwrap();
        store.set_path("a.c", 2).unwrap();
        assert_eq!(store.to_value(), json!({"a": {"b": 1, "c": 2}}));
        assert_eq!(store.get_path("a.b"), Some(&json!(1)));
        assert!(store.has_path("a"));
    }

    #[test]
    fn test_escaped_dots_stay_in_segment() {
        let mut store = DocumentStore::new();
        store.set_path("en\\.US./home/u", "hi").unwrap();
        assert_eq!(store.to_value(), json!({"en.US": {"/home/u": "hi"}}));
        assert_eq!(store.get_path("en\\.US./home/u"), Some(&json!("hi")));
    }

    #[test]
    fn test_set_path_replaces_scalars() {
        let mut store = DocumentStore::new();
        store.set("a", 5);
        store.set_path("a.b", 1).unwrap();
        assert_eq!(store.to_value(), json!({"a": {"b": 1}}));
        assert!(store.set_path("", 1).is_err());

        store.set_path("a.b.c.d", true).unwrap();
        store.set_path("x.y", "kept").unwrap();
        assert_eq!(
            store.to_value(),
            json!({"a": {"b": {"c": {"d": true}}}, "x": {"y": "kept"}})
        );
    }

    #[test]
    fn test_delete_path() {
        let mut store = DocumentStore::new();
        store.set_path("a.b", 1).unwrap().set_path("a.c", 2).unwrap();
        store.delete_path("a.b").delete_path("x.y.z").delete_path("a.c.d");
        assert_eq!(store.to_value(), json!({"a": {"c": 2}}));
    }

    #[test]
    fn test_visit_set_object_and_array() {
        let mut store = DocumentStore::new();
        store
            .visit(VisitOp::Set, json!({"a": 1, "b": 2}))
            .unwrap()
            .visit(VisitOp::Set, json!([{"c": 3}, {"a": 10}]))
            .unwrap();
        assert_eq!(store.to_value(), json!({"a": 10, "b": 2, "c": 3}));
    }

    #[test]
    fn test_visit_delete() {
        let mut store = DocumentStore::new();
        store.visit(VisitOp::Set, json!({"a": 1, "b": 2, "c": 3})).unwrap();
        store.visit(VisitOp::Delete, json!(["a", {"b": null}, "zz"])).unwrap();
        assert_eq!(store.to_value(), json!({"c": 3}));
    }

    #[test]
    fn test_visit_rejects_scalars() {
        let mut store = DocumentStore::new();
        assert!(store.visit(VisitOp::Set, json!(3)).is_err());
        assert!(store.visit(VisitOp::Set, json!(["key"])).is_err());
        assert!("merge".parse::<VisitOp>().is_err());
    }

    #[test]
    fn test_from_value_requires_object() {
        assert!(DocumentStore::from_value(json!({"a": 1})).is_ok());
        assert!(DocumentStore::from_value(json!([1])).is_err());
    }
}

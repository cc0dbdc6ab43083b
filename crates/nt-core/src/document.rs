//! Document representation
//!
//! Entities are stored and served as JSON objects. Nested attributes are
//! addressed with dotted paths (`startLocation.address`).

use serde_json::{Map, Value};

/// A stored entity
pub type Document = Map<String, Value>;

/// Identifier field present on every stored document
pub const ID_FIELD: &str = "_id";

/// Internal version counter, hidden from clients unless explicitly selected
pub const VERSION_FIELD: &str = "__v";

/// Creation timestamp, the default sort key
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Split a dotted path into its segments
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('.').filter(|s| !s.is_empty()).collect()
}

/// Look up a (possibly dotted) path in a document
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = doc.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Remove a (possibly dotted) path from a document, returning the old value
pub fn remove_path(doc: &mut Document, path: &str) -> Option<Value> {
    match path.split_once('.') {
        None => doc.remove(path),
        Some((head, rest)) => match doc.get_mut(head) {
            Some(Value::Object(inner)) => remove_path(inner, rest),
            _ => None,
        },
    }
}

/// Insert a value at a (possibly dotted) path, creating intermediate objects
pub fn set_path(doc: &mut Document, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(inner) = entry {
                set_path(inner, rest, value);
            }
        }
    }
}

/// The document's identifier, when present
pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

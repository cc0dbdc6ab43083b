//! Collection trait and shared document rules
//!
//! Every store applies the same lifecycle: stamp, prepare, validate, check
//! uniqueness, persist, present.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use nt_core::{document_id, get_path, set_path, Document, ValidationErrors, CREATED_AT_FIELD, ID_FIELD, VERSION_FIELD};
use nt_models::Schema;
use nt_queries::{DocumentQuery, Projection};
use serde_json::Value;
use uuid::Uuid;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid _id: {0}")]
    InvalidId(String),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("Duplicate value for {field}: {value}")]
    DuplicateKey { field: String, value: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A named set of documents sharing one schema
#[async_trait]
pub trait Collection: Send + Sync {
    /// Collection name, e.g. "tours"
    fn name(&self) -> &'static str;

    /// Run a deferred query
    async fn find(&self, query: DocumentQuery) -> StoreResult<Vec<Document>>;

    /// Find one document by id
    async fn find_by_id(&self, id: &str, projection: Projection) -> StoreResult<Option<Document>>;

    /// Insert a new document, returning it as stored
    async fn create(&self, doc: Document) -> StoreResult<Document>;

    /// Merge `changes` into a document, returning the updated document
    async fn find_by_id_and_update(&self, id: &str, changes: Document) -> StoreResult<Option<Document>>;

    /// Remove a document, returning what was removed
    async fn find_by_id_and_delete(&self, id: &str) -> StoreResult<Option<Document>>;
}

/// Ids are UUIDs; anything else can never match a stored document
pub fn check_id(id: &str) -> StoreResult<()> {
    Uuid::parse_str(id)
        .map(|_| ())
        .map_err(|_| StoreError::InvalidId(id.to_string()))
}

/// Fill the store-managed fields of a new document
pub fn stamp_new(doc: &mut Document) -> StoreResult<()> {
    match document_id(doc) {
        Some(id) => check_id(id)?,
        None => {
            doc.insert(ID_FIELD.to_string(), Value::String(Uuid::new_v4().to_string()));
        }
    }
    doc.insert(VERSION_FIELD.to_string(), Value::from(0));
    if !doc.contains_key(CREATED_AT_FIELD) {
        doc.insert(
            CREATED_AT_FIELD.to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
    }
    Ok(())
}

/// Apply a partial update on top of a stored document.
///
/// `_id` and `__v` cannot be changed by clients; dotted keys address nested
/// fields.
pub fn merge_changes(stored: &Document, changes: Document) -> Document {
    let mut merged = stored.clone();
    for (key, value) in changes {
        if key == ID_FIELD || key == VERSION_FIELD {
            continue;
        }
        set_path(&mut merged, &key, value);
    }
    let version = stored.get(VERSION_FIELD).and_then(Value::as_u64).unwrap_or(0);
    merged.insert(VERSION_FIELD.to_string(), Value::from(version + 1));
    merged
}

/// Run the schema's setters and validators on a document about to be written
pub fn prepare_for_write(schema: &dyn Schema, doc: &mut Document) -> StoreResult<()> {
    schema.prepare(doc);
    schema.validate(doc)?;
    Ok(())
}

/// Error for a new document reusing an existing id
pub fn duplicate_id(id: &str) -> StoreError {
    StoreError::DuplicateKey {
        field: ID_FIELD.to_string(),
        value: Value::from(id).to_string(),
    }
}

/// First unique field of `doc` whose value is already held by another document
pub fn find_duplicate<'a, I>(schema: &dyn Schema, doc: &Document, others: I) -> Option<StoreError>
where
    I: IntoIterator<Item = &'a Document>,
{
    let own_id = document_id(doc);
    let others: Vec<&Document> = others
        .into_iter()
        .filter(|other| document_id(other) != own_id)
        .collect();

    schema.unique_fields().iter().find_map(|field| {
        let value = get_path(doc, field).filter(|v| !v.is_null())?;
        others
            .iter()
            .any(|other| get_path(other, field) == Some(value))
            .then(|| StoreError::DuplicateKey {
                field: field.to_string(),
                value: value.to_string(),
            })
    })
}

/// Serve a stored document: hide, decorate, then project
pub fn present(schema: &dyn Schema, doc: Document, projection: &Projection) -> Document {
    projection.apply(schema.present(doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nt_models::TourSchema;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_check_id() {
        assert!(check_id("5c88fa8cf4afda39709c2955").is_err());
        assert!(check_id(&Uuid::new_v4().to_string()).is_ok());
        assert_eq!(
            check_id("abc").unwrap_err().to_string(),
            "Invalid _id: abc"
        );
    }

    #[test]
    fn test_stamp_new() {
        let mut d = doc(json!({ "name": "x" }));
        stamp_new(&mut d).unwrap();
        assert!(check_id(document_id(&d).unwrap()).is_ok());
        assert_eq!(d[VERSION_FIELD], json!(0));
        assert!(d[CREATED_AT_FIELD].as_str().unwrap().ends_with('Z'));

        let mut bad = doc(json!({ "_id": "not-a-uuid" }));
        assert!(matches!(stamp_new(&mut bad), Err(StoreError::InvalidId(_))));
    }

    #[test]
    fn test_merge_changes_protects_identity() {
        let stored = doc(json!({ "_id": "a", "__v": 2, "price": 397, "startLocation": { "address": "Banff" } }));
        let merged = merge_changes(
            &stored,
            doc(json!({ "_id": "b", "price": 497, "startLocation.description": "Canada" })),
        );
        assert_eq!(merged["_id"], json!("a"));
        assert_eq!(merged["__v"], json!(3));
        assert_eq!(merged["price"], json!(497));
        assert_eq!(merged["startLocation"], json!({ "address": "Banff", "description": "Canada" }));
    }

    #[test]
    fn test_find_duplicate() {
        let existing = vec![doc(json!({ "_id": "a", "name": "The Forest Hiker" }))];

        let clash = doc(json!({ "_id": "b", "name": "The Forest Hiker" }));
        match find_duplicate(&TourSchema, &clash, &existing) {
            Some(StoreError::DuplicateKey { field, value }) => {
                assert_eq!(field, "name");
                assert_eq!(value, "\"The Forest Hiker\"");
            }
            other => panic!("expected duplicate, got {:?}", other),
        }

        // a document never clashes with itself
        let same = doc(json!({ "_id": "a", "name": "The Forest Hiker" }));
        assert!(find_duplicate(&TourSchema, &same, &existing).is_none());
    }
}

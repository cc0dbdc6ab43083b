//! Schema trait and shared helpers

use nt_core::{Document, ValidationErrors};
use nt_queries::FilterSet;
use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::Validate;

/// Storage-side rules for one entity type
pub trait Schema: Send + Sync {
    /// Apply defaults and setters before validation
    fn prepare(&self, _doc: &mut Document) {}

    /// Validate a complete document (new, or merged with an update)
    fn validate(&self, doc: &Document) -> Result<(), ValidationErrors>;

    /// Fields whose values must be unique across the collection
    fn unique_fields(&self) -> &'static [&'static str] {
        &[]
    }

    /// Fields that are stored but never served
    fn hidden_fields(&self) -> &'static [&'static str] {
        &[]
    }

    /// Conditions added to every find, update and delete
    fn base_filter(&self) -> FilterSet {
        FilterSet::new()
    }

    /// Add virtual fields to a served document
    fn decorate(&self, _doc: &mut Document) {}

    /// Strip hidden fields and add virtuals
    fn present(&self, mut doc: Document) -> Document {
        for field in self.hidden_fields() {
            doc.remove(*field);
        }
        self.decorate(&mut doc);
        doc
    }
}

/// Schema accepting any document
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSchema;

impl Schema for NoSchema {
    fn validate(&self, _doc: &Document) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

/// Validate a document by reading it as a typed input struct
pub fn validate_as<T>(doc: &Document) -> Result<(), ValidationErrors>
where
    T: DeserializeOwned + Validate,
{
    let input: T = serde_json::from_value(Value::Object(doc.clone())).map_err(|e| {
        let mut errors = ValidationErrors::new();
        errors.add_base(format!("Invalid field value: {}", e));
        errors
    })?;
    input.validate().map_err(ValidationErrors::from)
}

/// Insert `value` when `field` is absent or null
pub fn default_field(doc: &mut Document, field: &str, value: Value) {
    match doc.get(field) {
        Some(existing) if !existing.is_null() => {}
        _ => {
            doc.insert(field.to_string(), value);
        }
    }
}

/// Trim surrounding whitespace from a string field
pub fn trim_field(doc: &mut Document, field: &str) {
    if let Some(Value::String(s)) = doc.get_mut(field) {
        let trimmed = s.trim();
        if trimmed.len() != s.len() {
            *s = trimmed.to_string();
        }
    }
}

/// Lowercase a string field
pub fn lowercase_field(doc: &mut Document, field: &str) {
    if let Some(Value::String(s)) = doc.get_mut(field) {
        *s = s.to_lowercase();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_default_field() {
        let mut d = doc(json!({ "a": null, "b": 2 }));
        default_field(&mut d, "a", json!(1));
        default_field(&mut d, "b", json!(10));
        default_field(&mut d, "c", json!(3));
        assert_eq!(Value::Object(d), json!({ "a": 1, "b": 2, "c": 3 }));
    }

    #[test]
    fn test_trim_and_lowercase() {
        let mut d = doc(json!({ "name": "  The Snow Adventurer ", "difficulty": "DIFFICULT" }));
        trim_field(&mut d, "name");
        lowercase_field(&mut d, "difficulty");
        assert_eq!(d["name"], json!("The Snow Adventurer"));
        assert_eq!(d["difficulty"], json!("difficult"));
    }

    #[test]
    fn test_no_schema_accepts_anything() {
        assert!(NoSchema.validate(&doc(json!({ "anything": [1, 2] }))).is_ok());
        assert!(NoSchema.base_filter().is_empty());
    }
}

//! Field projection
//!
//! Controls which fields of a document are serialized. The identifier is
//! included by every inclusion projection.

use nt_core::{get_path, remove_path, set_path, Document, ID_FIELD, VERSION_FIELD};

/// The set of fields included in or excluded from a serialized document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Every field
    All,
    /// Only these fields, plus `_id`
    Include(Vec<String>),
    /// Every field except these
    Exclude(Vec<String>),
}

impl Default for Projection {
    fn default() -> Self {
        default_projection()
    }
}

impl Projection {
    /// Parse `name,price` (inclusion) or `-__v,-summary` (exclusion).
    ///
    /// A list that mixes both forms is read as an inclusion of the
    /// unprefixed fields.
    pub fn parse(raw: &str) -> Self {
        let fields: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty() && *f != "-")
            .collect();
        if fields.is_empty() {
            return default_projection();
        }
        if fields.iter().all(|f| f.starts_with('-')) {
            return Self::Exclude(fields.iter().map(|f| f[1..].to_string()).collect());
        }
        Self::Include(
            fields
                .iter()
                .filter(|f| !f.starts_with('-'))
                .map(|f| f.to_string())
                .collect(),
        )
    }

    /// Apply this projection to a document
    pub fn apply(&self, doc: Document) -> Document {
        match self {
            Self::All => doc,
            Self::Include(fields) => {
                let mut projected = Document::new();
                if let Some(id) = doc.get(ID_FIELD) {
                    projected.insert(ID_FIELD.to_string(), id.clone());
                }
                for field in fields {
                    if let Some(value) = get_path(&doc, field) {
                        set_path(&mut projected, field, value.clone());
                    }
                }
                projected
            }
            Self::Exclude(fields) => {
                let mut doc = doc;
                for field in fields {
                    remove_path(&mut doc, field);
                }
                doc
            }
        }
    }
}

/// Default projection: hide the internal version counter
pub fn default_projection() -> Projection {
    Projection::Exclude(vec![VERSION_FIELD.to_string()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tour() -> Document {
        json!({
            "_id": "t1",
            "__v": 0,
            "name": "The Park Camper",
            "price": 1497,
            "summary": "Breathing in Nature",
            "startLocation": { "address": "Las Vegas", "description": "Nevada" }
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    #[test]
    fn test_inclusion_keeps_only_listed_and_id() {
        let projected = Projection::parse("name,price").apply(tour());
        let mut keys: Vec<&String> = projected.keys().collect();
        keys.sort();
        assert_eq!(keys, vec!["_id", "name", "price"]);
    }

    #[test]
    fn test_default_hides_version() {
        let projected = Projection::default().apply(tour());
        assert!(!projected.contains_key("__v"));
        assert!(projected.contains_key("summary"));
        assert_eq!(Projection::parse(" , "), default_projection());
    }

    #[test]
    fn test_exclusion_list() {
        let projected = Projection::parse("-summary,-__v").apply(tour());
        assert!(!projected.contains_key("summary"));
        assert!(!projected.contains_key("__v"));
        assert!(projected.contains_key("name"));
    }

    #[test]
    fn test_dotted_inclusion() {
        let projected = Projection::parse("startLocation.address").apply(tour());
        assert_eq!(
            serde_json::Value::Object(projected),
            json!({ "_id": "t1", "startLocation": { "address": "Las Vegas" } })
        );
    }

    #[test]
    fn test_mixed_list_reads_as_inclusion() {
        assert_eq!(
            Projection::parse("name,-price"),
            Projection::Include(vec!["name".to_string()])
        );
    }
}

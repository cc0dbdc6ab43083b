//! Query Sort Orders
//!
//! Sort orders define how query results should be ordered.

use nt_core::{get_path, Document, CREATED_AT_FIELD, ID_FIELD};
use std::cmp::Ordering;

use crate::compare::sort_cmp;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Ascending order (A-Z, 1-9, oldest first)
    #[default]
    Asc,
    /// Descending order (Z-A, 9-1, newest first)
    Desc,
}

impl SortDirection {
    fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            Self::Asc => ordering,
            Self::Desc => ordering.reverse(),
        }
    }
}

/// A single sort criterion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortCriterion {
    /// The field to sort by
    pub field: String,
    /// The sort direction
    pub direction: SortDirection,
}

impl SortCriterion {
    /// Create a new sort criterion
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Create ascending sort
    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    /// Create descending sort
    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }

    /// Parse `price` / `-price`
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        match token.strip_prefix('-') {
            Some(field) if !field.is_empty() => Some(Self::desc(field)),
            Some(_) => None,
            None if !token.is_empty() => Some(Self::asc(token)),
            None => None,
        }
    }
}

/// Collection of sort criteria, primary first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortOrder {
    criteria: Vec<SortCriterion>,
}

impl SortOrder {
    /// Create a new empty sort order
    pub fn new() -> Self {
        Self { criteria: vec![] }
    }

    /// Create with descending sort on single field
    pub fn by_desc(field: impl Into<String>) -> Self {
        Self {
            criteria: vec![SortCriterion::desc(field)],
        }
    }

    /// Create with ascending sort on single field
    pub fn by_asc(field: impl Into<String>) -> Self {
        Self {
            criteria: vec![SortCriterion::asc(field)],
        }
    }

    /// Parse a comma separated list such as `-ratingsAverage,price`
    pub fn parse(raw: &str) -> Self {
        Self {
            criteria: raw.split(',').filter_map(SortCriterion::parse).collect(),
        }
    }

    /// Get all sort criteria
    pub fn criteria(&self) -> &[SortCriterion] {
        &self.criteria
    }

    /// Check if any sort is defined
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Compare two documents; ties fall back to `_id` ascending
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for criterion in &self.criteria {
            let ordering = criterion
                .direction
                .apply(sort_cmp(get_path(a, &criterion.field), get_path(b, &criterion.field)));
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        sort_cmp(a.get(ID_FIELD), b.get(ID_FIELD))
    }
}

/// Default sort order: newest first
pub fn default_sort() -> SortOrder {
    SortOrder::by_desc(CREATED_AT_FIELD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_preserves_order_and_direction() {
        let order = SortOrder::parse("-ratingsAverage,price");
        assert_eq!(
            order.criteria(),
            &[SortCriterion::desc("ratingsAverage"), SortCriterion::asc("price")]
        );
    }

    #[test]
    fn test_parse_skips_empty_tokens() {
        let order = SortOrder::parse("price,, -,duration ");
        assert_eq!(
            order.criteria(),
            &[SortCriterion::asc("price"), SortCriterion::asc("duration")]
        );
        assert!(SortOrder::parse("").is_empty());
    }

    #[test]
    fn test_compare_secondary_and_tiebreak() {
        let order = SortOrder::parse("-ratingsAverage,price");
        let a = doc(json!({ "_id": "1", "ratingsAverage": 4.8, "price": 997 }));
        let b = doc(json!({ "_id": "2", "ratingsAverage": 4.8, "price": 497 }));
        let c = doc(json!({ "_id": "3", "ratingsAverage": 4.9, "price": 1997 }));

        let mut docs = vec![a.clone(), b.clone(), c.clone()];
        docs.sort_by(|x, y| order.compare(x, y));
        assert_eq!(docs, vec![c, b, a]);

        let twin_a = doc(json!({ "_id": "a", "price": 1 }));
        let twin_b = doc(json!({ "_id": "b", "price": 1 }));
        assert_eq!(SortOrder::by_asc("price").compare(&twin_b, &twin_a), Ordering::Greater);
    }

    #[test]
    fn test_default_sort() {
        assert_eq!(default_sort().criteria(), &[SortCriterion::desc(CREATED_AT_FIELD)]);
    }
}

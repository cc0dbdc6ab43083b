//! Query Filters
//!
//! Filters restrict which documents a query returns. Each filter is a
//! condition on one (possibly dotted) field; a `FilterSet` combines them
//! with AND semantics.

use nt_core::{get_path, Document};
use serde_json::{Map, Value};
use std::cmp::Ordering;

use crate::compare::{compare_same_type, values_equal};
use crate::params::{QueryParams, QueryValue};

/// Filter operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Equals
    Eq,
    /// Not equals; also matches documents missing the field
    Ne,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Less than
    Lt,
    /// Less than or equal
    Lte,
    /// Equal to any value of a list
    In,
}

impl FilterOperator {
    /// Parse one of the comparison tokens accepted in query strings.
    ///
    /// Only `gte`, `gt`, `lte` and `lt` are recognised; everything else is
    /// left to literal equality.
    pub fn from_query_token(token: &str) -> Option<Self> {
        match token {
            "gte" => Some(Self::Gte),
            "gt" => Some(Self::Gt),
            "lte" => Some(Self::Lte),
            "lt" => Some(Self::Lt),
            _ => None,
        }
    }

    /// The storage engine's native operator name
    pub fn as_operator(&self) -> &'static str {
        match self {
            Self::Eq => "$eq",
            Self::Ne => "$ne",
            Self::Gt => "$gt",
            Self::Gte => "$gte",
            Self::Lt => "$lt",
            Self::Lte => "$lte",
            Self::In => "$in",
        }
    }

    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Self::Gt => ordering == Ordering::Greater,
            Self::Gte => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Lte => ordering != Ordering::Greater,
            _ => false,
        }
    }
}

/// A single filter condition
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// The field being filtered (e.g., "price", "startLocation.address")
    pub field: String,
    /// The operator to apply
    pub operator: FilterOperator,
    /// The operand; an array for `In`
    pub value: Value,
}

impl Filter {
    /// Create a new filter
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Create an equals filter
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::Eq, value)
    }

    /// Create a not equals filter
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOperator::Ne, value)
    }

    /// Create a membership filter
    pub fn one_of(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self::new(field, FilterOperator::In, Value::Array(values))
    }

    /// Check whether a document satisfies this condition
    pub fn matches(&self, doc: &Document) -> bool {
        let stored = get_path(doc, &self.field);
        match self.operator {
            FilterOperator::Eq => stored.map_or(self.value.is_null(), |s| self.equals(s)),
            FilterOperator::Ne => !stored.map_or(self.value.is_null(), |s| self.equals(s)),
            FilterOperator::In => stored.map_or(false, |s| {
                self.value
                    .as_array()
                    .map_or(false, |options| options.iter().any(|o| element_matches(o, s, values_equal)))
            }),
            op => stored.map_or(false, |s| {
                element_matches(&self.value, s, |value, stored| {
                    compare_same_type(value, stored).map_or(false, |ord| op.accepts(ord))
                })
            }),
        }
    }

    fn equals(&self, stored: &Value) -> bool {
        element_matches(&self.value, stored, values_equal)
    }

    /// Native-operator rendering, e.g. `{"$gte": "500"}`; equality renders bare
    pub fn condition(&self) -> Value {
        match self.operator {
            FilterOperator::Eq => self.value.clone(),
            op => {
                let mut condition = Map::new();
                condition.insert(op.as_operator().to_string(), self.value.clone());
                Value::Object(condition)
            }
        }
    }
}

/// Arrays match when any element matches (or the whole array equals)
fn element_matches<F>(value: &Value, stored: &Value, predicate: F) -> bool
where
    F: Fn(&Value, &Value) -> bool,
{
    match stored {
        Value::Array(elements) => {
            predicate(value, stored) || elements.iter().any(|e| predicate(value, e))
        }
        _ => predicate(value, stored),
    }
}

/// Filter set - a collection of filters with AND semantics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    filters: Vec<Filter>,
}

impl FilterSet {
    /// Create a new empty filter set
    pub fn new() -> Self {
        Self { filters: vec![] }
    }

    /// Translate query parameters into filters.
    ///
    /// `field[gte]=500` becomes a `$gte` comparison, a repeated key becomes
    /// `$in`, anything else is a literal equality on the full key. Values are
    /// kept as strings.
    pub fn from_params(params: &QueryParams) -> Self {
        let mut set = Self::new();
        for (key, value) in params.iter() {
            if let Some((field, operator)) = split_operator(key) {
                set.add(Filter::new(field, operator, Value::String(value.last().to_string())));
                continue;
            }
            match value {
                QueryValue::One(v) => {
                    set.add(Filter::eq(key, Value::String(v.clone())));
                }
                QueryValue::Many(vs) => {
                    set.add(Filter::one_of(
                        key,
                        vs.iter().cloned().map(Value::String).collect(),
                    ));
                }
            }
        }
        set
    }

    /// Add a filter to the set
    pub fn add(&mut self, filter: Filter) -> &mut Self {
        self.filters.push(filter);
        self
    }

    /// Add a filter and return self (builder pattern)
    pub fn with(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Append every filter of another set
    pub fn extend(&mut self, other: FilterSet) {
        self.filters.extend(other.filters);
    }

    /// Get all filters
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Check if any filters are set
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Get number of filters
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Check if a specific field is being filtered
    pub fn has_filter_for(&self, field: &str) -> bool {
        self.filters.iter().any(|f| f.field == field)
    }

    /// Whether a document satisfies every filter
    pub fn matches(&self, doc: &Document) -> bool {
        self.filters.iter().all(|f| f.matches(doc))
    }

    /// Native filter document: `{price: {$gte: "500", $lt: "1500"}, difficulty: "easy"}`
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        for filter in &self.filters {
            let condition = filter.condition();
            if let (Some(Value::Object(existing)), Value::Object(more)) =
                (doc.get_mut(&filter.field), &condition)
            {
                existing.extend(more.clone());
                continue;
            }
            doc.insert(filter.field.clone(), condition);
        }
        doc
    }
}

/// `price[gte]` -> ("price", Gte); `None` for keys without a known token
fn split_operator(key: &str) -> Option<(&str, FilterOperator)> {
    let open = key.find('[')?;
    let token = key[open + 1..].strip_suffix(']')?;
    let field = &key[..open];
    if field.is_empty() {
        return None;
    }
    FilterOperator::from_query_token(token).map(|op| (field, op))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_comparison_tokens() {
        let params = QueryParams::parse("price[gte]=500&duration[lt]=10&ratingsAverage[gt]=4&maxGroupSize[lte]=15");
        let set = FilterSet::from_params(&params);

        assert_eq!(set.len(), 4);
        assert_eq!(set.filters()[0], Filter::new("price", FilterOperator::Gte, json!("500")));
        assert_eq!(set.filters()[1].operator, FilterOperator::Lt);
        assert_eq!(set.filters()[2].operator, FilterOperator::Gt);
        assert_eq!(set.filters()[3].operator, FilterOperator::Lte);
    }

    #[test]
    fn test_to_document_uses_native_operators() {
        let params = QueryParams::parse("price[gte]=500&price[lt]=1500&difficulty=easy");
        let rendered = FilterSet::from_params(&params).to_document();
        assert_eq!(
            Value::Object(rendered),
            json!({ "price": { "$gte": "500", "$lt": "1500" }, "difficulty": "easy" })
        );
    }

    #[test]
    fn test_unknown_tokens_stay_literal() {
        let params = QueryParams::parse("price[where]=1&name=gte&$where=sleep(1)");
        let set = FilterSet::from_params(&params);

        assert_eq!(set.filters()[0], Filter::eq("price[where]", json!("1")));
        assert_eq!(set.filters()[1], Filter::eq("name", json!("gte")));
        assert_eq!(set.filters()[2], Filter::eq("$where", json!("sleep(1)")));
        assert!(set.filters().iter().all(|f| f.operator == FilterOperator::Eq));
    }

    #[test]
    fn test_repeated_key_is_membership() {
        let set = FilterSet::from_params(&QueryParams::parse("duration=5&duration=9"));
        assert_eq!(set.filters()[0].operator, FilterOperator::In);

        assert!(set.matches(&doc(json!({ "duration": 9 }))));
        assert!(!set.matches(&doc(json!({ "duration": 7 }))));
    }

    #[test]
    fn test_gte_compares_numerically() {
        let set = FilterSet::from_params(&QueryParams::parse("price[gte]=500"));

        assert!(set.matches(&doc(json!({ "price": 997 }))));
        assert!(set.matches(&doc(json!({ "price": 500 }))));
        // "497" >= "500" would hold as strings; numerically it must not
        assert!(!set.matches(&doc(json!({ "price": 497 }))));
        assert!(!set.matches(&doc(json!({ "name": "no price" }))));
    }

    #[test]
    fn test_equality_casts_to_stored_type() {
        let set = FilterSet::from_params(&QueryParams::parse("duration=5&secretTour=false&difficulty=easy"));
        assert!(set.matches(&doc(json!({ "duration": 5, "secretTour": false, "difficulty": "easy" }))));
        assert!(!set.matches(&doc(json!({ "duration": 5, "secretTour": true, "difficulty": "easy" }))));
    }

    #[test]
    fn test_ne_matches_missing_fields() {
        let set = FilterSet::new().with(Filter::ne("secretTour", true));
        assert!(set.matches(&doc(json!({ "name": "a" }))));
        assert!(set.matches(&doc(json!({ "secretTour": false }))));
        assert!(!set.matches(&doc(json!({ "secretTour": true }))));
    }

    #[test]
    fn test_array_fields_match_any_element() {
        let set = FilterSet::new().with(Filter::eq("guides", "u1"));
        assert!(set.matches(&doc(json!({ "guides": ["u0", "u1"] }))));
        assert!(!set.matches(&doc(json!({ "guides": ["u2"] }))));
    }

    #[test]
    fn test_dotted_field() {
        let set = FilterSet::from_params(&QueryParams::parse("startLocation.address=Miami"));
        assert!(set.matches(&doc(json!({ "startLocation": { "address": "Miami" } }))));
    }
}

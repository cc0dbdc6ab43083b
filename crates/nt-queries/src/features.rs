//! API Features
//!
//! Translates a listing request's query parameters into restrictions on a
//! base query. Stages run in a fixed order: filter, sort, field selection,
//! pagination. Sorting is applied before paging so pages are stable.

use tracing::debug;

use crate::filters::FilterSet;
use crate::pagination::PageRequest;
use crate::params::QueryParams;
use crate::projection::{default_projection, Projection};
use crate::query::DocumentQuery;
use crate::sorts::{default_sort, SortOrder};

/// Builder applying query-string directives to a `DocumentQuery`
#[derive(Debug, Clone)]
pub struct ApiFeatures {
    query: DocumentQuery,
    params: QueryParams,
}

impl ApiFeatures {
    pub fn new(query: DocumentQuery, params: QueryParams) -> Self {
        Self { query, params }
    }

    /// AND every non-reserved parameter into the query's filter
    pub fn filter(mut self) -> Self {
        let filters = FilterSet::from_params(&self.params.without_reserved());
        debug!(filter = ?filters.to_document(), "applying query filter");
        self.query = self.query.and_all(filters);
        self
    }

    /// `sort=a,-b`, or newest first
    pub fn sort(mut self) -> Self {
        let sort = self
            .params
            .get_last("sort")
            .map(SortOrder::parse)
            .filter(|order| !order.is_empty())
            .unwrap_or_else(default_sort);
        self.query = self.query.sort(sort);
        self
    }

    /// `fields=name,price`, or everything but the version counter
    pub fn limit_fields(mut self) -> Self {
        let projection = self
            .params
            .get_last("fields")
            .map(Projection::parse)
            .unwrap_or_else(default_projection);
        self.query = self.query.select(projection);
        self
    }

    /// `page` and `limit`, with permissive defaults
    pub fn paginate(mut self) -> Self {
        let page = PageRequest::parse(self.params.get_last("page"), self.params.get_last("limit"));
        self.query = self.query.skip(page.skip()).limit(page.limit);
        self
    }

    pub fn into_query(self) -> DocumentQuery {
        self.query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{Filter, FilterOperator};
    use crate::pagination::DEFAULT_LIMIT;
    use crate::sorts::SortCriterion;
    use serde_json::json;

    fn build(raw: &str) -> DocumentQuery {
        ApiFeatures::new(DocumentQuery::all(), QueryParams::parse(raw))
            .filter()
            .sort()
            .limit_fields()
            .paginate()
            .into_query()
    }

    #[test]
    fn test_reserved_keys_are_not_filters() {
        let query = build("page=2&sort=price&limit=10&fields=name&difficulty=easy");
        assert_eq!(query.filter.len(), 1);
        assert_eq!(query.filter.filters()[0], Filter::eq("difficulty", json!("easy")));
    }

    #[test]
    fn test_bracketed_reserved_keys_fall_back_to_defaults() {
        let query = build("limit%5Bgte%5D=2&page%5Blt%5D=3&sort%5Bgt%5D=price");
        assert!(query.filter.is_empty());
        assert_eq!(query.sort, default_sort());
        assert_eq!(query.skip, 0);
        assert_eq!(query.limit, Some(DEFAULT_LIMIT));
    }

    #[test]
    fn test_gte_becomes_native_operator() {
        let query = build("price%5Bgte%5D=500");
        assert_eq!(
            query.filter.filters()[0],
            Filter::new("price", FilterOperator::Gte, json!("500"))
        );
        assert_eq!(
            serde_json::Value::Object(query.filter.to_document()),
            json!({ "price": { "$gte": "500" } })
        );
    }

    #[test]
    fn test_base_filter_is_kept() {
        let base = DocumentQuery::all().and(Filter::eq("tour", "t1"));
        let query = ApiFeatures::new(base, QueryParams::parse("rating[gte]=4"))
            .filter()
            .into_query();
        assert_eq!(query.filter.len(), 2);
        assert!(query.filter.has_filter_for("tour"));
        assert!(query.filter.has_filter_for("rating"));
    }

    #[test]
    fn test_sort_preserves_given_order() {
        let query = build("sort=-ratingsAverage,price");
        assert_eq!(
            query.sort.criteria(),
            &[SortCriterion::desc("ratingsAverage"), SortCriterion::asc("price")]
        );
    }

    #[test]
    fn test_default_sort_and_projection() {
        let query = build("");
        assert_eq!(query.sort, default_sort());
        assert_eq!(query.projection, default_projection());
        assert_eq!(query.skip, 0);
        assert_eq!(query.limit, Some(DEFAULT_LIMIT));
    }

    #[test]
    fn test_empty_sort_falls_back_to_default() {
        assert_eq!(build("sort=").sort, default_sort());
    }

    #[test]
    fn test_fields_projection() {
        let query = build("fields=name,price");
        assert_eq!(
            query.projection,
            Projection::Include(vec!["name".to_string(), "price".to_string()])
        );
    }

    #[test]
    fn test_pagination_skip() {
        let query = build("page=2&limit=10");
        assert_eq!(query.skip, 10);
        assert_eq!(query.limit, Some(10));

        let malformed = build("page=abc&limit=-1");
        assert_eq!(malformed.skip, 0);
        assert_eq!(malformed.limit, Some(DEFAULT_LIMIT));
    }
}

//! Deferred document query
//!
//! A `DocumentQuery` describes a retrieval without performing it. It is
//! composed through chained calls and executed by handing it to a storage
//! collection.

use nt_core::Document;

use crate::filters::{Filter, FilterSet};
use crate::projection::Projection;
use crate::sorts::SortOrder;

/// A not-yet-executed find
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentQuery {
    pub filter: FilterSet,
    pub sort: SortOrder,
    pub projection: Projection,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl DocumentQuery {
    /// Find every document matching `filter`
    pub fn find(filter: FilterSet) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    /// Find every document
    pub fn all() -> Self {
        Self::default()
    }

    /// AND another filter into the query
    pub fn and(mut self, filter: Filter) -> Self {
        self.filter.add(filter);
        self
    }

    /// AND a whole filter set into the query
    pub fn and_all(mut self, filters: FilterSet) -> Self {
        self.filter.extend(filters);
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn select(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Evaluate the query against an in-memory list of documents.
    ///
    /// Order of evaluation: filter, sort, skip/limit, projection.
    pub fn run<'a, I>(&self, documents: I) -> Vec<Document>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let mut matched: Vec<&Document> = documents
            .into_iter()
            .filter(|doc| self.filter.matches(doc))
            .collect();
        matched.sort_by(|a, b| self.sort.compare(a, b));

        let skip = usize::try_from(self.skip).unwrap_or(usize::MAX);
        let limit = self
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);

        matched
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(|doc| self.projection.apply(doc.clone()))
            .collect()
    }
}

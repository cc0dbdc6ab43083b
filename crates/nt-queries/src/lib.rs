//! # nt-queries
//!
//! Query layer for Natours RS.
//!
//! This crate turns REST query strings into composed, deferred document
//! queries without letting clients inject operators.
//!
//! ## Structure
//!
//! - `params` - Ordered query-parameter mapping
//! - `filters` - Filter conditions and operators
//! - `sorts` - Sort orders and directions
//! - `projection` - Field inclusion/exclusion
//! - `pagination` - Page/limit parsing with permissive defaults
//! - `query` - The deferred `DocumentQuery`
//! - `features` - `ApiFeatures`, applying all of the above in order
//!
//! ## Example
//!
//! ```
//! use nt_queries::{ApiFeatures, DocumentQuery, QueryParams};
//!
//! let params = QueryParams::parse("price[gte]=500&sort=-price&fields=name,price&page=2&limit=10");
//! let query = ApiFeatures::new(DocumentQuery::all(), params)
//!     .filter()
//!     .sort()
//!     .limit_fields()
//!     .paginate()
//!     .into_query();
//!
//! assert_eq!(query.skip, 10);
//! assert!(query.filter.has_filter_for("price"));
//! ```

pub mod compare;
pub mod features;
pub mod filters;
pub mod pagination;
pub mod params;
pub mod projection;
pub mod query;
pub mod sorts;

// Re-exports for convenience
pub use features::ApiFeatures;
pub use filters::{Filter, FilterOperator, FilterSet};
pub use pagination::{PageRequest, DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT};
pub use params::{QueryParams, QueryValue, RESERVED_KEYS};
pub use projection::Projection;
pub use query::DocumentQuery;
pub use sorts::{SortCriterion, SortDirection, SortOrder};

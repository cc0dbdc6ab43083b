//! # nt-db
//!
//! Document storage for Natours RS.
//!
//! This crate provides:
//!
//! - The `Collection` trait every handler talks to
//! - An in-memory collection (the default store, also used by tests)
//! - A PostgreSQL collection keeping documents as JSONB
//! - Relation population and the tour aggregations
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use nt_db::{Collection, MemoryCollection};
//! use nt_models::TourSchema;
//! use nt_queries::DocumentQuery;
//!
//! let tours = MemoryCollection::new("tours", Arc::new(TourSchema));
//! let all = tours.find(DocumentQuery::all()).await?;
//! ```

pub mod collection;
pub mod memory;
pub mod pool;
pub mod postgres;
pub mod relations;
pub mod tours;

// Re-exports
pub use collection::{Collection, StoreError, StoreResult};
pub use memory::MemoryCollection;
pub use pool::{Database, PoolStats};
pub use postgres::PgCollection;
pub use relations::{populate_all, Relation, RelationKind};
pub use tours::{monthly_plan, tour_stats};

//! # nt-models
//!
//! Resource schemas for Natours RS.
//!
//! A schema is the storage layer's knowledge of one entity type: defaults,
//! setters, validators, unique and hidden fields, query-time base filters
//! and virtual fields. Every collection applies its schema on writes and
//! reads, so request handlers never validate input themselves.

pub mod review;
pub mod schema;
pub mod tour;
pub mod user;

pub use review::ReviewSchema;
pub use schema::{NoSchema, Schema};
pub use tour::TourSchema;
pub use user::UserSchema;

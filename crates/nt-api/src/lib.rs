//! # nt-api
//!
//! REST API v1 handlers for Natours RS.
//!
//! Every resource is served by the same five generated handlers (see
//! `factory`); resource modules only add what is specific to them.

pub mod envelope;
pub mod error;
pub mod extractors;
pub mod factory;
pub mod handlers;
pub mod routes;

pub use extractors::{AppState, Resources};
pub use factory::{Resource, UPDATE_STATUS};
pub use routes::router;

//! API request handlers
//!
//! Each module wires one resource to its collection and adds the routes the
//! factory does not generate.

pub mod reviews;
pub mod tours;
pub mod users;

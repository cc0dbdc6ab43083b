//! # nt-core
//!
//! Core types and utilities for Natours RS.
//!
//! This crate provides the building blocks shared by the other crates:
//! - The `Document` representation and dotted-path helpers
//! - Validation error collections
//! - Configuration types

pub mod config;
pub mod document;
pub mod error;

pub use document::*;
pub use error::*;

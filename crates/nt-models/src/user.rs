//! User schema
//!
//! Collection: users. Credentials are stored alongside the profile but are
//! never served; deactivated users are invisible to every query.

use std::borrow::Cow;

use nt_core::{Document, ValidationErrors};
use nt_queries::{Filter, FilterSet};
use serde::Deserialize;
use serde_json::json;
use validator::{Validate, ValidationError};

use crate::schema::{default_field, lowercase_field, trim_field, validate_as, Schema};

pub const ROLES: [&str; 4] = ["user", "guide", "lead-guide", "admin"];

#[derive(Debug, Deserialize, Validate)]
pub struct UserInput {
    #[validate(required(message = "Please tell us your name!"))]
    pub name: Option<String>,

    #[validate(
        required(message = "Please provide your email"),
        email(message = "Please provide a valid email")
    )]
    pub email: Option<String>,

    pub photo: Option<String>,

    #[validate(custom = "validate_role")]
    pub role: Option<String>,

    pub active: Option<bool>,
}

fn validate_role(role: &str) -> Result<(), ValidationError> {
    if ROLES.contains(&role) {
        return Ok(());
    }
    let mut error = ValidationError::new("role");
    error.message = Some(Cow::from("Role is either: user, guide, lead-guide or admin"));
    Err(error)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UserSchema;

impl Schema for UserSchema {
    fn prepare(&self, doc: &mut Document) {
        trim_field(doc, "name");
        trim_field(doc, "email");
        lowercase_field(doc, "email");
        default_field(doc, "photo", json!("default.jpg"));
        default_field(doc, "role", json!("user"));
        default_field(doc, "active", json!(true));
    }

    fn validate(&self, doc: &Document) -> Result<(), ValidationErrors> {
        validate_as::<UserInput>(doc)
    }

    fn unique_fields(&self) -> &'static [&'static str] {
        &["email"]
    }

    fn hidden_fields(&self) -> &'static [&'static str] {
        &[
            "password",
            "passwordConfirm",
            "passwordChangedAt",
            "passwordResetToken",
            "passwordResetExpires",
            "active",
        ]
    }

    fn base_filter(&self) -> FilterSet {
        FilterSet::new().with(Filter::ne("active", false))
    }
}

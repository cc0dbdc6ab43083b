//! Review schema
//!
//! Collection: reviews. Each review belongs to one tour and one user.

use nt_core::{Document, ValidationErrors};
use serde::Deserialize;
use validator::Validate;

use crate::schema::{trim_field, validate_as, Schema};

/// Field linking a review to its tour
pub const TOUR_FIELD: &str = "tour";

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewInput {
    #[validate(
        required(message = "Review can not be empty!"),
        length(min = 1, message = "Review can not be empty!")
    )]
    pub review: Option<String>,

    #[validate(range(min = 1.0, max = 5.0, message = "Rating must be between 1 and 5"))]
    pub rating: Option<f64>,

    #[validate(required(message = "Review must belong to a tour."))]
    pub tour: Option<String>,

    #[validate(required(message = "Review must belong to a user"))]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReviewSchema;

impl Schema for ReviewSchema {
    fn prepare(&self, doc: &mut Document) {
        trim_field(doc, "review");
    }

    fn validate(&self, doc: &Document) -> Result<(), ValidationErrors> {
        validate_as::<ReviewInput>(doc)
    }
}

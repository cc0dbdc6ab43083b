//! Tour schema
//!
//! Collection: tours

use std::borrow::Cow;

use nt_core::{Document, ValidationErrors, CREATED_AT_FIELD};
use nt_queries::{Filter, FilterSet};
use serde::Deserialize;
use serde_json::{json, Value};
use validator::{Validate, ValidationError};

use crate::schema::{default_field, lowercase_field, trim_field, validate_as, Schema};

pub const DIFFICULTIES: [&str; 3] = ["easy", "medium", "difficult"];

/// Typed view of a tour document used for validation
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_price_discount"))]
pub struct TourInput {
    #[validate(
        required(message = "A tour must have a name"),
        custom = "validate_name_length"
    )]
    pub name: Option<String>,

    #[validate(required(message = "A tour must have a duration"))]
    pub duration: Option<f64>,

    #[validate(required(message = "A tour must have a group size"))]
    pub max_group_size: Option<f64>,

    #[validate(
        required(message = "A tour must have a difficulty"),
        custom = "validate_difficulty"
    )]
    pub difficulty: Option<String>,

    #[validate(custom = "validate_rating")]
    pub ratings_average: Option<f64>,

    pub ratings_quantity: Option<f64>,

    #[validate(required(message = "A tour must have a price"))]
    pub price: Option<f64>,

    pub price_discount: Option<f64>,

    #[validate(required(message = "A tour must have a summary"))]
    pub summary: Option<String>,

    pub description: Option<String>,
    pub image_cover: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub start_dates: Vec<String>,
    pub secret_tour: Option<bool>,
    #[serde(default)]
    pub guides: Vec<String>,
}

fn validation_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::from(message));
    error
}

fn validate_name_length(name: &str) -> Result<(), ValidationError> {
    match name.chars().count() {
        n if n > 40 => Err(validation_error(
            "length",
            "A tour name must have less or equal than 40 characters name",
        )),
        n if n < 10 => Err(validation_error(
            "length",
            "A tour name must have more or equal than 10 characters name",
        )),
        _ => Ok(()),
    }
}

fn validate_rating(rating: f64) -> Result<(), ValidationError> {
    if rating < 1.0 {
        return Err(validation_error("range", "Rating must be above 1.0"));
    }
    if rating > 5.0 {
        return Err(validation_error("range", "Rating must be below 5.0"));
    }
    Ok(())
}

fn validate_difficulty(difficulty: &str) -> Result<(), ValidationError> {
    if DIFFICULTIES.contains(&difficulty) {
        return Ok(());
    }
    Err(validation_error(
        "difficulty",
        "Difficulty is either: easy, medium or difficult",
    ))
}

fn validate_price_discount(tour: &TourInput) -> Result<(), ValidationError> {
    match (tour.price_discount, tour.price) {
        (Some(discount), Some(price)) if discount >= price => {
            let mut error = ValidationError::new("priceDiscount");
            error.message = Some(Cow::from(format!(
                "Discount price ({}) should be below regular price",
                discount
            )));
            Err(error)
        }
        _ => Ok(()),
    }
}

/// Round to one decimal place (4.666 -> 4.7)
fn round_rating(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TourSchema;

impl Schema for TourSchema {
    fn prepare(&self, doc: &mut Document) {
        trim_field(doc, "name");
        trim_field(doc, "summary");
        trim_field(doc, "description");
        lowercase_field(doc, "difficulty");
        default_field(doc, "ratingsAverage", json!(4.5));
        default_field(doc, "ratingsQuantity", json!(0));
        default_field(doc, "secretTour", json!(false));

        if let Some(rating) = doc.get("ratingsAverage").and_then(Value::as_f64) {
            doc.insert("ratingsAverage".to_string(), json!(round_rating(rating)));
        }
    }

    fn validate(&self, doc: &Document) -> Result<(), ValidationErrors> {
        validate_as::<TourInput>(doc)
    }

    fn unique_fields(&self) -> &'static [&'static str] {
        &["name"]
    }

    fn hidden_fields(&self) -> &'static [&'static str] {
        &[CREATED_AT_FIELD]
    }

    fn base_filter(&self) -> FilterSet {
        FilterSet::new().with(Filter::ne("secretTour", true))
    }

    fn decorate(&self, doc: &mut Document) {
        if let Some(duration) = doc.get("duration").and_then(Value::as_f64) {
            doc.insert("durationWeeks".to_string(), json!(duration / 7.0));
        }
    }
}

//! Tour API handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use nt_db::{monthly_plan, tour_stats, Collection, Relation};
use nt_models::review::TOUR_FIELD;
use nt_queries::{Projection, QueryParams};
use serde_json::Value;

use crate::envelope::Envelope;
use crate::error::{ApiError, ApiResult};
use crate::extractors::{AppState, RequestQuery, RouteParams};
use crate::factory::{self, Resource};

/// Fields served by the top-tours alias
pub const TOP_TOURS_FIELDS: &str = "name,price,ratingsAverage,summary,difficulty";

/// Tours with their guides populated from `users`
pub fn resource(tours: Arc<dyn Collection>, users: Arc<dyn Collection>) -> Resource {
    let guides = Relation::references("guides", users).with_projection(Projection::Exclude(vec![
        "__v".to_string(),
        "passwordChangedAt".to_string(),
    ]));
    Resource::new("tour", "tours", tours).with_relation(guides)
}

/// A tour's reviews, populated on single-tour reads
pub fn reviews_relation(reviews: Arc<dyn Collection>) -> Relation {
    Relation::virtual_many("reviews", reviews, TOUR_FIELD)
}

/// Preset the listing parameters of the five best cheap tours
pub fn alias_top_tours(query: &mut QueryParams) {
    query.set("limit", "5");
    query.set("sort", "-ratingsAverage,price");
    query.set("fields", TOP_TOURS_FIELDS);
}

/// GET /api/v1/tours/top-5-cheap
pub async fn top_5_cheap(
    State(state): State<AppState>,
    params: RouteParams,
    RequestQuery(mut query): RequestQuery,
) -> ApiResult<Response> {
    alias_top_tours(&mut query);
    factory::list(&state.resources.tours, &params, query).await
}

/// GET /api/v1/tours/tour-stats
pub async fn get_tour_stats(State(state): State<AppState>) -> ApiResult<Response> {
    let stats = tour_stats(state.resources.tours.collection.as_ref()).await?;
    Ok(Envelope::keyed("stats", Value::Array(stats)).into_response())
}

/// GET /api/v1/tours/monthly-plan/:year
pub async fn get_monthly_plan(
    State(state): State<AppState>,
    Path(year): Path<String>,
) -> ApiResult<Response> {
    let year: i32 = year
        .parse()
        .map_err(|_| ApiError::bad_request(format!("Invalid year: {}", year)))?;

    let plan = monthly_plan(state.resources.tours.collection.as_ref(), year).await?;
    let months = plan.len();
    Ok(Envelope::keyed("plan", Value::Array(plan))
        .with_results(months)
        .into_response())
}

//! API routes

use axum::{
    extract::{DefaultBodyLimit, OriginalUri},
    http::Method,
    middleware,
    routing::get,
    Router,
};

use crate::error::{mask_unexpected_errors, ApiError};
use crate::extractors::{AppState, Resources};
use crate::factory::{create_one, delete_one, get_all, get_one, update_one};
use crate::handlers::{tours, users};

/// Create the complete API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_router(&state.resources))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(state.config.server.max_body_size_bytes))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            mask_unexpected_errors,
        ))
        .with_state(state)
}

fn api_v1_router(resources: &Resources) -> Router<AppState> {
    Router::new()
        .nest("/tours", tours_router(resources))
        .nest("/reviews", reviews_router(resources))
        .nest("/users", users_router(resources))
}

fn tours_router(resources: &Resources) -> Router<AppState> {
    let tour_resource = resources.tours.clone();
    let tour_reviews = resources.tour_reviews.clone();
    let reviews_of_tour = tours::reviews_relation(resources.reviews.collection.clone());

    Router::new()
        .route("/", get_all(tour_resource.clone()).merge(create_one(tour_resource.clone())))
        .route("/top-5-cheap", get(tours::top_5_cheap))
        .route("/tour-stats", get(tours::get_tour_stats))
        .route("/monthly-plan/:year", get(tours::get_monthly_plan))
        .route(
            "/:id",
            get_one(tour_resource.clone(), vec![reviews_of_tour])
                .merge(update_one(tour_resource.clone()))
                .merge(delete_one(tour_resource)),
        )
        .route(
            "/:id/reviews",
            get_all(tour_reviews.clone()).merge(create_one(tour_reviews)),
        )
}

fn reviews_router(resources: &Resources) -> Router<AppState> {
    let reviews = resources.reviews.clone();

    Router::new()
        .route("/", get_all(reviews.clone()).merge(create_one(reviews.clone())))
        .route(
            "/:id",
            get_one(reviews.clone(), vec![])
                .merge(update_one(reviews.clone()))
                .merge(delete_one(reviews)),
        )
}

fn users_router(resources: &Resources) -> Router<AppState> {
    let user_resource = resources.users.clone();

    Router::new()
        .route("/", get_all(user_resource.clone()).post(users::create_user))
        .route(
            "/:id",
            get_one(user_resource.clone(), vec![])
                .merge(update_one(user_resource.clone()))
                .merge(delete_one(user_resource)),
        )
}

async fn route_not_found(OriginalUri(uri): OriginalUri) -> ApiError {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    ApiError::RouteNotFound(path.to_string())
}

async fn method_not_allowed(method: Method, OriginalUri(uri): OriginalUri) -> ApiError {
    ApiError::MethodNotAllowed {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}

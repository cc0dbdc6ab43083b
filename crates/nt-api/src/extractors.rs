//! Axum extractors for API handlers

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Path, Request},
    http::{request::Parts, StatusCode},
    Json,
};
use nt_core::config::AppConfig;
use nt_core::Document;
use nt_db::{Collection, MemoryCollection};
use nt_models::{ReviewSchema, TourSchema, UserSchema};
use nt_queries::QueryParams;

use crate::error::ApiError;
use crate::factory::Resource;
use crate::handlers::{reviews, tours, users};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub resources: Arc<Resources>,
}

impl AppState {
    pub fn new(config: AppConfig, resources: Resources) -> Self {
        Self {
            config: Arc::new(config),
            resources: Arc::new(resources),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default(), Resources::in_memory())
    }
}

/// The served resources, wired to their collections
pub struct Resources {
    pub tours: Arc<Resource>,
    pub reviews: Arc<Resource>,
    /// Reviews of the tour named in the path
    pub tour_reviews: Arc<Resource>,
    pub users: Arc<Resource>,
}

impl Resources {
    pub fn new(
        tour_store: Arc<dyn Collection>,
        review_store: Arc<dyn Collection>,
        user_store: Arc<dyn Collection>,
    ) -> Self {
        Self {
            tours: Arc::new(tours::resource(tour_store, user_store.clone())),
            reviews: Arc::new(reviews::resource(review_store.clone())),
            tour_reviews: Arc::new(reviews::nested_resource(review_store)),
            users: Arc::new(users::resource(user_store)),
        }
    }

    /// Everything kept in process memory
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryCollection::new("tours", Arc::new(TourSchema))),
            Arc::new(MemoryCollection::new("reviews", Arc::new(ReviewSchema))),
            Arc::new(MemoryCollection::new("users", Arc::new(UserSchema))),
        )
    }
}

/// Path parameters by name; empty when the route has none
#[derive(Debug, Clone, Default)]
pub struct RouteParams(pub HashMap<String, String>);

impl RouteParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// The `id` parameter every single-document route carries
    pub fn id(&self) -> Result<&str, ApiError> {
        self.get("id")
            .ok_or_else(|| ApiError::bad_request("Missing id in path"))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RouteParams
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let params = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map(|Path(params)| params)
            .unwrap_or_default();
        Ok(RouteParams(params))
    }
}

/// Raw query string as ordered parameters
#[derive(Debug, Clone, Default)]
pub struct RequestQuery(pub QueryParams);

#[async_trait]
impl<S> FromRequestParts<S> for RequestQuery
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestQuery(QueryParams::parse(parts.uri.query().unwrap_or_default())))
    }
}

/// JSON object body; rejections become API errors
#[derive(Debug, Clone)]
pub struct JsonBody(pub Document);

#[async_trait]
impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<Document>::from_request(req, state).await {
            Ok(Json(body)) => Ok(JsonBody(body)),
            Err(rejection) => Err(body_rejection(rejection)),
        }
    }
}

fn body_rejection(rejection: JsonRejection) -> ApiError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("Request body is too large".to_string())
    } else {
        ApiError::bad_request(rejection.body_text())
    }
}

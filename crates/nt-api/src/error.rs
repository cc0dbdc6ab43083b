//! API error handling
//!
//! Every failure reaches the client through `IntoResponse for ApiError`, as
//! `{status: "fail" | "error", message}`.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use nt_core::ValidationErrors;
use nt_db::StoreError;
use serde::Serialize;

use crate::extractors::AppState;

/// Message sent in place of unexpected errors outside development
pub const GENERIC_ERROR_MESSAGE: &str = "Something went very wrong!";

/// API error types
#[derive(Debug)]
pub enum ApiError {
    NotFound { resource: &'static str },
    BadRequest(String),
    PayloadTooLarge(String),
    Storage(StoreError),
    NotDefined(String),
    RouteNotFound(String),
    MethodNotAllowed { method: String, path: String },
}

impl ApiError {
    pub fn not_found(resource: &'static str) -> Self {
        ApiError::NotFound { resource }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } | ApiError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Storage(err) => match err {
                StoreError::InvalidId(_)
                | StoreError::DuplicateKey { .. }
                | StoreError::Validation(_) => StatusCode::BAD_REQUEST,
                StoreError::Database(_) | StoreError::Serialization(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::NotDefined(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Errors the client caused or is meant to see; anything else is a bug
    /// or an outage and is masked in production
    pub fn is_operational(&self) -> bool {
        !matches!(
            self,
            ApiError::Storage(StoreError::Database(_))
                | ApiError::Storage(StoreError::Serialization(_))
        )
    }

    pub fn message(&self) -> String {
        match self {
            ApiError::NotFound { resource } => format!("No {} found with that ID", resource),
            ApiError::BadRequest(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::NotDefined(msg) => msg.clone(),
            ApiError::Storage(err) => match err {
                StoreError::InvalidId(value) => format!("Invalid _id: {}.", value),
                StoreError::DuplicateKey { value, .. } => {
                    format!("Duplicate field value: {}. Please use another value!", value)
                }
                StoreError::Validation(errors) => invalid_input(errors),
                other => other.to_string(),
            },
            ApiError::RouteNotFound(path) => format!("Can't find {} on this server", path),
            ApiError::MethodNotAllowed { method, path } => {
                format!("{} is not allowed on {}", method, path)
            }
        }
    }
}

fn invalid_input(errors: &ValidationErrors) -> String {
    format!("Invalid input data. {}", errors.full_messages().join(". "))
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Storage(err)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
}

impl ErrorBody {
    fn for_status(status: StatusCode, message: String) -> Self {
        Self {
            status: if status.is_client_error() { "fail" } else { "error" },
            message,
        }
    }
}

/// Marks a response produced by a non-operational error
#[derive(Debug, Clone, Copy)]
pub struct UnexpectedError;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();

        if !self.is_operational() {
            tracing::error!(error = ?self, "unexpected error");
        } else if status.is_server_error() {
            tracing::warn!(%status, %message, "request failed");
        } else {
            tracing::debug!(%status, %message, "request rejected");
        }

        let mut response = (status, Json(ErrorBody::for_status(status, message))).into_response();
        if !self.is_operational() {
            response.extensions_mut().insert(UnexpectedError);
        }
        response
    }
}

/// Replace unexpected error details with a generic message unless running
/// in development
pub async fn mask_unexpected_errors(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if state.config.environment.is_development()
        || response.extensions().get::<UnexpectedError>().is_none()
    {
        return response;
    }

    let status = StatusCode::INTERNAL_SERVER_ERROR;
    (
        status,
        Json(ErrorBody::for_status(status, GENERIC_ERROR_MESSAGE.to_string())),
    )
        .into_response()
}

pub type ApiResult<T> = Result<T, ApiError>;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::auth::AuthError;
use crate::leads::LeadServiceError;
use crate::staff::{PasswordHashError, StaffServiceError};
use crate::store::RepositoryError;
use crate::validation::FieldErrors;

pub const NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";
pub const PERMISSION_DENIED: &str = "You do not have permission to perform this action.";

/// Everything a handler can fail with, already mapped to a status code.
#[derive(Debug)]
pub enum ApiError {
    Validation(FieldErrors),
    BadRequest(String),
    Unauthorized(&'static str),
    Forbidden,
    NotFound,
    Internal,
}

impl ApiError {
    fn repository(error: RepositoryError) -> Self {
        error!(error = %error, "repository failure");
        ApiError::Internal
    }

    fn hashing(error: PasswordHashError) -> Self {
        error!(error = %error, "password hashing failure");
        ApiError::Internal
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::Unauthorized(detail) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "detail": detail }))).into_response()
            }
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(json!({ "detail": PERMISSION_DENIED })),
            )
                .into_response(),
            ApiError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." }))).into_response()
            }
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "detail": "A server error occurred." })),
            )
                .into_response(),
        }
    }
}

impl From<LeadServiceError> for ApiError {
    fn from(error: LeadServiceError) -> Self {
        match error {
            LeadServiceError::Validation(errors) => ApiError::Validation(errors),
            LeadServiceError::NotFound => ApiError::NotFound,
            LeadServiceError::Forbidden(_) => ApiError::Forbidden,
            LeadServiceError::Repository(error) => ApiError::repository(error),
        }
    }
}

impl From<StaffServiceError> for ApiError {
    fn from(error: StaffServiceError) -> Self {
        match error {
            StaffServiceError::Validation(errors) => ApiError::Validation(errors),
            StaffServiceError::NotFound => ApiError::NotFound,
            StaffServiceError::Forbidden(_) => ApiError::Forbidden,
            StaffServiceError::Hashing(error) => ApiError::hashing(error),
            StaffServiceError::Repository(error) => ApiError::repository(error),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::Validation(errors) => ApiError::Validation(errors),
            AuthError::Unauthorized(detail) => ApiError::Unauthorized(detail),
            AuthError::Hashing(error) => ApiError::hashing(error),
            AuthError::Repository(error) => ApiError::repository(error),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Ids that do not parse cannot name a record.
impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::NotFound
    }
}

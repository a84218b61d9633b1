use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use super::service::{Credentials, Registration};
use crate::api::{run_blocking, ApiError, ApiState};
use crate::staff::StaffIdentity;
use crate::store::Store;

/// Public endpoints: login, registration, and access-token refresh.
pub fn auth_routes<R>() -> Router<ApiState<R>>
where
    R: Store,
{
    Router::new()
        .route("/auth/login/", post(login_handler::<R>))
        .route("/auth/register/", post(register_handler::<R>))
        .route("/auth/token/refresh/", post(refresh_handler::<R>))
}

#[derive(Debug, Deserialize)]
pub(crate) struct RefreshRequest {
    refresh: String,
}

pub(crate) async fn login_handler<R>(
    State(state): State<ApiState<R>>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, ApiError>
where
    R: Store,
{
    let Json(credentials) = payload?;
    let auth = state.auth.clone();
    let grant = run_blocking(move || auth.login(credentials)).await?;
    let body = json!({
        "message": "Login successful",
        "access": grant.access,
        "refresh": grant.refresh,
        "user": grant.user,
    });
    Ok((StatusCode::OK, Json(body)).into_response())
}

pub(crate) async fn register_handler<R>(
    State(state): State<ApiState<R>>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> Result<Response, ApiError>
where
    R: Store,
{
    let Json(registration) = payload?;
    let auth = state.auth.clone();
    let account = run_blocking(move || auth.register(registration)).await?;
    let body = json!({
        "message": "User registered successfully",
        "user": StaffIdentity::from(&account),
    });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub(crate) async fn refresh_handler<R>(
    State(state): State<ApiState<R>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Response, ApiError>
where
    R: Store,
{
    let Json(request) = payload?;
    let access = state.auth.refresh(&request.refresh)?;
    Ok((StatusCode::OK, Json(json!({ "access": access }))).into_response())
}

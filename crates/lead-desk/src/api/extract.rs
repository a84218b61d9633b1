use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderValue;

use super::error::{ApiError, NOT_AUTHENTICATED};
use super::ApiState;
use crate::access::Actor;
use crate::store::Store;

/// Resolves `Authorization: Bearer <token>` to the acting staff member.
#[axum::async_trait]
impl<R> FromRequestParts<ApiState<R>> for Actor
where
    R: Store,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState<R>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(bearer_token)
            .ok_or(ApiError::Unauthorized(NOT_AUTHENTICATED))?;
        Ok(state.auth.authenticate(token)?)
    }
}

fn bearer_token(value: &HeaderValue) -> Option<&str> {
    let (scheme, token) = value.to_str().ok()?.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use super::domain::{StaffDetail, StaffId, StaffInput, StaffOrdering, StaffPatch, StaffQuery};
use crate::access::Actor;
use crate::api::{run_blocking, ApiError, ApiState};
use crate::store::{PageRequest, Store};

/// Administrative staff endpoints.
pub fn staff_routes<R>() -> Router<ApiState<R>>
where
    R: Store,
{
    Router::new()
        .route("/staffs/", get(list_handler::<R>))
        .route("/staffs/create/", post(create_handler::<R>))
        .route("/staffs/:id/", get(detail_handler::<R>))
        .route(
            "/staffs/:id/update/",
            put(replace_handler::<R>).patch(patch_handler::<R>),
        )
        .route("/staffs/:id/delete/", delete(delete_handler::<R>))
}

#[derive(Debug, Default, Deserialize)]
pub struct StaffListParams {
    pub search: Option<String>,
    pub ordering: Option<StaffOrdering>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl From<StaffListParams> for StaffQuery {
    fn from(params: StaffListParams) -> Self {
        StaffQuery {
            search: params.search.filter(|term| !term.trim().is_empty()),
            ordering: params.ordering.unwrap_or_default(),
            page: PageRequest::new(params.page, params.page_size),
        }
    }
}

pub(crate) async fn list_handler<R>(
    State(state): State<ApiState<R>>,
    actor: Actor,
    params: Result<Query<StaffListParams>, QueryRejection>,
) -> Result<Response, ApiError>
where
    R: Store,
{
    let Query(params) = params?;
    let page = state.staff.list(&StaffQuery::from(params), &actor)?;
    Ok(Json(page).into_response())
}

pub(crate) async fn create_handler<R>(
    State(state): State<ApiState<R>>,
    actor: Actor,
    payload: Result<Json<StaffInput>, JsonRejection>,
) -> Result<Response, ApiError>
where
    R: Store,
{
    let Json(input) = payload?;
    let staff = state.staff.clone();
    let account = run_blocking(move || staff.create(input, &actor)).await?;
    let body = json!({
        "message": "Staff created successfully",
        "staff_id": account.id,
    });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub(crate) async fn detail_handler<R>(
    State(state): State<ApiState<R>>,
    id: Result<Path<u64>, PathRejection>,
    actor: Actor,
) -> Result<Response, ApiError>
where
    R: Store,
{
    let Path(id) = id?;
    let account = state.staff.get(StaffId(id), &actor)?;
    Ok(Json(StaffDetail::from(&account)).into_response())
}

pub(crate) async fn replace_handler<R>(
    State(state): State<ApiState<R>>,
    id: Result<Path<u64>, PathRejection>,
    actor: Actor,
    payload: Result<Json<StaffInput>, JsonRejection>,
) -> Result<Response, ApiError>
where
    R: Store,
{
    let Path(id) = id?;
    let Json(input) = payload?;
    let staff = state.staff.clone();
    run_blocking(move || staff.update(StaffId(id), StaffPatch::from(input), &actor)).await?;
    Ok(updated())
}

pub(crate) async fn patch_handler<R>(
    State(state): State<ApiState<R>>,
    id: Result<Path<u64>, PathRejection>,
    actor: Actor,
    payload: Result<Json<StaffPatch>, JsonRejection>,
) -> Result<Response, ApiError>
where
    R: Store,
{
    let Path(id) = id?;
    let Json(patch) = payload?;
    let staff = state.staff.clone();
    run_blocking(move || staff.update(StaffId(id), patch, &actor)).await?;
    Ok(updated())
}

pub(crate) async fn delete_handler<R>(
    State(state): State<ApiState<R>>,
    id: Result<Path<u64>, PathRejection>,
    actor: Actor,
) -> Result<Response, ApiError>
where
    R: Store,
{
    let Path(id) = id?;
    state.staff.delete(StaffId(id), &actor)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

fn updated() -> Response {
    Json(json!({ "message": "Staff updated successfully" })).into_response()
}

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use super::domain::{
    LeadId, LeadPatch, LeadPriority, LeadSource, LeadStatus, LeadSubmission, ProcessingStatus,
    ProcessingUpdateSubmission,
};
use super::repository::{LeadOrdering, LeadQuery};
use crate::access::Actor;
use crate::api::{ApiError, ApiState};
use crate::staff::StaffId;
use crate::store::{PageRequest, Store};

/// Lead endpoints. Every route needs a bearer token; capability checks happen
/// in the lifecycle engine.
pub fn lead_routes<R>() -> Router<ApiState<R>>
where
    R: Store,
{
    Router::new()
        .route("/leads/", get(list_handler::<R>))
        .route("/leads/create/", post(create_handler::<R>))
        .route(
            "/leads/:id/",
            get(detail_handler::<R>)
                .put(replace_handler::<R>)
                .patch(patch_handler::<R>)
                .delete(delete_handler::<R>),
        )
        .route("/leads/:id/timeline/", get(timeline_handler::<R>))
        .route("/leads/:id/remarks/", get(remarks_handler::<R>))
        .route(
            "/leads/:id/processing-updates/",
            post(processing_update_handler::<R>),
        )
}

/// Query string accepted by the lead list.
#[derive(Debug, Default, Deserialize)]
pub struct LeadListParams {
    pub priority: Option<LeadPriority>,
    pub status: Option<LeadStatus>,
    pub source: Option<LeadSource>,
    pub processing_status: Option<ProcessingStatus>,
    pub assigned_to: Option<StaffId>,
    pub search: Option<String>,
    pub ordering: Option<LeadOrdering>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl From<LeadListParams> for LeadQuery {
    fn from(params: LeadListParams) -> Self {
        LeadQuery {
            priority: params.priority,
            status: params.status,
            source: params.source,
            processing_status: params.processing_status,
            assigned_to: params.assigned_to,
            search: params.search.filter(|term| !term.trim().is_empty()),
            ordering: params.ordering.unwrap_or_default(),
            page: PageRequest::new(params.page, params.page_size),
        }
    }
}

pub(crate) async fn list_handler<R>(
    State(state): State<ApiState<R>>,
    actor: Actor,
    params: Result<Query<LeadListParams>, QueryRejection>,
) -> Result<Response, ApiError>
where
    R: Store,
{
    let Query(params) = params?;
    let page = state.leads.list(&LeadQuery::from(params), &actor)?;
    Ok(Json(page).into_response())
}

pub(crate) async fn create_handler<R>(
    State(state): State<ApiState<R>>,
    actor: Actor,
    payload: Result<Json<LeadSubmission>, JsonRejection>,
) -> Result<Response, ApiError>
where
    R: Store,
{
    let Json(submission) = payload?;
    let lead = state.leads.create(submission, &actor)?;
    let body = json!({
        "message": "Lead created successfully",
        "lead_id": lead.id,
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
    let lead = state.leads.get(LeadId(id), &actor)?;
    Ok(Json(lead).into_response())
}

pub(crate) async fn replace_handler<R>(
    State(state): State<ApiState<R>>,
    id: Result<Path<u64>, PathRejection>,
    actor: Actor,
    payload: Result<Json<LeadSubmission>, JsonRejection>,
) -> Result<Response, ApiError>
where
    R: Store,
{
    let Path(id) = id?;
    let Json(submission) = payload?;
    state
        .leads
        .update(LeadId(id), LeadPatch::from(submission), &actor)?;
    Ok(updated())
}

pub(crate) async fn patch_handler<R>(
    State(state): State<ApiState<R>>,
    id: Result<Path<u64>, PathRejection>,
    actor: Actor,
    payload: Result<Json<LeadPatch>, JsonRejection>,
) -> Result<Response, ApiError>
where
    R: Store,
{
    let Path(id) = id?;
    let Json(patch) = payload?;
    state.leads.update(LeadId(id), patch, &actor)?;
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
    state.leads.delete(LeadId(id), &actor)?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

pub(crate) async fn timeline_handler<R>(
    State(state): State<ApiState<R>>,
    id: Result<Path<u64>, PathRejection>,
    actor: Actor,
) -> Result<Response, ApiError>
where
    R: Store,
{
    let Path(id) = id?;
    let timeline = state.leads.timeline(LeadId(id), &actor)?;
    Ok(Json(timeline).into_response())
}

pub(crate) async fn remarks_handler<R>(
    State(state): State<ApiState<R>>,
    id: Result<Path<u64>, PathRejection>,
    actor: Actor,
) -> Result<Response, ApiError>
where
    R: Store,
{
    let Path(id) = id?;
    let history = state.leads.remark_history(LeadId(id), &actor)?;
    Ok(Json(history).into_response())
}

pub(crate) async fn processing_update_handler<R>(
    State(state): State<ApiState<R>>,
    id: Result<Path<u64>, PathRejection>,
    actor: Actor,
    payload: Result<Json<ProcessingUpdateSubmission>, JsonRejection>,
) -> Result<Response, ApiError>
where
    R: Store,
{
    let Path(id) = id?;
    let Json(submission) = payload?;
    let update = state
        .leads
        .submit_processing_update(LeadId(id), submission, &actor)?;
    Ok((StatusCode::CREATED, Json(update)).into_response())
}

fn updated() -> Response {
    Json(json!({ "message": "Lead updated successfully" })).into_response()
}

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use server_api::{
    create_tutorial, delete_all_tutorials, delete_tutorial, get_tutorial,
    list_published_tutorials, list_tutorials, update_tutorial,
};
use shared::{
    domain::{Tutorial, TutorialId},
    error::{ApiError, ErrorCode, MessageResponse},
    protocol::{CreateTutorialRequest, ListTutorialsQuery, UpdateTutorialRequest},
};
use tracing::{debug, error};

use crate::app_state::AppState;

pub(crate) type HttpError = (StatusCode, Json<MessageResponse>);

pub(crate) async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, HttpError> {
    state.api.store.health_check().await.map_err(|e| {
        error!(error = %e, "health check failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(MessageResponse::new("store unavailable")),
        )
    })?;
    Ok("ok")
}

pub(crate) async fn http_create_tutorial(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateTutorialRequest>, JsonRejection>,
) -> Result<Json<Tutorial>, HttpError> {
    let Json(req) = body.map_err(bad_json)?;
    let tutorial = create_tutorial(&state.api, req).await.map_err(http_error)?;
    Ok(Json(tutorial))
}

pub(crate) async fn http_list_tutorials(
    State(state): State<Arc<AppState>>,
    Query(q): Query<ListTutorialsQuery>,
) -> Result<Json<Vec<Tutorial>>, HttpError> {
    let tutorials = list_tutorials(&state.api, q).await.map_err(http_error)?;
    Ok(Json(tutorials))
}

pub(crate) async fn http_list_published_tutorials(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Tutorial>>, HttpError> {
    let tutorials = list_published_tutorials(&state.api)
        .await
        .map_err(http_error)?;
    Ok(Json(tutorials))
}

pub(crate) async fn http_get_tutorial(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Tutorial>, HttpError> {
    let Path(id) = id.map_err(bad_path)?;
    let tutorial = get_tutorial(&state.api, TutorialId(id))
        .await
        .map_err(http_error)?;
    Ok(Json(tutorial))
}

pub(crate) async fn http_update_tutorial(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdateTutorialRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, HttpError> {
    let Path(id) = id.map_err(bad_path)?;
    let Json(req) = body.map_err(bad_json)?;
    let confirmation = update_tutorial(&state.api, TutorialId(id), req)
        .await
        .map_err(http_error)?;
    Ok(Json(confirmation))
}

pub(crate) async fn http_delete_tutorial(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>, HttpError> {
    let Path(id) = id.map_err(bad_path)?;
    let confirmation = delete_tutorial(&state.api, TutorialId(id))
        .await
        .map_err(http_error)?;
    Ok(Json(confirmation))
}

pub(crate) async fn http_delete_all_tutorials(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, HttpError> {
    let confirmation = delete_all_tutorials(&state.api)
        .await
        .map_err(http_error)?;
    Ok(Json(confirmation))
}

pub(crate) fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn http_error(err: ApiError) -> HttpError {
    let status = status_for(err.code);
    if !status.is_server_error() {
        debug!(%status, message = %err.message, "request rejected");
    }
    (status, Json(err.into()))
}

/// Keeps malformed bodies on the `{ "message": .. }` error shape.
fn bad_json(rejection: JsonRejection) -> HttpError {
    let status = rejection.status();
    let message = rejection.body_text();
    debug!(%status, %message, "rejected request body");
    (status, Json(MessageResponse::new(message)))
}

fn bad_path(rejection: PathRejection) -> HttpError {
    let status = rejection.status();
    let message = rejection.body_text();
    debug!(%status, %message, "rejected path parameter");
    (status, Json(MessageResponse::new(message)))
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;

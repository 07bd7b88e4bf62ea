//! Tenant ("project") lifecycle endpoints.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use taskforge_core::{ActionResult, Tenant};

use crate::error::{action, ApiError};
use crate::extract::{ApiJson, ApiPath};
use crate::handlers::NameRequest;
use crate::state::AppState;

pub async fn list_projects(State(state): State<AppState>) -> Result<Json<Vec<Tenant>>, ApiError> {
    Ok(Json(state.provisioning.list().await?))
}

pub async fn get_project(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Tenant>, ApiError> {
    Ok(Json(state.provisioning.get(id).await?))
}

/// Provision a tenant. A degraded tenant still answers 201, with a warning.
pub async fn create_project(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<NameRequest>,
) -> Response {
    match state.provisioning.create(&body.name).await {
        Ok(provisioned) => (
            StatusCode::CREATED,
            Json(ActionResult::ok(provisioned.tenant).with_warning(provisioned.warning)),
        )
            .into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

pub async fn rename_project(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(body): ApiJson<NameRequest>,
) -> Response {
    action(StatusCode::OK, state.provisioning.rename(id, &body.name).await)
}

pub async fn delete_project(State(state): State<AppState>, ApiPath(id): ApiPath<i64>) -> Response {
    match state.provisioning.delete(id).await {
        Ok(report) => {
            let warning = (!report.index_deleted)
                .then(|| "Project deleted but its search index could not be removed".to_string());
            (
                StatusCode::OK,
                Json(ActionResult::ok(report).with_warning(warning)),
            )
                .into_response()
        }
        Err(e) => ApiError(e).into_response(),
    }
}

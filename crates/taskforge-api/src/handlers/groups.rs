use axum::{
    extract::State,
    http::StatusCode,
    response::Response,
    Json,
};
use uuid::Uuid;

use taskforge_core::Group;

use crate::error::{action, ApiError};
use crate::extract::{ApiJson, ApiPath};
use crate::handlers::NameRequest;
use crate::state::AppState;

/// Groups of a project; empty for an unknown project.
pub async fn list_groups(
    State(state): State<AppState>,
    ApiPath(project_id): ApiPath<i64>,
) -> Result<Json<Vec<Group>>, ApiError> {
    Ok(Json(state.board.list_groups(project_id).await?))
}

pub async fn create_group(
    State(state): State<AppState>,
    ApiPath(project_id): ApiPath<i64>,
    ApiJson(body): ApiJson<NameRequest>,
) -> Response {
    action(
        StatusCode::CREATED,
        state.board.create_group(project_id, &body.name).await,
    )
}

pub async fn rename_group(
    State(state): State<AppState>,
    ApiPath((project_id, group_id)): ApiPath<(i64, Uuid)>,
    ApiJson(body): ApiJson<NameRequest>,
) -> Response {
    action(
        StatusCode::OK,
        state
            .board
            .rename_group(project_id, group_id, &body.name)
            .await,
    )
}

pub async fn delete_group(
    State(state): State<AppState>,
    ApiPath((project_id, group_id)): ApiPath<(i64, Uuid)>,
) -> Response {
    action(
        StatusCode::OK,
        state.board.delete_group(project_id, group_id).await,
    )
}

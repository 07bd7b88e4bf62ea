use axum::{
    extract::State,
    http::StatusCode,
    response::Response,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use taskforge_core::{NewTask, Task, TaskStatus, TaskUpdate};

use crate::error::{action, ApiError};
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;

/// Drag-and-drop move.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: TaskStatus,
    #[serde(default)]
    pub position: Option<i32>,
}

/// Tasks of one group by position; empty for an unknown project.
pub async fn list_tasks(
    State(state): State<AppState>,
    ApiPath((project_id, group_id)): ApiPath<(i64, Uuid)>,
) -> Result<Json<Vec<Task>>, ApiError> {
    Ok(Json(state.board.list_tasks(project_id, group_id).await?))
}

pub async fn create_task(
    State(state): State<AppState>,
    ApiPath(project_id): ApiPath<i64>,
    ApiJson(body): ApiJson<NewTask>,
) -> Response {
    action(
        StatusCode::CREATED,
        state.board.create_task(project_id, body).await,
    )
}

pub async fn update_task(
    State(state): State<AppState>,
    ApiPath((project_id, task_id)): ApiPath<(i64, Uuid)>,
    ApiJson(body): ApiJson<TaskUpdate>,
) -> Response {
    action(
        StatusCode::OK,
        state.board.update_task(project_id, task_id, body).await,
    )
}

pub async fn update_task_status(
    State(state): State<AppState>,
    ApiPath((project_id, task_id)): ApiPath<(i64, Uuid)>,
    ApiJson(body): ApiJson<StatusRequest>,
) -> Response {
    action(
        StatusCode::OK,
        state
            .board
            .update_task_status(project_id, task_id, body.status, body.position)
            .await,
    )
}

pub async fn delete_task(
    State(state): State<AppState>,
    ApiPath((project_id, task_id)): ApiPath<(i64, Uuid)>,
) -> Response {
    action(
        StatusCode::OK,
        state.board.delete_task(project_id, task_id).await,
    )
}

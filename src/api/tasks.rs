//! Task endpoints, including the drag-and-drop move.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};

use super::server::ApiState;
use crate::error::ApiResult;
use crate::types::{NewTask, TaskMove, TaskUpdate};
use crate::validate::required_id;

#[derive(Debug, Deserialize)]
pub(super) struct TaskListQuery {
    section_id: Option<i64>,
}

/// `GET /api/tasks?section_id=`
pub(super) async fn list_tasks(
    State(state): State<ApiState>,
    query: Result<Query<TaskListQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let section_id = required_id(query.section_id, "section_id")?;
    let tasks = state.db().list_tasks(section_id)?;
    Ok(Json(json!({ "success": true, "tasks": tasks })))
}

/// `POST /api/tasks`
pub(super) async fn create_task(
    State(state): State<ApiState>,
    body: Result<Json<NewTask>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(input) = body?;
    let task = state.db().create_task(&input)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Task created",
            "task_id": task.id,
            "task": task,
        })),
    ))
}

/// `GET /api/tasks/{id}`: the task with its links.
pub(super) async fn get_task(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let task = state.db().get_task_with_links(id)?;
    Ok(Json(json!({ "success": true, "task": task })))
}

/// `PUT /api/tasks/{id}`
pub(super) async fn update_task(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<TaskUpdate>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(input) = body?;
    let task = state.db().update_task(id, &input)?;
    Ok(Json(json!({
        "success": true,
        "message": "Task updated",
        "task": task,
    })))
}

/// `PATCH /api/tasks/{id}` with `{new_section_id?, new_position?}`.
pub(super) async fn move_task(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<TaskMove>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(request) = body?;
    let task = state.db().move_task(id, &request)?;
    Ok(Json(json!({
        "success": true,
        "message": "Task moved",
        "task": task,
    })))
}

/// `DELETE /api/tasks/{id}`
pub(super) async fn delete_task(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    state.db().delete_task(id)?;
    Ok(Json(json!({ "success": true, "message": "Task deleted" })))
}

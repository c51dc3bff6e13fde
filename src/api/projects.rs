//! Project endpoints.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
};
use serde_json::{Value, json};

use super::server::ApiState;
use crate::error::ApiResult;
use crate::types::{NewProject, ProjectListQuery, ProjectUpdate};

/// `GET /api/projects?search=&status=`
pub(super) async fn list_projects(
    State(state): State<ApiState>,
    query: Result<Query<ProjectListQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let projects = state.db().list_projects(&query)?;
    Ok(Json(json!({ "success": true, "projects": projects })))
}

/// `POST /api/projects`
pub(super) async fn create_project(
    State(state): State<ApiState>,
    body: Result<Json<NewProject>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(input) = body?;
    let project = state.db().create_project(&input)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Project created",
            "project_id": project.id,
            "project": project,
        })),
    ))
}

/// `GET /api/projects/{id}`: the full board view.
pub(super) async fn get_project_view(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let view = state.db().project_view(id)?;
    Ok(Json(json!({
        "success": true,
        "project": view.project,
        "sections": view.sections,
    })))
}

/// `PUT|PATCH /api/projects/{id}`
pub(super) async fn update_project(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<ProjectUpdate>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(input) = body?;
    let project = state.db().update_project(id, &input)?;
    Ok(Json(json!({
        "success": true,
        "message": "Project updated",
        "project": project,
    })))
}

/// `DELETE /api/projects/{id}`
pub(super) async fn delete_project(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    state.db().delete_project(id)?;
    Ok(Json(json!({ "success": true, "message": "Project deleted" })))
}

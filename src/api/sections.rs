//! Section endpoints.

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
use crate::error::{ApiError, ApiResult};
use crate::types::{NewSection, SectionUpdate};
use crate::validate::required_id;

#[derive(Debug, Deserialize)]
pub(super) struct SectionListQuery {
    project_id: Option<i64>,
}

/// `GET /api/sections?project_id=`
pub(super) async fn list_sections(
    State(state): State<ApiState>,
    query: Result<Query<SectionListQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let project_id = required_id(query.project_id, "project_id")?;
    let sections = state.db().list_sections(project_id)?;
    Ok(Json(json!({ "success": true, "sections": sections })))
}

/// `POST /api/sections`
pub(super) async fn create_section(
    State(state): State<ApiState>,
    body: Result<Json<NewSection>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(input) = body?;
    let section = state.db().create_section(&input)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Section created",
            "section_id": section.id,
            "section": section,
        })),
    ))
}

/// `GET /api/sections/{id}`
pub(super) async fn get_section(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let section = state
        .db()
        .get_section(id)?
        .ok_or_else(|| ApiError::section_not_found(id))?;
    Ok(Json(json!({ "success": true, "section": section })))
}

/// `PUT|PATCH /api/sections/{id}`
pub(super) async fn update_section(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<SectionUpdate>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(input) = body?;
    let section = state.db().update_section(id, &input)?;
    Ok(Json(json!({
        "success": true,
        "message": "Section updated",
        "section": section,
    })))
}

/// `DELETE /api/sections/{id}`: only empty sections can be deleted.
pub(super) async fn delete_section(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    state.db().delete_section(id)?;
    Ok(Json(json!({ "success": true, "message": "Section deleted" })))
}

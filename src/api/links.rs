//! Link endpoints.

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
use crate::types::{LinkUpdate, NewLink};
use crate::validate::{required_id, required_str};

#[derive(Debug, Deserialize)]
pub(super) struct LinkListQuery {
    linkable_type: Option<String>,
    linkable_id: Option<i64>,
}

/// `GET /api/links?linkable_type=&linkable_id=`
pub(super) async fn list_links(
    State(state): State<ApiState>,
    query: Result<Query<LinkListQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(query) = query?;
    let linkable_type = required_str(query.linkable_type.as_deref(), "linkable_type")?;
    let linkable_id = required_id(query.linkable_id, "linkable_id")?;
    let links = state.db().list_links(&linkable_type, linkable_id)?;
    Ok(Json(json!({ "success": true, "links": links })))
}

/// `POST /api/links`
pub(super) async fn create_link(
    State(state): State<ApiState>,
    body: Result<Json<NewLink>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(input) = body?;
    let link = state.db().create_link(&input)?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Link created",
            "link_id": link.id,
            "link": link,
        })),
    ))
}

/// `GET /api/links/{id}`
pub(super) async fn get_link(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let link = state
        .db()
        .get_link(id)?
        .ok_or_else(|| ApiError::link_not_found(id))?;
    Ok(Json(json!({ "success": true, "link": link })))
}

/// `PUT|PATCH /api/links/{id}`
pub(super) async fn update_link(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
    body: Result<Json<LinkUpdate>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(input) = body?;
    let link = state.db().update_link(id, &input)?;
    Ok(Json(json!({
        "success": true,
        "message": "Link updated",
        "link": link,
    })))
}

/// `DELETE /api/links/{id}`
pub(super) async fn delete_link(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    state.db().delete_link(id)?;
    Ok(Json(json!({ "success": true, "message": "Link deleted" })))
}

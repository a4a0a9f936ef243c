//! File library endpoints
//!
//! Listing, artwork, streaming, deletion, and promotion for the scratch
//! and finalized storage areas. Names always resolve through the
//! registry, which rejects anything pointing outside an area root.

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::error::{ApiError, ApiResult};
use crate::models::{Area, FileEntry};
use crate::AppState;

/// File listing response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesResponse {
    pub scratch_files: Vec<FileEntry>,
    pub finalized_files: Vec<FileEntry>,
}

/// Batch move request body
#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub names: Option<Vec<String>>,
}

/// Batch move response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveResponse {
    pub success: bool,
    pub moved_count: usize,
    pub errors: Vec<String>,
}

/// Deletion response
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
}

/// GET /files - contents of both storage areas
pub async fn list_files(State(state): State<AppState>) -> ApiResult<Json<FilesResponse>> {
    let scratch_files = state.registry.list(Area::Scratch).await?;
    let finalized_files = state.registry.list(Area::Finalized).await?;
    Ok(Json(FilesResponse {
        scratch_files,
        finalized_files,
    }))
}

/// GET /thumbnail/:area/:name - embedded artwork image
pub async fn thumbnail(
    State(state): State<AppState>,
    Path((area, name)): Path<(String, String)>,
) -> ApiResult<Response> {
    let area = parse_area(&area)?;
    let (mime, bytes) = state.registry.artwork(area, &name).await?;
    Ok(([(CONTENT_TYPE, mime)], bytes).into_response())
}

/// GET /stream/:area/:name - stream a file, honoring Range requests
pub async fn stream_file(
    State(state): State<AppState>,
    Path((area, name)): Path<(String, String)>,
    request: Request,
) -> ApiResult<Response> {
    let area = parse_area(&area)?;
    let path = state.registry.resolve(area, &name)?;
    let response = ServeFile::new(path)
        .oneshot(request)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(response.map(Body::new))
}

/// DELETE /delete/:area/:name - remove a file from its area
pub async fn delete_file(
    State(state): State<AppState>,
    Path((area, name)): Path<(String, String)>,
) -> ApiResult<Json<DeleteResponse>> {
    let area = parse_area(&area)?;
    state.registry.delete(area, &name).await?;
    Ok(Json(DeleteResponse { success: true }))
}

/// POST /move - promote scratch files into finalized storage
///
/// Per-name failures land in `errors`; the rest of the batch still
/// moves.
pub async fn move_files(
    State(state): State<AppState>,
    Json(request): Json<MoveRequest>,
) -> ApiResult<Json<MoveResponse>> {
    let names = request
        .names
        .filter(|names| !names.is_empty())
        .ok_or_else(|| ApiError::BadRequest("names is required".to_string()))?;

    let outcome = state.registry.move_to_finalized(&names).await?;
    Ok(Json(MoveResponse {
        success: outcome.errors.is_empty(),
        moved_count: outcome.moved.len(),
        errors: outcome.errors,
    }))
}

fn parse_area(area: &str) -> Result<Area, ApiError> {
    Area::parse(area).ok_or_else(|| ApiError::BadRequest(format!("Unknown storage area: {area}")))
}

/// Build file library routes
pub fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/files", get(list_files))
        .route("/thumbnail/:area/:name", get(thumbnail))
        .route("/stream/:area/:name", get(stream_file))
        .route("/delete/:area/:name", delete(delete_file))
        .route("/move", post(move_files))
}

//! Media URL preview endpoint

use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::services::extractor::PreviewInfo;
use crate::AppState;

/// Preview request body
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub url: Option<String>,
}

/// POST /preview - fetch metadata for a URL without downloading
///
/// Returns a single-video or playlist description; playlists carry an
/// entry count and up to five sampled entries.
pub async fn preview(
    State(state): State<AppState>,
    Json(request): Json<PreviewRequest>,
) -> ApiResult<Json<PreviewInfo>> {
    let url = request
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("url is required".to_string()))?;

    let info = state.extractor.preview(&url).await?;
    Ok(Json(info))
}

/// Build preview routes
pub fn preview_routes() -> Router<AppState> {
    Router::new().route("/preview", post(preview))
}

//! Download submission and job inspection endpoints

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::Job;
use crate::AppState;

/// Download request body
#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    pub url: Option<String>,
    /// Speed adjustment factor; omitted or 1.0 keeps the original tempo
    pub speed: Option<f64>,
}

/// Download acceptance response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub download_id: Uuid,
}

/// Job listing response
#[derive(Debug, Serialize)]
pub struct JobsResponse {
    pub jobs: Vec<Job>,
}

/// POST /download - accept a download job
///
/// Validation happens here; the pipeline itself runs on a background
/// task and reports through `/status/:id` and the event stream.
pub async fn start_download(
    State(state): State<AppState>,
    Json(request): Json<DownloadRequest>,
) -> ApiResult<Json<DownloadResponse>> {
    let url = request
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("url is required".to_string()))?;

    let speed = request.speed.unwrap_or(1.0);
    if !speed.is_finite() || speed <= 0.0 {
        return Err(ApiError::BadRequest(format!(
            "Invalid speed factor: {speed}"
        )));
    }

    let job = state.store.create(&url, speed).await;
    state.runner.spawn(job.id);

    Ok(Json(DownloadResponse {
        download_id: job.id,
    }))
}

/// GET /status/:id - current snapshot of one job
pub async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Job>> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| ApiError::NotFound(format!("unknown download id: {id}")))?;
    let job = state
        .store
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("unknown download id: {id}")))?;
    Ok(Json(job))
}

/// GET /jobs - all jobs, newest first
pub async fn list_jobs(State(state): State<AppState>) -> Json<JobsResponse> {
    Json(JobsResponse {
        jobs: state.store.list().await,
    })
}

/// Build download routes
pub fn download_routes() -> Router<AppState> {
    Router::new()
        .route("/download", post(start_download))
        .route("/status/:id", get(job_status))
        .route("/jobs", get(list_jobs))
}

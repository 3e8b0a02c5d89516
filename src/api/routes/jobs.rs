//! Job status handlers.

use crate::api::AppState;
use crate::error::Error;
use crate::types::JobId;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};

/// GET /jobs - List tracked jobs, oldest first
#[utoipa::path(
    get,
    path = "/jobs",
    tag = "jobs",
    responses(
        (status = 200, description = "Tracked jobs", body = Vec<Job>)
    )
)]
pub async fn list_jobs(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.node.jobs().list())
}

/// GET /jobs/:id - Poll one job
#[utoipa::path(
    get,
    path = "/jobs/{id}",
    tag = "jobs",
    params(
        ("id" = String, Path, description = "Job id")
    ),
    responses(
        (status = 200, description = "Job status", body = Job),
        (status = 404, description = "Unknown or swept job")
    )
)]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> impl IntoResponse {
    match state.node.jobs().get_status(JobId(id)) {
        Some(job) => (StatusCode::OK, Json(job)).into_response(),
        None => Error::NotFound(format!("job {}", id)).into_response(),
    }
}

//! Debug log handlers.

use super::DebugLogRequest;
use crate::api::AppState;
use crate::debug_log::DebugLogFilter;
use crate::error::Error;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};

/// POST /debug/log - Append a debug log entry
#[utoipa::path(
    post,
    path = "/debug/log",
    tag = "debug",
    request_body = DebugLogRequest,
    responses(
        (status = 201, description = "Entry appended", body = DebugLogEntry),
        (status = 400, description = "Empty message")
    )
)]
pub async fn append_debug_log(
    State(state): State<AppState>,
    Json(request): Json<DebugLogRequest>,
) -> impl IntoResponse {
    if request.message.trim().is_empty() {
        return Error::Validation("message must not be empty".into()).into_response();
    }
    let entry = state
        .node
        .debug_log()
        .append(request.message, request.level, request.meta);
    (StatusCode::CREATED, Json(entry)).into_response()
}

/// GET /debug/logs - Read debug log entries, oldest first
#[utoipa::path(
    get,
    path = "/debug/logs",
    tag = "debug",
    params(
        ("level" = Option<String>, Query, description = "info, warn or error"),
        ("since" = Option<String>, Query, description = "RFC 3339 lower bound"),
        ("limit" = Option<usize>, Query, description = "Newest N entries")
    ),
    responses(
        (status = 200, description = "Matching entries", body = Vec<DebugLogEntry>)
    )
)]
pub async fn list_debug_logs(
    State(state): State<AppState>,
    Query(filter): Query<DebugLogFilter>,
) -> impl IntoResponse {
    Json(state.node.debug_log().entries(&filter))
}

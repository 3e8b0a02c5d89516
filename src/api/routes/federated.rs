//! Federated pointer and aggregation handlers.

use super::{AggregateRequest, QueuedResponse};
use crate::api::AppState;
use crate::error::Error;
use crate::types::ArticleFederated;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

/// GET /articles/federated - List federated pointers
#[utoipa::path(
    get,
    path = "/articles/federated",
    tag = "federated",
    responses(
        (status = 200, description = "Federated pointers", body = Vec<ArticleFederated>),
        (status = 503, description = "Federated store not ready")
    )
)]
pub async fn list_federated(State(state): State<AppState>) -> impl IntoResponse {
    let store = match state.node.stores().federated() {
        Ok(store) => store,
        Err(e) => return e.into_response(),
    };
    match store.all().await {
        Ok(pointers) => (StatusCode::OK, Json(pointers)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /articles/federated - Receive a replicated pointer
#[utoipa::path(
    post,
    path = "/articles/federated",
    tag = "federated",
    request_body = ArticleFederated,
    responses(
        (status = 200, description = "Pointer stored or already known"),
        (status = 400, description = "Missing cid or invalid url"),
        (status = 503, description = "Federated store not ready")
    )
)]
pub async fn add_federated(
    State(state): State<AppState>,
    Json(pointer): Json<ArticleFederated>,
) -> impl IntoResponse {
    if !matches!(url::Url::parse(&pointer.url), Ok(u) if matches!(u.scheme(), "http" | "https")) {
        return Error::Validation(format!("'{}' is not an absolute http(s) url", pointer.url))
            .into_response();
    }

    let store = match state.node.stores().federated() {
        Ok(store) => store,
        Err(e) => return e.into_response(),
    };
    let cid = pointer.cid.clone();
    match store.add(pointer, false).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(json!({"success": true, "cid": cid, "added": outcome.is_added()})),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /articles/aggregate - Aggregate provider endpoints in the background
#[utoipa::path(
    post,
    path = "/articles/aggregate",
    tag = "federated",
    request_body = AggregateRequest,
    responses(
        (status = 202, description = "Aggregation queued", body = QueuedResponse),
        (status = 400, description = "No endpoints given or configured")
    )
)]
pub async fn aggregate(
    State(state): State<AppState>,
    Json(request): Json<AggregateRequest>,
) -> impl IntoResponse {
    match state.node.dispatch_aggregation(request.endpoints) {
        Ok(job_id) => (StatusCode::ACCEPTED, Json(QueuedResponse::new(job_id))).into_response(),
        Err(e) => e.into_response(),
    }
}

//! Analyzed article handlers.

use super::{AnalyzedQuery, QueuedResponse};
use crate::api::AppState;
use crate::error::Error;
use crate::node::Resolved;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

/// GET /articles/analyzed - List analyzed articles, or read one by id
#[utoipa::path(
    get,
    path = "/articles/analyzed",
    tag = "analyzed",
    params(
        ("id" = Option<String>, Query, description = "Analyzed id or local article id")
    ),
    responses(
        (status = 200, description = "Analyzed article(s)"),
        (status = 404, description = "No analysis for this id"),
        (status = 503, description = "Analyzed store not ready")
    )
)]
pub async fn list_analyzed(
    State(state): State<AppState>,
    Query(query): Query<AnalyzedQuery>,
) -> impl IntoResponse {
    if let Some(id) = query.id {
        return match state.node.find_analyzed(id).await {
            Ok(Some(analyzed)) => (StatusCode::OK, Json(json!(analyzed))).into_response(),
            Ok(None) => Error::NotFound(format!("analysis for {}", id)).into_response(),
            Err(e) => e.into_response(),
        };
    }

    let store = match state.node.stores().analyzed() {
        Ok(store) => store,
        Err(e) => return e.into_response(),
    };
    match store.all().await {
        Ok(mut analyzed) => {
            analyzed.sort_by(|a, b| b.analysis_timestamp.cmp(&a.analysis_timestamp));
            (StatusCode::OK, Json(json!(analyzed))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// GET /articles/analyzed/full - Analyzed article, analyzing it if missing
#[utoipa::path(
    get,
    path = "/articles/analyzed/full",
    tag = "analyzed",
    params(
        ("id" = String, Query, description = "Analyzed id or local article id")
    ),
    responses(
        (status = 200, description = "Analyzed article"),
        (status = 202, description = "Analysis queued", body = QueuedResponse),
        (status = 400, description = "Missing id"),
        (status = 404, description = "Article not found"),
        (status = 503, description = "No AI backend or analyzed store")
    )
)]
pub async fn analyzed_full(
    State(state): State<AppState>,
    Query(query): Query<AnalyzedQuery>,
) -> impl IntoResponse {
    let Some(id) = query.id else {
        return Error::Validation("id is required".into()).into_response();
    };
    match state.node.analyzed_full(id).await {
        Ok(Resolved::Ready(analyzed)) => (StatusCode::OK, Json(json!(analyzed))).into_response(),
        Ok(Resolved::Queued(job_id)) => {
            (StatusCode::ACCEPTED, Json(QueuedResponse::new(job_id))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

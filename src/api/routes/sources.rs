//! Source registry handlers.

use super::ListSourcesQuery;
use crate::api::AppState;
use crate::error::Error;
use crate::sources::SourceOverride;
use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

/// GET /sources - List merged sources
#[utoipa::path(
    get,
    path = "/sources",
    tag = "sources",
    params(
        ("withMeta" = Option<bool>, Query, description = "Attach articleCount and latestPublishedAt per source")
    ),
    responses(
        (status = 200, description = "Effective source list", body = Vec<Source>),
        (status = 503, description = "Local store not ready (withMeta only)")
    )
)]
pub async fn list_sources(
    State(state): State<AppState>,
    Query(query): Query<ListSourcesQuery>,
) -> impl IntoResponse {
    let sources = state.node.sources().sources().await;
    if !query.with_meta {
        return (StatusCode::OK, Json(json!(sources))).into_response();
    }

    let mut meta = match state.node.source_meta().await {
        Ok(meta) => meta,
        Err(e) => return e.into_response(),
    };

    let listed: Vec<serde_json::Value> = sources
        .into_iter()
        .map(|source| {
            let stats = meta.remove(&source.name).unwrap_or_default();
            let mut value = json!(source);
            if let Some(object) = value.as_object_mut() {
                object.insert("meta".into(), json!(stats));
            }
            value
        })
        .collect();
    (StatusCode::OK, Json(json!(listed))).into_response()
}

/// POST /sources/update - Upsert a source override
///
/// The body is any subset of source fields plus `name`; fields not given
/// keep their current value.
#[utoipa::path(
    post,
    path = "/sources/update",
    tag = "sources",
    request_body(content = Source, description = "Partial source; only name is required"),
    responses(
        (status = 200, description = "Override saved", body = Source),
        (status = 400, description = "Missing name or invalid resulting source"),
        (status = 500, description = "Override file could not be written")
    )
)]
pub async fn update_source(
    State(state): State<AppState>,
    Json(partial): Json<SourceOverride>,
) -> impl IntoResponse {
    let Some(name) = partial
        .get("name")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    else {
        return Error::Validation("source name is required".into()).into_response();
    };

    match state.node.sources().update(&name, partial).await {
        Ok(source) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": format!("source {} updated", name),
                "source": source
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

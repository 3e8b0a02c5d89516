//! Fetch and local article store handlers.

use super::{
    FetchQuery, FullArticleQuery, ListArticlesQuery, LocalFetchRequest, QueuedResponse,
    RefetchRequest, SaveArticleRequest,
};
use crate::api::AppState;
use crate::error::Error;
use crate::node::{ArticleLookup, Resolved};
use crate::store::AddOutcome;
use crate::types::Article;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

/// GET /articles/fetch - Fetch every enabled source in the background
#[utoipa::path(
    get,
    path = "/articles/fetch",
    tag = "articles",
    params(
        ("language" = Option<String>, Query, description = "Translate titles into this language"),
        ("skipTranslation" = Option<bool>, Query, description = "Skip title translation")
    ),
    responses(
        (status = 202, description = "Fetch queued", body = QueuedResponse),
        (status = 503, description = "Shutting down")
    )
)]
pub async fn fetch_all(
    State(state): State<AppState>,
    Query(query): Query<FetchQuery>,
) -> impl IntoResponse {
    let options = query.into_options();
    let params = json!(options);
    match state.node.dispatch_fetch_all(options) {
        Ok(job_id) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "success": true,
                "jobId": job_id,
                "params": params,
                "status": "queued"
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /articles/fetch/:source - Fetch one source in the background
#[utoipa::path(
    get,
    path = "/articles/fetch/{source}",
    tag = "articles",
    params(
        ("source" = String, Path, description = "Source name"),
        ("language" = Option<String>, Query, description = "Translate titles into this language"),
        ("skipTranslation" = Option<bool>, Query, description = "Skip title translation")
    ),
    responses(
        (status = 202, description = "Fetch queued", body = QueuedResponse),
        (status = 404, description = "Unknown source"),
        (status = 409, description = "Source disabled")
    )
)]
pub async fn fetch_source(
    State(state): State<AppState>,
    Path(source): Path<String>,
    Query(query): Query<FetchQuery>,
) -> impl IntoResponse {
    match state
        .node
        .dispatch_fetch_source(&source, query.into_options())
        .await
    {
        Ok(job_id) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "success": true,
                "jobId": job_id,
                "source": source,
                "status": "queued"
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /articles/local/fetch - Fetch a supplied source list in the background
#[utoipa::path(
    post,
    path = "/articles/local/fetch",
    tag = "articles",
    request_body = LocalFetchRequest,
    responses(
        (status = 202, description = "Fetch queued"),
        (status = 400, description = "Empty source list")
    )
)]
pub async fn fetch_local(
    State(state): State<AppState>,
    Json(request): Json<LocalFetchRequest>,
) -> impl IntoResponse {
    let count = request.sources.len();
    match state
        .node
        .dispatch_fetch_sources(request.sources, request.options)
    {
        Ok(job_id) => (
            StatusCode::ACCEPTED,
            Json(json!({
                "success": true,
                "message": format!("fetching {} source(s) in the background", count),
                "jobId": job_id
            })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /articles/local - List local articles, newest first
#[utoipa::path(
    get,
    path = "/articles/local",
    tag = "articles",
    params(
        ("source" = Option<String>, Query, description = "Only articles from this source"),
        ("limit" = Option<usize>, Query, description = "Maximum number of articles")
    ),
    responses(
        (status = 200, description = "Local articles", body = Vec<Article>),
        (status = 503, description = "Local store not ready")
    )
)]
pub async fn list_local(
    State(state): State<AppState>,
    Query(query): Query<ListArticlesQuery>,
) -> impl IntoResponse {
    let local = match state.node.stores().local() {
        Ok(local) => local,
        Err(e) => return e.into_response(),
    };
    let source = query.source;
    let mut articles = match local
        .query(|a| source.as_deref().is_none_or(|s| a.source == s))
        .await
    {
        Ok(articles) => articles,
        Err(e) => return e.into_response(),
    };

    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    if let Some(limit) = query.limit {
        articles.truncate(limit);
    }
    (StatusCode::OK, Json(articles)).into_response()
}

/// GET /articles/local/full - Article with full content
///
/// Returns the article when its content is stored, otherwise queues a job
/// that resolves (and, with an AI backend, analyzes) it.
#[utoipa::path(
    get,
    path = "/articles/local/full",
    tag = "articles",
    params(
        ("id" = Option<String>, Query, description = "Article id"),
        ("cid" = Option<String>, Query, description = "Content id"),
        ("url" = Option<String>, Query, description = "Article url")
    ),
    responses(
        (status = 200, description = "Article with content", body = Article),
        (status = 202, description = "Resolution queued", body = QueuedResponse),
        (status = 400, description = "No id, cid or url"),
        (status = 404, description = "Article not found")
    )
)]
pub async fn local_full(
    State(state): State<AppState>,
    Query(query): Query<FullArticleQuery>,
) -> impl IntoResponse {
    let lookup = ArticleLookup {
        id: query.id,
        cid: query.cid,
        url: query.url,
    };
    match state.node.local_full(&lookup).await {
        Ok(Resolved::Ready(article)) => (StatusCode::OK, Json(json!(article))).into_response(),
        Ok(Resolved::Queued(job_id)) => {
            (StatusCode::ACCEPTED, Json(QueuedResponse::new(job_id))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// POST /articles/local/save - Store one article
#[utoipa::path(
    post,
    path = "/articles/local/save",
    tag = "articles",
    request_body = SaveArticleRequest,
    responses(
        (status = 200, description = "Article stored"),
        (status = 400, description = "Invalid article"),
        (status = 409, description = "Url exists and overwrite is false")
    )
)]
pub async fn save_local(
    State(state): State<AppState>,
    Json(request): Json<SaveArticleRequest>,
) -> impl IntoResponse {
    let url = request.article.url.clone();
    match state.node.save_local(request.article, request.overwrite).await {
        Ok(AddOutcome::Added { replaced }) => (
            StatusCode::OK,
            Json(json!({"success": true, "url": url, "overwritten": replaced})),
        )
            .into_response(),
        Ok(AddOutcome::Skipped) => Error::Duplicate(url).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /articles/local/refetch - Add articles, skipping existing urls
#[utoipa::path(
    post,
    path = "/articles/local/refetch",
    tag = "articles",
    request_body = RefetchRequest,
    responses(
        (status = 200, description = "Number of new articles"),
        (status = 503, description = "Local store not ready")
    )
)]
pub async fn refetch_local(
    State(state): State<AppState>,
    Json(request): Json<RefetchRequest>,
) -> impl IntoResponse {
    let local = match state.node.stores().local() {
        Ok(local) => local,
        Err(e) => return e.into_response(),
    };

    let submitted = request.articles.len();
    let valid: Vec<Article> = request
        .articles
        .into_iter()
        .filter(|article| match article.validate() {
            Ok(()) => true,
            Err(reason) => {
                tracing::warn!(url = %article.url, reason = %reason, "skipping invalid article");
                false
            }
        })
        .collect();
    let invalid = submitted - valid.len();

    match local.add_unique(valid).await {
        Ok(added) => (
            StatusCode::OK,
            Json(json!({"success": true, "added": added, "invalid": invalid})),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// DELETE /articles/local/delete/*url - Remove an article by url
///
/// Idempotent: deleting a missing url succeeds with `deleted: false`.
#[utoipa::path(
    delete,
    path = "/articles/local/delete/{url}",
    tag = "articles",
    params(
        ("url" = String, Path, description = "Article url, percent-encoded or raw")
    ),
    responses(
        (status = 200, description = "Article removed or absent"),
        (status = 503, description = "Local store not ready")
    )
)]
pub async fn delete_local(
    State(state): State<AppState>,
    Path(url): Path<String>,
) -> impl IntoResponse {
    let local = match state.node.stores().local() {
        Ok(local) => local,
        Err(e) => return e.into_response(),
    };
    match local.delete(&url).await {
        Ok(deleted) => {
            tracing::info!(url = %url, deleted, "local article delete");
            (
                StatusCode::OK,
                Json(json!({"success": true, "url": url, "deleted": deleted})),
            )
                .into_response()
        }
        Err(e) => e.into_response(),
    }
}

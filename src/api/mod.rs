//! REST API server module
//!
//! HTTP surface of a news node: source registry, fetch jobs, article stores,
//! debug log, job polling and live event streams.

use crate::{Config, NewsNode, Result};
use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod error_response;
pub mod openapi;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Sources
/// - `GET /sources` - List merged sources (`?withMeta=true` adds statistics)
/// - `POST /sources/update` - Upsert a source override
///
/// ## Articles
/// - `GET /articles/fetch` - Fetch all enabled sources (background)
/// - `GET /articles/fetch/:source` - Fetch one source (background)
/// - `POST /articles/local/fetch` - Fetch a supplied source list (background)
/// - `GET /articles/local` - List local articles
/// - `GET /articles/local/full` - Full article, resolving content if needed
/// - `POST /articles/local/save` - Store one article
/// - `POST /articles/local/refetch` - Add articles, skipping duplicates
/// - `DELETE /articles/local/delete/*url` - Remove an article by url
///
/// ## Analyzed
/// - `GET /articles/analyzed` - List analyzed articles or read one by id
/// - `GET /articles/analyzed/full` - Analyzed article, analyzing if missing
///
/// ## Federated
/// - `GET /articles/federated` - List federated pointers
/// - `POST /articles/federated` - Receive a federated pointer
/// - `POST /articles/aggregate` - Aggregate provider endpoints (background)
///
/// ## Debug log
/// - `POST /debug/log` - Append an entry
/// - `GET /debug/logs` - Read entries
///
/// ## Jobs
/// - `GET /jobs` - List tracked jobs
/// - `GET /jobs/:id` - Poll one job
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive documentation (if enabled)
/// - `GET /events` - Server-sent events stream
/// - `GET /ws` - WebSocket event stream
pub fn create_router(node: Arc<NewsNode>, config: Arc<Config>) -> Router {
    let state = AppState::new(node, config.clone());

    let router = Router::new()
        // Sources
        .route("/sources", get(routes::list_sources))
        .route("/sources/update", post(routes::update_source))
        // Articles
        .route("/articles/fetch", get(routes::fetch_all))
        .route("/articles/fetch/:source", get(routes::fetch_source))
        .route("/articles/local", get(routes::list_local))
        .route("/articles/local/fetch", post(routes::fetch_local))
        .route("/articles/local/full", get(routes::local_full))
        .route("/articles/local/save", post(routes::save_local))
        .route("/articles/local/refetch", post(routes::refetch_local))
        .route("/articles/local/delete/*url", delete(routes::delete_local))
        // Analyzed
        .route("/articles/analyzed", get(routes::list_analyzed))
        .route("/articles/analyzed/full", get(routes::analyzed_full))
        // Federated
        .route(
            "/articles/federated",
            get(routes::list_federated).post(routes::add_federated),
        )
        .route("/articles/aggregate", post(routes::aggregate))
        // Debug log
        .route("/debug/log", post(routes::append_debug_log))
        .route("/debug/logs", get(routes::list_debug_logs))
        // Jobs
        .route("/jobs", get(routes::list_jobs))
        .route("/jobs/:id", get(routes::get_job))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream))
        .route("/ws", get(routes::websocket));

    let router = if config.server.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state);

    // Last layer applied is outermost: trace, then CORS, then rate limiting
    let router = if config.server.api.rate_limit.enabled {
        let limiter = Arc::new(rate_limit::RateLimiter::new(
            config.server.api.rate_limit.clone(),
        ));
        router.layer(middleware::from_fn_with_state(
            limiter,
            rate_limit::rate_limit_middleware,
        ))
    } else {
        router
    };

    let router = if config.server.api.cors_enabled {
        router.layer(build_cors_layer(&config.server.api.cors_origins))
    } else {
        router
    };

    router.layer(TraceLayer::new_for_http())
}

/// Build a CORS layer from configured origins ("*" allows any)
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server fails or `shutdown` resolves.
///
/// # Example
///
/// ```no_run
/// use newsnode::{Config, NewsNode};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let node = Arc::new(NewsNode::new((*config).clone()).await?);
///
/// newsnode::api::start_api_server(node, config, std::future::pending()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server<F>(node: Arc<NewsNode>, config: Arc<Config>, shutdown: F) -> Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let bind_address = config.server.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(node, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %listener.local_addr().unwrap_or(bind_address), "API server listening");

    // ConnectInfo<SocketAddr> is required by the rate limiting middleware
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

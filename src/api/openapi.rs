//! OpenAPI documentation and schema generation
//!
//! The spec is generated at compile time with utoipa and served at
//! `/openapi.json`; Swagger UI reads its own copy at `/api-docs/openapi.json`.

use utoipa::OpenApi;

/// OpenAPI documentation for the newsnode REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "newsnode REST API",
        version = "0.1.0",
        description = "News aggregation node: sources, fetch jobs, article stores, AI analysis and live events",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:4000", description = "Local development server")
    ),
    paths(
        // Sources
        crate::api::routes::list_sources,
        crate::api::routes::update_source,

        // Articles
        crate::api::routes::fetch_all,
        crate::api::routes::fetch_source,
        crate::api::routes::fetch_local,
        crate::api::routes::list_local,
        crate::api::routes::local_full,
        crate::api::routes::save_local,
        crate::api::routes::refetch_local,
        crate::api::routes::delete_local,

        // Analyzed
        crate::api::routes::list_analyzed,
        crate::api::routes::analyzed_full,

        // Federated
        crate::api::routes::list_federated,
        crate::api::routes::add_federated,
        crate::api::routes::aggregate,

        // Debug log
        crate::api::routes::append_debug_log,
        crate::api::routes::list_debug_logs,

        // Jobs
        crate::api::routes::list_jobs,
        crate::api::routes::get_job,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
        crate::api::routes::websocket,
    ),
    components(schemas(
        // Core types
        crate::types::Article,
        crate::types::ArticleFederated,
        crate::types::SourceType,
        crate::types::Job,
        crate::types::JobId,
        crate::types::JobStatus,
        crate::types::RunStatus,
        crate::types::LogLevel,
        crate::types::DebugLogEntry,
        crate::types::Event,
        crate::sources::Source,
        crate::fetch::FetchOptions,
        crate::fetch::FetchError,
        crate::node::FetchSummary,
        crate::node::SourceMeta,
        crate::resolver::ArticleMetadata,

        // Config types
        crate::config::Config,
        crate::config::StoreBackend,
        crate::config::PersistenceConfig,
        crate::config::PipelineConfig,
        crate::config::AiConfig,
        crate::config::RetryConfig,
        crate::config::JobsConfig,
        crate::config::AggregationConfig,
        crate::config::EventsConfig,
        crate::config::DebugLogConfig,
        crate::config::ServerIntegrationConfig,
        crate::config::ApiConfig,
        crate::config::RateLimitConfig,

        // API request/response types
        crate::api::routes::ListSourcesQuery,
        crate::api::routes::FetchQuery,
        crate::api::routes::LocalFetchRequest,
        crate::api::routes::ListArticlesQuery,
        crate::api::routes::FullArticleQuery,
        crate::api::routes::SaveArticleRequest,
        crate::api::routes::RefetchRequest,
        crate::api::routes::AnalyzedQuery,
        crate::api::routes::AggregateRequest,
        crate::api::routes::DebugLogRequest,
        crate::api::routes::QueuedResponse,

        // Error types
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "sources", description = "Source registry - Merged defaults and persisted overrides"),
        (name = "articles", description = "Articles - Background fetches and the local article store"),
        (name = "analyzed", description = "Analyzed articles - AI enrichment, computed lazily"),
        (name = "federated", description = "Federation - Replicated pointers and provider aggregation"),
        (name = "debug", description = "Debug log - Application log readable over the API"),
        (name = "jobs", description = "Jobs - Status of background work"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, live events"),
    )
)]
pub struct ApiDoc;

//! # newsnode
//!
//! Backend library for a news aggregation node.
//!
//! A node pulls articles from configured sources (RSS, JSON APIs, scraped
//! pages, GDELT), normalizes and deduplicates them into a local store,
//! optionally enriches them through an external AI service, and serves the
//! result over HTTP with live job and log events.
//!
//! ## Quick Start
//!
//! ```no_run
//! use newsnode::{Config, NewsNode, FetchOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let node = NewsNode::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = node.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let job = node.dispatch_fetch_all(FetchOptions::default())?;
//!     println!("fetch queued as {}", job);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// AI analysis backend
pub mod ai;
/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// SQLite persistence layer
pub mod db;
/// Bounded debug log
pub mod debug_log;
/// Error types
pub mod error;
/// Event broadcasting
pub mod events;
/// Source fetching and normalization
pub mod fetch;
/// Background job tracking
pub mod jobs;
/// The node handle (decomposed into focused submodules)
pub mod node;
/// Aggregation of provider endpoints into full articles
pub mod resolver;
/// Retry logic with exponential backoff
pub mod retry;
/// Source registry
pub mod sources;
/// Article stores
pub mod store;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use ai::{AiBackend, AiTask, HttpAiBackend};
pub use config::Config;
pub use db::Database;
pub use error::{
    ApiError, DatabaseError, Error, ErrorDetail, JobError, Result, SourceError, StoreError,
    ToHttpStatus,
};
pub use fetch::{FetchOptions, FetchPipeline};
pub use node::NewsNode;
pub use resolver::{AggregationResolver, ArticleMetadata};
pub use sources::{Source, SourceRegistry};
pub use store::{AddOutcome, ArticleStore, StoreRegistry};
pub use types::{
    Article, ArticleAnalyzed, ArticleFederated, DebugLogEntry, Event, Job, JobId, JobStatus,
    LogLevel, RunStatus, SourceType,
};

/// Run the node and its API server until a termination signal arrives.
///
/// Starts the job sweeper, serves the API on the configured bind address,
/// and on SIGTERM/SIGINT (Ctrl+C elsewhere) stops the server and calls
/// [`NewsNode::shutdown`].
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use newsnode::{Config, NewsNode, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let node = NewsNode::new(config.clone()).await?;
///
///     run_with_shutdown(node, config).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(node: NewsNode, config: Config) -> Result<()> {
    let node = std::sync::Arc::new(node);
    let sweeper = node.start_job_sweeper();

    let served = api::start_api_server(node.clone(), std::sync::Arc::new(config), wait_for_signal()).await;

    node.shutdown().await?;
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "job sweeper task ended abnormally");
    }
    served
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}

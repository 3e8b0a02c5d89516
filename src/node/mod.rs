//! The news node: one handle over every component
//!
//! `NewsNode` is the explicit context object the API and background jobs work
//! through. Methods are split by concern:
//! - [`dispatch`] - Fire-and-forget background jobs
//! - [`services`] - Synchronous store-backed operations used by jobs and routes
//! - [`lifecycle`] - Job sweeper and shutdown

mod dispatch;
mod lifecycle;
mod services;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use services::{ArticleLookup, FetchSummary, Resolved, SourceMeta};

use crate::ai::{AiBackend, HttpAiBackend};
use crate::config::Config;
use crate::debug_log::DebugLog;
use crate::error::Result;
use crate::events::{BroadcastSink, EventBroadcaster};
use crate::fetch::FetchPipeline;
use crate::jobs::JobTracker;
use crate::resolver::AggregationResolver;
use crate::sources::{Source, SourceRegistry, default_sources};
use crate::store::StoreRegistry;
use crate::types::Event;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio_util::sync::CancellationToken;

/// Handle to a running news node
///
/// Cheap to clone; every clone shares the same stores, jobs and event channel.
#[derive(Clone)]
pub struct NewsNode {
    pub(crate) config: Arc<Config>,
    pub(crate) sources: Arc<SourceRegistry>,
    pub(crate) pipeline: Arc<FetchPipeline>,
    pub(crate) stores: StoreRegistry,
    pub(crate) jobs: JobTracker,
    pub(crate) events: EventBroadcaster,
    pub(crate) event_sink: Arc<BroadcastSink>,
    pub(crate) debug_log: DebugLog,
    pub(crate) ai: Option<Arc<dyn AiBackend>>,
    pub(crate) resolver: Arc<AggregationResolver>,
    pub(crate) accepting_jobs: Arc<AtomicBool>,
    pub(crate) cancel: CancellationToken,
}

impl NewsNode {
    /// Open stores, load sources and connect the AI backend from `config`
    ///
    /// # Errors
    /// Returns error if a store cannot be opened or an HTTP client cannot be
    /// built (for example an invalid AI backend url)
    pub async fn new(config: Config) -> Result<Self> {
        let stores = StoreRegistry::open(&config.persistence).await?;
        let ai = HttpAiBackend::from_config(&config.ai)?;
        if ai.is_none() {
            tracing::info!("No AI backend configured, analysis and translation disabled");
        }
        Self::with_parts(config, stores, default_sources(), ai).await
    }

    /// Assemble a node from explicit parts
    ///
    /// Used by tests to inject in-memory stores, custom default sources and a
    /// fake AI backend.
    pub async fn with_parts(
        config: Config,
        stores: StoreRegistry,
        defaults: Vec<Source>,
        ai: Option<Arc<dyn AiBackend>>,
    ) -> Result<Self> {
        config.validate()?;
        let events = EventBroadcaster::new();
        let event_sink = Arc::new(BroadcastSink::new(config.events.channel_capacity));
        events.set_sink(event_sink.clone());

        let sources = SourceRegistry::open(config.persistence.sources_path.clone(), defaults).await;
        let pipeline = FetchPipeline::new(&config.pipeline, ai.clone(), events.clone())?;
        let resolver = AggregationResolver::new(&config.aggregation, &config.pipeline, stores.clone())?;
        let jobs = JobTracker::new(config.jobs.retention, events.clone());
        let debug_log = DebugLog::new(config.debug_log.capacity, events.clone());

        let ready: Vec<&str> = stores
            .readiness()
            .into_iter()
            .filter(|(_, ready)| *ready)
            .map(|(name, _)| name)
            .collect();
        tracing::info!(stores = ?ready, ai = ai.is_some(), "news node ready");

        Ok(Self {
            config: Arc::new(config),
            sources: Arc::new(sources),
            pipeline: Arc::new(pipeline),
            stores,
            jobs,
            events,
            event_sink,
            debug_log,
            ai,
            resolver: Arc::new(resolver),
            accepting_jobs: Arc::new(AtomicBool::new(true)),
            cancel: CancellationToken::new(),
        })
    }

    /// Node configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Source registry
    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    /// Fetch pipeline
    pub fn pipeline(&self) -> &FetchPipeline {
        &self.pipeline
    }

    /// Store handles
    pub fn stores(&self) -> &StoreRegistry {
        &self.stores
    }

    /// Job tracker
    pub fn jobs(&self) -> &JobTracker {
        &self.jobs
    }

    /// Event broadcaster shared by every component
    pub fn events(&self) -> &EventBroadcaster {
        &self.events
    }

    /// Application debug log
    pub fn debug_log(&self) -> &DebugLog {
        &self.debug_log
    }

    /// AI backend, if configured
    pub fn ai(&self) -> Option<&Arc<dyn AiBackend>> {
        self.ai.as_ref()
    }

    /// Aggregation resolver
    pub fn resolver(&self) -> &AggregationResolver {
        &self.resolver
    }

    /// Receive every event broadcast from now on
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_sink.subscribe()
    }
}

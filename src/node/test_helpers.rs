//! Shared test helpers for creating NewsNode instances in tests.

use crate::ai::{AiBackend, AiResponse, AiTask};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::node::NewsNode;
use crate::sources::Source;
use crate::store::StoreRegistry;
use crate::types::{Job, JobId, JobStatus, SourceType};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

/// AI backend answering every task, or failing every task
pub(crate) struct StubAi {
    pub(crate) fail: bool,
}

#[async_trait]
impl AiBackend for StubAi {
    async fn run(&self, task: AiTask, _text: &str) -> Result<AiResponse> {
        if self.fail {
            return Err(Error::Ai(format!("{} unavailable", task)));
        }
        Ok(AiResponse::ok(match task {
            AiTask::Summarize => serde_json::json!({"summary": "Stub summary."}),
            AiTask::ExtractTags => serde_json::json!(["stub"]),
            other => serde_json::json!({"label": other.path()}),
        }))
    }

    async fn translate(&self, text: &str, target_language: &str) -> Result<String> {
        Ok(format!("[{}] {}", target_language, text))
    }
}

/// A source pointing at `endpoint`
pub(crate) fn rss_source(name: &str, endpoint: &str) -> Source {
    Source {
        name: name.to_string(),
        endpoint: endpoint.to_string(),
        enabled: true,
        source_type: SourceType::Rss,
        category: "news".to_string(),
        language: "en".to_string(),
        api_key: None,
        options: serde_json::Map::new(),
    }
}

/// Helper to create a test NewsNode backed by in-memory stores.
/// Returns the node and the tempdir holding its source override file
/// (which must be kept alive).
pub(crate) async fn create_test_node(
    defaults: Vec<Source>,
    ai: Option<Arc<dyn AiBackend>>,
) -> (NewsNode, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let mut config = Config::default();
    config.persistence.sources_path = temp_dir.path().join("sources.json");
    config.aggregation.timeout = Duration::from_secs(5);

    let node = NewsNode::with_parts(config, StoreRegistry::in_memory(), defaults, ai)
        .await
        .unwrap();
    (node, temp_dir)
}

/// Poll until `id` reaches a terminal status
pub(crate) async fn wait_for_job(node: &NewsNode, id: JobId) -> Job {
    for _ in 0..200 {
        if let Some(job) = node.jobs().get_status(id)
            && matches!(job.status, JobStatus::Done | JobStatus::Error)
        {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("job {} did not finish", id);
}

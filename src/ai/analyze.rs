use super::{AiBackend, AiTask};
use crate::events::EventBroadcaster;
use crate::types::{Article, ArticleAnalyzed, Event, RunStatus};
use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use uuid::Uuid;

/// Result of [`analyze_article`]
#[derive(Clone, Debug)]
pub struct AnalysisOutcome {
    /// Analyzed record, `None` when nothing usable came back
    pub analyzed: Option<ArticleAnalyzed>,
    /// `ok`, `partial` (some tasks failed) or `error` (every core task failed)
    pub status: RunStatus,
    /// One message per failed task
    pub errors: Vec<String>,
}

async fn run_task(
    ai: &dyn AiBackend,
    task: AiTask,
    text: &str,
    article: &Article,
    events: &EventBroadcaster,
) -> Result<Value, String> {
    let result = ai.run(task, text).await;

    let (status, message) = match &result {
        Ok(_) => (RunStatus::Ok, None),
        Err(e) => {
            tracing::warn!(article_id = %article.id, task = %task, error = %e, "AI task failed");
            (RunStatus::Error, Some(e.to_string()))
        }
    };
    events.broadcast(Event::AiStatus {
        article_id: article.id,
        source: article.source.clone(),
        task: task.path().to_string(),
        status,
        message,
    });

    result
        .map(|envelope| envelope.data)
        .map_err(|e| format!("{}: {}", task, e))
}

fn summary_from(data: &Value) -> Option<String> {
    let summary = match data {
        Value::String(s) => s.as_str(),
        other => other.get("summary")?.as_str()?,
    };
    let summary = summary.trim();
    (!summary.is_empty()).then(|| summary.to_string())
}

fn tags_from(data: &Value) -> Vec<String> {
    let list = match data {
        Value::Array(items) => items,
        other => match other.get("tags").and_then(|t| t.as_array()) {
            Some(items) => items,
            None => return vec![],
        },
    };
    let mut tags: Vec<String> = list
        .iter()
        .filter_map(|t| t.as_str())
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

/// Enrich `article` through the AI backend
///
/// The core tasks run concurrently and independently. A summary and tags are
/// requested only when the article lacks them. Failed tasks leave their field
/// `null` and are listed in `errors`. Each task reports an `ai-status` event.
pub async fn analyze_article(
    ai: &dyn AiBackend,
    article: &Article,
    events: &EventBroadcaster,
) -> AnalysisOutcome {
    let text = if article.content.trim().is_empty() {
        article.summary.trim()
    } else {
        article.content.trim()
    };
    if text.is_empty() {
        return AnalysisOutcome {
            analyzed: None,
            status: RunStatus::Error,
            errors: vec!["no content to analyze".to_string()],
        };
    }

    tracing::debug!(article_id = %article.id, source = %article.source, "analyzing article");

    let core = join_all(
        AiTask::CORE
            .iter()
            .map(|task| run_task(ai, *task, text, article, events)),
    );
    let summary = async {
        if article.summary.trim().is_empty() {
            Some(run_task(ai, AiTask::Summarize, text, article, events).await)
        } else {
            None
        }
    };
    let tags = async {
        if article.tags.is_empty() {
            Some(run_task(ai, AiTask::ExtractTags, text, article, events).await)
        } else {
            None
        }
    };
    let (core, summary, tags) = futures::join!(core, summary, tags);

    let mut errors = Vec::new();
    let mut core_failures = 0;
    let mut fields = Vec::with_capacity(core.len());
    for result in core {
        match result {
            Ok(data) => fields.push(data),
            Err(e) => {
                core_failures += 1;
                errors.push(e);
                fields.push(Value::Null);
            }
        }
    }

    if core_failures == AiTask::CORE.len() {
        tracing::warn!(article_id = %article.id, "every AI task failed");
        return AnalysisOutcome {
            analyzed: None,
            status: RunStatus::Error,
            errors,
        };
    }

    let mut enriched = article.clone();
    match summary {
        Some(Ok(data)) => {
            if let Some(summary) = summary_from(&data) {
                enriched.summary = summary;
            }
        }
        Some(Err(e)) => errors.push(e),
        None => {}
    }
    match tags {
        Some(Ok(data)) => enriched.tags = tags_from(&data),
        Some(Err(e)) => errors.push(e),
        None => {}
    }
    enriched.id = Uuid::new_v4();
    enriched.analyzed = true;

    // Same order as AiTask::CORE
    let mut fields = fields.into_iter();
    let mut next = || fields.next().unwrap_or(Value::Null);
    let analyzed = ArticleAnalyzed {
        article: enriched,
        original_id: article.id,
        political_bias: next(),
        sentiment: next(),
        cognitive_biases: next(),
        antithesis: next(),
        philosophical: next(),
        analysis_timestamp: Utc::now(),
    };

    let status = if errors.is_empty() {
        RunStatus::Ok
    } else {
        RunStatus::Partial
    };
    tracing::info!(
        article_id = %article.id,
        analyzed_id = %analyzed.article.id,
        status = ?status,
        failed = errors.len(),
        "article analyzed"
    );

    AnalysisOutcome {
        analyzed: Some(analyzed),
        status,
        errors,
    }
}

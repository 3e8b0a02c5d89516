//! Waiting helpers for background jobs

use newsnode::{Event, Job, JobId, JobStatus, NewsNode};
use std::time::Duration;

/// Outcome of waiting for a job
#[derive(Debug, PartialEq)]
pub enum WaitResult {
    /// Job finished with this message
    Done(Option<String>),
    /// Job failed with this message
    Failed(Option<String>),
    /// Timeout waiting for a terminal status
    Timeout,
    /// Event channel closed unexpectedly
    ChannelClosed,
}

/// Wait on the event stream for `id` to reach done or error
///
/// Subscribe with [`NewsNode::subscribe`] before dispatching so the terminal
/// event cannot be missed; pass that receiver here.
pub async fn wait_for_job_event(
    events: &mut tokio::sync::broadcast::Receiver<Event>,
    id: JobId,
    timeout: Duration,
) -> WaitResult {
    let result = tokio::time::timeout(timeout, async {
        loop {
            match events.recv().await {
                Ok(Event::JobStatus {
                    job_id,
                    status,
                    message,
                    ..
                }) if job_id == id => match status {
                    JobStatus::Done => return WaitResult::Done(message),
                    JobStatus::Error => return WaitResult::Failed(message),
                    _ => continue,
                },
                Ok(_) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => return WaitResult::ChannelClosed,
            }
        }
    })
    .await;

    result.unwrap_or(WaitResult::Timeout)
}

/// Poll the job tracker until `id` is terminal
pub async fn poll_job(node: &NewsNode, id: JobId, timeout: Duration) -> Option<Job> {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if let Some(job) = node.jobs().get_status(id)
            && job.status.is_terminal()
        {
            return Some(job);
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    None
}

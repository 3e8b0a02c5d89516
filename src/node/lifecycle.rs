//! Startup and shutdown coordination.

use crate::error::Result;
use crate::types::JobStatus;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::NewsNode;

impl NewsNode {
    /// Start the periodic job sweep
    ///
    /// Stops when [`NewsNode::shutdown`] runs.
    pub fn start_job_sweeper(&self) -> tokio::task::JoinHandle<()> {
        tracing::info!(
            interval_ms = self.config.jobs.sweep_interval.as_millis() as u64,
            retention_ms = self.config.jobs.retention.as_millis() as u64,
            "Starting job sweeper"
        );
        self.jobs
            .spawn_sweeper(self.config.jobs.sweep_interval, self.cancel.child_token())
    }

    /// Whether new background jobs are accepted
    pub fn is_accepting_jobs(&self) -> bool {
        self.accepting_jobs.load(Ordering::SeqCst)
    }

    /// Gracefully shut down the node
    ///
    /// 1. Stops accepting new jobs
    /// 2. Stops the job sweeper
    /// 3. Waits up to 30 seconds for queued and running jobs to finish
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_with_timeout(Duration::from_secs(30)).await
    }

    pub(crate) async fn shutdown_with_timeout(&self, timeout: Duration) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.accepting_jobs.store(false, Ordering::SeqCst);
        self.cancel.cancel();
        tracing::info!("Stopped accepting new jobs");

        match tokio::time::timeout(timeout, self.wait_for_active_jobs()).await {
            Ok(()) => tracing::info!("All background jobs finished"),
            Err(_) => tracing::warn!(
                active = self.active_jobs(),
                "Timeout waiting for background jobs, proceeding with shutdown"
            ),
        }

        tracing::info!("Shutdown complete");
        Ok(())
    }

    fn active_jobs(&self) -> usize {
        self.jobs
            .list()
            .iter()
            .filter(|job| matches!(job.status, JobStatus::Queued | JobStatus::Running))
            .count()
    }

    async fn wait_for_active_jobs(&self) {
        while self.active_jobs() > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

//! In-memory job tracker
//!
//! One row per job id. Rows are never persisted, so job ids are only
//! meaningful for the lifetime of the process.

use crate::error::{JobError, Result};
use crate::events::EventBroadcaster;
use crate::types::{Event, Job, JobId, JobStatus};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Tracks background job status by id
#[derive(Clone)]
pub struct JobTracker {
    jobs: Arc<RwLock<HashMap<JobId, Job>>>,
    retention: Duration,
    events: EventBroadcaster,
}

impl JobTracker {
    /// Create a tracker that keeps finished jobs for `retention`
    pub fn new(retention: Duration, events: EventBroadcaster) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            retention,
            events,
        }
    }

    /// Register a new queued job
    pub fn create(&self, source: impl Into<String>) -> JobId {
        let id = JobId::new();
        // A fresh id has no row yet, so the transition cannot be rejected
        let _ = self.set_status(id, JobStatus::Queued, source, None);
        id
    }

    /// Insert or update a job row
    ///
    /// `created_at` is stamped on first insert and preserved afterwards.
    /// A status that would move the job backwards is rejected.
    pub fn set_status(
        &self,
        id: JobId,
        status: JobStatus,
        source: impl Into<String>,
        message: Option<String>,
    ) -> Result<Job> {
        let source = source.into();
        let now = Utc::now();

        let job = {
            let mut jobs = self.jobs.write().unwrap_or_else(|p| p.into_inner());
            match jobs.get_mut(&id) {
                Some(existing) => {
                    if !existing.status.can_transition_to(status) {
                        return Err(JobError::InvalidTransition {
                            id: id.to_string(),
                            from: existing.status.to_string(),
                            to: status.to_string(),
                        }
                        .into());
                    }
                    existing.status = status;
                    existing.source = source;
                    existing.message = message;
                    existing.updated_at = now;
                    existing.clone()
                }
                None => {
                    let job = Job {
                        id,
                        source,
                        status,
                        message,
                        created_at: now,
                        updated_at: now,
                    };
                    jobs.insert(id, job.clone());
                    job
                }
            }
        };

        tracing::debug!(job_id = %id, status = %job.status, source = %job.source, "job status");
        self.events.broadcast(Event::JobStatus {
            job_id: id,
            source: job.source.clone(),
            status: job.status,
            message: job.message.clone(),
        });

        Ok(job)
    }

    /// Current row for `id`
    pub fn get_status(&self, id: JobId) -> Option<Job> {
        self.jobs
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .get(&id)
            .cloned()
    }

    /// Every tracked job, oldest first
    pub fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self
            .jobs
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .values()
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.created_at);
        jobs
    }

    /// Number of tracked jobs
    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// Whether no jobs are tracked
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict finished jobs older than the retention window
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    /// [`Self::sweep`] against an explicit clock
    ///
    /// Queued and running jobs are never evicted, however old.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let retention = chrono::Duration::from_std(self.retention)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100));
        let mut jobs = self.jobs.write().unwrap_or_else(|p| p.into_inner());
        let before = jobs.len();
        jobs.retain(|_, job| {
            !(job.status.is_terminal()
                && job
                    .updated_at
                    .checked_add_signed(retention)
                    .is_some_and(|expiry| expiry <= now))
        });
        let removed = before - jobs.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = jobs.len(), "swept finished jobs");
        }
        removed
    }

    /// Run [`Self::sweep`] every `interval` until `cancel` fires
    pub fn spawn_sweeper(
        &self,
        interval: Duration,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let tracker = self.clone();
        let interval = if interval.is_zero() {
            tracing::warn!("zero sweep interval, sweeping every second instead");
            Duration::from_secs(1)
        } else {
            interval
        };
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        tracker.sweep();
                    }
                    _ = cancel.cancelled() => {
                        tracing::debug!("job sweeper stopped");
                        break;
                    }
                }
            }
        })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Mutex;

    fn tracker(retention: Duration) -> JobTracker {
        JobTracker::new(retention, EventBroadcaster::new())
    }

    #[test]
    fn test_created_at_preserved_across_updates() {
        let jobs = tracker(Duration::from_secs(600));
        let id = jobs.create("bbc");
        let created = jobs.get_status(id).unwrap().created_at;

        std::thread::sleep(Duration::from_millis(5));
        let job = jobs
            .set_status(id, JobStatus::Running, "bbc", Some("fetching".into()))
            .unwrap();

        assert_eq!(job.created_at, created);
        assert!(job.updated_at > created);
        assert_eq!(job.message.as_deref(), Some("fetching"));
    }

    #[test]
    fn test_terminal_status_cannot_regress() {
        let jobs = tracker(Duration::from_secs(600));
        let id = jobs.create("bbc");
        jobs.set_status(id, JobStatus::Running, "bbc", None).unwrap();
        jobs.set_status(id, JobStatus::Done, "bbc", None).unwrap();

        let err = jobs
            .set_status(id, JobStatus::Running, "bbc", None)
            .unwrap_err();
        assert!(matches!(err, Error::Job(JobError::InvalidTransition { .. })));
        assert!(jobs.set_status(id, JobStatus::Queued, "bbc", None).is_err());
        assert!(jobs.set_status(id, JobStatus::Error, "bbc", None).is_err());
        assert_eq!(jobs.get_status(id).unwrap().status, JobStatus::Done);
    }

    #[test]
    fn test_observed_statuses_are_monotonic() {
        let jobs = tracker(Duration::from_secs(600));
        let id = jobs.create("x");
        let attempts = [
            JobStatus::Running,
            JobStatus::Queued,
            JobStatus::Running,
            JobStatus::Error,
            JobStatus::Running,
            JobStatus::Done,
        ];
        let mut observed = vec![jobs.get_status(id).unwrap().status];
        for status in attempts {
            let _ = jobs.set_status(id, status, "x", None);
            observed.push(jobs.get_status(id).unwrap().status);
        }
        for pair in observed.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?}", observed);
        }
        assert_eq!(*observed.last().unwrap(), JobStatus::Error);
    }

    #[test]
    fn test_sweep_removes_only_old_terminal_jobs() {
        let jobs = tracker(Duration::from_secs(600));
        let done = jobs.create("a");
        let failed = jobs.create("b");
        let queued = jobs.create("c");
        let running = jobs.create("d");
        jobs.set_status(done, JobStatus::Done, "a", None).unwrap();
        jobs.set_status(failed, JobStatus::Error, "b", Some("500".into()))
            .unwrap();
        jobs.set_status(running, JobStatus::Running, "d", None).unwrap();

        // Inside the window nothing goes
        assert_eq!(jobs.sweep_at(Utc::now()), 0);

        // Far past the window only terminal rows go
        let later = Utc::now() + chrono::Duration::days(30);
        assert_eq!(jobs.sweep_at(later), 2);
        assert!(jobs.get_status(done).is_none());
        assert!(jobs.get_status(failed).is_none());
        assert!(jobs.get_status(queued).is_some());
        assert!(jobs.get_status(running).is_some());
    }

    #[test]
    fn test_zero_retention_sweeps_immediately() {
        let jobs = tracker(Duration::ZERO);
        let id = jobs.create("a");
        jobs.set_status(id, JobStatus::Done, "a", None).unwrap();
        assert_eq!(jobs.sweep(), 1);
        assert!(jobs.is_empty());
    }

    #[test]
    fn test_status_changes_are_broadcast() {
        let events = EventBroadcaster::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = seen.clone();
        events.set_sink(Arc::new(
            move |e: &Event| -> std::result::Result<(), String> {
                sink_seen.lock().unwrap().push(e.clone());
                Ok(())
            },
        ));

        let jobs = JobTracker::new(Duration::from_secs(600), events);
        let id = jobs.create("bbc");
        jobs.set_status(id, JobStatus::Running, "bbc", None).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        match &seen[1] {
            Event::JobStatus { job_id, status, .. } => {
                assert_eq!(*job_id, id);
                assert_eq!(*status, JobStatus::Running);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_sweeper_runs_and_stops_on_cancel() {
        let jobs = tracker(Duration::ZERO);
        let id = jobs.create("a");
        jobs.set_status(id, JobStatus::Done, "a", None).unwrap();

        let cancel = CancellationToken::new();
        let handle = jobs.spawn_sweeper(Duration::from_millis(10), cancel.clone());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(jobs.get_status(id).is_none());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_zero_sweep_interval_keeps_sweeping() {
        let jobs = tracker(Duration::ZERO);
        let id = jobs.create("a");
        jobs.set_status(id, JobStatus::Error, "a", Some("boom".into()))
            .unwrap();

        let cancel = CancellationToken::new();
        let handle = jobs.spawn_sweeper(Duration::ZERO, cancel.clone());

        tokio::time::sleep(Duration::from_millis(1300)).await;
        assert!(jobs.get_status(id).is_none());

        cancel.cancel();
        let joined = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap();
        assert!(joined.is_ok());
    }
}

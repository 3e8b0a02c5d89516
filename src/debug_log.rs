//! Application debug log
//!
//! A bounded append-only ring of [`DebugLogEntry`] readable over the API.
//! Separate from `tracing` output, though every append is mirrored there.

use crate::events::EventBroadcaster;
use crate::types::{DebugLogEntry, Event, LogLevel};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Filter for [`DebugLog::entries`]
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DebugLogFilter {
    /// Only entries at this level
    pub level: Option<LogLevel>,
    /// Only entries at or after this time
    pub since: Option<DateTime<Utc>>,
    /// Keep only the newest N matching entries
    pub limit: Option<usize>,
}

/// Bounded debug log
#[derive(Clone)]
pub struct DebugLog {
    entries: Arc<Mutex<VecDeque<DebugLogEntry>>>,
    capacity: usize,
    events: EventBroadcaster,
}

impl DebugLog {
    /// Create a log that keeps at most `capacity` entries
    pub fn new(capacity: usize, events: EventBroadcaster) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(1024)))),
            capacity,
            events,
        }
    }

    /// Append an entry, dropping the oldest when full
    pub fn append(
        &self,
        message: impl Into<String>,
        level: LogLevel,
        meta: Option<serde_json::Value>,
    ) -> DebugLogEntry {
        let entry = DebugLogEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            message: message.into(),
            level,
            meta,
        };

        match level {
            LogLevel::Info => tracing::info!(target: "newsnode::debug_log", "{}", entry.message),
            LogLevel::Warn => tracing::warn!(target: "newsnode::debug_log", "{}", entry.message),
            LogLevel::Error => tracing::error!(target: "newsnode::debug_log", "{}", entry.message),
        }

        {
            let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
            while entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(entry.clone());
        }

        self.events.broadcast(Event::DebugLog {
            entry: entry.clone(),
        });
        entry
    }

    /// Entries matching `filter`, oldest first
    pub fn entries(&self, filter: &DebugLogFilter) -> Vec<DebugLogEntry> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        let mut matched: Vec<DebugLogEntry> = entries
            .iter()
            .filter(|e| filter.level.is_none_or(|l| e.level == l))
            .filter(|e| filter.since.is_none_or(|s| e.timestamp >= s))
            .cloned()
            .collect();
        if let Some(limit) = filter.limit
            && matched.len() > limit
        {
            matched.drain(..matched.len() - limit);
        }
        matched
    }

    /// Number of retained entries
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

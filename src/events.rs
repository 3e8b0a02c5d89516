//! Best-effort event fan-out to live subscribers
//!
//! At most one [`EventSink`] is installed at a time. Broadcasting never
//! blocks on and never fails because of a subscriber: sink errors are
//! dropped and a panicking sink is contained.

use crate::types::Event;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Delivery target for broadcast events
pub trait EventSink: Send + Sync {
    /// Deliver one event
    fn send(&self, event: &Event) -> std::result::Result<(), String>;
}

impl<F> EventSink for F
where
    F: Fn(&Event) -> std::result::Result<(), String> + Send + Sync,
{
    fn send(&self, event: &Event) -> std::result::Result<(), String> {
        self(event)
    }
}

/// Holder of the single active sink
#[derive(Clone, Default)]
pub struct EventBroadcaster {
    sink: Arc<RwLock<Option<Arc<dyn EventSink>>>>,
}

impl EventBroadcaster {
    /// Broadcaster with no sink installed
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `sink`, replacing any previous one
    pub fn set_sink(&self, sink: Arc<dyn EventSink>) {
        let mut slot = self.sink.write().unwrap_or_else(|p| p.into_inner());
        *slot = Some(sink);
    }

    /// Remove the active sink
    pub fn clear_sink(&self) {
        let mut slot = self.sink.write().unwrap_or_else(|p| p.into_inner());
        *slot = None;
    }

    /// Whether a sink is installed
    pub fn has_sink(&self) -> bool {
        self.sink
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .is_some()
    }

    /// Deliver `event` to the active sink, if any
    pub fn broadcast(&self, event: Event) {
        // Clone the handle out so a slow sink never holds the lock
        let sink = self
            .sink
            .read()
            .unwrap_or_else(|p| p.into_inner())
            .clone();
        let Some(sink) = sink else {
            return;
        };

        match catch_unwind(AssertUnwindSafe(|| sink.send(&event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::trace!(error = %e, "event sink rejected event"),
            Err(_) => tracing::warn!("event sink panicked, event dropped"),
        }
    }
}

/// Sink that forwards events into a tokio broadcast channel
///
/// Every SSE and WebSocket subscriber holds a receiver of the same channel.
/// Having no receivers is not an error.
pub struct BroadcastSink {
    tx: broadcast::Sender<Event>,
}

impl BroadcastSink {
    /// Create a sink with a channel of `capacity` buffered events per receiver
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// New receiver for a live subscriber
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of live receivers
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl EventSink for BroadcastSink {
    fn send(&self, event: &Event) -> std::result::Result<(), String> {
        // SendError only means nobody is listening right now
        let _ = self.tx.send(event.clone());
        Ok(())
    }
}

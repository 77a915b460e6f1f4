//! Event sink trait and implementations.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::event::CalculatorEvent;
use crate::types::EventId;

/// Destination for calculator events.
///
/// Emitting is fire-and-forget from the caller's point of view: callers log a
/// failed emit and carry on.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Record an event.
    async fn emit(&self, event: CalculatorEvent) -> Result<EventId>;
}

#[async_trait]
impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    async fn emit(&self, event: CalculatorEvent) -> Result<EventId> {
        (**self).emit(event).await
    }
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl EventSink for NullSink {
    async fn emit(&self, event: CalculatorEvent) -> Result<EventId> {
        Ok(event.event_id)
    }
}

/// Bounded in-memory event log, oldest events evicted first.
pub struct InMemoryEventLog {
    events: RwLock<VecDeque<CalculatorEvent>>,
    capacity: usize,
}

impl InMemoryEventLog {
    /// Default number of retained events.
    pub const DEFAULT_CAPACITY: usize = 1000;

    /// Create a log with the default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a log retaining at most `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::new()),
            capacity,
        }
    }

    /// All retained events, oldest first.
    pub async fn events(&self) -> Vec<CalculatorEvent> {
        self.events.read().await.iter().cloned().collect()
    }

    /// Retained events about one `namespace/name`.
    pub async fn for_object(&self, object: &str) -> Vec<CalculatorEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|event| event.object == object)
            .cloned()
            .collect()
    }

    /// Number of retained events.
    pub async fn count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Retained events as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if an event cannot be encoded.
    pub async fn export_json(&self) -> Result<String> {
        let events = self.events().await;
        Ok(serde_json::to_string_pretty(&events)?)
    }
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for InMemoryEventLog {
    async fn emit(&self, event: CalculatorEvent) -> Result<EventId> {
        if self.capacity == 0 {
            return Err(Error::emit_failed("event log has zero capacity"));
        }

        let event_id = event.event_id;
        let mut events = self.events.write().await;
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
        Ok(event_id)
    }
}

/// A wrapper that adds tracing to an event sink.
pub struct TracingSink<S: EventSink> {
    inner: S,
}

impl<S: EventSink> TracingSink<S> {
    /// Create a new tracing sink.
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Get the wrapped sink.
    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: EventSink> EventSink for TracingSink<S> {
    async fn emit(&self, event: CalculatorEvent) -> Result<EventId> {
        tracing::debug!(
            object = %event.object,
            event_type = %event.event_type,
            reason = %event.reason,
            message = %event.message,
            "Emitting event"
        );
        let result = self.inner.emit(event).await;
        if let Ok(ref id) = result {
            tracing::trace!(event_id = %id, "Event emitted");
        }
        result
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_and_read() {
        let log = InMemoryEventLog::new();
        let event = CalculatorEvent::progressing("default/sum");
        let id = log.emit(event.clone()).await.unwrap();

        assert_eq!(id, event.event_id);
        assert_eq!(log.count().await, 1);
        assert_eq!(log.events().await, vec![event]);
    }

    #[tokio::test]
    async fn test_for_object_filters() {
        let log = InMemoryEventLog::new();
        log.emit(CalculatorEvent::progressing("default/a")).await.ok();
        log.emit(CalculatorEvent::progressing("default/b")).await.ok();
        log.emit(CalculatorEvent::succeeded("default/a", 1.0)).await.ok();

        assert_eq!(log.for_object("default/a").await.len(), 2);
        assert_eq!(log.for_object("default/c").await.len(), 0);
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let log = InMemoryEventLog::with_capacity(2);
        log.emit(CalculatorEvent::progressing("default/1")).await.ok();
        log.emit(CalculatorEvent::progressing("default/2")).await.ok();
        log.emit(CalculatorEvent::progressing("default/3")).await.ok();

        let events = log.events().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].object, "default/2");
        assert_eq!(events[1].object, "default/3");
    }

    #[tokio::test]
    async fn test_zero_capacity_rejects() {
        let log = InMemoryEventLog::with_capacity(0);
        let result = log.emit(CalculatorEvent::progressing("default/x")).await;
        assert!(matches!(result, Err(Error::EmitFailed { .. })));
    }

    #[tokio::test]
    async fn test_export_json() {
        let log = InMemoryEventLog::new();
        log.emit(CalculatorEvent::failed("default/x", "bad")).await.ok();
        let json = log.export_json().await.unwrap();
        assert!(json.contains("\"Warning\""));
        assert!(json.contains("default/x"));
    }

    #[tokio::test]
    async fn test_tracing_sink_delegates() {
        let sink = TracingSink::new(InMemoryEventLog::new());
        sink.emit(CalculatorEvent::progressing("default/t")).await.ok();
        assert_eq!(sink.inner().count().await, 1);
    }

    #[tokio::test]
    async fn test_shared_sink_keeps_one_log() {
        let log = Arc::new(InMemoryEventLog::new());
        let sink = TracingSink::new(Arc::clone(&log));
        sink.emit(CalculatorEvent::progressing("default/shared")).await.ok();
        assert_eq!(log.count().await, 1);
    }

    #[tokio::test]
    async fn test_null_sink_accepts_everything() {
        let event = CalculatorEvent::progressing("default/n");
        assert_eq!(NullSink.emit(event.clone()).await, Ok(event.event_id));
    }
}

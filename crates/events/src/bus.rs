//! Event bus for live subscribers.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::{Error, Result};
use crate::event::CalculatorEvent;
use crate::sink::EventSink;
use crate::types::{EventId, EventType};

/// Pattern for filtering events.
#[derive(Debug, Clone)]
pub enum EventPattern {
    /// Match all events.
    All,
    /// Match events about one `namespace/name`.
    ByObject(String),
    /// Match events of one type.
    ByType(EventType),
}

impl EventPattern {
    /// Check if an event matches this pattern.
    #[must_use]
    pub fn matches(&self, event: &CalculatorEvent) -> bool {
        match self {
            Self::All => true,
            Self::ByObject(object) => event.object == *object,
            Self::ByType(event_type) => event.event_type == *event_type,
        }
    }
}

/// Subscription handle for receiving events.
pub struct EventSubscription {
    receiver: broadcast::Receiver<CalculatorEvent>,
    pattern: EventPattern,
}

impl EventSubscription {
    /// Receive the next matching event.
    ///
    /// # Errors
    ///
    /// Returns `Error::ChannelClosed` once the bus is gone.
    pub async fn recv(&mut self) -> Result<CalculatorEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.pattern.matches(&event) => return Ok(event),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return Err(Error::ChannelClosed),
            }
        }
    }

    /// Try to receive a matching event without waiting.
    ///
    /// # Errors
    ///
    /// Returns `Error::ChannelClosed` when no matching event is buffered.
    pub fn try_recv(&mut self) -> Result<CalculatorEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.pattern.matches(&event) => return Ok(event),
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => {}
                Err(_) => return Err(Error::ChannelClosed),
            }
        }
    }
}

/// Event bus: records each event in a backing sink, then broadcasts it.
pub struct EventBus {
    /// Underlying sink.
    sink: Arc<dyn EventSink>,
    /// Broadcast sender for all events.
    broadcast: broadcast::Sender<CalculatorEvent>,
}

impl EventBus {
    /// Default broadcast channel capacity.
    pub const DEFAULT_CAPACITY: usize = 1000;

    /// Create a new event bus with the given backing sink.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_capacity(sink, Self::DEFAULT_CAPACITY)
    }

    /// Create a new event bus with an explicit channel capacity.
    pub fn with_capacity(sink: Arc<dyn EventSink>, capacity: usize) -> Self {
        let (broadcast, _) = broadcast::channel(capacity.max(1));
        Self { sink, broadcast }
    }

    /// Subscribe to all events.
    pub fn subscribe(&self) -> EventSubscription {
        self.subscribe_with_pattern(EventPattern::All)
    }

    /// Subscribe to events matching a pattern.
    pub fn subscribe_with_pattern(&self, pattern: EventPattern) -> EventSubscription {
        EventSubscription {
            receiver: self.broadcast.subscribe(),
            pattern,
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.broadcast.receiver_count()
    }

    /// Get the backing sink.
    pub fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }
}

#[async_trait]
impl EventSink for EventBus {
    async fn emit(&self, event: CalculatorEvent) -> Result<EventId> {
        let event_id = self.sink.emit(event.clone()).await?;

        debug!(
            event_id = %event_id,
            object = %event.object,
            reason = %event.reason,
            "Publishing event"
        );

        // no live subscribers is not an error
        let _ = self.broadcast.send(event);

        Ok(event_id)
    }
}

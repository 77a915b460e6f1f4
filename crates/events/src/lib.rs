//! Progress and outcome events for Calculator reconciliation.
//!
//! Key features:
//!
//! - **Event types**: Normal/Warning events about one Calculator
//! - **Event sinks**: fire-and-forget destinations (in-memory log, null, tracing)
//! - **Event bus**: records events and broadcasts them to live subscribers
//!
//! # Example
//!
//! ```ignore
//! use calc_events::{CalculatorEvent, EventBus, EventSink, InMemoryEventLog};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let log = Arc::new(InMemoryEventLog::new());
//!     let bus = EventBus::new(log.clone());
//!     let mut sub = bus.subscribe();
//!
//!     bus.emit(CalculatorEvent::succeeded("default/sum", 6.0)).await.ok();
//!
//!     let event = sub.recv().await;
//!     println!("Received: {event:?}");
//! }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod bus;
pub mod error;
pub mod event;
pub mod sink;
pub mod types;

// Re-export main types
pub use bus::{EventBus, EventPattern, EventSubscription};
pub use error::{Error, Result};
pub use event::{CalculatorEvent, REASON_COMPUTED, REASON_FAILED, REASON_RECONCILING};
pub use sink::{EventSink, InMemoryEventLog, NullSink, TracingSink};
pub use types::{EventId, EventType};

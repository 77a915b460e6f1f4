//! Calculator events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EventId, EventType};

/// Reason attached to a reconciliation that has started.
pub const REASON_RECONCILING: &str = "Reconciling";
/// Reason attached to a successful computation.
pub const REASON_COMPUTED: &str = "Computed";
/// Reason attached to a rejected or failed computation.
pub const REASON_FAILED: &str = "Failed";

/// Human-readable note about one Calculator, in the shape of a cluster event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatorEvent {
    pub event_id: EventId,
    /// `namespace/name` of the Calculator the event is about.
    pub object: String,
    pub event_type: EventType,
    pub reason: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl CalculatorEvent {
    /// Create an event with an explicit type and reason.
    pub fn new(
        object: impl Into<String>,
        event_type: EventType,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            object: object.into(),
            event_type,
            reason: reason.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Reconciliation of `object` has started.
    pub fn progressing(object: impl Into<String>) -> Self {
        let object = object.into();
        let message = format!("reconciling calculator {object}");
        Self::new(object, EventType::Normal, REASON_RECONCILING, message)
    }

    /// `object` computed `result`.
    pub fn succeeded(object: impl Into<String>, result: f64) -> Self {
        let object = object.into();
        let message = format!("calculator {object} computed result {result}");
        Self::new(object, EventType::Normal, REASON_COMPUTED, message)
    }

    /// `object` was marked failed with `reason`.
    pub fn failed(object: impl Into<String>, reason: impl AsRef<str>) -> Self {
        let object = object.into();
        let message = format!("calculator {object} failed: {}", reason.as_ref());
        Self::new(object, EventType::Warning, REASON_FAILED, message)
    }

    #[must_use]
    pub fn is_warning(&self) -> bool {
        self.event_type == EventType::Warning
    }
}

//! Convergence controller: one reconcile cycle per Calculator.
//!
//! A cycle walks `Fetched -> Validated | Rejected -> Computed | Failed -> Persisted`.
//! Validation and computation failures end up in the persisted status. Store
//! failures go back to the caller unconverted.

use std::sync::Arc;

use calc_events::{CalculatorEvent, EventSink, NullSink};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::store::ResourceStore;
use crate::types::{CalculatorSpec, CalculatorStatus, ObjectKey};

/// What a completed cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The resource is gone. Nothing was written.
    NotFound,
    /// Status was written as `success`.
    Computed { result: f64 },
    /// Status was written as `failed`. `error` is the rejection that caused it.
    Rejected { error: Error },
}

impl ReconcileOutcome {
    #[must_use]
    pub const fn is_computed(&self) -> bool {
        matches!(self, Self::Computed { .. })
    }

    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Validate then compute a desired state, producing the status to persist.
///
/// Pure: the same spec always yields the same status, whatever status the
/// resource carried before.
#[must_use]
pub fn converge(spec: &CalculatorSpec) -> (CalculatorStatus, ReconcileOutcome) {
    let verdict = calc_core::validate(&spec.operation, &spec.operands);
    if !verdict.is_ok() {
        let status = CalculatorStatus::failed(verdict.reason());
        let error = Error::ValidationFailed {
            violations: verdict.violations().to_vec(),
        };
        return (status, ReconcileOutcome::Rejected { error });
    }

    match calc_core::compute(&spec.operation, &spec.operands) {
        Ok(result) => (
            CalculatorStatus::success(result),
            ReconcileOutcome::Computed { result },
        ),
        Err(err) => {
            let error = Error::from(err);
            (
                CalculatorStatus::failed(error.to_string()),
                ReconcileOutcome::Rejected { error },
            )
        }
    }
}

/// Drives Calculators in a store toward their desired state.
///
/// Holds no per-resource state and takes no locks. At most one cycle per
/// identity is expected to run at a time.
pub struct Reconciler {
    store: Arc<dyn ResourceStore>,
    sink: Arc<dyn EventSink>,
}

impl Reconciler {
    /// Create a reconciler that emits events to `sink`.
    pub fn new(store: Arc<dyn ResourceStore>, sink: Arc<dyn EventSink>) -> Self {
        Self { store, sink }
    }

    /// Create a reconciler that emits no events.
    pub fn without_events(store: Arc<dyn ResourceStore>) -> Self {
        Self::new(store, Arc::new(NullSink))
    }

    /// Run one cycle for `key`.
    ///
    /// # Errors
    ///
    /// Returns store errors (`Error::Conflict`, `Error::Store`) as-is. A
    /// missing resource or rejected desired state is an `Ok` outcome.
    pub async fn reconcile(&self, key: &ObjectKey) -> Result<ReconcileOutcome> {
        let (_tx, never_cancelled) = watch::channel(false);
        self.reconcile_until(key, &never_cancelled).await
    }

    /// Run one cycle for `key`, giving up when `cancel` reads `true`.
    ///
    /// Cancellation is checked before the fetch and before the status write.
    ///
    /// # Errors
    ///
    /// Returns `Error::Cancelled` when cancelled at either boundary, and store
    /// errors as-is.
    pub async fn reconcile_until(
        &self,
        key: &ObjectKey,
        cancel: &watch::Receiver<bool>,
    ) -> Result<ReconcileOutcome> {
        ensure_active(cancel, key)?;
        info!(key = %key, "Reconciling calculator");

        let calculator = match self.store.fetch(key).await {
            Ok(calculator) => calculator,
            Err(Error::NotFound { .. }) => {
                info!(key = %key, "Calculator not found, nothing to reconcile");
                return Ok(ReconcileOutcome::NotFound);
            }
            Err(e) => return Err(e),
        };

        let object = key.to_string();
        self.notify(CalculatorEvent::progressing(object.clone())).await;

        let (status, outcome) = converge(&calculator.spec);
        debug!(
            key = %key,
            operation = %calculator.spec.operation,
            status = %status.status(),
            "Converged desired state"
        );

        ensure_active(cancel, key)?;
        let event = outcome_event(object, &status);
        self.store.persist_status(&calculator.with_status(status)).await?;

        match outcome {
            ReconcileOutcome::Computed { result } => {
                info!(key = %key, result, "Computation of calculator succeeded");
            }
            ReconcileOutcome::Rejected { ref error } => {
                warn!(key = %key, error = %error, "Calculator marked failed");
            }
            ReconcileOutcome::NotFound => {}
        }
        self.notify(event).await;

        Ok(outcome)
    }

    /// Get the store.
    pub fn store(&self) -> &Arc<dyn ResourceStore> {
        &self.store
    }

    /// Emit without ever failing the cycle.
    async fn notify(&self, event: CalculatorEvent) {
        let object = event.object.clone();
        if let Err(e) = self.sink.emit(event).await {
            warn!(key = %object, error = %e, "Failed to emit calculator event");
        }
    }
}

fn ensure_active(cancel: &watch::Receiver<bool>, key: &ObjectKey) -> Result<()> {
    if *cancel.borrow() {
        debug!(key = %key, "Reconciliation cancelled");
        return Err(Error::Cancelled);
    }
    Ok(())
}

fn outcome_event(object: String, status: &CalculatorStatus) -> CalculatorEvent {
    match status.result() {
        Some(result) => CalculatorEvent::succeeded(object, result),
        None => CalculatorEvent::failed(object, status.reason().unwrap_or_default()),
    }
}

/// Builder for Reconciler.
#[derive(Default)]
pub struct ReconcilerBuilder {
    store: Option<Arc<dyn ResourceStore>>,
    sink: Option<Arc<dyn EventSink>>,
}

impl ReconcilerBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the resource store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ResourceStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the event sink.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Build the reconciler.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidConfig` when no store was set.
    pub fn build(self) -> Result<Reconciler> {
        let store = self
            .store
            .ok_or_else(|| Error::invalid_config("resource store is required"))?;
        let sink = self.sink.unwrap_or_else(|| Arc::new(NullSink));
        Ok(Reconciler::new(store, sink))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::indexing_slicing
)]
mod tests {
    use async_trait::async_trait;
    use calc_events::{EventId, InMemoryEventLog};

    use super::*;
    use crate::store::InMemoryResourceStore;
    use crate::types::{Calculator, StatusKind};

    struct FailingSink;

    #[async_trait]
    impl EventSink for FailingSink {
        async fn emit(&self, _event: CalculatorEvent) -> calc_events::Result<EventId> {
            Err(calc_events::Error::ChannelClosed)
        }
    }

    struct UnavailableStore;

    #[async_trait]
    impl ResourceStore for UnavailableStore {
        async fn fetch(&self, key: &ObjectKey) -> Result<Calculator> {
            Ok(Calculator::new(key, CalculatorSpec::new("add", vec![1.0, 2.0])))
        }

        async fn persist_status(&self, _calculator: &Calculator) -> Result<Calculator> {
            Err(Error::store("persist_status", "connection refused"))
        }

        async fn list(&self) -> Result<Vec<ObjectKey>> {
            Err(Error::store("list", "connection refused"))
        }
    }

    async fn seeded(operation: &str, operands: &[f64]) -> (Arc<InMemoryResourceStore>, ObjectKey) {
        let store = Arc::new(InMemoryResourceStore::new());
        let key = ObjectKey::new("default", "calc");
        store
            .apply(Calculator::new(
                &key,
                CalculatorSpec::new(operation, operands.to_vec()),
            ))
            .await;
        (store, key)
    }

    #[test]
    fn test_converge_success() {
        let (status, outcome) = converge(&CalculatorSpec::new("fact", vec![5.0]));
        assert_eq!(status, CalculatorStatus::success(120.0));
        assert_eq!(outcome, ReconcileOutcome::Computed { result: 120.0 });
    }

    #[test]
    fn test_converge_rejects_with_joined_reason() {
        let (status, outcome) = converge(&CalculatorSpec::new("div", vec![1.0, 0.0, 0.0]));
        assert_eq!(status.status(), StatusKind::Failed);
        assert_eq!(
            status.reason(),
            Some("denominator at index 1 cannot be 0; denominator at index 2 cannot be 0")
        );
        assert!(outcome.is_rejected());
    }

    #[test]
    fn test_converge_unknown_operation_fails_status() {
        let (status, outcome) = converge(&CalculatorSpec::new("pow", vec![2.0, 3.0]));
        assert_eq!(status.reason(), Some("unknown operation pow"));
        assert!(matches!(
            outcome,
            ReconcileOutcome::Rejected {
                error: Error::ValidationFailed { .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_reconcile_emits_progress_and_outcome() {
        let (store, key) = seeded("add", &[1.0, 2.0, 3.0]).await;
        let log = Arc::new(InMemoryEventLog::new());
        let reconciler = Reconciler::new(store, log.clone());

        let outcome = reconciler.reconcile(&key).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Computed { result: 6.0 });

        let events = log.for_object("default/calc").await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].reason, calc_events::REASON_RECONCILING);
        assert_eq!(events[1].reason, calc_events::REASON_COMPUTED);
    }

    #[tokio::test]
    async fn test_failed_outcome_emits_warning() {
        let (store, key) = seeded("log", &[8.0, 1.0]).await;
        let log = Arc::new(InMemoryEventLog::new());
        let reconciler = Reconciler::new(store, log.clone());

        reconciler.reconcile(&key).await.unwrap();

        let events = log.events().await;
        let last = events.last().unwrap();
        assert!(last.is_warning());
        assert!(last.message.contains("base 1 must be > 1"));
    }

    #[tokio::test]
    async fn test_emit_failure_does_not_fail_cycle() {
        let (store, key) = seeded("mul", &[2.0, 4.0]).await;
        let reconciler = Reconciler::new(store.clone(), Arc::new(FailingSink));

        let outcome = reconciler.reconcile(&key).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Computed { result: 8.0 });
        assert_eq!(
            store.get(&key).await.unwrap().status,
            CalculatorStatus::success(8.0)
        );
    }

    #[tokio::test]
    async fn test_store_error_propagates_unconverted() {
        let reconciler = Reconciler::without_events(Arc::new(UnavailableStore));
        let err = reconciler
            .reconcile(&ObjectKey::new("default", "calc"))
            .await
            .unwrap_err();
        assert_eq!(err, Error::store("persist_status", "connection refused"));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_cancelled_before_fetch_touches_nothing() {
        let (store, key) = seeded("add", &[1.0, 1.0]).await;
        let reconciler = Reconciler::without_events(store.clone());
        let (_tx, cancel) = watch::channel(true);

        let err = reconciler.reconcile_until(&key, &cancel).await.unwrap_err();
        assert_eq!(err, Error::Cancelled);
        assert_eq!(store.get(&key).await.unwrap().metadata.resource_version, 1);
    }

    #[test]
    fn test_builder_requires_store() {
        assert!(matches!(
            ReconcilerBuilder::new().build(),
            Err(Error::InvalidConfig { .. })
        ));

        let store: Arc<dyn ResourceStore> = Arc::new(InMemoryResourceStore::new());
        let built = ReconcilerBuilder::new()
            .with_store(store)
            .with_sink(Arc::new(InMemoryEventLog::new()))
            .build();
        assert!(built.is_ok());
    }
}

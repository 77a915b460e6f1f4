//! Operator runtime: store, admission, events and the reconciliation loop.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::sync::Arc;

use calc_events::{EventBus, EventSubscription, InMemoryEventLog, TracingSink};
use calc_reconciler::{
    Admission, Calculator, InMemoryResourceStore, LoopStopper, ObjectKey, PassSummary,
    Reconciler, ReconciliationLoop, TracingResourceStore,
};
use tracing::{info, warn};

use crate::config::{ConfigError, OperatorConfig};

/// A Calculator that admission turned away.
#[derive(Debug, Clone, PartialEq)]
pub struct Denied {
    pub key: ObjectKey,
    pub error: calc_reconciler::Error,
}

/// Everything needed to admit and reconcile Calculators in one process.
pub struct Operator {
    store: Arc<TracingResourceStore<InMemoryResourceStore>>,
    admission: Admission,
    events: Arc<InMemoryEventLog>,
    bus: Arc<EventBus>,
    reconciliation: ReconciliationLoop,
}

impl Operator {
    /// Wire up an operator from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` when the configuration does not validate.
    pub fn new(config: &OperatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let admission = config.admission()?;
        let store = Arc::new(TracingResourceStore::new(InMemoryResourceStore::new()));
        let events = Arc::new(InMemoryEventLog::with_capacity(config.events.capacity));
        let bus = Arc::new(EventBus::new(events.clone()));

        let reconciler = Arc::new(Reconciler::new(
            store.clone(),
            Arc::new(TracingSink::new(bus.clone())),
        ));
        let reconciliation = ReconciliationLoop::new(reconciler, config.reconciler.clone());

        Ok(Self {
            store,
            admission,
            events,
            bus,
            reconciliation,
        })
    }

    /// Default, validate and store each Calculator.
    ///
    /// Returns the ones admission denied. They are not stored.
    pub async fn admit_all(&self, calculators: Vec<Calculator>) -> Vec<Denied> {
        let mut denied = Vec::new();
        for calculator in calculators {
            let key = calculator.key();
            match self.admission.admit_calculator(calculator) {
                Ok(admitted) => {
                    self.store.inner().apply(admitted).await;
                }
                Err(error) => {
                    warn!(key = %key, error = %error, "Calculator denied by admission");
                    denied.push(Denied { key, error });
                }
            }
        }
        info!(
            stored = self.store.inner().len().await,
            denied = denied.len(),
            "Admission complete"
        );
        denied
    }

    /// Reconcile every stored Calculator once.
    ///
    /// # Errors
    ///
    /// Returns store listing errors or `Error::Cancelled`.
    pub async fn reconcile_once(&self) -> calc_reconciler::Result<PassSummary> {
        self.reconciliation.run_once().await
    }

    /// Reconcile on the configured interval until stopped.
    ///
    /// # Errors
    ///
    /// Returns the loop's terminal error.
    pub async fn run(&self) -> calc_reconciler::Result<()> {
        self.reconciliation.run().await
    }

    /// Handle that stops [`Self::run`].
    pub fn stopper(&self) -> LoopStopper {
        self.reconciliation.stopper()
    }

    /// Live stream of events emitted from now on.
    pub fn subscribe(&self) -> EventSubscription {
        self.bus.subscribe()
    }

    /// Stored Calculators, ordered by identity.
    pub async fn calculators(&self) -> Vec<Calculator> {
        self.store.inner().snapshot().await
    }

    /// Retained event log.
    pub fn events(&self) -> &InMemoryEventLog {
        &self.events
    }
}

//! Continuous reconciliation loop.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::reconciler::{ReconcileOutcome, Reconciler};
use crate::store::ResourceStore;
use crate::types::ObjectKey;

/// Configuration for the reconciliation loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Interval between reconciliation passes.
    #[serde(with = "millis", rename = "interval_ms")]
    pub interval: Duration,
    /// Maximum consecutive failed passes before stopping.
    pub max_errors: usize,
    /// Whether to stop on the first failed pass.
    pub stop_on_error: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_errors: 10,
            stop_on_error: false,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::cast_possible_truncation)]
    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Tally of one pass over every stored Calculator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassSummary {
    /// Calculators written as `success`.
    pub computed: usize,
    /// Calculators written as `failed`.
    pub rejected: usize,
    /// Calculators deleted between listing and fetching.
    pub missing: usize,
    /// Calculators whose cycle returned a store error.
    pub errors: Vec<(ObjectKey, Error)>,
}

impl PassSummary {
    /// Whether every cycle of the pass completed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of Calculators visited.
    #[must_use]
    pub fn total(&self) -> usize {
        self.computed + self.rejected + self.missing + self.errors.len()
    }

    fn record(&mut self, key: ObjectKey, outcome: Result<ReconcileOutcome>) {
        match outcome {
            Ok(ReconcileOutcome::Computed { .. }) => {
                self.computed = self.computed.saturating_add(1);
            }
            Ok(ReconcileOutcome::Rejected { .. }) => {
                self.rejected = self.rejected.saturating_add(1);
            }
            // deleted between fetch and persist
            Ok(ReconcileOutcome::NotFound) | Err(Error::NotFound { .. }) => {
                self.missing = self.missing.saturating_add(1);
            }
            Err(e) => self.errors.push((key, e)),
        }
    }
}

/// Continuous reconciliation loop.
///
/// Each pass lists the store and reconciles every Calculator in turn, so at
/// most one cycle per identity is ever in flight.
pub struct ReconciliationLoop {
    reconciler: Arc<Reconciler>,
    store: Arc<dyn ResourceStore>,
    config: LoopConfig,
    stop_rx: watch::Receiver<bool>,
    stop_tx: watch::Sender<bool>,
}

impl ReconciliationLoop {
    /// Create a new reconciliation loop.
    pub fn new(reconciler: Arc<Reconciler>, config: LoopConfig) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let store = Arc::clone(reconciler.store());
        Self {
            reconciler,
            store,
            config,
            stop_rx,
            stop_tx,
        }
    }

    /// Run the reconciliation loop.
    ///
    /// This runs until stopped or max errors reached.
    ///
    /// # Errors
    ///
    /// Returns the first failure when `stop_on_error` is set, or
    /// `Error::ReconcileFailed` after `max_errors` consecutive failed passes.
    pub async fn run(&self) -> Result<()> {
        info!(
            interval_ms = self.config.interval.as_millis(),
            "Starting reconciliation loop"
        );

        let mut consecutive_errors = 0usize;
        let mut interval = tokio::time::interval(self.config.interval);
        let mut stop_rx = self.stop_rx.clone();

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.run_once().await {
                        Ok(summary) if summary.is_clean() => {
                            consecutive_errors = 0;
                            debug!(
                                computed = summary.computed,
                                rejected = summary.rejected,
                                "Reconciliation pass complete"
                            );
                        }
                        Ok(summary) => {
                            consecutive_errors = consecutive_errors.saturating_add(1);
                            for (key, e) in &summary.errors {
                                warn!(key = %key, error = %e, "Reconcile cycle failed");
                            }
                            if let Some((_, first)) = summary.errors.into_iter().next() {
                                self.on_error(first, consecutive_errors)?;
                            }
                        }
                        Err(Error::Cancelled) => {
                            info!("Reconciliation loop stopped mid-pass");
                            return Ok(());
                        }
                        Err(e) => {
                            consecutive_errors = consecutive_errors.saturating_add(1);
                            self.on_error(e, consecutive_errors)?;
                        }
                    }
                }
                _ = stop_rx.changed() => {
                    if *stop_rx.borrow() {
                        info!("Reconciliation loop stopped");
                        return Ok(());
                    }
                }
            }
        }
    }

    fn on_error(&self, e: Error, consecutive_errors: usize) -> Result<()> {
        error!(
            error = %e,
            consecutive = consecutive_errors,
            "Reconciliation error"
        );

        if self.config.stop_on_error {
            return Err(e);
        }

        if consecutive_errors >= self.config.max_errors {
            error!("Max errors reached, stopping loop");
            return Err(Error::reconcile_failed(format!(
                "Max errors ({}) reached",
                self.config.max_errors
            )));
        }
        Ok(())
    }

    /// Reconcile every stored Calculator once.
    ///
    /// # Errors
    ///
    /// Returns listing errors from the store, or `Error::Cancelled` when the
    /// loop was stopped. Per-resource failures land in the summary.
    pub async fn run_once(&self) -> Result<PassSummary> {
        let keys = self.store.list().await?;
        debug!(count = keys.len(), "Starting reconciliation pass");

        let mut summary = PassSummary::default();
        for key in keys {
            let outcome = self.reconciler.reconcile_until(&key, &self.stop_rx).await;
            if matches!(outcome, Err(Error::Cancelled)) {
                return Err(Error::Cancelled);
            }
            summary.record(key, outcome);
        }
        Ok(summary)
    }

    /// Stop the loop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Get a stopper handle.
    pub fn stopper(&self) -> LoopStopper {
        LoopStopper {
            stop_tx: self.stop_tx.clone(),
        }
    }

    /// Get the configuration.
    pub const fn config(&self) -> &LoopConfig {
        &self.config
    }
}

/// Handle to stop a reconciliation loop.
#[derive(Clone)]
pub struct LoopStopper {
    stop_tx: watch::Sender<bool>,
}

impl LoopStopper {
    /// Stop the loop.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::store::InMemoryResourceStore;
    use crate::types::{Calculator, CalculatorSpec, StatusKind};

    /// Reads from an in-memory store but fails every status write.
    struct RejectingStore {
        inner: InMemoryResourceStore,
        error: Error,
    }

    #[async_trait]
    impl ResourceStore for RejectingStore {
        async fn fetch(&self, key: &ObjectKey) -> Result<Calculator> {
            self.inner.fetch(key).await
        }

        async fn persist_status(&self, _calculator: &Calculator) -> Result<Calculator> {
            Err(self.error.clone())
        }

        async fn list(&self) -> Result<Vec<ObjectKey>> {
            self.inner.list().await
        }
    }

    async fn rejecting_loop(error: Error, config: LoopConfig) -> ReconciliationLoop {
        let inner = InMemoryResourceStore::new();
        inner
            .apply(Calculator::new(
                &ObjectKey::new("default", "sum"),
                CalculatorSpec::new("add", vec![1.0, 2.0]),
            ))
            .await;
        let store = Arc::new(RejectingStore { inner, error });
        ReconciliationLoop::new(Arc::new(Reconciler::without_events(store)), config)
    }

    fn fast(config: LoopConfig) -> LoopConfig {
        LoopConfig {
            interval: Duration::from_millis(5),
            ..config
        }
    }

    async fn setup(
        specs: &[(&str, &str, Vec<f64>)],
    ) -> (Arc<InMemoryResourceStore>, Arc<Reconciler>) {
        let store = Arc::new(InMemoryResourceStore::new());
        for (name, operation, operands) in specs {
            store
                .apply(Calculator::new(
                    &ObjectKey::new("default", *name),
                    CalculatorSpec::new(*operation, operands.clone()),
                ))
                .await;
        }
        let reconciler = Arc::new(Reconciler::without_events(store.clone()));
        (store, reconciler)
    }

    /// Given three calculators, one of them invalid
    /// When the loop runs one pass
    /// Then two are computed and one is rejected
    #[tokio::test]
    async fn one_pass_reconciles_every_calculator() {
        let (store, reconciler) = setup(&[
            ("sum", "add", vec![1.0, 2.0]),
            ("ratio", "div", vec![1.0, 0.0]),
            ("wave", "cos", vec![0.0]),
        ])
        .await;
        let loop_runner = ReconciliationLoop::new(reconciler, LoopConfig::default());

        let summary = loop_runner.run_once().await.unwrap();
        assert_eq!(summary.computed, 2);
        assert_eq!(summary.rejected, 1);
        assert!(summary.is_clean());
        assert_eq!(summary.total(), 3);

        let ratio = store.get(&ObjectKey::new("default", "ratio")).await.unwrap();
        assert_eq!(ratio.status.status(), StatusKind::Failed);
    }

    /// Given an empty store
    /// When the loop runs one pass
    /// Then nothing is visited
    #[tokio::test]
    async fn empty_store_is_a_clean_pass() {
        let (_, reconciler) = setup(&[]).await;
        let loop_runner = ReconciliationLoop::new(reconciler, LoopConfig::default());

        let summary = loop_runner.run_once().await.unwrap();
        assert_eq!(summary, PassSummary::default());
    }

    /// Given a loop that is running
    /// When stop() is called
    /// Then the loop should exit gracefully
    #[tokio::test]
    async fn stop_signal_terminates_loop() {
        let (_, reconciler) = setup(&[("sum", "add", vec![1.0, 2.0])]).await;
        let config = LoopConfig {
            interval: Duration::from_millis(20),
            ..Default::default()
        };
        let loop_runner = ReconciliationLoop::new(reconciler, config);
        let stopper = loop_runner.stopper();

        let handle = tokio::spawn(async move { loop_runner.run().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        stopper.stop();

        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(result.is_ok(), "Loop should stop within timeout");
        let inner = result.ok().and_then(|r| r.ok());
        assert_eq!(inner, Some(Ok(())));
    }

    /// Given a stopped loop
    /// When a pass is attempted
    /// Then it is cancelled before touching any calculator
    #[tokio::test]
    async fn stopped_loop_cancels_pass() {
        let (store, reconciler) = setup(&[("sum", "add", vec![1.0, 2.0])]).await;
        let loop_runner = ReconciliationLoop::new(reconciler, LoopConfig::default());
        loop_runner.stop();

        assert_eq!(loop_runner.run_once().await, Err(Error::Cancelled));
        let sum = store.get(&ObjectKey::new("default", "sum")).await.unwrap();
        assert_eq!(sum.status.status(), StatusKind::Unset);
    }

    /// Given a store that fails every status write and stop_on_error set
    /// When the loop runs
    /// Then it terminates with the store error from the first pass
    #[tokio::test]
    async fn stop_on_error_terminates_on_first_failure() {
        let error = Error::store("persist_status", "disk full");
        let config = fast(LoopConfig {
            stop_on_error: true,
            ..Default::default()
        });
        let loop_runner = rejecting_loop(error.clone(), config).await;

        let result = tokio::time::timeout(Duration::from_secs(1), loop_runner.run()).await;
        assert_eq!(result.ok(), Some(Err(error)));
    }

    /// Given a store that fails every status write and an error budget of two
    /// When the loop runs
    /// Then it gives up after two consecutive failed passes
    #[tokio::test]
    async fn max_errors_terminates_loop() {
        let config = fast(LoopConfig {
            max_errors: 2,
            ..Default::default()
        });
        let loop_runner = rejecting_loop(Error::store("persist_status", "disk full"), config).await;

        let result = tokio::time::timeout(Duration::from_secs(1), loop_runner.run()).await;
        assert!(matches!(result, Ok(Err(Error::ReconcileFailed { .. }))));
    }

    /// Given a calculator deleted between fetch and persist
    /// When the loop runs one pass
    /// Then it is counted as missing, not as an error
    #[tokio::test]
    async fn deleted_during_cycle_counts_as_missing() {
        let loop_runner =
            rejecting_loop(Error::not_found("default/sum"), LoopConfig::default()).await;

        let summary = loop_runner.run_once().await.unwrap();
        assert_eq!(summary.missing, 1);
        assert!(summary.is_clean());
    }

    /// Given a calculator deleted during every pass and an error budget of one
    /// When the loop runs
    /// Then it keeps running until stopped
    #[tokio::test]
    async fn deleted_calculators_do_not_spend_error_budget() {
        let config = fast(LoopConfig {
            max_errors: 1,
            ..Default::default()
        });
        let loop_runner = rejecting_loop(Error::not_found("default/sum"), config).await;
        let stopper = loop_runner.stopper();

        let handle = tokio::spawn(async move { loop_runner.run().await });
        tokio::time::sleep(Duration::from_millis(30)).await;
        stopper.stop();

        let result = tokio::time::timeout(Duration::from_secs(1), handle).await;
        let inner = result.ok().and_then(|r| r.ok());
        assert_eq!(inner, Some(Ok(())));
    }

    #[test]
    fn loop_config_reads_interval_in_millis() {
        let config: LoopConfig =
            serde_json::from_str(r#"{"interval_ms": 250, "stop_on_error": true}"#).unwrap();
        assert_eq!(config.interval, Duration::from_millis(250));
        assert_eq!(config.max_errors, 10);
        assert!(config.stop_on_error);
    }
}

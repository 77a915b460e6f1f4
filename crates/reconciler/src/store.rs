//! Resource store trait and implementations.
//!
//! The store owns identity and persistence. The controller only reads desired
//! state through [`ResourceStore::fetch`] and writes observed state through
//! [`ResourceStore::persist_status`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::types::{Calculator, CalculatorSpec, ObjectKey};

/// Trait for Calculator storage backends.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Read a Calculator by identity.
    ///
    /// Fails with `Error::NotFound` when the resource does not exist.
    async fn fetch(&self, key: &ObjectKey) -> Result<Calculator>;

    /// Replace the status of a Calculator.
    ///
    /// Only `status` is written. The write is rejected with `Error::Conflict`
    /// when `calculator.metadata.resource_version` is stale.
    async fn persist_status(&self, calculator: &Calculator) -> Result<Calculator>;

    /// Identities of all stored Calculators, in a stable order.
    async fn list(&self) -> Result<Vec<ObjectKey>>;
}

/// In-memory resource store for tests and local runs.
#[derive(Default)]
pub struct InMemoryResourceStore {
    objects: RwLock<BTreeMap<ObjectKey, Calculator>>,
}

impl InMemoryResourceStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or update a Calculator from a manifest.
    ///
    /// A new resource starts at generation and resource version 1. Updating
    /// an existing one keeps its status and bumps the resource version, and
    /// the generation too when the spec changed.
    pub async fn apply(&self, calculator: Calculator) -> Calculator {
        let key = calculator.key();
        let mut objects = self.objects.write().await;

        let stored = match objects.get(&key) {
            Some(existing) => {
                let spec_changed = existing.spec != calculator.spec;
                let mut next = existing.clone();
                next.spec = calculator.spec;
                next.metadata.resource_version =
                    existing.metadata.resource_version.saturating_add(1);
                if spec_changed {
                    next.metadata.generation = existing.metadata.generation.saturating_add(1);
                }
                next
            }
            None => {
                let mut fresh = calculator;
                fresh.metadata.resource_version = 1;
                fresh.metadata.generation = 1;
                fresh
            }
        };

        objects.insert(key, stored.clone());
        stored
    }

    /// Replace the spec of an existing Calculator.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no such Calculator exists.
    pub async fn update_spec(&self, key: &ObjectKey, spec: CalculatorSpec) -> Result<Calculator> {
        let mut objects = self.objects.write().await;
        let existing = objects.get_mut(key).ok_or_else(|| Error::not_found(key))?;
        existing.spec = spec;
        existing.metadata.generation = existing.metadata.generation.saturating_add(1);
        existing.metadata.resource_version = existing.metadata.resource_version.saturating_add(1);
        Ok(existing.clone())
    }

    /// Remove a Calculator.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no such Calculator exists.
    pub async fn delete(&self, key: &ObjectKey) -> Result<Calculator> {
        self.objects
            .write()
            .await
            .remove(key)
            .ok_or_else(|| Error::not_found(key))
    }

    /// Current copy of a Calculator, if stored.
    pub async fn get(&self, key: &ObjectKey) -> Option<Calculator> {
        self.objects.read().await.get(key).cloned()
    }

    /// Every stored Calculator, ordered by identity.
    pub async fn snapshot(&self) -> Vec<Calculator> {
        self.objects.read().await.values().cloned().collect()
    }

    /// Number of stored Calculators.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl ResourceStore for InMemoryResourceStore {
    async fn fetch(&self, key: &ObjectKey) -> Result<Calculator> {
        self.get(key).await.ok_or_else(|| Error::not_found(key))
    }

    async fn persist_status(&self, calculator: &Calculator) -> Result<Calculator> {
        let key = calculator.key();
        let mut objects = self.objects.write().await;
        let existing = objects.get_mut(&key).ok_or_else(|| Error::not_found(&key))?;

        let expected = calculator.metadata.resource_version;
        let actual = existing.metadata.resource_version;
        if expected != actual {
            return Err(Error::conflict(&key, expected, actual));
        }

        existing.status = calculator.status.clone();
        existing.metadata.resource_version = actual.saturating_add(1);
        Ok(existing.clone())
    }

    async fn list(&self) -> Result<Vec<ObjectKey>> {
        Ok(self.objects.read().await.keys().cloned().collect())
    }
}

/// A wrapper that adds tracing to a resource store.
pub struct TracingResourceStore<S: ResourceStore> {
    inner: S,
}

impl<S: ResourceStore> TracingResourceStore<S> {
    /// Create a new tracing store.
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }

    /// Get the wrapped store.
    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: ResourceStore> ResourceStore for TracingResourceStore<S> {
    async fn fetch(&self, key: &ObjectKey) -> Result<Calculator> {
        tracing::debug!(key = %key, "Fetching calculator");
        let result = self.inner.fetch(key).await;
        if let Err(ref e) = result {
            tracing::debug!(key = %key, error = %e, "Fetch failed");
        }
        result
    }

    async fn persist_status(&self, calculator: &Calculator) -> Result<Calculator> {
        tracing::debug!(
            key = %calculator.key(),
            status = %calculator.status.status(),
            resource_version = calculator.metadata.resource_version,
            "Persisting status"
        );
        let result = self.inner.persist_status(calculator).await;
        match result {
            Ok(ref stored) => {
                tracing::trace!(
                    resource_version = stored.metadata.resource_version,
                    "Status persisted"
                );
            }
            Err(ref e) => tracing::warn!(error = %e, "Status write failed"),
        }
        result
    }

    async fn list(&self) -> Result<Vec<ObjectKey>> {
        self.inner.list().await
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{CalculatorStatus, StatusKind};

    fn calculator(name: &str, operation: &str, operands: &[f64]) -> Calculator {
        Calculator::new(
            &ObjectKey::new("default", name),
            CalculatorSpec::new(operation, operands.to_vec()),
        )
    }

    #[tokio::test]
    async fn test_apply_and_fetch() {
        let store = InMemoryResourceStore::new();
        let stored = store.apply(calculator("sum", "add", &[1.0, 2.0])).await;
        assert_eq!(stored.metadata.resource_version, 1);
        assert_eq!(stored.metadata.generation, 1);

        let fetched = store.fetch(&stored.key()).await.unwrap();
        assert_eq!(fetched, stored);
    }

    #[tokio::test]
    async fn test_fetch_missing_is_not_found() {
        let store = InMemoryResourceStore::new();
        let result = store.fetch(&ObjectKey::new("default", "ghost")).await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_reapply_keeps_status_and_bumps_generation() {
        let store = InMemoryResourceStore::new();
        let stored = store.apply(calculator("sum", "add", &[1.0, 2.0])).await;
        store
            .persist_status(&stored.with_status(CalculatorStatus::success(3.0)))
            .await
            .unwrap();

        let updated = store.apply(calculator("sum", "add", &[1.0, 5.0])).await;
        assert_eq!(updated.metadata.generation, 2);
        assert_eq!(updated.metadata.resource_version, 3);
        assert_eq!(updated.status.status(), StatusKind::Success);

        let unchanged = store.apply(calculator("sum", "add", &[1.0, 5.0])).await;
        assert_eq!(unchanged.metadata.generation, 2);
    }

    #[tokio::test]
    async fn test_persist_status_replaces_status_only() {
        let store = InMemoryResourceStore::new();
        let stored = store.apply(calculator("sum", "add", &[1.0, 2.0])).await;

        let mut write = stored.clone().with_status(CalculatorStatus::failed("nope"));
        write.spec = CalculatorSpec::new("mul", vec![0.0]);
        let persisted = store.persist_status(&write).await.unwrap();

        assert_eq!(persisted.spec, stored.spec);
        assert_eq!(persisted.status, CalculatorStatus::failed("nope"));
        assert_eq!(persisted.metadata.resource_version, 2);
    }

    #[tokio::test]
    async fn test_stale_status_write_conflicts() {
        let store = InMemoryResourceStore::new();
        let stored = store.apply(calculator("sum", "add", &[1.0, 2.0])).await;
        store
            .update_spec(&stored.key(), CalculatorSpec::new("add", vec![4.0, 4.0]))
            .await
            .unwrap();

        let result = store
            .persist_status(&stored.with_status(CalculatorStatus::success(3.0)))
            .await;
        assert!(matches!(
            result,
            Err(Error::Conflict {
                expected: 1,
                actual: 2,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_list_is_ordered() {
        let store = InMemoryResourceStore::new();
        store.apply(calculator("b", "add", &[1.0, 1.0])).await;
        store.apply(calculator("a", "add", &[1.0, 1.0])).await;

        let keys = store.list().await.unwrap();
        assert_eq!(
            keys,
            vec![ObjectKey::new("default", "a"), ObjectKey::new("default", "b")]
        );
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryResourceStore::new();
        let stored = store.apply(calculator("gone", "add", &[1.0, 1.0])).await;
        assert!(store.delete(&stored.key()).await.is_ok());
        assert!(store.is_empty().await);
        assert!(store.delete(&stored.key()).await.is_err());
    }

    #[tokio::test]
    async fn test_tracing_store_delegates() {
        let store = TracingResourceStore::new(InMemoryResourceStore::new());
        let stored = store.inner().apply(calculator("t", "add", &[1.0, 1.0])).await;
        assert!(store.fetch(&stored.key()).await.is_ok());
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}

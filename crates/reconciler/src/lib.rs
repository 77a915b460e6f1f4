//! K8s-style convergence controller for Calculator resources.
//!
//! This crate drives stored Calculators toward their desired state:
//!
//! - **Desired State**: `spec`, an operation code and its operands
//! - **Observed State**: `status`, either a result or a failure reason
//! - **Cycle**: fetch, validate, compute, persist the status wholesale
//!
//! # Key Concepts
//!
//! ## Reconciliation
//!
//! One cycle per resource identity:
//! 1. Fetch the Calculator (a missing one is a no-op outcome)
//! 2. Validate the spec through `calc-core`
//! 3. Compute the result when validation passed
//! 4. Replace the status, `success` with a result or `failed` with a reason
//!
//! Rejected desired state is recorded on the resource. Store failures are
//! returned to the caller, who decides whether to retry.
//!
//! ## Admission
//!
//! Empty spec fields are defaulted before the resource is stored, never
//! during a cycle.
//!
//! # Example
//!
//! ```ignore
//! use calc_reconciler::{
//!     Calculator, CalculatorSpec, InMemoryResourceStore, ObjectKey, Reconciler,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(InMemoryResourceStore::new());
//!     let key = ObjectKey::new("default", "sum");
//!     store
//!         .apply(Calculator::new(&key, CalculatorSpec::new("add", vec![1.0, 2.0, 3.0])))
//!         .await;
//!
//!     let reconciler = Reconciler::without_events(store.clone());
//!     let outcome = reconciler.reconcile(&key).await;
//!     println!("{outcome:?}");
//! }
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod admission;
pub mod error;
pub mod r#loop;
pub mod reconciler;
pub mod store;
pub mod types;

// Re-export main types
pub use admission::{Admission, DefaultingPolicy, OPERANDS_FIELD, OPERATION_FIELD};
pub use error::{Error, Result};
pub use r#loop::{LoopConfig, LoopStopper, PassSummary, ReconciliationLoop};
pub use reconciler::{ReconcileOutcome, Reconciler, ReconcilerBuilder, converge};
pub use store::{InMemoryResourceStore, ResourceStore, TracingResourceStore};
pub use types::{
    API_VERSION, Calculator, CalculatorSpec, CalculatorStatus, DEFAULT_NAMESPACE, KIND, ObjectKey,
    ObjectMeta, StatusKind,
};

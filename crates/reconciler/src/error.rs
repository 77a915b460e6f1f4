//! Error types for the reconciler crate.

use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The resource is gone; nothing to reconcile.
    #[error("calculator '{key}' not found")]
    NotFound { key: String },

    /// Operands broke one or more rules.
    #[error("validation failed for operands: {}", violations.join("; "))]
    ValidationFailed { violations: Vec<String> },

    /// Operation code outside the closed set.
    #[error("unknown operation '{operation}'")]
    UnknownOperation { operation: String },

    /// The dispatcher could not produce a result.
    #[error("computation failed: {reason}")]
    ComputationFailed { reason: String },

    /// Status write raced with another writer.
    #[error("conflict writing '{key}': expected resource version {expected}, found {actual}")]
    Conflict {
        key: String,
        expected: u64,
        actual: u64,
    },

    /// Store operation failed.
    #[error("store operation '{operation}' failed: {reason}")]
    Store { operation: String, reason: String },

    /// Admission rejected the desired state.
    #[error("admission denied for field '{field}': {reason}")]
    AdmissionDenied { field: String, reason: String },

    /// Cancellation was observed at a fetch/persist boundary.
    #[error("reconciliation cancelled")]
    Cancelled,

    /// Reconciliation loop gave up.
    #[error("reconciliation failed: {reason}")]
    ReconcileFailed { reason: String },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Error {
    /// Create a not found error.
    pub fn not_found(key: impl ToString) -> Self {
        Self::NotFound {
            key: key.to_string(),
        }
    }

    /// Create a conflict error.
    pub fn conflict(key: impl ToString, expected: u64, actual: u64) -> Self {
        Self::Conflict {
            key: key.to_string(),
            expected,
            actual,
        }
    }

    /// Create a store error.
    pub fn store(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Store {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create an admission denied error.
    pub fn admission_denied(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AdmissionDenied {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a reconcile failed error.
    pub fn reconcile_failed(reason: impl Into<String>) -> Self {
        Self::ReconcileFailed {
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Whether the external scheduler should try the cycle again.
    ///
    /// Only store-layer failures qualify. Rejected desired state is already
    /// recorded on the resource and retrying cannot change it.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Store { .. })
    }

    /// Whether this error describes the desired state rather than the store.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed { .. }
                | Self::UnknownOperation { .. }
                | Self::ComputationFailed { .. }
        )
    }
}

impl From<calc_core::Error> for Error {
    fn from(err: calc_core::Error) -> Self {
        match err {
            calc_core::Error::UnknownOperation { operation } => {
                Self::UnknownOperation { operation }
            }
            calc_core::Error::ValidationFailed { violations } => {
                Self::ValidationFailed { violations }
            }
            other @ (calc_core::Error::MissingOperand { .. }
            | calc_core::Error::UnknownCountMode { .. }) => Self::ComputationFailed {
                reason: other.to_string(),
            },
        }
    }
}

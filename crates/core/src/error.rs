//! Core error types for operand validation and computation.
//!
//! All errors are explicit, typed, and recoverable - no panics allowed.

use thiserror::Error;

/// The standard Result type for calculator core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Operation code outside the closed set.
    #[error("unknown operation '{operation}'")]
    UnknownOperation { operation: String },

    /// Count mode text outside `min`/`max`/`exact`.
    #[error("unknown operand count mode '{mode}'")]
    UnknownCountMode { mode: String },

    /// One or more operand rules were violated.
    #[error("validation failed for operands: {}", violations.join("; "))]
    ValidationFailed { violations: Vec<String> },

    /// The dispatcher needed an operand that is not there.
    #[error("operation '{operation}' has no operand at index {index}")]
    MissingOperand { operation: String, index: usize },
}

impl Error {
    /// Create an unknown operation error.
    pub fn unknown_operation(operation: impl Into<String>) -> Self {
        Self::UnknownOperation {
            operation: operation.into(),
        }
    }

    /// Create an unknown count mode error.
    pub fn unknown_count_mode(mode: impl Into<String>) -> Self {
        Self::UnknownCountMode { mode: mode.into() }
    }

    /// Create a validation failed error.
    pub fn validation_failed(violations: Vec<String>) -> Self {
        Self::ValidationFailed { violations }
    }

    /// Create a missing operand error.
    pub fn missing_operand(operation: impl Into<String>, index: usize) -> Self {
        Self::MissingOperand {
            operation: operation.into(),
            index,
        }
    }

    /// Violation messages carried by this error.
    ///
    /// Errors other than `ValidationFailed` report their own message as the
    /// single violation.
    #[must_use]
    pub fn violations(&self) -> Vec<String> {
        match self {
            Self::ValidationFailed { violations } => violations.clone(),
            other => vec![other.to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_operation_display() {
        let err = Error::unknown_operation("modulo");
        assert!(err.to_string().contains("modulo"));
    }

    #[test]
    fn test_validation_failed_joins_violations() {
        let err = Error::validation_failed(vec!["first".to_string(), "second".to_string()]);
        assert_eq!(
            err.to_string(),
            "validation failed for operands: first; second"
        );
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn test_missing_operand_is_its_own_violation() {
        let err = Error::missing_operand("log", 1);
        assert_eq!(err.violations(), vec![err.to_string()]);
    }
}

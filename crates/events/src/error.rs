//! Error types for the events crate.

use std::fmt;

/// Result type alias for event operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Event error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Recording the event failed.
    EmitFailed { reason: String },
    /// Channel closed.
    ChannelClosed,
    /// Serialization error.
    Serialization { reason: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmitFailed { reason } => {
                write!(f, "failed to emit event: {reason}")
            }
            Self::ChannelClosed => {
                write!(f, "event channel closed")
            }
            Self::Serialization { reason } => {
                write!(f, "serialization error: {reason}")
            }
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Create an emit failed error.
    pub fn emit_failed(reason: impl Into<String>) -> Self {
        Self::EmitFailed {
            reason: reason.into(),
        }
    }

    /// Create a serialization error.
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::Serialization {
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::emit_failed("sink full");
        assert!(err.to_string().contains("sink full"));
        assert_eq!(Error::ChannelClosed.to_string(), "event channel closed");
    }
}

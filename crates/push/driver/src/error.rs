//! Driver error types.

use thiserror::Error;

/// Errors a driver raises instead of a per-recipient failure.
///
/// Per-recipient rejections never show up here; they are part of the
/// [`push_core::FailureSet`] a driver returns.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DriverError {
    /// Payload unusable for this backend; raised before any network I/O.
    #[error("invalid payload: {message}")]
    Validation { message: String },

    /// Backend could not be reached.
    #[error("backend unavailable: {message}")]
    Unavailable { message: String },

    /// Backend answered with an error not tied to any recipient.
    #[error("backend error: {message}")]
    Backend { message: String },
}

impl DriverError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Whole-batch failure rather than a bad request.
    pub fn is_catastrophic(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Backend { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catastrophic_classification() {
        assert!(DriverError::unavailable("connection refused").is_catastrophic());
        assert!(DriverError::backend("HTTP 503").is_catastrophic());
        assert!(!DriverError::validation("payload is null").is_catastrophic());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            DriverError::unavailable("connection refused").to_string(),
            "backend unavailable: connection refused"
        );
    }
}

//! Dispatch error types.

use push_core::{AttemptId, DriverKey};
use push_driver::DriverError;
use thiserror::Error;

/// Result type alias for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Errors surfaced to callers of the dispatch service.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Request or payload rejected before any delivery was tried.
    #[error("invalid request: {message}")]
    Invalid { message: String },

    /// A driver failed the whole batch.
    #[error("driver {driver} failed: {source}")]
    Driver {
        driver: DriverKey,
        #[source]
        source: DriverError,
    },

    /// A platform routes to a driver that is not registered.
    #[error("no driver registered under {key}")]
    UnknownDriver { key: DriverKey },

    /// No attempt with this identifier.
    #[error("dispatch attempt {id} not found")]
    NotFound { id: AttemptId },

    /// The queue refused the job.
    #[error("queue error: {message}")]
    Queue { message: String },

    /// Storage failure.
    #[error("storage error: {0:#}")]
    Storage(color_eyre::eyre::Report),
}

impl DispatchError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    pub fn queue(message: impl Into<String>) -> Self {
        Self::Queue {
            message: message.into(),
        }
    }

    /// Whether re-submitting the whole attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Driver { source, .. } => source.is_catastrophic(),
            Self::Queue { .. } | Self::Storage(_) => true,
            Self::Invalid { .. } | Self::UnknownDriver { .. } | Self::NotFound { .. } => false,
        }
    }
}

impl From<color_eyre::eyre::Report> for DispatchError {
    fn from(report: color_eyre::eyre::Report) -> Self {
        Self::Storage(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        let outage = DispatchError::Driver {
            driver: "apns".into(),
            source: DriverError::unavailable("connection refused"),
        };
        assert!(outage.is_retryable());
        assert!(DispatchError::queue("closed").is_retryable());
        assert!(DispatchError::from(color_eyre::eyre::eyre!("disk full")).is_retryable());

        assert!(!DispatchError::invalid("payload is null").is_retryable());
        assert!(!DispatchError::UnknownDriver { key: "fcm".into() }.is_retryable());
        assert!(!DispatchError::NotFound { id: AttemptId::new("x") }.is_retryable());
    }

    #[test]
    fn test_display() {
        let err = DispatchError::Driver {
            driver: "apns".into(),
            source: DriverError::unavailable("connection refused"),
        };
        assert_eq!(
            err.to_string(),
            "driver apns failed: backend unavailable: connection refused"
        );
    }
}

//! Driver that only logs.

use push_core::{FailureSet, Payload, Recipient};

use crate::{Driver, DriverError};

/// Accepts every recipient and logs the send.
///
/// Stands in for providers that have no driver yet, and for local runs.
#[derive(Debug, Clone, Default)]
pub struct LogDriver {
    name: String,
}

impl LogDriver {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Driver for LogDriver {
    async fn attempt(
        &self,
        recipients: &[Recipient],
        payload: &Payload,
    ) -> Result<FailureSet, DriverError> {
        for recipient in recipients {
            tracing::info!(
                driver = %self.name,
                recipient = %recipient,
                payload = %payload.as_json(),
                "push notification"
            );
        }

        Ok(FailureSet::new())
    }
}

//! Driver trait.

use std::sync::Arc;

use push_core::{FailureSet, Payload, Recipient};

use crate::DriverError;

/// One delivery backend.
#[trait_variant::make(Send)]
pub trait Driver: Send + Sync {
    /// Reject payloads this backend cannot deliver. Must not perform I/O.
    fn validate(&self, payload: &Payload) -> Result<(), DriverError> {
        payload
            .validate()
            .map_err(|e| DriverError::validation(e.to_string()))
    }

    /// Attempt delivery to every recipient.
    ///
    /// Returns the recipients the backend rejected; everyone else counts as
    /// accepted. `Err` is reserved for failures of the whole batch.
    async fn attempt(
        &self,
        recipients: &[Recipient],
        payload: &Payload,
    ) -> Result<FailureSet, DriverError>;
}

impl<D: Driver> Driver for Arc<D> {
    fn validate(&self, payload: &Payload) -> Result<(), DriverError> {
        (**self).validate(payload)
    }

    async fn attempt(
        &self,
        recipients: &[Recipient],
        payload: &Payload,
    ) -> Result<FailureSet, DriverError> {
        (**self).attempt(recipients, payload).await
    }
}

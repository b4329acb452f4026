//! Scriptable in-memory driver.

use std::collections::HashMap;

use parking_lot::Mutex;
use push_core::{FailureSet, Payload, Recipient};

use crate::{Driver, DriverError};

/// One recorded call to [`FakeDriver::attempt`].
#[derive(Debug, Clone, PartialEq)]
pub struct FakeCall {
    pub recipients: Vec<Recipient>,
    pub payload: Payload,
}

/// Driver whose answers are scripted up front.
///
/// Rejects configured recipients and can fail every call with an outage.
/// It records what it was asked to send, and can misbehave by reporting
/// failures for recipients outside the batch.
#[derive(Debug, Default)]
pub struct FakeDriver {
    rejections: HashMap<Recipient, String>,
    strays: Vec<(Recipient, String)>,
    outage: Option<DriverError>,
    calls: Mutex<Vec<FakeCall>>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject `recipient` with `reason` on every call.
    pub fn reject(mut self, recipient: impl Into<Recipient>, reason: impl Into<String>) -> Self {
        self.rejections.insert(recipient.into(), reason.into());
        self
    }

    /// Report `recipient` as failed on every call, even when it was not sent.
    pub fn stray(mut self, recipient: impl Into<Recipient>, reason: impl Into<String>) -> Self {
        self.strays.push((recipient.into(), reason.into()));
        self
    }

    /// Fail every call as if the backend were unreachable.
    pub fn unavailable(mut self, message: impl Into<String>) -> Self {
        self.outage = Some(DriverError::unavailable(message));
        self
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<FakeCall> {
        self.calls.lock().clone()
    }

    /// Every recipient handed to the driver, in call order.
    pub fn sent(&self) -> Vec<Recipient> {
        self.calls
            .lock()
            .iter()
            .flat_map(|call| call.recipients.iter().cloned())
            .collect()
    }
}

impl Driver for FakeDriver {
    async fn attempt(
        &self,
        recipients: &[Recipient],
        payload: &Payload,
    ) -> Result<FailureSet, DriverError> {
        self.calls.lock().push(FakeCall {
            recipients: recipients.to_vec(),
            payload: payload.clone(),
        });

        if let Some(outage) = &self.outage {
            return Err(outage.clone());
        }

        let mut failures = FailureSet::new();
        for recipient in recipients {
            if let Some(reason) = self.rejections.get(recipient) {
                failures.insert(recipient.clone(), reason.clone());
            }
        }
        for (recipient, reason) in &self.strays {
            failures.insert(recipient.clone(), reason.clone());
        }

        Ok(failures)
    }
}

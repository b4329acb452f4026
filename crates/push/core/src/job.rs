//! Routing plans and queued job descriptors.

use std::collections::BTreeMap;

use color_eyre::eyre::WrapErr as _;

use crate::{AttemptId, CredentialId, DriverKey, FailureRecord, Payload, Recipient};

/// One recipient resolved to the token its driver addresses.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Target {
    pub recipient: Recipient,
    pub token: Recipient,
}

/// Recipients of one send grouped by the driver that will deliver them.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DispatchPlan {
    pub routes: BTreeMap<DriverKey, Vec<Target>>,
    /// Recipients that could not be routed, failed up front.
    #[serde(default)]
    pub unresolved: Vec<FailureRecord>,
}

impl DispatchPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target to the route for `driver`.
    pub fn route(&mut self, driver: DriverKey, recipient: Recipient, token: Recipient) {
        self.routes
            .entry(driver)
            .or_default()
            .push(Target { recipient, token });
    }

    pub fn unresolved(&mut self, recipient: Recipient, reason: impl Into<String>) {
        self.unresolved.push(FailureRecord::new(recipient, reason));
    }

    /// Number of routed targets across all drivers.
    pub fn target_count(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }
}

/// Everything a worker needs to replay a send later.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct JobDescriptor {
    pub attempt_id: AttemptId,
    pub credential_id: CredentialId,
    pub recipients: Vec<Recipient>,
    pub plan: DispatchPlan,
    pub payload: Payload,
}

impl JobDescriptor {
    /// Encode for the queue.
    pub fn encode(&self) -> color_eyre::eyre::Result<Vec<u8>> {
        serde_json::to_vec(self).wrap_err("failed to encode job")
    }

    /// Decode a job taken off the queue.
    pub fn decode(bytes: &[u8]) -> color_eyre::eyre::Result<Self> {
        serde_json::from_slice(bytes).wrap_err("failed to decode job")
    }
}

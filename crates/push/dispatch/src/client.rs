//! Dispatch client over a single driver.

use push_core::{FailureSet, Payload, Recipient};
use push_driver::{Driver, DriverError};

/// What the failure accumulator does between sends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Each send starts from an empty accumulator.
    #[default]
    Reset,
    /// Failures pile up across sends until [`DispatchClient::reset`].
    Accumulate,
}

/// Outcome of one [`DispatchClient::send`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendReport {
    /// Recipients handed to the driver.
    pub attempted: usize,
    /// Recipients the driver rejected in this call.
    pub failures: FailureSet,
}

impl SendReport {
    /// Recipients that were handed over and not rejected.
    pub fn accepted(&self) -> usize {
        self.attempted.saturating_sub(self.failures.len())
    }
}

/// Sends through one driver and remembers which recipients failed.
pub struct DispatchClient<D> {
    driver: D,
    policy: FailurePolicy,
    failures: FailureSet,
}

impl<D: Driver> DispatchClient<D> {
    /// Create a client with the default [`FailurePolicy::Reset`].
    pub fn new(driver: D) -> Self {
        Self::with_policy(driver, FailurePolicy::default())
    }

    pub fn with_policy(driver: D, policy: FailurePolicy) -> Self {
        Self {
            driver,
            policy,
            failures: FailureSet::new(),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Send `payload` to `recipients`.
    ///
    /// Invalid payloads are rejected before the driver is called, and an empty
    /// recipient list never reaches the driver. Whole-batch driver errors are
    /// returned as-is and leave no per-recipient failures behind.
    pub async fn send(
        &mut self,
        recipients: &[Recipient],
        payload: &Payload,
    ) -> Result<SendReport, DriverError> {
        if self.policy == FailurePolicy::Reset {
            self.failures.clear();
        }

        self.driver.validate(payload)?;

        if recipients.is_empty() {
            tracing::debug!("empty recipient list, nothing to send");
            return Ok(SendReport::default());
        }

        let mut failures = self.driver.attempt(recipients, payload).await?;

        // Drivers may only fail recipients they were given.
        failures.retain(|recipient| {
            let known = recipients.contains(recipient);
            if !known {
                tracing::warn!(recipient = %recipient, "driver reported unknown recipient");
            }
            known
        });

        tracing::debug!(
            attempted = recipients.len(),
            failed = failures.len(),
            "send completed"
        );

        self.failures.merge(failures.clone());

        Ok(SendReport {
            attempted: recipients.len(),
            failures,
        })
    }

    /// Failures recorded since creation or the last reset.
    pub fn failures(&self) -> &FailureSet {
        &self.failures
    }

    /// Forget every recorded failure.
    pub fn reset(&mut self) {
        self.failures.clear();
    }
}

#[cfg(test)]
mod tests {
    use push_driver::FakeDriver;

    use super::*;

    fn payload() -> Payload {
        Payload::new(serde_json::json!({
            "notification": { "title": "", "body": "" },
            "data": { "a": "A" },
        }))
    }

    fn recipients(ids: &[&str]) -> Vec<Recipient> {
        ids.iter().map(|id| Recipient::from(*id)).collect()
    }

    #[tokio::test]
    async fn test_failures_reflect_driver_rejections() {
        let mut client = DispatchClient::new(FakeDriver::new().reject("UID:2", "NotRegistered"));

        let report = client
            .send(&recipients(&["UID:1", "UID:2"]), &payload())
            .await
            .unwrap();

        assert_eq!(report.attempted, 2);
        assert_eq!(report.accepted(), 1);
        assert_eq!(
            client.failures().records(),
            vec![push_core::FailureRecord::new("UID:2", "NotRegistered")]
        );
    }

    #[tokio::test]
    async fn test_failures_outside_batch_are_dropped() {
        let driver = FakeDriver::new()
            .reject("UID:2", "NotRegistered")
            .stray("UID:9", "Unregistered");
        let mut client = DispatchClient::with_policy(driver, FailurePolicy::Accumulate);

        let report = client
            .send(&recipients(&["UID:1", "UID:2"]), &payload())
            .await
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        assert!(!report.failures.contains(&"UID:9".into()));
        assert_eq!(report.accepted(), 1);
        assert_eq!(client.failures().len(), 1);
        assert!(client.failures().contains(&"UID:2".into()));
        assert!(!client.failures().contains(&"UID:9".into()));
    }

    #[tokio::test]
    async fn test_clean_send_leaves_no_failures() {
        let mut client = DispatchClient::new(FakeDriver::new());
        let batch = recipients(&["UID:1", "UID:2", "UID:3"]);

        client.send(&batch, &payload()).await.unwrap();

        assert!(batch.iter().all(|r| !client.failures().contains(r)));
    }

    #[tokio::test]
    async fn test_failures_is_idempotent() {
        let mut client = DispatchClient::new(FakeDriver::new().reject("UID:1", "BadDeviceToken"));
        client.send(&recipients(&["UID:1"]), &payload()).await.unwrap();

        let first = client.failures().clone();
        let second = client.failures().clone();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_empty_batch_skips_driver() {
        let mut client = DispatchClient::new(FakeDriver::new());

        let report = client.send(&[], &payload()).await.unwrap();

        assert_eq!(report, SendReport::default());
        assert!(client.driver().calls().is_empty());
        assert!(client.failures().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_payload_rejected_before_driver() {
        let mut client = DispatchClient::new(FakeDriver::new());

        let err = client
            .send(&recipients(&["UID:1"]), &Payload::new(serde_json::json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, DriverError::Validation { .. }));
        assert!(client.driver().calls().is_empty());
    }

    #[tokio::test]
    async fn test_outage_propagates() {
        let mut client = DispatchClient::new(FakeDriver::new().unavailable("connection refused"));

        let err = client
            .send(&recipients(&["UID:1"]), &payload())
            .await
            .unwrap_err();

        assert!(err.is_catastrophic());
        assert!(client.failures().is_empty());
    }

    #[tokio::test]
    async fn test_reset_policy_scopes_to_last_send() {
        let driver = FakeDriver::new()
            .reject("UID:1", "Unregistered")
            .reject("UID:3", "Unregistered");
        let mut client = DispatchClient::new(driver);

        client.send(&recipients(&["UID:1", "UID:2"]), &payload()).await.unwrap();
        client.send(&recipients(&["UID:3"]), &payload()).await.unwrap();

        assert_eq!(client.failures().len(), 1);
        assert!(client.failures().contains(&"UID:3".into()));
    }

    #[tokio::test]
    async fn test_accumulate_policy_keeps_history() {
        let driver = FakeDriver::new()
            .reject("UID:1", "Unregistered")
            .reject("UID:3", "Unregistered");
        let mut client = DispatchClient::with_policy(driver, FailurePolicy::Accumulate);

        client.send(&recipients(&["UID:1", "UID:2"]), &payload()).await.unwrap();
        let report = client.send(&recipients(&["UID:3"]), &payload()).await.unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(client.failures().len(), 2);

        client.reset();
        assert!(client.failures().is_empty());
    }
}

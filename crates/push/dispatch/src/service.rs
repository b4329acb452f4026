//! Push service: routing, attempt tracking and the send lifecycle.

use std::collections::{BTreeSet, HashMap};

use push_core::{
    AttemptId, Credential, Device, DispatchAttempt, DispatchPlan, DispatchStatus, FailureSet,
    JobDescriptor, Payload, Platform, Recipient,
};
use push_driver::DriverRegistry;
use push_storage::AllStorage;

use crate::{DispatchConfig, DispatchError, JobQueue, Result, fan_out, validate_plan};

/// Dispatch service tying drivers, storage and the queue together.
pub struct PushService<S, Q> {
    store: S,
    registry: DriverRegistry,
    queue: Q,
    config: DispatchConfig,
}

impl<S, Q> PushService<S, Q> {
    /// Create a new push service.
    pub fn new(store: S, registry: DriverRegistry, queue: Q, config: DispatchConfig) -> Self {
        Self {
            store,
            registry,
            queue,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }
}

impl<S, Q> PushService<S, Q>
where
    S: AllStorage,
    Q: JobQueue,
{
    /// Resolve an API key to its credential.
    pub fn authenticate(&self, api_key: &str) -> Result<Option<Credential>> {
        Ok(self.store.credential_by_api_key(api_key)?)
    }

    /// Register a device and return it with its recipient uid.
    pub fn register_device(
        &self,
        credential: &Credential,
        platform: &str,
        identity: &str,
        token: &str,
    ) -> Result<Device> {
        if identity.trim().is_empty() {
            return Err(DispatchError::invalid("device identity is empty"));
        }
        if token.trim().is_empty() {
            return Err(DispatchError::invalid("device token is empty"));
        }

        let platform = Platform::new(platform);
        if self.config.driver_for(&platform).is_none() {
            return Err(DispatchError::invalid(format!(
                "no driver configured for platform {platform}"
            )));
        }

        let device = Device::new(credential.id.clone(), platform, identity, token);
        let stored = self.store.register_device(&device)?;

        tracing::info!(
            credential_id = %credential.id,
            platform = %stored.platform,
            device_uid = %stored.uid,
            "device registered"
        );

        Ok(stored)
    }

    /// Look up an attempt of `credential`.
    pub fn status(&self, credential: &Credential, id: &AttemptId) -> Result<DispatchAttempt> {
        match self.store.attempt(id)? {
            Some(attempt) if attempt.credential_id == credential.id => Ok(attempt),
            _ => Err(DispatchError::NotFound { id: id.clone() }),
        }
    }

    /// Most recent attempts of `credential`, newest first.
    pub fn latest(&self, credential: &Credential) -> Result<Vec<DispatchAttempt>> {
        Ok(self
            .store
            .latest_attempts(&credential.id, self.config.list_limit)?)
    }

    /// Route recipients of `credential` to drivers by device platform.
    ///
    /// Duplicate recipients are routed once. Unknown devices and platforms
    /// without a driver end up in [`DispatchPlan::unresolved`].
    pub fn plan(&self, credential: &Credential, recipients: &[Recipient]) -> Result<DispatchPlan> {
        let devices: HashMap<Recipient, Device> = self
            .store
            .devices(&credential.id, recipients)?
            .into_iter()
            .map(|device| (device.uid.clone(), device))
            .collect();

        let mut plan = DispatchPlan::new();
        let mut seen = BTreeSet::new();

        for recipient in recipients {
            if !seen.insert(recipient) {
                continue;
            }

            let Some(device) = devices.get(recipient) else {
                plan.unresolved(recipient.clone(), "unknown device");
                continue;
            };

            match self.config.driver_for(&device.platform) {
                Some(driver) => {
                    plan.route(driver.clone(), recipient.clone(), device.token_recipient())
                }
                None => plan.unresolved(
                    recipient.clone(),
                    format!("no driver configured for platform {}", device.platform),
                ),
            }
        }

        Ok(plan)
    }

    /// Send right away and return the settled attempt.
    ///
    /// A driver failing the whole batch settles the attempt as failed and is
    /// returned as [`DispatchError::Driver`].
    pub async fn send_now(
        &self,
        credential: &Credential,
        recipients: Vec<Recipient>,
        payload: Payload,
    ) -> Result<DispatchAttempt> {
        let plan = self.plan(credential, &recipients)?;
        validate_plan(&self.registry, &plan, &payload)?;

        let mut attempt = DispatchAttempt::pending(credential.id.clone(), recipients);
        self.store.create_attempt(&attempt)?;

        tracing::info!(
            attempt_id = %attempt.id,
            credential_id = %credential.id,
            recipients = attempt.recipients.len(),
            "sending push"
        );

        self.run(&mut attempt, &plan, &payload).await?;
        Ok(attempt)
    }

    /// Record a queued attempt and hand it to the queue.
    pub async fn queue(
        &self,
        credential: &Credential,
        recipients: Vec<Recipient>,
        payload: Payload,
    ) -> Result<DispatchAttempt> {
        let plan = self.plan(credential, &recipients)?;
        validate_plan(&self.registry, &plan, &payload)?;

        let mut attempt = DispatchAttempt::queued(credential.id.clone(), recipients);
        self.store.create_attempt(&attempt)?;

        let job = JobDescriptor {
            attempt_id: attempt.id.clone(),
            credential_id: credential.id.clone(),
            recipients: attempt.recipients.clone(),
            plan,
            payload,
        };

        if let Err(e) = self.queue.enqueue(job).await {
            tracing::error!(attempt_id = %attempt.id, error = %e, "failed to enqueue push");
            let failures = FailureSet::all(&attempt.recipients, &e.to_string());
            self.settle(&mut attempt, DispatchStatus::Failed, failures)?;
            return Err(e);
        }

        tracing::info!(
            attempt_id = %attempt.id,
            credential_id = %credential.id,
            recipients = attempt.recipients.len(),
            "push queued"
        );

        Ok(attempt)
    }

    /// Worker entry point for a dequeued job.
    ///
    /// Jobs whose attempt already settled are skipped, so redelivery of the
    /// same job is harmless.
    pub async fn process(&self, job: JobDescriptor) -> Result<DispatchAttempt> {
        let Some(mut attempt) = self.store.attempt(&job.attempt_id)? else {
            return Err(DispatchError::NotFound { id: job.attempt_id });
        };

        if attempt.status != DispatchStatus::Queued {
            tracing::info!(
                attempt_id = %attempt.id,
                status = %attempt.status,
                "attempt already processed, skipping"
            );
            return Ok(attempt);
        }

        self.run(&mut attempt, &job.plan, &job.payload).await?;
        Ok(attempt)
    }

    /// Fan out, then settle the attempt.
    async fn run(
        &self,
        attempt: &mut DispatchAttempt,
        plan: &DispatchPlan,
        payload: &Payload,
    ) -> Result<()> {
        let report = match fan_out(&self.registry, plan, payload).await {
            Ok(report) => report,
            Err(e) => {
                let failures = FailureSet::all(&attempt.recipients, &e.to_string());
                self.settle(attempt, DispatchStatus::Failed, failures)?;
                return Err(e);
            }
        };

        if report.is_catastrophic() {
            let failures = report.failures.clone();
            self.settle(attempt, DispatchStatus::Failed, failures)?;
            return match report.into_error() {
                Some(e) => Err(e),
                None => Ok(()),
            };
        }

        let status = DispatchStatus::settle(&attempt.recipients, &report.failures);
        self.settle(attempt, status, report.failures)?;
        Ok(())
    }

    fn settle(
        &self,
        attempt: &mut DispatchAttempt,
        status: DispatchStatus,
        failures: FailureSet,
    ) -> Result<()> {
        attempt.settle(status, failures)?;
        self.store.update_attempt(
            &attempt.id,
            attempt.status,
            &attempt.failures,
            attempt.updated_at,
        )?;

        tracing::info!(
            attempt_id = %attempt.id,
            status = %attempt.status,
            failed = attempt.failures.len(),
            "attempt settled"
        );

        Ok(())
    }
}

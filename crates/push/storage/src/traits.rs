//! Storage traits.

use push_core::{
    AttemptId, Credential, CredentialId, Device, DispatchAttempt, DispatchStatus, FailureSet,
    Recipient,
};

/// API credential storage.
pub trait CredentialStore: Send + Sync {
    /// Insert a credential or replace the API key of an existing one.
    fn upsert_credential(&self, credential: &Credential) -> color_eyre::eyre::Result<()>;

    /// Find the credential owning an API key.
    fn credential_by_api_key(&self, api_key: &str)
    -> color_eyre::eyre::Result<Option<Credential>>;
}

/// Device registry.
pub trait DeviceStore: Send + Sync {
    /// Register a device. An existing device with the same uid keeps its
    /// creation time and gets the new token.
    fn register_device(&self, device: &Device) -> color_eyre::eyre::Result<Device>;

    /// Devices of `credential` among `uids`. Unknown uids are skipped.
    fn devices(
        &self,
        credential: &CredentialId,
        uids: &[Recipient],
    ) -> color_eyre::eyre::Result<Vec<Device>>;
}

/// Dispatch attempt status tracking.
pub trait StatusStore: Send + Sync {
    /// Record a new attempt.
    fn create_attempt(&self, attempt: &DispatchAttempt) -> color_eyre::eyre::Result<()>;

    /// Settle an attempt, stamping `updated_at`. Fails if the attempt is
    /// unknown or the current status does not allow the transition.
    fn update_attempt(
        &self,
        id: &AttemptId,
        status: DispatchStatus,
        failures: &FailureSet,
        updated_at: chrono::DateTime<chrono::Utc>,
    ) -> color_eyre::eyre::Result<()>;

    /// Look up an attempt by identifier.
    fn attempt(&self, id: &AttemptId) -> color_eyre::eyre::Result<Option<DispatchAttempt>>;

    /// Most recent attempts of a credential, newest first.
    fn latest_attempts(
        &self,
        credential: &CredentialId,
        limit: usize,
    ) -> color_eyre::eyre::Result<Vec<DispatchAttempt>>;
}

/// Combined storage trait.
pub trait AllStorage: CredentialStore + DeviceStore + StatusStore {}

impl<T> AllStorage for T where T: CredentialStore + DeviceStore + StatusStore {}

/// Error for a transition the store refuses.
pub(crate) fn check_transition(
    id: &AttemptId,
    current: DispatchStatus,
    next: DispatchStatus,
) -> color_eyre::eyre::Result<()> {
    if !current.can_transition_to(next) {
        color_eyre::eyre::bail!("attempt {} cannot move from {} to {}", id, current, next);
    }
    Ok(())
}

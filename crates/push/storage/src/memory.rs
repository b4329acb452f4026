//! In-memory storage.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use push_core::{
    AttemptId, Credential, CredentialId, Device, DispatchAttempt, DispatchStatus, FailureSet,
    Recipient,
};

use crate::traits::*;

#[derive(Default)]
struct Inner {
    credentials: HashMap<CredentialId, Credential>,
    devices: HashMap<Recipient, Device>,
    attempts: HashMap<AttemptId, DispatchAttempt>,
    /// Attempt ids in creation order.
    order: Vec<AttemptId>,
}

/// Storage kept in process memory. Lost on restart.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryStorage {
    fn upsert_credential(&self, credential: &Credential) -> color_eyre::eyre::Result<()> {
        self.inner
            .write()
            .credentials
            .insert(credential.id.clone(), credential.clone());
        Ok(())
    }

    fn credential_by_api_key(
        &self,
        api_key: &str,
    ) -> color_eyre::eyre::Result<Option<Credential>> {
        Ok(self
            .inner
            .read()
            .credentials
            .values()
            .find(|c| c.api_key == api_key)
            .cloned())
    }
}

impl DeviceStore for MemoryStorage {
    fn register_device(&self, device: &Device) -> color_eyre::eyre::Result<Device> {
        let mut inner = self.inner.write();
        let stored = inner
            .devices
            .entry(device.uid.clone())
            .and_modify(|existing| {
                existing.token = device.token.clone();
                existing.updated_at = chrono::Utc::now();
            })
            .or_insert_with(|| device.clone());

        Ok(stored.clone())
    }

    fn devices(
        &self,
        credential: &CredentialId,
        uids: &[Recipient],
    ) -> color_eyre::eyre::Result<Vec<Device>> {
        let inner = self.inner.read();
        Ok(uids
            .iter()
            .filter_map(|uid| inner.devices.get(uid))
            .filter(|device| &device.credential_id == credential)
            .cloned()
            .collect())
    }
}

impl StatusStore for MemoryStorage {
    fn create_attempt(&self, attempt: &DispatchAttempt) -> color_eyre::eyre::Result<()> {
        let mut inner = self.inner.write();
        if inner.attempts.contains_key(&attempt.id) {
            color_eyre::eyre::bail!("attempt {} already exists", attempt.id);
        }
        inner.order.push(attempt.id.clone());
        inner.attempts.insert(attempt.id.clone(), attempt.clone());
        Ok(())
    }

    fn update_attempt(
        &self,
        id: &AttemptId,
        status: DispatchStatus,
        failures: &FailureSet,
        updated_at: chrono::DateTime<chrono::Utc>,
    ) -> color_eyre::eyre::Result<()> {
        let mut inner = self.inner.write();
        let Some(attempt) = inner.attempts.get_mut(id) else {
            color_eyre::eyre::bail!("attempt {} not found", id);
        };

        check_transition(id, attempt.status, status)?;
        attempt.status = status;
        attempt.failures = failures.clone();
        attempt.updated_at = updated_at;
        Ok(())
    }

    fn attempt(&self, id: &AttemptId) -> color_eyre::eyre::Result<Option<DispatchAttempt>> {
        Ok(self.inner.read().attempts.get(id).cloned())
    }

    fn latest_attempts(
        &self,
        credential: &CredentialId,
        limit: usize,
    ) -> color_eyre::eyre::Result<Vec<DispatchAttempt>> {
        let inner = self.inner.read();
        Ok(inner
            .order
            .iter()
            .rev()
            .filter_map(|id| inner.attempts.get(id))
            .filter(|attempt| &attempt.credential_id == credential)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use push_core::Platform;

    fn now() -> chrono::DateTime<chrono::Utc> {
        chrono::Utc::now()
    }

    #[test]
    fn test_devices_scoped_to_credential() {
        let storage = MemoryStorage::new();
        let device = Device::new(CredentialId::new("acme"), Platform::new("ios"), "abc", "tok");
        storage.register_device(&device).unwrap();

        let uids = [device.uid.clone(), Recipient::from("UID:unknown")];
        assert_eq!(storage.devices(&CredentialId::new("acme"), &uids).unwrap().len(), 1);
        assert!(storage.devices(&CredentialId::new("other"), &uids).unwrap().is_empty());
    }

    #[test]
    fn test_settled_attempt_is_final() {
        let storage = MemoryStorage::new();
        let attempt = DispatchAttempt::pending(CredentialId::new("acme"), vec!["UID:1".into()]);
        storage.create_attempt(&attempt).unwrap();
        assert!(storage.create_attempt(&attempt).is_err());

        let settled_at = now();
        storage
            .update_attempt(&attempt.id, DispatchStatus::Failed, &FailureSet::new(), settled_at)
            .unwrap();
        assert_eq!(
            storage.attempt(&attempt.id).unwrap().unwrap().updated_at,
            settled_at
        );
        assert!(
            storage
                .update_attempt(&attempt.id, DispatchStatus::Sent, &FailureSet::new(), now())
                .is_err()
        );
        assert_eq!(
            storage.attempt(&attempt.id).unwrap().unwrap().status,
            DispatchStatus::Failed
        );
    }

    #[test]
    fn test_latest_newest_first() {
        let storage = MemoryStorage::new();
        let acme = CredentialId::new("acme");
        let first = DispatchAttempt::pending(acme.clone(), vec![]);
        let second = DispatchAttempt::pending(acme.clone(), vec![]);
        storage.create_attempt(&first).unwrap();
        storage.create_attempt(&second).unwrap();

        let latest = storage.latest_attempts(&acme, 1).unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].id, second.id);
    }
}

//! Registered devices and the credentials they belong to.

use sha1::Digest as _;

use crate::{CredentialId, Platform, Recipient};

/// API credential scoping devices and attempts to one tenant.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Credential {
    pub id: CredentialId,
    pub api_key: String,
}

impl Credential {
    pub fn new(id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            id: CredentialId::new(id),
            api_key: api_key.into(),
        }
    }

    /// Create a credential with a freshly generated API key.
    pub fn generate(id: impl Into<String>) -> Self {
        Self::new(id, uuid::Uuid::new_v4().simple().to_string())
    }
}

/// A device registered for push delivery.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Device {
    /// Recipient identifier handed out to the caller.
    pub uid: Recipient,
    pub credential_id: CredentialId,
    pub platform: Platform,
    /// Caller-side identity of the device (IMEI, vendor id, ...).
    pub identity: String,
    /// Provider registration token the drivers address.
    pub token: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Device {
    pub fn new(
        credential_id: CredentialId,
        platform: Platform,
        identity: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        let identity = identity.into();
        let now = chrono::Utc::now();
        Self {
            uid: device_uid(&credential_id, &platform, &identity),
            credential_id,
            platform,
            identity,
            token: token.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The token as a driver-level recipient.
    pub fn token_recipient(&self) -> Recipient {
        Recipient::new(self.token.clone())
    }
}

/// Derive the stable recipient uid for a device.
///
/// `UID:` followed by the hex SHA-1 of credential id, platform and identity.
/// The same inputs always map to the same uid, so re-registering a device
/// with a new token keeps its address.
pub fn device_uid(credential_id: &CredentialId, platform: &Platform, identity: &str) -> Recipient {
    let mut hasher = sha1::Sha1::new();
    hasher.update(credential_id.as_str().as_bytes());
    hasher.update(platform.as_str().as_bytes());
    hasher.update(identity.as_bytes());
    Recipient::new(format!("UID:{}", hex::encode(hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_is_deterministic() {
        let credential = CredentialId::new("acme");
        let platform = Platform::new("android");
        let a = device_uid(&credential, &platform, "123456789012345");
        let b = device_uid(&credential, &platform, "123456789012345");
        assert_eq!(a, b);
        assert!(a.as_str().starts_with("UID:"));
        assert_eq!(a.as_str().len(), "UID:".len() + 40);
    }

    #[test]
    fn test_uid_matches_known_digest() {
        let uid = device_uid(
            &CredentialId::new("1"),
            &Platform::new("android"),
            "123456789012345",
        );
        assert_eq!(uid.as_str(), "UID:aebeb65c7fb77ed3ca852a495595e44bcd2abd8d");
    }

    #[test]
    fn test_uid_scoped_by_credential_and_platform() {
        let identity = "123456789012345";
        let base = device_uid(&CredentialId::new("acme"), &Platform::new("android"), identity);
        assert_ne!(
            base,
            device_uid(&CredentialId::new("other"), &Platform::new("android"), identity)
        );
        assert_ne!(
            base,
            device_uid(&CredentialId::new("acme"), &Platform::new("ios"), identity)
        );
    }
}

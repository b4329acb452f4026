//! Configured backends.

use std::path::PathBuf;

use color_eyre::eyre::WrapErr as _;
use push_core::{FailureSet, Payload, Recipient};

use crate::{ApnsDriver, Driver, DriverError, FakeDriver, LogDriver};

/// Driver configuration, one table per registered key.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DriverConfig {
    /// Apple Push Notification service with a PKCS12 certificate.
    Apns {
        certificate: PathBuf,
        #[serde(default)]
        password: String,
        topic: String,
        #[serde(default)]
        sandbox: bool,
    },
    /// Log every send and accept it.
    Log,
}

/// A delivery backend selected by configuration.
pub enum Backend {
    Apns(ApnsDriver),
    Log(LogDriver),
    Fake(FakeDriver),
}

impl Backend {
    /// Build the backend described by `config`, registered under `name`.
    pub fn from_config(name: &str, config: &DriverConfig) -> color_eyre::eyre::Result<Self> {
        match config {
            DriverConfig::Apns {
                certificate,
                password,
                topic,
                sandbox,
            } => {
                let der = std::fs::read(certificate).wrap_err_with(|| {
                    format!("failed to read APNs certificate {}", certificate.display())
                })?;
                let driver = if *sandbox {
                    ApnsDriver::sandbox(&der, password, topic)?
                } else {
                    ApnsDriver::new(&der, password, topic)?
                };
                Ok(Self::Apns(driver))
            }
            DriverConfig::Log => Ok(Self::Log(LogDriver::new(name))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Apns(_) => "apns",
            Self::Log(_) => "log",
            Self::Fake(_) => "fake",
        }
    }
}

impl Driver for Backend {
    fn validate(&self, payload: &Payload) -> Result<(), DriverError> {
        match self {
            Self::Apns(driver) => driver.validate(payload),
            Self::Log(driver) => driver.validate(payload),
            Self::Fake(driver) => driver.validate(payload),
        }
    }

    async fn attempt(
        &self,
        recipients: &[Recipient],
        payload: &Payload,
    ) -> Result<FailureSet, DriverError> {
        match self {
            Self::Apns(driver) => driver.attempt(recipients, payload).await,
            Self::Log(driver) => driver.attempt(recipients, payload).await,
            Self::Fake(driver) => driver.attempt(recipients, payload).await,
        }
    }
}

impl From<FakeDriver> for Backend {
    fn from(driver: FakeDriver) -> Self {
        Self::Fake(driver)
    }
}

impl From<LogDriver> for Backend {
    fn from(driver: LogDriver) -> Self {
        Self::Log(driver)
    }
}

impl From<ApnsDriver> for Backend {
    fn from(driver: ApnsDriver) -> Self {
        Self::Apns(driver)
    }
}

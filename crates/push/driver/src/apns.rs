//! APNs driver using the a2 crate.

use a2::NotificationBuilder as _;
use color_eyre::eyre::WrapErr as _;
use push_core::{FailureSet, Payload, Recipient};

use crate::{Driver, DriverError};

/// APNs driver using certificate authentication.
pub struct ApnsDriver {
    client: a2::Client,
    topic: String,
}

impl ApnsDriver {
    /// Create a production APNs driver from PKCS12 certificate bytes and password.
    pub fn new(pkcs12_der: &[u8], password: &str, topic: &str) -> color_eyre::eyre::Result<Self> {
        Self::with_endpoint(pkcs12_der, password, topic, a2::Endpoint::Production)
    }

    /// Create an APNs driver for the sandbox environment.
    pub fn sandbox(
        pkcs12_der: &[u8],
        password: &str,
        topic: &str,
    ) -> color_eyre::eyre::Result<Self> {
        Self::with_endpoint(pkcs12_der, password, topic, a2::Endpoint::Sandbox)
    }

    fn with_endpoint(
        pkcs12_der: &[u8],
        password: &str,
        topic: &str,
        endpoint: a2::Endpoint,
    ) -> color_eyre::eyre::Result<Self> {
        let mut cursor = std::io::Cursor::new(pkcs12_der);
        let config = a2::ClientConfig {
            endpoint,
            ..Default::default()
        };

        let client = a2::Client::certificate(&mut cursor, password, config)
            .wrap_err("failed to create APNs client")?;

        Ok(Self {
            client,
            topic: topic.to_string(),
        })
    }

    async fn push_single(&self, token: &Recipient, payload: &Payload) -> Result<(), Outcome> {
        let title = payload.notification_field("title").unwrap_or_default();
        let body = payload.notification_field("body").unwrap_or_default();

        let mut notification = a2::DefaultNotificationBuilder::new()
            .set_title(title)
            .set_body(body)
            .build(
                token.as_str(),
                a2::NotificationOptions {
                    apns_topic: Some(&self.topic),
                    ..Default::default()
                },
            );

        if let Some(data) = payload.data() {
            notification
                .add_custom_data("data", data)
                .map_err(|e| Outcome::Batch(DriverError::validation(e.to_string())))?;
        }

        match self.client.send(notification).await {
            Ok(_) => Ok(()),
            Err(a2::Error::ResponseError(response)) => Err(classify(&response)),
            Err(e) => Err(Outcome::Batch(DriverError::unavailable(e.to_string()))),
        }
    }
}

/// How a single send went wrong.
enum Outcome {
    /// The device token was refused.
    Recipient(String),
    /// The whole batch is unusable.
    Batch(DriverError),
}

fn classify(response: &a2::Response) -> Outcome {
    let reason = response
        .error
        .as_ref()
        .map(|body| format!("{:?}", body.reason))
        .unwrap_or_else(|| format!("HTTP {}", response.code));

    match response.code {
        // Bad token, unregistered device, oversize payload for this device.
        400 | 410 | 413 => Outcome::Recipient(reason),
        // Auth, rate limiting, server errors: nothing recipient specific.
        _ => Outcome::Batch(DriverError::backend(reason)),
    }
}

impl Driver for ApnsDriver {
    async fn attempt(
        &self,
        recipients: &[Recipient],
        payload: &Payload,
    ) -> Result<FailureSet, DriverError> {
        let mut failures = FailureSet::new();

        for token in recipients {
            match self.push_single(token, payload).await {
                Ok(()) => tracing::debug!(recipient = %token, "apns accepted"),
                Err(Outcome::Recipient(reason)) => {
                    tracing::info!(recipient = %token, reason = %reason, "apns rejected recipient");
                    failures.insert(token.clone(), reason);
                }
                Err(Outcome::Batch(e)) => {
                    tracing::warn!(error = %e, "apns batch aborted");
                    return Err(e);
                }
            }
        }

        Ok(failures)
    }
}

//! Concurrent send across several drivers.

use futures_util::future::join_all;
use push_core::{DispatchPlan, DriverKey, FailureSet, Payload, Recipient};
use push_driver::{Driver, DriverError, DriverRegistry};

use crate::{DispatchClient, DispatchError};

/// Merged outcome of every route in a plan.
#[derive(Debug, Default)]
pub struct FanOutReport {
    /// Failures keyed by the caller's recipient, across all drivers.
    pub failures: FailureSet,
    /// Drivers that failed their whole batch.
    pub errors: Vec<(DriverKey, DriverError)>,
    /// Number of routes that were sent.
    pub routes: usize,
}

impl FanOutReport {
    /// Every route failed outright.
    pub fn is_catastrophic(&self) -> bool {
        self.routes > 0 && self.errors.len() == self.routes
    }

    /// Turn the first whole-batch error into a [`DispatchError`].
    pub fn into_error(mut self) -> Option<DispatchError> {
        if self.errors.is_empty() {
            return None;
        }
        let (driver, source) = self.errors.swap_remove(0);
        Some(DispatchError::Driver { driver, source })
    }
}

/// Check every route has a registered driver that accepts `payload`.
///
/// Performs no I/O.
pub fn validate_plan(
    registry: &DriverRegistry,
    plan: &DispatchPlan,
    payload: &Payload,
) -> Result<(), DispatchError> {
    payload
        .validate()
        .map_err(|e| DispatchError::invalid(e.to_string()))?;

    for key in plan.routes.keys() {
        let driver = registry
            .get(key)
            .ok_or_else(|| DispatchError::UnknownDriver { key: key.clone() })?;
        driver.validate(payload).map_err(|e| match e {
            DriverError::Validation { message } => DispatchError::invalid(message),
            other => DispatchError::Driver {
                driver: key.clone(),
                source: other,
            },
        })?;
    }

    Ok(())
}

/// Send `payload` along every route of `plan` at once.
///
/// Each route gets its own [`DispatchClient`]. Driver failures are mapped back
/// from tokens to the caller's recipients and merged; a route whose driver
/// fails outright has all its recipients marked failed with the error text.
/// Unresolved recipients from the plan are failed up front.
pub async fn fan_out(
    registry: &DriverRegistry,
    plan: &DispatchPlan,
    payload: &Payload,
) -> Result<FanOutReport, DispatchError> {
    let mut routes = Vec::with_capacity(plan.routes.len());
    for (key, targets) in &plan.routes {
        let driver = registry
            .get(key)
            .ok_or_else(|| DispatchError::UnknownDriver { key: key.clone() })?;
        routes.push((key, targets, driver));
    }

    let sends = routes.into_iter().map(|(key, targets, driver)| async move {
        let tokens: Vec<Recipient> = targets.iter().map(|t| t.token.clone()).collect();
        let mut client = DispatchClient::new(driver);
        let result = client.send(&tokens, payload).await;
        (key, targets, result)
    });

    let mut report = FanOutReport {
        routes: plan.routes.len(),
        ..Default::default()
    };

    for record in &plan.unresolved {
        report
            .failures
            .insert(record.recipient.clone(), record.reason.clone());
    }

    for (key, targets, result) in join_all(sends).await {
        match result {
            Ok(sent) => {
                for target in targets {
                    if let Some(reason) = sent.failures.reason(&target.token) {
                        report.failures.insert(target.recipient.clone(), reason);
                    }
                }
                tracing::debug!(
                    driver = %key,
                    attempted = sent.attempted,
                    failed = sent.failures.len(),
                    "route sent"
                );
            }
            Err(e) => {
                tracing::warn!(driver = %key, error = %e, "route failed");
                let reason = e.to_string();
                for target in targets {
                    report.failures.insert(target.recipient.clone(), reason.as_str());
                }
                report.errors.push((key.clone(), e));
            }
        }
    }

    Ok(report)
}

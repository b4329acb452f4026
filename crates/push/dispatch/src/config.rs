//! Dispatch configuration.

use std::collections::BTreeMap;

use push_core::{DriverKey, Platform};

/// How sends are routed and queued.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// Number of queue workers.
    pub workers: usize,
    /// Jobs the queue holds before `enqueue` waits.
    pub queue_capacity: usize,
    /// Device platform to driver key.
    pub platforms: BTreeMap<Platform, DriverKey>,
    /// How many attempts status listings return.
    pub list_limit: usize,
}

impl DispatchConfig {
    /// Route `platform` to the driver registered under `driver`.
    pub fn route(mut self, platform: &str, driver: &str) -> Self {
        self.platforms
            .insert(Platform::new(platform), DriverKey::new(driver));
        self
    }

    pub fn driver_for(&self, platform: &Platform) -> Option<&DriverKey> {
        self.platforms.get(platform)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 1024,
            platforms: BTreeMap::new(),
            list_limit: 50,
        }
    }
}

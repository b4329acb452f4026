//! Driver registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use color_eyre::eyre::WrapErr as _;
use push_core::DriverKey;

use crate::{Backend, DriverConfig};

/// Backends keyed by the name callers route to.
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: BTreeMap<DriverKey, Arc<Backend>>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every configured driver.
    pub fn from_config<'a>(
        configs: impl IntoIterator<Item = (&'a String, &'a DriverConfig)>,
    ) -> color_eyre::eyre::Result<Self> {
        let mut registry = Self::new();

        for (name, config) in configs {
            let backend = Backend::from_config(name, config)
                .wrap_err_with(|| format!("failed to build driver {}", name))?;
            tracing::info!(driver = %name, kind = backend.kind(), "registered driver");
            registry.register(DriverKey::new(name.as_str()), backend);
        }

        Ok(registry)
    }

    /// Register a backend, replacing any previous one under `key`.
    pub fn register(&mut self, key: DriverKey, backend: impl Into<Backend>) -> &mut Self {
        self.drivers.insert(key, Arc::new(backend.into()));
        self
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, key: impl Into<DriverKey>, backend: impl Into<Backend>) -> Self {
        self.register(key.into(), backend);
        self
    }

    pub fn get(&self, key: &DriverKey) -> Option<Arc<Backend>> {
        self.drivers.get(key).cloned()
    }

    pub fn contains(&self, key: &DriverKey) -> bool {
        self.drivers.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &DriverKey> {
        self.drivers.keys()
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }
}

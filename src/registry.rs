//! Driver registry.
//!
//! Maps plugin names to driver factories. Constructed at startup, populated
//! via `register()`, and handed to the resource manager by reference when
//! loading components. No global state — testable in isolation.

use crate::component::{Driver, HardwareDriver};
use crate::config::HardwareInfo;
use crate::error::ConfigError;
use crate::types::ComponentKind;
use std::collections::HashMap;

/// Factory function producing a fresh driver instance.
pub type DriverFactory = fn() -> Box<dyn HardwareDriver>;

/// Registry of available hardware drivers.
#[derive(Default)]
pub struct DriverRegistry {
    factories: HashMap<&'static str, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a driver factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) {
        if self.factories.contains_key(name) {
            panic!("driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Instantiate the driver named by `info.plugin`, tagged with the
    /// component kind the description declares.
    pub fn create(&self, info: &HardwareInfo) -> Result<Driver, ConfigError> {
        let factory = self
            .factories
            .get(info.plugin.as_str())
            .ok_or_else(|| ConfigError::UnknownPlugin {
                component: info.name.clone(),
                plugin: info.plugin.clone(),
            })?;
        let driver = factory();
        Ok(match info.kind {
            ComponentKind::Actuator => Driver::Actuator(driver),
            ComponentKind::Sensor => Driver::Sensor(driver),
            ComponentKind::System => Driver::System(driver),
        })
    }

    /// All registered plugin names.
    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

//! Built-in drivers.

pub mod mock;

pub use mock::MockHardware;

use crate::component::HardwareDriver;
use crate::registry::DriverRegistry;

fn mock_factory() -> Box<dyn HardwareDriver> {
    Box::new(MockHardware::default())
}

/// Register all built-in drivers into `registry`.
pub fn register_builtin_drivers(registry: &mut DriverRegistry) {
    registry.register("mock", mock_factory);
}

/// A fresh registry holding only the built-in drivers.
pub fn builtin_registry() -> DriverRegistry {
    let mut registry = DriverRegistry::new();
    register_builtin_drivers(&mut registry);
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_mock() {
        let registry = builtin_registry();
        assert_eq!(registry.plugin_names(), vec!["mock"]);
    }
}

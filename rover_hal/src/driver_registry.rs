//! Driver registry for output drivers.
//!
//! Maps driver names to factory functions. Constructed at startup and
//! consulted once to build the output backend; no global state.

use crate::drivers::register_all_drivers;
use crate::error::EngineError;
use rover_common::config::GpioConfig;
use rover_common::hal::driver::{DigitalOutput, GpioError};
use std::collections::HashMap;
use std::sync::Arc;

/// Factory building an output driver from the `[gpio]` config section.
pub type DriverFactory = fn(&GpioConfig) -> Result<Arc<dyn DigitalOutput>, GpioError>;

/// Registry of available output drivers.
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

    /// Create a registry holding every built-in driver.
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();
        register_all_drivers(&mut registry);
        registry
    }

    /// Register a driver factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: DriverFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a driver factory by name.
    pub fn get_factory(&self, name: &str) -> Option<DriverFactory> {
        self.factories.get(name).copied()
    }

    /// Create a driver instance by name.
    ///
    /// # Errors
    /// `EngineError::DriverNotFound` for an unknown name, or the factory's
    /// own `GpioError` (e.g. the chip device cannot be opened).
    pub fn create_driver(
        &self,
        name: &str,
        config: &GpioConfig,
    ) -> Result<Arc<dyn DigitalOutput>, EngineError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| EngineError::DriverNotFound(name.to_string()))?;
        Ok(factory(config)?)
    }

    /// List all registered driver names, sorted.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::SimulatedOutput;

    fn create_test_driver(_config: &GpioConfig) -> Result<Arc<dyn DigitalOutput>, GpioError> {
        Ok(Arc::new(SimulatedOutput::new()))
    }

    #[test]
    fn registry_register_and_create() {
        let mut reg = DriverRegistry::new();
        reg.register("test_driver", create_test_driver);

        let driver = reg
            .create_driver("test_driver", &GpioConfig::default())
            .expect("should create");
        assert_eq!(driver.name(), "simulation");
    }

    #[test]
    fn registry_driver_not_found() {
        let reg = DriverRegistry::new();
        let result = reg.create_driver("nonexistent", &GpioConfig::default());
        assert!(matches!(result, Err(EngineError::DriverNotFound(_))));
    }

    #[test]
    fn builtin_drivers_are_listed() {
        let reg = DriverRegistry::with_builtin_drivers();
        assert_eq!(reg.list_drivers(), vec!["gpiochip", "simulation"]);
    }

    #[test]
    fn factory_error_propagates() {
        let reg = DriverRegistry::with_builtin_drivers();
        let config = GpioConfig {
            chip: 4_000,
            ..GpioConfig::default()
        };
        let result = reg.create_driver("gpiochip", &config);
        assert!(matches!(
            result,
            Err(EngineError::Gpio(GpioError::ChipOpen { .. }))
        ));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn registry_duplicate_panics() {
        let mut reg = DriverRegistry::new();
        reg.register("dup", create_test_driver);
        reg.register("dup", create_test_driver);
    }
}

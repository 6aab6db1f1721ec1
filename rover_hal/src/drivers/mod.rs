//! Output driver implementations.
//!
//! - [`gpiochip`] - Linux GPIO character device (`/dev/gpiochipN`)
//! - [`simulation`] - In-memory recorder for development and testing
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `DigitalOutput` trait from `rover_common::hal::driver`
//! 3. Register its factory in [`register_all_drivers`]

pub mod gpiochip;
pub mod simulation;

use crate::driver_registry::DriverRegistry;

/// Name of the hardware driver.
pub const GPIOCHIP_DRIVER: &str = "gpiochip";

/// Name of the simulation driver.
pub const SIMULATION_DRIVER: &str = "simulation";

/// Register all built-in drivers into `registry`.
pub fn register_all_drivers(registry: &mut DriverRegistry) {
    registry.register(GPIOCHIP_DRIVER, gpiochip::create_driver);
    registry.register(SIMULATION_DRIVER, simulation::create_driver);
}

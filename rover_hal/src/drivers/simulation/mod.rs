//! Simulation output driver.
//!
//! Records every line write in memory instead of touching hardware. Used by
//! `--simulate` on development machines and by the engine tests, which
//! inspect the recorded trace to check pulse timing.

mod driver;
mod trace;

pub use driver::SimulatedOutput;
pub use trace::{LineEvent, LineTrace};

use rover_common::config::GpioConfig;
use rover_common::hal::driver::{DigitalOutput, GpioError};
use std::sync::Arc;

/// Factory function to create a simulation driver instance.
pub fn create_driver(_config: &GpioConfig) -> Result<Arc<dyn DigitalOutput>, GpioError> {
    Ok(Arc::new(SimulatedOutput::new()))
}

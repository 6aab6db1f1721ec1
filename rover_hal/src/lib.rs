//! Rover step engine.
//!
//! Generates step/direction/enable signals for four stepper axes, one
//! dedicated thread per axis, on top of a pluggable digital-output driver.
//!
//! # Module Structure
//!
//! - [`core`] - [`StepEngine`] lifecycle: claim, spawn, stop
//! - [`scheduler`] - Per-axis step algorithm and worker loop
//! - [`axis`] - Atomic target-speed arena shared with the control loop
//! - [`indicator`] - Shared step-activity LED
//! - [`timing`] - Wrapping tick clock and hybrid microsecond delay
//! - [`driver_registry`] - Name → factory lookup for output drivers
//! - [`drivers`] - `gpiochip` and `simulation` drivers
//! - [`rt`] - Optional SCHED_FIFO / mlockall setup (`rt` feature)
//!
//! # Usage
//!
//! ```rust
//! use rover_common::prelude::*;
//! use rover_hal::{DriverRegistry, StepEngine};
//!
//! let config = RoverConfig::default();
//! let output = DriverRegistry::with_builtin_drivers()
//!     .create_driver("simulation", &config.gpio)
//!     .unwrap();
//! let mut engine = StepEngine::start(output, &config, ShutdownToken::new()).unwrap();
//! engine.set_speed(AxisId::Pan, 50);
//! engine.stop();
//! ```

pub mod axis;
pub mod core;
pub mod driver_registry;
pub mod drivers;
pub mod error;
pub mod indicator;
pub mod rt;
pub mod scheduler;
pub mod timing;

pub use crate::axis::AxisBank;
pub use crate::core::{EngineOptions, StepEngine};
pub use crate::driver_registry::DriverRegistry;
pub use crate::error::EngineError;
pub use crate::timing::{MonotonicClock, TickSource};

//! Prelude module for common re-exports.
//!
//! This module provides convenient re-exports of commonly used types
//! so that consumers can do `use rover_common::prelude::*;` and get
//! the most important types without listing individual paths.
//!
//! # Usage
//!
//! ```rust
//! use rover_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ConfigError, ConfigLoader, ControlConfig, GpioConfig, InputConfig, LogLevel, RoverConfig,
    StepperConfig,
};

// ─── Hardware ───────────────────────────────────────────────────────
pub use crate::hal::driver::{DigitalOutput, GpioError};
pub use crate::hal::types::{AxisId, Level, PinSet};

// ─── Lifecycle ──────────────────────────────────────────────────────
pub use crate::shutdown::ShutdownToken;

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{COMMAND_RANGE, INPUT_AXIS_SLOTS, MAX_JOYSTICK_VALUE};

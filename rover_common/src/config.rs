//! Configuration loading traits and types.
//!
//! This module provides the rover's TOML configuration model and a
//! standardized way to load it. Every field has a default matching the
//! reference rig, so an absent or empty file yields a working setup.
//!
//! # Usage
//!
//! ```rust,no_run
//! use rover_common::config::{ConfigLoader, ConfigError, RoverConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = RoverConfig::load(Path::new("rover.toml"))?;
//!     config.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use crate::consts::*;
use crate::hal::types::{AxisId, Level, PinSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Common configuration fields.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "rover-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    "rover".to_string()
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

/// GPIO controller settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GpioConfig {
    /// Index of `/dev/gpiochipN`.
    pub chip: u32,
    /// Activity LED line; a negative value disables the indicator.
    pub activity_led: i32,
    /// Level that energizes a stepper driver.
    pub enable_active_level: Level,
    /// Level of an active step pulse.
    pub pulse_active_level: Level,
}

impl GpioConfig {
    /// The activity LED line, if one is configured.
    pub fn activity_led_line(&self) -> Option<u32> {
        u32::try_from(self.activity_led).ok()
    }
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            chip: DEFAULT_GPIO_CHIP,
            activity_led: DEFAULT_ACTIVITY_LED as i32,
            enable_active_level: Level::Low,
            pulse_active_level: Level::High,
        }
    }
}

/// Pin map of the four axes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MotorsConfig {
    /// Left drive wheel
    pub left: PinSet,
    /// Right drive wheel
    pub right: PinSet,
    /// Turret pan
    pub pan: PinSet,
    /// Turret tilt
    pub tilt: PinSet,
}

impl Default for MotorsConfig {
    fn default() -> Self {
        Self {
            left: PinSet::from_tuple(MOTOR_LEFT_PINS),
            right: PinSet::from_tuple(MOTOR_RIGHT_PINS),
            pan: PinSet::from_tuple(MOTOR_PAN_PINS),
            tilt: PinSet::from_tuple(MOTOR_TILT_PINS),
        }
    }
}

/// Step generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StepperConfig {
    /// Axis speed at full stick deflection.
    pub max_speed_steps_per_sec: i16,
    /// Active pulse width in microseconds.
    pub pulse_width_us: u32,
    /// Activity LED on-time after a step.
    pub step_led_duration_ms: u64,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            max_speed_steps_per_sec: MAX_SPEED_STEPS_PER_SEC,
            pulse_width_us: PULSE_WIDTH_US,
            step_led_duration_ms: STEP_LED_DURATION_MS,
        }
    }
}

/// Input source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// Joystick character device.
    pub joystick_path: PathBuf,
    /// UDP control port (0 picks an ephemeral port).
    pub udp_port: u16,
    /// Largest accepted datagram.
    pub udp_buffer_size: usize,
    /// Network silence before inputs return to neutral.
    pub network_timeout_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            joystick_path: PathBuf::from(DEFAULT_JOYSTICK_PATH),
            udp_port: UDP_PORT,
            udp_buffer_size: UDP_BUFFER_SIZE,
            network_timeout_ms: NETWORK_TIMEOUT_MS,
        }
    }
}

/// Control/mixing loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlConfig {
    /// Deadzone in the scaled [-512, 512] domain.
    pub deadzone: i32,
    /// Loop cadence.
    pub poll_interval_ms: u64,
    /// Status line cadence.
    pub log_interval_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            deadzone: JOYSTICK_DEADZONE,
            poll_interval_ms: CONTROL_POLL_MS,
            log_interval_ms: LOG_INTERVAL_MS,
        }
    }
}

/// Complete rover configuration, loaded from `rover.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoverConfig {
    /// Common fields
    #[serde(default)]
    pub shared: SharedConfig,
    /// GPIO controller
    #[serde(default)]
    pub gpio: GpioConfig,
    /// Axis pin map
    #[serde(default)]
    pub motors: MotorsConfig,
    /// Step generation
    #[serde(default)]
    pub stepper: StepperConfig,
    /// Input sources
    #[serde(default)]
    pub input: InputConfig,
    /// Control loop
    #[serde(default)]
    pub control: ControlConfig,
}

impl RoverConfig {
    /// Pin set of one axis.
    pub fn pins(&self, axis: AxisId) -> PinSet {
        match axis {
            AxisId::Left => self.motors.left,
            AxisId::Right => self.motors.right,
            AxisId::Pan => self.motors.pan,
            AxisId::Tilt => self.motors.tilt,
        }
    }

    /// Validate the configuration.
    ///
    /// # Validation Rules
    /// 1. `service_name` not empty
    /// 2. Every GPIO line (motors + LED) used at most once
    /// 3. `max_speed_steps_per_sec` > 0
    /// 4. `pulse_width_us` in 1..=1000
    /// 5. `udp_buffer_size` in 64..=65507
    /// 6. `deadzone` in 0..512
    /// 7. Loop intervals and network timeout > 0
    /// 8. `joystick_path` not empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shared.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }

        let mut lines = HashSet::new();
        for axis in AxisId::ALL {
            for line in self.pins(axis).lines() {
                if !lines.insert(line) {
                    return Err(ConfigError::ValidationError(format!(
                        "GPIO line {line} is assigned more than once (axis '{axis}')"
                    )));
                }
            }
        }
        if let Some(led) = self.gpio.activity_led_line() {
            if !lines.insert(led) {
                return Err(ConfigError::ValidationError(format!(
                    "activity_led line {led} collides with a motor line"
                )));
            }
        }

        if self.stepper.max_speed_steps_per_sec <= 0 {
            return Err(ConfigError::ValidationError(
                "max_speed_steps_per_sec must be greater than 0".to_string(),
            ));
        }

        if !(1..=1000).contains(&self.stepper.pulse_width_us) {
            return Err(ConfigError::ValidationError(format!(
                "pulse_width_us must be in 1..=1000 (got {})",
                self.stepper.pulse_width_us
            )));
        }

        if !(64..=65507).contains(&self.input.udp_buffer_size) {
            return Err(ConfigError::ValidationError(format!(
                "udp_buffer_size must be in 64..=65507 (got {})",
                self.input.udp_buffer_size
            )));
        }

        if !(0..COMMAND_RANGE).contains(&self.control.deadzone) {
            return Err(ConfigError::ValidationError(format!(
                "deadzone must be in 0..{COMMAND_RANGE} (got {})",
                self.control.deadzone
            )));
        }

        if self.control.poll_interval_ms == 0 || self.control.log_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "control intervals must be greater than 0".to_string(),
            ));
        }

        if self.input.network_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "network_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.input.joystick_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "joystick_path cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// This trait provides a default implementation that works with any type
/// implementing `serde::de::DeserializeOwned`.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

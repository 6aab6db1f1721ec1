//! Digital-output capability trait and error types.
//!
//! This module defines:
//! - `DigitalOutput` trait - Interface for pluggable GPIO output backends
//! - `GpioError` enum - Error types for GPIO operations

use crate::hal::types::Level;
use thiserror::Error;

/// Error types for GPIO operations.
#[derive(Debug, Clone, Error)]
pub enum GpioError {
    /// The GPIO controller could not be opened
    #[error("Failed to open GPIO chip {chip}: {reason}")]
    ChipOpen {
        /// Chip index
        chip: u32,
        /// OS error text
        reason: String,
    },

    /// A line could not be claimed as output
    #[error("Failed to claim line {line}: {reason}")]
    Claim {
        /// Line offset on the chip
        line: u32,
        /// OS error text
        reason: String,
    },

    /// Writing a level failed
    #[error("Failed to write line {line}: {reason}")]
    Write {
        /// Line offset on the chip
        line: u32,
        /// OS error text
        reason: String,
    },

    /// Write to a line that was never claimed
    #[error("Line {0} was not claimed")]
    UnclaimedLine(u32),

    /// Internal lock poisoned by a panicking thread
    #[error("GPIO driver state poisoned")]
    Poisoned,
}

/// Capability over a GPIO controller able to drive output lines.
///
/// The step engine never touches hardware registers; it depends only on
/// this trait. Implementations must be safe for concurrent `write()` calls
/// on *different* lines from different threads. Concurrent writes of the
/// same level to one line must be harmless.
///
/// # Lifecycle
///
/// 1. `claim()` - Called once per line at startup, before any worker runs
/// 2. `write()` - Called from the axis workers at pulse rate
///
/// # Timing Contracts
///
/// | Operation | Max Duration | RT Constraint |
/// |-----------|--------------|---------------|
/// | `claim()` | unbounded | None (startup) |
/// | `write()` | a few µs | **HARD** |
pub trait DigitalOutput: Send + Sync {
    /// Returns the backend's identifier (e.g., "gpiochip", "simulation").
    fn name(&self) -> &'static str;

    /// Claim `line` as an output driven to `initial`.
    ///
    /// # Errors
    /// Return `GpioError::Claim` if the line is busy or does not exist.
    fn claim(&self, line: u32, initial: Level) -> Result<(), GpioError>;

    /// Drive a claimed line to `level`.
    fn write(&self, line: u32, level: Level) -> Result<(), GpioError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpio_error_display() {
        let err = GpioError::Claim {
            line: 13,
            reason: "busy".to_string(),
        };
        assert!(err.to_string().contains("13"));
        assert!(err.to_string().contains("busy"));

        let err = GpioError::UnclaimedLine(7);
        assert_eq!(err.to_string(), "Line 7 was not claimed");
    }
}

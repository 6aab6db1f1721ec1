//! Step engine error types.

use rover_common::hal::driver::GpioError;
use thiserror::Error;

/// Errors raised while building, starting or running the step engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A GPIO operation failed
    #[error(transparent)]
    Gpio(#[from] GpioError),

    /// Requested output driver is not registered
    #[error("Output driver '{0}' is not registered")]
    DriverNotFound(String),

    /// An axis worker thread could not be spawned
    #[error("Failed to spawn worker for axis '{axis}': {reason}")]
    Spawn {
        /// Axis name
        axis: &'static str,
        /// OS error text
        reason: String,
    },

    /// Real-time scheduling setup failed
    #[error("RT setup failed: {0}")]
    RtSetup(String),
}

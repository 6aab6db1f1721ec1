//! Control-side error types.

use rover_common::config::ConfigError;
use rover_hal::EngineError;
use thiserror::Error;

/// Reasons a control datagram is rejected.
#[derive(Debug, Error)]
pub enum PacketError {
    /// Payload is not valid JSON
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A stick entry is an array without two numeric coordinates
    #[error("joystick '{0}' must hold two numbers")]
    InvalidStick(&'static str),

    /// Datagram exceeds the configured buffer size
    #[error("datagram larger than {limit} bytes")]
    Oversized {
        /// Configured maximum
        limit: usize,
    },
}

/// Errors surfaced to the binary.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Configuration could not be loaded or validated
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Step engine failed to start
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// An input worker thread could not be spawned
    #[error("Failed to spawn {worker} worker: {reason}")]
    Spawn {
        /// Worker name
        worker: &'static str,
        /// OS error text
        reason: String,
    },

    /// An axis worker stopped on a GPIO fault
    #[error("GPIO fault during operation; axes released")]
    Faulted,
}

//! Rover control side.
//!
//! Fuses two unreliable input sources into one axis vector and turns it into
//! per-axis step rates every few milliseconds.
//!
//! # Module Structure
//!
//! - [`input`] - Input axis vector and the joystick / network workers
//! - [`mixing`] - Scaling, deadzone and differential-drive arithmetic
//! - [`cycle`] - The control/mixing loop and its statistics
//! - [`netinfo`] - IPv4 interface listing for startup diagnostics
//! - [`error`] - Packet and top-level error types

pub mod cycle;
pub mod error;
pub mod input;
pub mod mixing;
pub mod netinfo;

pub use crate::cycle::{ControlLoop, CycleStats};
pub use crate::error::{ControlError, PacketError};
pub use crate::input::{InputAxisVector, InputManager};

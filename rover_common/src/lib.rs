//! Rover Common Library
//!
//! This crate provides shared constants, the digital-output capability and
//! configuration loading utilities for all rover workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Rig constants (pin map, timing, input scaling)
//! - [`hal`] - Digital-output capability trait and axis/pin types
//! - [`config`] - TOML configuration model and loader
//! - [`shutdown`] - Cooperative shutdown token shared by all workers
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use rover_common::prelude::*;
//!
//! let config = RoverConfig::default();
//! assert_eq!(config.pins(AxisId::Left).pulse, 13);
//! ```

pub mod config;
pub mod consts;
pub mod hal;
pub mod prelude;
pub mod shutdown;

//! Hardware abstraction types.
//!
//! This module contains the digital-output capability the step engine
//! drives and the identifiers it is parameterized with.

pub mod driver;
pub mod types;

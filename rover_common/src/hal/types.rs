//! Axis and line types.
//!
//! This module defines the identifiers shared between the step engine and
//! the control loop:
//! - `AxisId` - One of the four driven axes
//! - `PinSet` - Enable/direction/pulse lines of one axis
//! - `Level` - Logic level of a digital output line

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Not;

/// One of the four independently driven axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum AxisId {
    /// Left drive wheel
    Left = 0,
    /// Right drive wheel
    Right = 1,
    /// Turret pan
    Pan = 2,
    /// Turret tilt
    Tilt = 3,
}

impl AxisId {
    /// Number of axes on the rig.
    pub const COUNT: usize = 4;

    /// All axes in index order.
    pub const ALL: [AxisId; Self::COUNT] = [AxisId::Left, AxisId::Right, AxisId::Pan, AxisId::Tilt];

    /// Dense index, usable for fixed-size arrays.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Lowercase name, used for thread names and log fields.
    pub const fn name(self) -> &'static str {
        match self {
            AxisId::Left => "left",
            AxisId::Right => "right",
            AxisId::Pan => "pan",
            AxisId::Tilt => "tilt",
        }
    }
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// GPIO lines driving one stepper driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PinSet {
    /// Driver enable line
    pub enable: u32,
    /// Direction line (high = forward)
    pub direction: u32,
    /// Step pulse line
    pub pulse: u32,
}

impl PinSet {
    /// Build a pin set from an `(enable, direction, pulse)` tuple.
    pub const fn from_tuple(pins: (u32, u32, u32)) -> Self {
        Self {
            enable: pins.0,
            direction: pins.1,
            pulse: pins.2,
        }
    }

    /// All three lines, in claim order.
    pub const fn lines(&self) -> [u32; 3] {
        [self.enable, self.direction, self.pulse]
    }
}

/// Logic level of an output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Logic 0
    #[default]
    Low,
    /// Logic 1
    High,
}

impl Level {
    /// `true` for `High`.
    #[inline]
    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }
}

impl From<bool> for Level {
    #[inline]
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

impl Not for Level {
    type Output = Level;

    #[inline]
    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

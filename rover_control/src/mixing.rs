//! Stick-to-speed arithmetic.
//!
//! Raw joystick units are scaled into the command domain
//! `[-COMMAND_RANGE, COMMAND_RANGE]`, deadzoned, mixed for the differential
//! drive and finally converted to steps/second. The deadzone is applied
//! both before mixing and again on the mixed command.

use rover_common::consts::{
    COMMAND_RANGE, JOYSTICK_AXIS_RX, JOYSTICK_AXIS_RY, JOYSTICK_AXIS_X, JOYSTICK_AXIS_Y,
    MAX_JOYSTICK_VALUE,
};
use rover_common::hal::types::AxisId;

/// Raw joystick units to the command domain, rounded half away from zero.
#[inline]
pub fn scale_axis(raw: i16) -> i32 {
    let scaled = f64::from(raw) / f64::from(MAX_JOYSTICK_VALUE) * f64::from(COMMAND_RANGE);
    (scaled.round() as i32).clamp(-COMMAND_RANGE, COMMAND_RANGE)
}

/// Zero anything strictly inside the deadzone.
#[inline]
pub fn apply_deadzone(value: i32, deadzone: i32) -> i32 {
    if value.abs() < deadzone { 0 } else { value }
}

/// Differential-drive mix: `(x + y, x - y)`, each clamped to the command
/// domain.
#[inline]
pub fn mix(x: i32, y: i32) -> (i32, i32) {
    (
        (x + y).clamp(-COMMAND_RANGE, COMMAND_RANGE),
        (x - y).clamp(-COMMAND_RANGE, COMMAND_RANGE),
    )
}

/// Command to signed steps/second. Truncates toward zero.
#[inline]
pub fn command_to_speed(command: i32, deadzone: i32, max_speed: i16) -> i16 {
    if command.abs() < deadzone {
        return 0;
    }
    let command = command.clamp(-COMMAND_RANGE, COMMAND_RANGE);
    (command * i32::from(max_speed) / COMMAND_RANGE) as i16
}

/// The four raw input slots the mixer reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StickSample {
    pub x: i16,
    pub y: i16,
    pub rx: i16,
    pub ry: i16,
}

impl StickSample {
    /// Pick the mixer's slots out of a full axis snapshot.
    pub fn from_slots(slots: &[i16]) -> Self {
        let at = |i: usize| slots.get(i).copied().unwrap_or(0);
        Self {
            x: at(JOYSTICK_AXIS_X),
            y: at(JOYSTICK_AXIS_Y),
            rx: at(JOYSTICK_AXIS_RX),
            ry: at(JOYSTICK_AXIS_RY),
        }
    }
}

/// Stick values in the command domain, signed and deadzoned, before mixing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScaledSticks {
    pub x: i32,
    pub y: i32,
    pub pan: i32,
    pub tilt: i32,
}

/// Per-axis commands in the command domain, after mixing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AxisCommands {
    pub left: i32,
    pub right: i32,
    pub pan: i32,
    pub tilt: i32,
}

impl AxisCommands {
    /// Command for `axis`.
    pub fn get(&self, axis: AxisId) -> i32 {
        match axis {
            AxisId::Left => self.left,
            AxisId::Right => self.right,
            AxisId::Pan => self.pan,
            AxisId::Tilt => self.tilt,
        }
    }
}

/// Mixer parameters.
#[derive(Debug, Clone, Copy)]
pub struct Mixer {
    deadzone: i32,
    max_speed: i16,
}

impl Mixer {
    /// Mixer with the given deadzone and full-scale speed.
    pub fn new(deadzone: i32, max_speed: i16) -> Self {
        Self {
            deadzone,
            max_speed,
        }
    }

    /// Scale, sign and deadzone one sample.
    ///
    /// Sign convention: X and Y are negated for the drive, RX is used as is
    /// for pan, RY is negated for tilt.
    pub fn scale(&self, sample: StickSample) -> ScaledSticks {
        ScaledSticks {
            x: apply_deadzone(-scale_axis(sample.x), self.deadzone),
            y: apply_deadzone(-scale_axis(sample.y), self.deadzone),
            pan: apply_deadzone(scale_axis(sample.rx), self.deadzone),
            tilt: apply_deadzone(-scale_axis(sample.ry), self.deadzone),
        }
    }

    /// Mix scaled sticks into per-axis commands.
    pub fn mix_sticks(&self, sticks: ScaledSticks) -> AxisCommands {
        let (left, right) = mix(sticks.x, sticks.y);
        AxisCommands {
            left,
            right,
            pan: sticks.pan,
            tilt: sticks.tilt,
        }
    }

    /// [`scale`](Self::scale) then [`mix_sticks`](Self::mix_sticks).
    pub fn commands(&self, sample: StickSample) -> AxisCommands {
        self.mix_sticks(self.scale(sample))
    }

    /// Steps/second for every axis, in [`AxisId`] order.
    pub fn speeds(&self, commands: &AxisCommands) -> [i16; AxisId::COUNT] {
        AxisId::ALL.map(|axis| command_to_speed(commands.get(axis), self.deadzone, self.max_speed))
    }
}

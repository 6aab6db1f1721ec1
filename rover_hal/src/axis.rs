//! Axis command arena.
//!
//! One fixed slot per [`AxisId`]. The target speed is the only value that
//! crosses the control-loop / worker boundary; everything else about an
//! axis (enabled flag, direction, step timing) lives in its worker.

use rover_common::hal::types::AxisId;
use std::sync::atomic::{AtomicI16, Ordering};

/// Commanded speed of one axis in steps/second (0 = stopped).
#[derive(Debug, Default)]
pub struct AxisCommand {
    target_speed: AtomicI16,
}

impl AxisCommand {
    /// Latest commanded speed.
    #[inline]
    pub fn target_speed(&self) -> i16 {
        self.target_speed.load(Ordering::Relaxed)
    }

    /// Replace the commanded speed.
    #[inline]
    pub fn set_target_speed(&self, speed: i16) {
        self.target_speed.store(speed, Ordering::Relaxed);
    }
}

/// Commands for all four axes, addressed by [`AxisId`].
#[derive(Debug, Default)]
pub struct AxisBank {
    axes: [AxisCommand; AxisId::COUNT],
}

impl AxisBank {
    /// Create a bank with every axis stopped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Command slot of one axis.
    #[inline]
    pub fn axis(&self, axis: AxisId) -> &AxisCommand {
        &self.axes[axis.index()]
    }

    /// Latest commanded speed of `axis`.
    #[inline]
    pub fn target_speed(&self, axis: AxisId) -> i16 {
        self.axis(axis).target_speed()
    }

    /// Command `axis` to `speed` steps/second.
    #[inline]
    pub fn set_target_speed(&self, axis: AxisId, speed: i16) {
        self.axis(axis).set_target_speed(speed);
    }

    /// Command every axis to zero.
    pub fn stop_all(&self) {
        for axis in AxisId::ALL {
            self.set_target_speed(axis, 0);
        }
    }

    /// Snapshot of all four speeds in [`AxisId`] order.
    pub fn snapshot(&self) -> [i16; AxisId::COUNT] {
        AxisId::ALL.map(|axis| self.target_speed(axis))
    }
}

//! Step activity indicator.
//!
//! A single LED line shared by all four axis workers. Any worker that steps
//! re-arms it; any worker that is waiting turns it off once the deadline
//! has passed. Both operations are idempotent level-sets, so racing workers
//! at worst write the same level twice.

use rover_common::hal::driver::{DigitalOutput, GpioError};
use rover_common::hal::types::Level;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Shared activity LED state.
#[derive(Debug)]
pub struct StepIndicator {
    line: u32,
    on_duration_ms: u64,
    on: AtomicBool,
    off_deadline_ms: AtomicU64,
}

impl StepIndicator {
    /// Indicator on `line`, held on for `on_duration_ms` after each step.
    pub fn new(line: u32, on_duration_ms: u64) -> Self {
        Self {
            line,
            on_duration_ms,
            on: AtomicBool::new(false),
            off_deadline_ms: AtomicU64::new(0),
        }
    }

    /// LED line.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// `true` while the LED is lit.
    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::Relaxed)
    }

    /// Extend the on-window after a step, lighting the LED if it was off.
    pub fn trigger(&self, now_ms: u64, out: &dyn DigitalOutput) -> Result<(), GpioError> {
        self.off_deadline_ms
            .store(now_ms + self.on_duration_ms, Ordering::Relaxed);
        if !self.on.swap(true, Ordering::Relaxed) {
            out.write(self.line, Level::High)?;
        }
        Ok(())
    }

    /// Turn the LED off if its deadline has passed.
    pub fn expire(&self, now_ms: u64, out: &dyn DigitalOutput) -> Result<(), GpioError> {
        if self.on.load(Ordering::Relaxed)
            && now_ms >= self.off_deadline_ms.load(Ordering::Relaxed)
        {
            out.write(self.line, Level::Low)?;
            self.on.store(false, Ordering::Relaxed);
        }
        Ok(())
    }

    /// Force the LED off.
    pub fn clear(&self, out: &dyn DigitalOutput) -> Result<(), GpioError> {
        self.on.store(false, Ordering::Relaxed);
        out.write(self.line, Level::Low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::simulation::SimulatedOutput;

    fn claimed_output() -> SimulatedOutput {
        let out = SimulatedOutput::new();
        out.claim(18, Level::Low).unwrap();
        out
    }

    #[test]
    fn trigger_lights_once_and_extends_deadline() {
        let out = claimed_output();
        let led = StepIndicator::new(18, 50);

        led.trigger(1_000, &out).unwrap();
        led.trigger(1_030, &out).unwrap();
        assert!(led.is_on());
        assert_eq!(out.level(18), Some(Level::High));
        // Only the first trigger writes the line.
        assert_eq!(out.write_count(18), 1);

        // Deadline is 1_080 after the second trigger.
        led.expire(1_060, &out).unwrap();
        assert!(led.is_on());
        led.expire(1_080, &out).unwrap();
        assert!(!led.is_on());
        assert_eq!(out.level(18), Some(Level::Low));
    }

    #[test]
    fn expire_when_off_is_a_no_op() {
        let out = claimed_output();
        let led = StepIndicator::new(18, 50);
        led.expire(10_000, &out).unwrap();
        assert_eq!(out.write_count(18), 0);
    }
}

//! Per-axis step scheduler and worker loop.
//!
//! [`StepScheduler`] owns everything an axis worker knows about its motor:
//! enable state, current direction and the tick of the last step. Each
//! [`StepScheduler::poll`] call runs one iteration of the step algorithm
//! and reports what the worker should do next.
//!
//! [`AxisWorker::run`] is the loop around it: one thread per axis, no
//! locks on the hot path, only the atomic target speed in [`AxisBank`].

use crate::axis::AxisBank;
use crate::indicator::StepIndicator;
use crate::timing::{TickSource, tick_diff};
use rover_common::hal::driver::{DigitalOutput, GpioError};
use rover_common::hal::types::{AxisId, Level, PinSet};
use rover_common::shutdown::ShutdownToken;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info};

/// Longest single wait between polls, bounding speed-change latency.
pub const MAX_WAIT_US: u32 = 1_000;

/// Sleep while the axis is commanded to zero.
pub const IDLE_POLL: Duration = Duration::from_millis(2);

/// What the worker should do after one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Speed is zero; driver disabled. Sleep [`IDLE_POLL`].
    Idle,
    /// A step pulse was emitted. Poll again immediately.
    Stepped,
    /// Next step is not due yet. Wait this many microseconds.
    Waiting(u32),
}

/// Electrical polarity and pulse timing shared by all axes.
#[derive(Debug, Clone, Copy)]
pub struct StepTiming {
    /// Enable level that energises the driver
    pub enable_active: Level,
    /// Pulse level that constitutes a step
    pub pulse_active: Level,
    /// Duration the pulse line is held active
    pub pulse_width_us: u32,
}

/// Microseconds between steps at `speed` steps/second.
///
/// Never below `pulse_width_us + 1`, so the pulse always fits inside the
/// step period. `speed` must be non-zero.
#[inline]
pub fn step_interval_us(speed: i16, pulse_width_us: u32) -> u32 {
    let magnitude = u32::from(speed.unsigned_abs()).max(1);
    (1_000_000 / magnitude).max(pulse_width_us + 1)
}

/// Step state machine of one axis.
#[derive(Debug)]
pub struct StepScheduler {
    axis: AxisId,
    pins: PinSet,
    timing: StepTiming,
    enabled: bool,
    forward: bool,
    last_step_tick: u32,
    steps: u64,
}

impl StepScheduler {
    /// Scheduler for an axis whose lines were claimed with enable inactive
    /// and direction forward. `now_tick` seeds the last-step time.
    pub fn new(axis: AxisId, pins: PinSet, timing: StepTiming, now_tick: u32) -> Self {
        Self {
            axis,
            pins,
            timing,
            enabled: false,
            forward: true,
            last_step_tick: now_tick,
            steps: 0,
        }
    }

    /// Axis this scheduler drives.
    pub fn axis(&self) -> AxisId {
        self.axis
    }

    /// `true` while the driver enable line is asserted.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Pulses emitted since construction.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Run one iteration of the step algorithm at `speed`.
    pub fn poll(
        &mut self,
        speed: i16,
        out: &dyn DigitalOutput,
        clock: &dyn TickSource,
        indicator: Option<&StepIndicator>,
    ) -> Result<StepOutcome, GpioError> {
        if speed == 0 {
            if self.enabled {
                out.write(self.pins.enable, !self.timing.enable_active)?;
                self.enabled = false;
            }
            return Ok(StepOutcome::Idle);
        }

        if !self.enabled {
            out.write(self.pins.enable, self.timing.enable_active)?;
            self.enabled = true;
        }

        let forward = speed > 0;
        if forward != self.forward {
            out.write(self.pins.direction, Level::from(forward))?;
            self.forward = forward;
            // Direction setup time before the next pulse.
            self.last_step_tick = clock.ticks_us();
        }

        let interval = step_interval_us(speed, self.timing.pulse_width_us);
        let elapsed = tick_diff(clock.ticks_us(), self.last_step_tick);

        if elapsed >= interval {
            out.write(self.pins.pulse, self.timing.pulse_active)?;
            clock.delay(self.timing.pulse_width_us);
            out.write(self.pins.pulse, !self.timing.pulse_active)?;
            self.last_step_tick = clock.ticks_us();
            self.steps += 1;

            if let Some(led) = indicator {
                led.trigger(clock.now_ms(), out)?;
            }
            return Ok(StepOutcome::Stepped);
        }

        if let Some(led) = indicator {
            led.expire(clock.now_ms(), out)?;
        }
        Ok(StepOutcome::Waiting((interval - elapsed).min(MAX_WAIT_US)))
    }

    /// Drive pulse and enable inactive.
    ///
    /// Both lines are attempted even if the first write fails; the first
    /// error is returned.
    pub fn release(&mut self, out: &dyn DigitalOutput) -> Result<(), GpioError> {
        let pulse = out.write(self.pins.pulse, !self.timing.pulse_active);
        let enable = out.write(self.pins.enable, !self.timing.enable_active);
        self.enabled = false;
        pulse.and(enable)
    }
}

/// Everything an axis thread needs, moved into the thread at spawn.
pub struct AxisWorker {
    /// Step state machine
    pub scheduler: StepScheduler,
    /// Shared speed commands
    pub bank: Arc<AxisBank>,
    /// Output backend
    pub output: Arc<dyn DigitalOutput>,
    /// Tick source
    pub clock: Arc<dyn TickSource>,
    /// Shared activity LED, if configured
    pub indicator: Option<Arc<StepIndicator>>,
    /// Engine-local stop request
    pub halt: ShutdownToken,
    /// Process-wide shutdown, requested on a GPIO fault
    pub shutdown: ShutdownToken,
    /// Latched when any worker hits a GPIO fault
    pub fault: Arc<AtomicBool>,
}

impl AxisWorker {
    /// Step until halted, then release the axis lines.
    pub fn run(mut self) {
        let axis = self.scheduler.axis();
        debug!(%axis, "axis worker started");

        while !self.halt.is_requested() {
            let speed = self.bank.target_speed(axis);
            let outcome = self.scheduler.poll(
                speed,
                self.output.as_ref(),
                self.clock.as_ref(),
                self.indicator.as_deref(),
            );
            match outcome {
                Ok(StepOutcome::Idle) => {
                    self.halt.sleep(IDLE_POLL);
                }
                Ok(StepOutcome::Stepped) => {}
                Ok(StepOutcome::Waiting(us)) => {
                    if self.halt.is_requested() {
                        break;
                    }
                    self.clock.delay(us);
                }
                Err(e) => {
                    error!(%axis, "GPIO fault, stopping rig: {e}");
                    self.fault.store(true, Ordering::SeqCst);
                    self.shutdown.request();
                    break;
                }
            }
        }

        if let Err(e) = self.scheduler.release(self.output.as_ref()) {
            error!(%axis, "failed to release axis lines: {e}");
        }
        info!(%axis, steps = self.scheduler.steps(), "axis worker stopped");
    }
}

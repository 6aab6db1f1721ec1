//! Control/mixing loop.
//!
//! Runs on the main thread. Every `poll_interval_ms` it samples the input
//! axis vector, mixes it and writes one target speed per axis into the step
//! engine's command bank. Once per `log_interval_ms` it emits the status
//! line and timing statistics.
//!
//! The loop itself never fails: bad input has already been contained by the
//! producers and the engine owns all GPIO error handling.

use crate::input::InputAxisVector;
use crate::mixing::{AxisCommands, Mixer, ScaledSticks, StickSample};
use rover_common::config::RoverConfig;
use rover_common::hal::types::AxisId;
use rover_common::shutdown::ShutdownToken;
use rover_hal::AxisBank;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

// ─── Cycle Statistics ───────────────────────────────────────────────

/// Control-loop timing statistics. O(1) update, no allocation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleStats {
    /// Total iterations executed.
    pub cycle_count: u64,
    /// Duration of the last iteration [µs].
    pub last_cycle_us: u64,
    /// Longest iteration [µs].
    pub max_cycle_us: u64,
    /// Running sum for average computation.
    pub sum_cycle_us: u64,
    /// Iterations that took longer than the poll interval.
    pub overruns: u64,
}

impl CycleStats {
    /// Create a new zeroed stats instance.
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_us: 0,
            max_cycle_us: 0,
            sum_cycle_us: 0,
            overruns: 0,
        }
    }

    /// Record one iteration against its budget.
    #[inline]
    pub fn record(&mut self, duration_us: u64, budget_us: u64) {
        self.cycle_count += 1;
        self.last_cycle_us = duration_us;
        self.max_cycle_us = self.max_cycle_us.max(duration_us);
        self.sum_cycle_us += duration_us;
        if duration_us > budget_us {
            self.overruns += 1;
        }
    }

    /// Average iteration time [µs] (0 if no iterations).
    #[inline]
    pub fn avg_cycle_us(&self) -> u64 {
        self.sum_cycle_us.checked_div(self.cycle_count).unwrap_or(0)
    }
}

// ─── Control Loop ───────────────────────────────────────────────────

/// Result of one control iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlSnapshot {
    /// Raw inputs read
    pub sample: StickSample,
    /// Signed, deadzoned stick values in the command domain
    pub sticks: ScaledSticks,
    /// Mixed commands
    pub commands: AxisCommands,
    /// Speeds written, in [`AxisId`] order
    pub speeds: [i16; AxisId::COUNT],
}

/// Input vector → axis bank pipeline.
pub struct ControlLoop {
    axes: Arc<InputAxisVector>,
    bank: Arc<AxisBank>,
    mixer: Mixer,
    poll_interval: Duration,
    log_interval: Duration,
    stats: CycleStats,
    last: ControlSnapshot,
}

impl ControlLoop {
    /// Loop reading `axes` and commanding `bank`.
    pub fn new(axes: Arc<InputAxisVector>, bank: Arc<AxisBank>, config: &RoverConfig) -> Self {
        Self {
            axes,
            bank,
            mixer: Mixer::new(
                config.control.deadzone,
                config.stepper.max_speed_steps_per_sec,
            ),
            poll_interval: Duration::from_millis(config.control.poll_interval_ms),
            log_interval: Duration::from_millis(config.control.log_interval_ms),
            stats: CycleStats::new(),
            last: ControlSnapshot::default(),
        }
    }

    /// Run one iteration: sample, mix, command.
    pub fn tick(&mut self) -> ControlSnapshot {
        let sample = StickSample::from_slots(&self.axes.snapshot());
        let sticks = self.mixer.scale(sample);
        let commands = self.mixer.mix_sticks(sticks);
        let speeds = self.mixer.speeds(&commands);
        for axis in AxisId::ALL {
            self.bank.set_target_speed(axis, speeds[axis.index()]);
        }
        self.last = ControlSnapshot {
            sample,
            sticks,
            commands,
            speeds,
        };
        self.last
    }

    /// Result of the most recent [`tick`](Self::tick).
    pub fn last(&self) -> &ControlSnapshot {
        &self.last
    }

    /// Timing statistics so far.
    pub fn stats(&self) -> &CycleStats {
        &self.stats
    }

    /// Tick every poll interval until `shutdown` is requested. All axes are
    /// commanded to zero on exit.
    pub fn run(&mut self, shutdown: &ShutdownToken) {
        let budget_us = self.poll_interval.as_micros() as u64;
        let mut last_log = Instant::now();
        info!(
            "Control loop running (poll {}ms, status every {}ms)",
            self.poll_interval.as_millis(),
            self.log_interval.as_millis()
        );

        while !shutdown.is_requested() {
            let started = Instant::now();
            self.tick();

            if last_log.elapsed() >= self.log_interval {
                self.log_status();
                last_log = Instant::now();
            }

            let elapsed = started.elapsed();
            self.stats.record(elapsed.as_micros() as u64, budget_us);
            if let Some(remaining) = self.poll_interval.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }

        self.bank.stop_all();
        info!(cycles = self.stats.cycle_count, "Control loop stopped");
    }

    /// Status line for the last iteration, in command-domain units.
    pub fn status_line(&self) -> String {
        let ControlSnapshot {
            sticks, commands, ..
        } = self.last;
        format!(
            "JOY X:{} Y:{} RX:{} RY:{} | MixL:{} MixR:{}",
            sticks.x, sticks.y, sticks.pan, sticks.tilt, commands.left, commands.right
        )
    }

    fn log_status(&self) {
        let sample = self.last.sample;
        info!(
            raw_x = sample.x,
            raw_y = sample.y,
            raw_rx = sample.rx,
            raw_ry = sample.ry,
            "{}",
            self.status_line()
        );
        debug!(
            cycles = self.stats.cycle_count,
            avg_us = self.stats.avg_cycle_us(),
            max_us = self.stats.max_cycle_us,
            overruns = self.stats.overruns,
            "control loop timing"
        );
    }
}

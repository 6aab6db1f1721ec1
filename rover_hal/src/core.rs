//! Step engine lifecycle.
//!
//! [`StepEngine`] is the entry point of this crate. It claims every output
//! line at a safe initial level, spawns one worker thread per axis and
//! exposes the per-axis target speed. Stopping joins the workers, which
//! leave their lines de-energised.

use crate::axis::AxisBank;
use crate::error::EngineError;
use crate::indicator::StepIndicator;
use crate::rt;
use crate::scheduler::{AxisWorker, StepScheduler, StepTiming};
use crate::timing::{MonotonicClock, TickSource};
use rover_common::config::RoverConfig;
use rover_common::hal::driver::DigitalOutput;
use rover_common::hal::types::{AxisId, Level};
use rover_common::shutdown::ShutdownToken;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Optional knobs for [`StepEngine::start_with`].
#[derive(Clone)]
pub struct EngineOptions {
    /// SCHED_FIFO priority for axis threads (0 = leave policy untouched)
    pub rt_priority: i32,
    /// Tick source shared by all workers
    pub clock: Arc<dyn TickSource>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            rt_priority: 0,
            clock: Arc::new(MonotonicClock::new()),
        }
    }
}

/// Four-axis step generator.
pub struct StepEngine {
    output: Arc<dyn DigitalOutput>,
    bank: Arc<AxisBank>,
    indicator: Option<Arc<StepIndicator>>,
    halt: ShutdownToken,
    fault: Arc<AtomicBool>,
    workers: Vec<(AxisId, JoinHandle<()>)>,
}

impl StepEngine {
    /// Claim all lines and start the axis workers with default options.
    pub fn start(
        output: Arc<dyn DigitalOutput>,
        config: &RoverConfig,
        shutdown: ShutdownToken,
    ) -> Result<Self, EngineError> {
        Self::start_with(output, config, shutdown, EngineOptions::default())
    }

    /// Claim all lines and start the axis workers.
    ///
    /// Lines are claimed before any thread is spawned: activity LED low,
    /// enable inactive, direction forward, pulse inactive. A worker that
    /// hits a GPIO fault latches [`faulted`](Self::faulted) and requests
    /// `shutdown`.
    ///
    /// # Errors
    /// `EngineError::Gpio` if any line cannot be claimed,
    /// `EngineError::Spawn` if a worker thread cannot be created.
    pub fn start_with(
        output: Arc<dyn DigitalOutput>,
        config: &RoverConfig,
        shutdown: ShutdownToken,
        options: EngineOptions,
    ) -> Result<Self, EngineError> {
        let timing = StepTiming {
            enable_active: config.gpio.enable_active_level,
            pulse_active: config.gpio.pulse_active_level,
            pulse_width_us: config.stepper.pulse_width_us,
        };

        let indicator = match config.gpio.activity_led_line() {
            Some(line) => {
                output.claim(line, Level::Low)?;
                Some(Arc::new(StepIndicator::new(
                    line,
                    config.stepper.step_led_duration_ms,
                )))
            }
            None => None,
        };

        for axis in AxisId::ALL {
            let pins = config.pins(axis);
            output.claim(pins.enable, !timing.enable_active)?;
            output.claim(pins.direction, Level::High)?;
            output.claim(pins.pulse, !timing.pulse_active)?;
            debug!(
                %axis,
                enable = pins.enable,
                direction = pins.direction,
                pulse = pins.pulse,
                "claimed axis lines"
            );
        }

        let mut engine = Self {
            output,
            bank: Arc::new(AxisBank::new()),
            indicator,
            halt: ShutdownToken::new(),
            fault: Arc::new(AtomicBool::new(false)),
            workers: Vec::with_capacity(AxisId::COUNT),
        };

        for axis in AxisId::ALL {
            let worker = AxisWorker {
                scheduler: StepScheduler::new(
                    axis,
                    config.pins(axis),
                    timing,
                    options.clock.ticks_us(),
                ),
                bank: Arc::clone(&engine.bank),
                output: Arc::clone(&engine.output),
                clock: Arc::clone(&options.clock),
                indicator: engine.indicator.clone(),
                halt: engine.halt.clone(),
                shutdown: shutdown.clone(),
                fault: Arc::clone(&engine.fault),
            };
            let priority = options.rt_priority;

            // On error `engine` is dropped here, which joins the workers
            // already running.
            let handle = thread::Builder::new()
                .name(format!("axis-{}", axis.name()))
                .spawn(move || {
                    if let Err(e) = rt::set_thread_priority(priority) {
                        warn!(%axis, "{e}");
                    }
                    debug!(%axis, realtime = rt::is_realtime(), "axis thread scheduling");
                    worker.run();
                })
                .map_err(|e| EngineError::Spawn {
                    axis: axis.name(),
                    reason: e.to_string(),
                })?;
            engine.workers.push((axis, handle));
        }

        info!(
            "Step engine started on '{}' output ({} axes, max pulse width {}us)",
            engine.output.name(),
            AxisId::COUNT,
            timing.pulse_width_us
        );
        Ok(engine)
    }

    /// Command `axis` to `speed` steps/second; sign selects direction.
    #[inline]
    pub fn set_speed(&self, axis: AxisId, speed: i16) {
        self.bank.set_target_speed(axis, speed);
    }

    /// Latest commanded speed of `axis`.
    #[inline]
    pub fn speed(&self, axis: AxisId) -> i16 {
        self.bank.target_speed(axis)
    }

    /// Shared command arena, for callers that write speeds every cycle.
    pub fn bank(&self) -> Arc<AxisBank> {
        Arc::clone(&self.bank)
    }

    /// `true` once any worker stopped on a GPIO fault.
    pub fn faulted(&self) -> bool {
        self.fault.load(Ordering::SeqCst)
    }

    /// `true` while axis workers are running.
    pub fn is_running(&self) -> bool {
        !self.workers.is_empty()
    }

    /// Stop and join all axis workers, then turn the activity LED off.
    ///
    /// Idempotent. Each worker drives its pulse and enable lines inactive
    /// before exiting.
    pub fn stop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.halt.request();
        self.bank.stop_all();

        for (axis, handle) in self.workers.drain(..) {
            if handle.join().is_err() {
                error!(%axis, "axis worker panicked");
                self.fault.store(true, Ordering::SeqCst);
            }
        }

        if let Some(led) = &self.indicator {
            if let Err(e) = led.clear(self.output.as_ref()) {
                warn!("failed to clear activity LED: {e}");
            }
        }
        info!("Step engine stopped");
    }
}

impl Drop for StepEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

//! In-memory `DigitalOutput` implementation.

use super::trace::{LineEvent, LineTrace};
use rover_common::hal::driver::{DigitalOutput, GpioError};
use rover_common::hal::types::Level;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::trace;

#[derive(Debug, Default)]
struct SimState {
    /// Current level of each claimed line
    levels: HashMap<u32, Level>,
    /// Level each line was claimed with
    initial: HashMap<u32, Level>,
    /// Writes per line since claim
    writes: HashMap<u32, u64>,
    /// Lines whose claim must fail
    unavailable: HashSet<u32>,
    /// Lines whose writes must fail
    failing: HashSet<u32>,
    trace: LineTrace,
}

/// Simulated GPIO controller.
#[derive(Debug)]
pub struct SimulatedOutput {
    start: Instant,
    state: Mutex<SimState>,
}

impl SimulatedOutput {
    /// Controller with every line available.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            state: Mutex::new(SimState::default()),
        }
    }

    /// Controller on which claiming any of `lines` fails, as if another
    /// process held them.
    pub fn with_unavailable_lines(lines: impl IntoIterator<Item = u32>) -> Self {
        let sim = Self::new();
        if let Ok(mut state) = sim.state.lock() {
            state.unavailable.extend(lines);
        }
        sim
    }

    fn lock(&self) -> Result<MutexGuard<'_, SimState>, GpioError> {
        self.state.lock().map_err(|_| GpioError::Poisoned)
    }

    /// Make every later write to `line` fail.
    pub fn fail_writes(&self, line: u32) {
        if let Ok(mut state) = self.lock() {
            state.failing.insert(line);
        }
    }

    /// Current level of `line`, `None` if unclaimed.
    pub fn level(&self, line: u32) -> Option<Level> {
        self.lock().ok()?.levels.get(&line).copied()
    }

    /// `true` once `line` has been claimed.
    pub fn is_claimed(&self, line: u32) -> bool {
        self.lock()
            .map(|s| s.levels.contains_key(&line))
            .unwrap_or(false)
    }

    /// Number of writes to `line` since it was claimed.
    pub fn write_count(&self, line: u32) -> u64 {
        self.lock()
            .ok()
            .and_then(|s| s.writes.get(&line).copied())
            .unwrap_or(0)
    }

    /// Times at which `line` changed to `level`.
    pub fn edges(&self, line: u32, level: Level) -> Vec<Duration> {
        self.lock()
            .map(|s| s.trace.edges(line, level, s.initial.get(&line).copied()))
            .unwrap_or_default()
    }

    /// Copy of all recorded writes.
    pub fn events(&self) -> Vec<LineEvent> {
        self.lock()
            .map(|s| s.trace.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Forget recorded writes. Levels and claims are kept; edge detection
    /// restarts from the current levels.
    pub fn clear_trace(&self) {
        if let Ok(mut state) = self.lock() {
            state.trace.clear();
            state.writes.clear();
            state.initial = state.levels.clone();
        }
    }
}

impl Default for SimulatedOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl DigitalOutput for SimulatedOutput {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn claim(&self, line: u32, initial: Level) -> Result<(), GpioError> {
        let mut state = self.lock()?;
        if state.unavailable.contains(&line) {
            return Err(GpioError::Claim {
                line,
                reason: "line busy".to_string(),
            });
        }
        state.levels.insert(line, initial);
        state.initial.insert(line, initial);
        trace!(line, ?initial, "claimed simulated line");
        Ok(())
    }

    fn write(&self, line: u32, level: Level) -> Result<(), GpioError> {
        let at = self.start.elapsed();
        let mut state = self.lock()?;
        if state.failing.contains(&line) {
            return Err(GpioError::Write {
                line,
                reason: "injected fault".to_string(),
            });
        }
        let Some(current) = state.levels.get_mut(&line) else {
            return Err(GpioError::UnclaimedLine(line));
        };
        *current = level;
        *state.writes.entry(line).or_default() += 1;
        state.trace.push(LineEvent { line, level, at });
        Ok(())
    }
}

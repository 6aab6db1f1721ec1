//! Tick clock and microsecond delay primitives.
//!
//! All step timing goes through this module:
//! - [`TickSource`] - free-running microsecond tick counter plus a
//!   millisecond clock, both monotonic
//! - [`tick_diff`] - wraparound-safe elapsed ticks
//! - [`delay_us`] - hybrid sleep / busy-wait delay
//!
//! The tick counter is a `u32` and wraps roughly every 71.6 minutes; every
//! consumer must compare ticks with [`tick_diff`], never with `<`.

use std::time::{Duration, Instant};

/// Requests above this many microseconds use a scheduler sleep; at or
/// below it the delay busy-waits on the monotonic clock.
pub const BUSY_WAIT_THRESHOLD_US: u32 = 100;

/// Monotonic time source used by the axis workers.
pub trait TickSource: Send + Sync {
    /// Free-running microsecond tick counter. Wraps at `u32::MAX`.
    fn ticks_us(&self) -> u32;

    /// Monotonic milliseconds, used for indicator deadlines.
    fn now_ms(&self) -> u64;

    /// Block for `us` microseconds. Defaults to [`delay_us`].
    fn delay(&self, us: u32) {
        delay_us(us);
    }
}

/// [`TickSource`] backed by `std::time::Instant`.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    /// Create a clock whose tick 0 is now.
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for MonotonicClock {
    #[inline]
    fn ticks_us(&self) -> u32 {
        // Truncation is the wrap.
        self.epoch.elapsed().as_micros() as u32
    }

    #[inline]
    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

/// Ticks elapsed from `earlier` to `later`, correct across one wrap of the
/// counter.
#[inline]
pub const fn tick_diff(later: u32, earlier: u32) -> u32 {
    if later >= earlier {
        later - earlier
    } else {
        (u32::MAX - earlier) + 1 + later
    }
}

/// Block the calling thread for `us` microseconds.
///
/// Long waits sleep so the core is given back to the scheduler. Short
/// waits spin, since OS sleep granularity cannot resolve single-digit
/// microsecond pulse widths.
#[inline]
pub fn delay_us(us: u32) {
    if us > BUSY_WAIT_THRESHOLD_US {
        std::thread::sleep(Duration::from_micros(us as u64));
    } else {
        spin_until(Instant::now() + Duration::from_micros(us as u64));
    }
}

/// Busy-wait until the monotonic clock reaches `deadline`.
#[inline]
pub fn spin_until(deadline: Instant) {
    while Instant::now() < deadline {
        std::hint::spin_loop();
    }
}

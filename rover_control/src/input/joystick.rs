//! Joystick device worker.
//!
//! Reads the Linux joystick API (`/dev/input/jsN`): fixed 8-byte events in
//! native byte order. The device is opened non-blocking and drained in
//! bursts, with a short sleep between bursts. A missing device is retried
//! once per second forever; prior axis values are left untouched while it
//! is absent.

use super::InputAxisVector;
use rover_common::consts::SUPPORTED_AXES;
use rover_common::shutdown::ShutdownToken;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Button press / release.
pub const JS_EVENT_BUTTON: u8 = 0x01;
/// Axis movement.
pub const JS_EVENT_AXIS: u8 = 0x02;
/// Synthetic event reporting initial state after open.
pub const JS_EVENT_INIT: u8 = 0x80;

/// Size of one event on the wire.
pub const JS_EVENT_SIZE: usize = 8;

/// Delay between open attempts while the device is absent.
pub const REOPEN_INTERVAL: Duration = Duration::from_secs(1);

/// Sleep between read bursts.
pub const READ_INTERVAL: Duration = Duration::from_millis(10);

/// Decoded `struct js_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsEvent {
    /// Driver timestamp in milliseconds
    pub time_ms: u32,
    /// Axis position or button state
    pub value: i16,
    /// `JS_EVENT_*` flags
    pub kind: u8,
    /// Axis or button index
    pub number: u8,
}

impl JsEvent {
    /// Decode one event in native byte order.
    pub fn decode(buf: &[u8; JS_EVENT_SIZE]) -> Self {
        Self {
            time_ms: u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]),
            value: i16::from_ne_bytes([buf[4], buf[5]]),
            kind: buf[6],
            number: buf[7],
        }
    }

    /// Encode back to wire form.
    pub fn encode(&self) -> [u8; JS_EVENT_SIZE] {
        let mut buf = [0u8; JS_EVENT_SIZE];
        buf[..4].copy_from_slice(&self.time_ms.to_ne_bytes());
        buf[4..6].copy_from_slice(&self.value.to_ne_bytes());
        buf[6] = self.kind;
        buf[7] = self.number;
        buf
    }

    /// `true` for axis events, initial-state or live.
    #[inline]
    pub fn is_axis(&self) -> bool {
        self.kind & !JS_EVENT_INIT == JS_EVENT_AXIS
    }
}

/// Store an axis event into `axes` if its index is a supported slot.
///
/// Returns `true` if a slot was written.
pub fn apply_event(event: &JsEvent, axes: &InputAxisVector) -> bool {
    let index = usize::from(event.number);
    if !event.is_axis() || !SUPPORTED_AXES.contains(&index) {
        return false;
    }
    axes.set(index, event.value)
}

/// Read events until the device would block.
///
/// Returns the number of slots written. End-of-file and short reads are
/// errors: the device went away or is not a joystick.
pub fn drain_events(device: &mut impl Read, axes: &InputAxisVector) -> io::Result<usize> {
    let mut buf = [0u8; JS_EVENT_SIZE];
    let mut applied = 0;
    loop {
        match device.read(&mut buf) {
            Ok(JS_EVENT_SIZE) => {
                let event = JsEvent::decode(&buf);
                trace!(?event, "joystick event");
                if apply_event(&event, axes) {
                    applied += 1;
                }
            }
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "joystick device closed",
                ));
            }
            Ok(n) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("short joystick event ({n} bytes)"),
                ));
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(applied),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

fn open_nonblocking(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
}

/// Counters shared with observers of the worker.
#[derive(Debug, Default)]
pub struct JoystickStats {
    /// Open attempts, successful or not
    pub open_attempts: AtomicU64,
    /// Axis slots written
    pub events_applied: AtomicU64,
    /// `true` while the device is open
    pub connected: AtomicBool,
}

/// Joystick producer.
pub struct JoystickWorker {
    path: PathBuf,
    axes: Arc<InputAxisVector>,
    shutdown: ShutdownToken,
    stats: Arc<JoystickStats>,
}

impl JoystickWorker {
    /// Worker reading `path` into `axes` until `shutdown`.
    pub fn new(path: PathBuf, axes: Arc<InputAxisVector>, shutdown: ShutdownToken) -> Self {
        Self {
            path,
            axes,
            shutdown,
            stats: Arc::new(JoystickStats::default()),
        }
    }

    /// Counters for this worker.
    pub fn stats(&self) -> Arc<JoystickStats> {
        Arc::clone(&self.stats)
    }

    /// Run until shutdown. Never returns early on device errors.
    pub fn run(self) {
        let mut device: Option<File> = None;
        let mut reported_absent = false;

        while !self.shutdown.is_requested() {
            if device.is_none() {
                self.stats.open_attempts.fetch_add(1, Ordering::Relaxed);
                match open_nonblocking(&self.path) {
                    Ok(file) => {
                        info!("Joystick connected: {}", self.path.display());
                        self.stats.connected.store(true, Ordering::Relaxed);
                        reported_absent = false;
                        device = Some(file);
                    }
                    Err(e) => {
                        if reported_absent {
                            debug!("Joystick {} still unavailable: {e}", self.path.display());
                        } else {
                            warn!(
                                "Joystick {} unavailable ({e}), retrying every {}s",
                                self.path.display(),
                                REOPEN_INTERVAL.as_secs()
                            );
                            reported_absent = true;
                        }
                        self.shutdown.sleep(REOPEN_INTERVAL);
                    }
                }
                continue;
            }
            let Some(file) = device.as_mut() else {
                continue;
            };

            match drain_events(file, &self.axes) {
                Ok(applied) => {
                    self.stats
                        .events_applied
                        .fetch_add(applied as u64, Ordering::Relaxed);
                }
                Err(e) => {
                    warn!("Joystick read error on {}: {e}, reopening", self.path.display());
                    self.stats.connected.store(false, Ordering::Relaxed);
                    device = None;
                }
            }
            self.shutdown.sleep(READ_INTERVAL);
        }
        debug!("joystick worker stopped");
    }
}

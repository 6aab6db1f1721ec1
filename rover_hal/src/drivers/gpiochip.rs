//! Linux GPIO character-device driver.
//!
//! Drives lines of `/dev/gpiochipN` through the kernel line-handle ioctls.
//! Each claimed line gets its own handle fd so writes on different lines
//! never contend.
//!
//! # ABI
//!
//! `GPIO_GET_LINEHANDLE_IOCTL` returns an fd for a set of output lines;
//! `GPIOHANDLE_SET_LINE_VALUES_IOCTL` on that fd sets their levels. The
//! request structs mirror `<linux/gpio.h>` and their sizes are checked at
//! compile time.

use rover_common::config::GpioConfig;
use rover_common::hal::driver::{DigitalOutput, GpioError};
use rover_common::hal::types::Level;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

mod abi {
    use static_assertions::const_assert_eq;

    pub const GPIOHANDLES_MAX: usize = 64;
    pub const GPIOHANDLE_REQUEST_OUTPUT: u32 = 1 << 1;

    #[repr(C)]
    pub struct GpioHandleRequest {
        pub line_offsets: [u32; GPIOHANDLES_MAX],
        pub flags: u32,
        pub default_values: [u8; GPIOHANDLES_MAX],
        pub consumer_label: [u8; 32],
        pub lines: u32,
        pub fd: libc::c_int,
    }

    #[repr(C)]
    pub struct GpioHandleData {
        pub values: [u8; GPIOHANDLES_MAX],
    }

    const_assert_eq!(std::mem::size_of::<GpioHandleRequest>(), 364);
    const_assert_eq!(std::mem::size_of::<GpioHandleData>(), 64);

    nix::ioctl_readwrite!(get_linehandle, 0xB4, 0x03, GpioHandleRequest);
    nix::ioctl_readwrite!(set_line_values, 0xB4, 0x09, GpioHandleData);
}

use abi::{GPIOHANDLE_REQUEST_OUTPUT, GPIOHANDLES_MAX, GpioHandleData, GpioHandleRequest};

/// Consumer label shown by `gpioinfo`.
const CONSUMER: &[u8] = b"rover";

/// Output driver over one GPIO character device.
#[derive(Debug)]
pub struct GpioChipOutput {
    chip: File,
    handles: RwLock<HashMap<u32, OwnedFd>>,
}

impl GpioChipOutput {
    /// Open `/dev/gpiochip{index}`.
    pub fn open(index: u32) -> Result<Self, GpioError> {
        let path = PathBuf::from(format!("/dev/gpiochip{index}"));
        let chip = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| GpioError::ChipOpen {
                chip: index,
                reason: e.to_string(),
            })?;
        info!("Opened GPIO controller {}", path.display());
        Ok(Self {
            chip,
            handles: RwLock::new(HashMap::new()),
        })
    }

    fn request_handle(&self, line: u32, initial: Level) -> Result<OwnedFd, GpioError> {
        let mut request = GpioHandleRequest {
            line_offsets: [0; GPIOHANDLES_MAX],
            flags: GPIOHANDLE_REQUEST_OUTPUT,
            default_values: [0; GPIOHANDLES_MAX],
            consumer_label: [0; 32],
            lines: 1,
            fd: -1,
        };
        request.line_offsets[0] = line;
        request.default_values[0] = u8::from(initial.is_high());
        request.consumer_label[..CONSUMER.len()].copy_from_slice(CONSUMER);

        unsafe { abi::get_linehandle(self.chip.as_raw_fd(), &mut request) }.map_err(|e| {
            GpioError::Claim {
                line,
                reason: e.to_string(),
            }
        })?;
        if request.fd < 0 {
            return Err(GpioError::Claim {
                line,
                reason: "kernel returned no line handle".to_string(),
            });
        }
        // The kernel hands ownership of the new fd to us.
        Ok(unsafe { OwnedFd::from_raw_fd(request.fd) })
    }
}

impl DigitalOutput for GpioChipOutput {
    fn name(&self) -> &'static str {
        "gpiochip"
    }

    fn claim(&self, line: u32, initial: Level) -> Result<(), GpioError> {
        let mut handles = self.handles.write().map_err(|_| GpioError::Poisoned)?;
        if handles.contains_key(&line) {
            drop(handles);
            return self.write(line, initial);
        }
        let fd = self.request_handle(line, initial)?;
        handles.insert(line, fd);
        debug!(line, ?initial, "claimed GPIO line");
        Ok(())
    }

    fn write(&self, line: u32, level: Level) -> Result<(), GpioError> {
        let handles = self.handles.read().map_err(|_| GpioError::Poisoned)?;
        let fd = handles.get(&line).ok_or(GpioError::UnclaimedLine(line))?;

        let mut data = GpioHandleData {
            values: [0; GPIOHANDLES_MAX],
        };
        data.values[0] = u8::from(level.is_high());

        unsafe { abi::set_line_values(fd.as_raw_fd(), &mut data) }.map_err(|e| {
            GpioError::Write {
                line,
                reason: e.to_string(),
            }
        })?;
        Ok(())
    }
}

/// Factory function to create a gpiochip driver instance.
pub fn create_driver(config: &GpioConfig) -> Result<Arc<dyn DigitalOutput>, GpioError> {
    Ok(Arc::new(GpioChipOutput::open(config.chip)?))
}

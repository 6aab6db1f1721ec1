//! Input fusion layer.
//!
//! Two producers write the same [`InputAxisVector`]:
//! - [`joystick`] - local joystick character device
//! - [`network`] - UDP JSON control stream with staleness watchdog
//!
//! Slots are independent atomics. The last writer of a slot wins; readers
//! may see a mix of both producers across slots.

pub mod joystick;
pub mod network;

use crate::error::ControlError;
use joystick::JoystickWorker;
use network::NetworkWorker;
use rover_common::config::InputConfig;
use rover_common::consts::INPUT_AXIS_SLOTS;
use rover_common::shutdown::ShutdownToken;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicI16, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};

/// Latest raw value of each input axis, in joystick units.
#[derive(Debug, Default)]
pub struct InputAxisVector {
    slots: [AtomicI16; INPUT_AXIS_SLOTS],
}

impl InputAxisVector {
    /// All slots zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of slot `index`; 0 for an index outside the vector.
    #[inline]
    pub fn get(&self, index: usize) -> i16 {
        self.slots
            .get(index)
            .map_or(0, |slot| slot.load(Ordering::Relaxed))
    }

    /// Store `value` in slot `index`. Returns `false` if there is no such
    /// slot.
    #[inline]
    pub fn set(&self, index: usize, value: i16) -> bool {
        match self.slots.get(index) {
            Some(slot) => {
                slot.store(value, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Return every slot to neutral.
    pub fn zero_all(&self) {
        for slot in &self.slots {
            slot.store(0, Ordering::Relaxed);
        }
    }

    /// Copy of all slots.
    pub fn snapshot(&self) -> [i16; INPUT_AXIS_SLOTS] {
        std::array::from_fn(|i| self.slots[i].load(Ordering::Relaxed))
    }
}

/// Owns the two input worker threads.
pub struct InputManager {
    axes: Arc<InputAxisVector>,
    shutdown: ShutdownToken,
    network_addr: Option<SocketAddr>,
    workers: Vec<(&'static str, JoinHandle<()>)>,
}

impl InputManager {
    /// Start the joystick worker and, if its port can be bound, the network
    /// worker. A bind failure disables the network source only.
    pub fn start(config: &InputConfig, shutdown: ShutdownToken) -> Result<Self, ControlError> {
        let mut manager = Self {
            axes: Arc::new(InputAxisVector::new()),
            shutdown: shutdown.clone(),
            network_addr: None,
            workers: Vec::with_capacity(2),
        };

        let joystick = JoystickWorker::new(
            config.joystick_path.clone(),
            Arc::clone(&manager.axes),
            shutdown.clone(),
        );
        manager.spawn("joystick", move || joystick.run())?;

        match NetworkWorker::bind(config, Arc::clone(&manager.axes), shutdown) {
            Ok(network) => {
                manager.network_addr = Some(network.local_addr());
                manager.spawn("network", move || network.run())?;
            }
            Err(e) => {
                warn!(
                    "Network control disabled: cannot bind UDP port {}: {e}",
                    config.udp_port
                );
            }
        }

        info!("Input workers started ({} active)", manager.workers.len());
        Ok(manager)
    }

    fn spawn(
        &mut self,
        name: &'static str,
        body: impl FnOnce() + Send + 'static,
    ) -> Result<(), ControlError> {
        let handle = thread::Builder::new()
            .name(format!("input-{name}"))
            .spawn(body)
            .map_err(|e| ControlError::Spawn {
                worker: name,
                reason: e.to_string(),
            })?;
        self.workers.push((name, handle));
        Ok(())
    }

    /// Axis vector written by the workers.
    pub fn axes(&self) -> Arc<InputAxisVector> {
        Arc::clone(&self.axes)
    }

    /// Address the network worker listens on, if it is running.
    pub fn network_addr(&self) -> Option<SocketAddr> {
        self.network_addr
    }

    /// Request shutdown and join both workers. Idempotent.
    pub fn stop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.shutdown.request();
        for (name, handle) in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("{name} worker panicked");
            }
        }
        info!("Input workers stopped");
    }
}

impl Drop for InputManager {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_slot_is_rejected() {
        let axes = InputAxisVector::new();
        assert!(!axes.set(INPUT_AXIS_SLOTS, 5));
        assert_eq!(axes.get(INPUT_AXIS_SLOTS), 0);
    }

    #[test]
    fn zero_all_clears_every_slot() {
        let axes = InputAxisVector::new();
        for i in 0..INPUT_AXIS_SLOTS {
            axes.set(i, (i as i16 + 1) * 100);
        }
        assert_eq!(axes.get(4), 500);
        axes.zero_all();
        assert_eq!(axes.snapshot(), [0; INPUT_AXIS_SLOTS]);
    }
}

//! Real-time scheduling helpers.
//!
//! With the `rt` feature enabled these lock process memory and move the
//! calling thread to `SCHED_FIFO`. Without it every call is a no-op, so
//! development builds run unprivileged.

use crate::error::EngineError;

/// Lock all current and future pages of the process into RAM.
///
/// No-op when the `rt` feature is not enabled.
#[cfg(feature = "rt")]
pub fn lock_memory() -> Result<(), EngineError> {
    use nix::sys::mman::{MlockallFlags, mlockall};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| EngineError::RtSetup(format!("mlockall failed: {e}")))
}

#[cfg(not(feature = "rt"))]
pub fn lock_memory() -> Result<(), EngineError> {
    Ok(()) // No-op in development builds
}

/// Move the calling thread to `SCHED_FIFO` at `priority`.
///
/// A priority of 0 leaves the scheduling policy untouched.
/// No-op when the `rt` feature is not enabled.
#[cfg(feature = "rt")]
pub fn set_thread_priority(priority: i32) -> Result<(), EngineError> {
    if priority == 0 {
        return Ok(());
    }
    let param = libc::sched_param {
        sched_priority: priority,
    };
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(EngineError::RtSetup(format!(
            "sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"
        )));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
pub fn set_thread_priority(_priority: i32) -> Result<(), EngineError> {
    Ok(()) // No-op in development builds
}

/// `true` if the calling thread already runs under a real-time policy.
pub fn is_realtime() -> bool {
    #[cfg(target_os = "linux")]
    {
        let policy = unsafe { libc::sched_getscheduler(0) };
        policy == libc::SCHED_FIFO || policy == libc::SCHED_RR
    }
    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}

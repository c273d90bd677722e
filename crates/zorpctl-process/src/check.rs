//! Process existence checking and liveness.
//!
//! A non-destructive `kill(pid, 0)` probes the process table without
//! delivering a signal. EPERM still means the process exists, we just may
//! not signal it.

use crate::pidfile::PidRegistry;
use zorpctl_common::{CommandResult, ControlError, ControlResult};

/// Check whether a process with the given pid exists in the process table.
pub fn process_exists(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid as i32), None) {
        Ok(_) => true,
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

/// Determines whether an instance's recorded pid corresponds to a live
/// process.
///
/// Stale pid files are never deleted here; a dead pid is reported, the
/// file stays in place.
#[derive(Debug, Clone)]
pub struct LivenessChecker {
    registry: PidRegistry,
}

impl LivenessChecker {
    pub fn new(registry: PidRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PidRegistry {
        &self.registry
    }

    /// Liveness as a result: the live pid on success, otherwise the exact
    /// failure kind (not running / permission denied / stale pid file).
    pub fn check(&self, process_name: &str) -> ControlResult<u32> {
        let pid = self.registry.read_pid(process_name)?;
        if process_exists(pid) {
            Ok(pid)
        } else {
            Err(ControlError::InvalidPid { pid })
        }
    }

    /// Liveness as a command result: `Success("Running")` or the mapped
    /// failure message.
    pub fn is_running(&self, process_name: &str) -> CommandResult {
        match self.check(process_name) {
            Ok(_) => CommandResult::success("Running"),
            Err(err) => err.into(),
        }
    }
}

//! Process termination primitives.

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use zorpctl_common::{ControlError, ControlResult};

/// Deliver a signal to a process. Failure carries the OS error text.
pub fn send_signal(pid: u32, signal: Signal) -> ControlResult<()> {
    kill(Pid::from_raw(pid as i32), signal)
        .map_err(|e| ControlError::SignalDelivery(e.to_string()))
}

/// Terminate a process gracefully (SIGTERM).
pub fn terminate_gracefully(pid: u32) -> ControlResult<()> {
    send_signal(pid, Signal::SIGTERM)
}

/// Force kill a process (SIGKILL).
pub fn force_kill(pid: u32) -> ControlResult<()> {
    send_signal(pid, Signal::SIGKILL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_to_dead_pid_carries_os_error() {
        let result = send_signal(999_999_999, Signal::SIGTERM);
        match result {
            Err(ControlError::SignalDelivery(msg)) => assert!(!msg.is_empty()),
            other => panic!("expected SignalDelivery error, got {:?}", other),
        }
    }
}

//! The stop algorithm.
//!
//! Delivers SIGTERM (or SIGKILL under force), then polls liveness within a
//! bounded budget. Stopping an already-stopped instance is a no-op
//! success. Under force the pid file is removed immediately after
//! signaling, whether or not the process has exited yet.

use nix::sys::signal::Signal;
use tracing::warn;
use zorpctl_common::{CommandResult, ControlError, ControlResult, Instance};
use zorpctl_process::send_signal;

use crate::handler::{CommandHandler, ProcessContext};

/// Seam for signal delivery, so tests can observe (or forbid) deliveries.
pub trait SignalDelivery {
    fn deliver(&self, pid: u32, signal: Signal) -> ControlResult<()>;
}

/// Delivers signals through the OS.
pub struct OsSignalDelivery;

impl SignalDelivery for OsSignalDelivery {
    fn deliver(&self, pid: u32, signal: Signal) -> ControlResult<()> {
        send_signal(pid, signal)
    }
}

/// Stop one instance process.
pub struct StopAlgorithm<'a> {
    ctx: &'a ProcessContext<'a>,
    force: bool,
    signals: Box<dyn SignalDelivery>,
}

impl<'a> StopAlgorithm<'a> {
    pub fn new(ctx: &'a ProcessContext<'a>) -> Self {
        Self {
            ctx,
            force: false,
            signals: Box::new(OsSignalDelivery),
        }
    }

    /// Kill instead of terminate, and drop the pid file immediately.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_signal_delivery(mut self, signals: Box<dyn SignalDelivery>) -> Self {
        self.signals = signals;
        self
    }

    fn kill_process(&self, process_name: &str, signal: Signal) -> ControlResult<u32> {
        let pid = self.ctx.registry.read_pid(process_name)?;
        self.signals.deliver(pid, signal)?;

        if self.force {
            if let Err(err) = self.ctx.registry.remove_pid(process_name) {
                warn!(process = process_name, error = %err, "pid file removal failed");
            }
        }
        Ok(pid)
    }

    fn wait_until_stopped(&self, process_name: &str) -> bool {
        for _ in 0..self.ctx.config.stop_check_timeout {
            if self.ctx.liveness.check(process_name).is_err() {
                return true;
            }
            std::thread::sleep(self.ctx.check_delay());
        }
        self.ctx.liveness.check(process_name).is_err()
    }

    fn stop(&self, instance: &Instance) -> CommandResult {
        let process_name = instance.process_name();
        let signal = if self.force {
            Signal::SIGKILL
        } else {
            Signal::SIGTERM
        };

        let pid = match self.kill_process(&process_name, signal) {
            Ok(pid) => pid,
            Err(err) => return err.into(),
        };

        if self.wait_until_stopped(&process_name) {
            CommandResult::success("Stopped")
        } else {
            ControlError::StopTimeout {
                pid,
                signal: signal as i32,
                timeout: self.ctx.config.stop_check_timeout,
            }
            .into()
        }
    }
}

impl CommandHandler for StopAlgorithm<'_> {
    fn execute(&mut self, instance: &Instance) -> CommandResult {
        // Stopping an instance that is not running is a success, not an
        // error; the liveness message is carried through.
        if let Err(err) = self.ctx.liveness.check(&instance.process_name()) {
            return CommandResult::success(err.to_string());
        }

        self.stop(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZorpctlConfig;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::tempdir;
    use zorpctl_szig::mock::{MockSzigFactory, MockState};

    struct RecordingSignals {
        calls: Rc<RefCell<Vec<(u32, Signal)>>>,
        fail_with: Option<String>,
    }

    impl SignalDelivery for RecordingSignals {
        fn deliver(&self, pid: u32, signal: Signal) -> ControlResult<()> {
            self.calls.borrow_mut().push((pid, signal));
            match &self.fail_with {
                Some(message) => Err(ControlError::SignalDelivery(message.clone())),
                None => Ok(()),
            }
        }
    }

    fn test_config(pidfile_dir: &std::path::Path) -> ZorpctlConfig {
        ZorpctlConfig {
            pidfile_dir: pidfile_dir.display().to_string(),
            check_delay_secs: 0,
            stop_check_timeout: 3,
            ..ZorpctlConfig::default()
        }
    }

    fn test_instance() -> Instance {
        Instance {
            name: "default".to_string(),
            process_num: 0,
            number_of_processes: 1,
            auto_start: true,
            auto_restart: true,
            enable_core: false,
            zorp_args: vec![],
        }
    }

    fn recording(
        calls: &Rc<RefCell<Vec<(u32, Signal)>>>,
        fail_with: Option<&str>,
    ) -> Box<RecordingSignals> {
        Box::new(RecordingSignals {
            calls: Rc::clone(calls),
            fail_with: fail_with.map(str::to_string),
        })
    }

    #[test]
    fn test_stopping_a_stopped_instance_delivers_no_signal() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let factory = MockSzigFactory::new(MockState::default());
        let ctx = ProcessContext::new(&config, &factory);

        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut algorithm = StopAlgorithm::new(&ctx).with_signal_delivery(recording(&calls, None));

        let result = algorithm.execute(&test_instance());
        assert!(result.is_success());
        assert_eq!(result.message(), "Process not running");
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_graceful_stop_uses_sigterm_and_times_out_on_survivor() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let factory = MockSzigFactory::new(MockState::default());
        let ctx = ProcessContext::new(&config, &factory);
        // Our own pid: live, and it will not exit during the poll.
        let pid = std::process::id();
        std::fs::write(ctx.registry.pid_path("default#0"), pid.to_string()).unwrap();

        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut algorithm = StopAlgorithm::new(&ctx).with_signal_delivery(recording(&calls, None));

        let result = algorithm.execute(&test_instance());
        assert!(!result.is_success());
        assert_eq!(
            result.message(),
            format!("Did not exit in time (pid='{}', signo='15', timeout='3')", pid)
        );
        assert_eq!(calls.borrow().as_slice(), &[(pid, Signal::SIGTERM)]);
        // Graceful stop never removes the pid file itself.
        assert!(ctx.registry.pid_path("default#0").exists());
    }

    #[test]
    fn test_forced_stop_removes_pid_file_immediately() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let factory = MockSzigFactory::new(MockState::default());
        let ctx = ProcessContext::new(&config, &factory);
        let pid = std::process::id();
        std::fs::write(ctx.registry.pid_path("default#0"), pid.to_string()).unwrap();

        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut algorithm = StopAlgorithm::new(&ctx)
            .with_force(true)
            .with_signal_delivery(recording(&calls, None));

        let result = algorithm.execute(&test_instance());
        assert_eq!(calls.borrow().as_slice(), &[(pid, Signal::SIGKILL)]);
        // Pid file removed right after signaling even though the process
        // (this test) has not exited; the poll then sees "not running".
        assert!(!ctx.registry.pid_path("default#0").exists());
        assert!(result.is_success());
        assert_eq!(result.message(), "Stopped");
    }

    #[test]
    fn test_signal_failure_carries_os_error_text() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let factory = MockSzigFactory::new(MockState::default());
        let ctx = ProcessContext::new(&config, &factory);
        std::fs::write(
            ctx.registry.pid_path("default#0"),
            std::process::id().to_string(),
        )
        .unwrap();

        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut algorithm = StopAlgorithm::new(&ctx)
            .with_signal_delivery(recording(&calls, Some("No such process")));

        let result = algorithm.execute(&test_instance());
        assert!(!result.is_success());
        assert_eq!(result.message(), "No such process");
    }
}

//! The start algorithm.
//!
//! Brings one instance process to the running state: precondition checks
//! (already running, valid index, start policy), launch-command assembly,
//! spawn or systemd pass-through, then a bounded liveness poll.

use std::process::Command;

use tracing::{debug, warn};
use zorpctl_common::{CommandResult, ControlError, ControlResult, Instance};
use zorpctl_process::{execute_command, strip_quotes};

use crate::handler::{CommandHandler, ProcessContext};

/// Seam for launching the worker process; spawn failures are reported so
/// the caller can decide to swallow them.
pub trait Spawner {
    fn spawn(&self, argv: &[String]) -> ControlResult<()>;
}

/// Spawns through `std::process::Command`, detached.
pub struct ProcessSpawner;

impl Spawner for ProcessSpawner {
    fn spawn(&self, argv: &[String]) -> ControlResult<()> {
        let (executable, args) = argv
            .split_first()
            .ok_or_else(|| ControlError::validation("Empty launch command".to_string()))?;
        execute_command(executable, args)?;
        Ok(())
    }
}

/// Seam for the alternate systemd strategy.
pub trait UnitControl {
    /// Whether the unit is currently active.
    fn is_active(&self, unit: &str) -> bool;

    /// Start the unit; invocation failure is reported via exit status.
    fn start(&self, unit: &str) -> ControlResult<()>;
}

/// Shells out to `systemctl`.
pub struct SystemctlUnitControl;

const SYSTEMCTL: &str = "/bin/systemctl";

impl UnitControl for SystemctlUnitControl {
    fn is_active(&self, unit: &str) -> bool {
        Command::new(SYSTEMCTL)
            .args(["is-active", "--quiet", unit])
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }

    fn start(&self, unit: &str) -> ControlResult<()> {
        let status = Command::new(SYSTEMCTL)
            .args(["start", unit])
            .status()
            .map_err(|_| ControlError::UnitInvocation {
                unit: unit.to_string(),
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(ControlError::UnitInvocation {
                unit: unit.to_string(),
            })
        }
    }
}

/// Start one instance process.
pub struct StartAlgorithm<'a> {
    ctx: &'a ProcessContext<'a>,
    force: bool,
    use_systemd: bool,
    spawner: Box<dyn Spawner>,
    units: Box<dyn UnitControl>,
}

impl<'a> StartAlgorithm<'a> {
    pub fn new(ctx: &'a ProcessContext<'a>) -> Self {
        Self {
            ctx,
            force: false,
            use_systemd: ctx.config.use_systemd,
            spawner: Box::new(ProcessSpawner),
            units: Box::new(SystemctlUnitControl),
        }
    }

    /// Override the no-auto-start policy.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_spawner(mut self, spawner: Box<dyn Spawner>) -> Self {
        self.spawner = spawner;
        self
    }

    pub fn with_unit_control(mut self, units: Box<dyn UnitControl>) -> Self {
        self.units = units;
        self
    }

    fn precondition(&self, instance: &Instance) -> Option<CommandResult> {
        if self.use_systemd {
            let unit = self.ctx.config.systemd_unit(&instance.name);
            if self.units.is_active(&unit) {
                return Some(CommandResult::success("Running"));
            }
        } else if self
            .ctx
            .liveness
            .is_running(&instance.process_name())
            .is_success()
        {
            return Some(CommandResult::success("Process is already running"));
        }

        if let Err(err) = self.validate(instance) {
            return Some(err.into());
        }
        None
    }

    fn validate(&self, instance: &Instance) -> ControlResult<()> {
        if instance.process_num >= instance.number_of_processes {
            return Err(ControlError::validation(format!(
                "Number {} must be between [0..{})",
                instance.process_num, instance.number_of_processes
            )));
        }
        if !instance.auto_start && !self.force {
            return Err(ControlError::validation(
                "Not started, because no-auto-start is set".to_string(),
            ));
        }
        Ok(())
    }

    /// Launch command: executable, identity, extra args, master/slave
    /// flag, process name, plus conditional core/background flags; one
    /// layer of matching quotes stripped per token.
    fn assemble_command(&self, instance: &Instance) -> Vec<String> {
        let mut command = vec![
            self.ctx.config.zorp_executable(),
            "--as".to_string(),
            instance.name.clone(),
        ];
        command.extend(instance.zorp_args.iter().cloned());
        command.push(if instance.process_num > 0 {
            "--slave".to_string()
        } else {
            "--master".to_string()
        });
        command.push(instance.process_name());

        if instance.enable_core {
            command.push("--enable-core".to_string());
        }
        if !instance.auto_restart {
            command.push("--process-mode".to_string());
            command.push("background".to_string());
        }

        command
            .iter()
            .map(|token| strip_quotes(token).to_string())
            .collect()
    }

    fn wait_until_running(&self, process_name: &str) -> bool {
        for _ in 0..self.ctx.config.start_check_timeout {
            if self.ctx.liveness.check(process_name).is_ok() {
                return true;
            }
            std::thread::sleep(self.ctx.check_delay());
        }
        self.ctx.liveness.check(process_name).is_ok()
    }

    fn start(&self, instance: &Instance) -> CommandResult {
        let argv = self.assemble_command(instance);
        debug!(command = ?argv, "spawning instance process");

        // Spawn failures are swallowed; the poll below reports the
        // timeout.
        if let Err(err) = self.spawner.spawn(&argv) {
            warn!(instance = %instance.process_name(), error = %err, "spawn failed");
        }

        if self.wait_until_running(&instance.process_name()) {
            self.ctx.liveness.is_running(&instance.process_name())
        } else {
            ControlError::StartTimeout.into()
        }
    }

    fn start_with_systemd(&self, instance: &Instance) -> CommandResult {
        let unit = self.ctx.config.systemd_unit(&instance.name);
        if let Err(err) = self.units.start(&unit) {
            return err.into();
        }

        let running = self.ctx.liveness.is_running(&instance.process_name());
        if running.is_success() {
            running
        } else {
            CommandResult::failure("Failed to start")
        }
    }
}

impl CommandHandler for StartAlgorithm<'_> {
    fn execute(&mut self, instance: &Instance) -> CommandResult {
        if let Some(short_circuit) = self.precondition(instance) {
            return short_circuit;
        }

        if self.use_systemd {
            self.start_with_systemd(instance)
        } else {
            self.start(instance)
        }
    }
}

//! Runtime tunables: log verbosity and deadlock detection.
//!
//! Log verbosity is bounded to `[0, 10]`. Attempting to set, increment or
//! decrement past a bound is reported as an out-of-range failure, never
//! silently clamped.

use zorpctl_common::{CommandResult, ControlError, ControlResult, Instance};
use zorpctl_szig::SzigChannel;

use crate::handler::{channel_error, CommandHandler, ProcessContext};

const LOG_LEVEL_MIN: i64 = 0;
const LOG_LEVEL_MAX: i64 = 10;

/// What to do with the log verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevelMode {
    Get,
    Set(i64),
    Increment,
    Decrement,
}

/// Read or adjust the log verbosity of one instance process.
pub struct LogLevelAlgorithm<'a> {
    ctx: &'a ProcessContext<'a>,
    mode: LogLevelMode,
}

impl<'a> LogLevelAlgorithm<'a> {
    pub fn new(ctx: &'a ProcessContext<'a>, mode: LogLevelMode) -> Self {
        Self { ctx, mode }
    }

    fn get_level(&self, channel: &mut dyn SzigChannel) -> ControlResult<CommandResult> {
        let level = channel.log_level().map_err(channel_error)?;
        let logspec = channel.log_spec().map_err(channel_error)?;
        Ok(CommandResult::success_with(
            format!("verbose_level={}, logspec='{}'", level, logspec),
            serde_json::json!(level),
        ))
    }

    fn set_level(&self, channel: &mut dyn SzigChannel, level: i64) -> ControlResult<CommandResult> {
        channel.set_log_level(level).map_err(channel_error)?;
        Ok(CommandResult::success(format!("New verbose_level={}", level)))
    }

    fn run(&self, channel: &mut dyn SzigChannel) -> ControlResult<CommandResult> {
        match self.mode {
            LogLevelMode::Get => self.get_level(channel),
            LogLevelMode::Set(value) if (LOG_LEVEL_MIN..=LOG_LEVEL_MAX).contains(&value) => {
                self.set_level(channel, value)
            }
            LogLevelMode::Increment => {
                let current = channel.log_level().map_err(channel_error)?;
                if current < LOG_LEVEL_MAX {
                    self.set_level(channel, current + 1)
                } else {
                    Err(ControlError::OutOfRange)
                }
            }
            LogLevelMode::Decrement => {
                let current = channel.log_level().map_err(channel_error)?;
                if current > LOG_LEVEL_MIN {
                    self.set_level(channel, current - 1)
                } else {
                    Err(ControlError::OutOfRange)
                }
            }
            LogLevelMode::Set(_) => Err(ControlError::OutOfRange),
        }
    }
}

impl CommandHandler for LogLevelAlgorithm<'_> {
    fn execute(&mut self, instance: &Instance) -> CommandResult {
        let process_name = instance.process_name();

        if let Err(err) = self.ctx.liveness.check(&process_name) {
            return err.into();
        }
        let mut channel = match self.ctx.open_channel(&process_name) {
            Ok(channel) => channel,
            Err(failure) => return failure,
        };

        match self.run(channel.as_mut()) {
            Ok(result) => result,
            Err(err) => err.into(),
        }
    }
}

/// Read or toggle deadlock detection of one instance process.
pub struct DeadlockCheckAlgorithm<'a> {
    ctx: &'a ProcessContext<'a>,
    value: Option<bool>,
}

impl<'a> DeadlockCheckAlgorithm<'a> {
    /// `value: None` reads the flag, `Some(_)` writes it first.
    pub fn new(ctx: &'a ProcessContext<'a>, value: Option<bool>) -> Self {
        Self { ctx, value }
    }

    fn run(&self, channel: &mut dyn SzigChannel) -> ControlResult<CommandResult> {
        if let Some(value) = self.value {
            channel.set_deadlock_check(value).map_err(channel_error)?;
        }
        let current = channel.deadlock_check().map_err(channel_error)?;
        Ok(CommandResult::success(format!("Deadlockcheck={}", current)))
    }
}

impl CommandHandler for DeadlockCheckAlgorithm<'_> {
    fn execute(&mut self, instance: &Instance) -> CommandResult {
        let process_name = instance.process_name();

        if let Err(err) = self.ctx.liveness.check(&process_name) {
            return err.into();
        }
        let mut channel = match self.ctx.open_channel(&process_name) {
            Ok(channel) => channel,
            Err(failure) => return failure,
        };

        match self.run(channel.as_mut()) {
            Ok(result) => result,
            Err(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZorpctlConfig;
    use tempfile::tempdir;
    use zorpctl_szig::mock::{MockSzigFactory, MockState};

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

    fn running_context<'a>(
        config: &'a ZorpctlConfig,
        factory: &'a MockSzigFactory,
    ) -> ProcessContext<'a> {
        let ctx = ProcessContext::new(config, factory);
        std::fs::write(
            ctx.registry.pid_path("default#0"),
            std::process::id().to_string(),
        )
        .unwrap();
        ctx
    }

    fn config_in(dir: &std::path::Path) -> ZorpctlConfig {
        ZorpctlConfig {
            pidfile_dir: dir.display().to_string(),
            ..ZorpctlConfig::default()
        }
    }

    #[test]
    fn test_get_reports_level_and_logspec() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let mut state = MockState::default();
        state.log_level = 6;
        state.log_spec = "core.accounting:5".to_string();
        let factory = MockSzigFactory::new(state);
        let ctx = running_context(&config, &factory);

        let result = LogLevelAlgorithm::new(&ctx, LogLevelMode::Get).execute(&test_instance());
        assert!(result.is_success());
        assert_eq!(
            result.message(),
            "verbose_level=6, logspec='core.accounting:5'"
        );
        assert_eq!(result.value(), Some(&serde_json::json!(6)));
    }

    #[test]
    fn test_set_out_of_range_issues_no_write() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let factory = MockSzigFactory::new(MockState::default());
        let ctx = running_context(&config, &factory);

        let result =
            LogLevelAlgorithm::new(&ctx, LogLevelMode::Set(15)).execute(&test_instance());
        assert!(!result.is_success());
        assert_eq!(result.message(), "Log level is out of range");
        assert_eq!(factory.state().borrow().calls_matching("set_log_level"), 0);
    }

    #[test]
    fn test_set_within_range() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let factory = MockSzigFactory::new(MockState::default());
        let ctx = running_context(&config, &factory);

        let result =
            LogLevelAlgorithm::new(&ctx, LogLevelMode::Set(7)).execute(&test_instance());
        assert!(result.is_success());
        assert_eq!(result.message(), "New verbose_level=7");
        assert_eq!(factory.state().borrow().log_level, 7);
    }

    #[test]
    fn test_decrement_at_floor_is_out_of_range() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let factory = MockSzigFactory::new(MockState::default());
        let ctx = running_context(&config, &factory);

        LogLevelAlgorithm::new(&ctx, LogLevelMode::Set(0)).execute(&test_instance());
        let result =
            LogLevelAlgorithm::new(&ctx, LogLevelMode::Decrement).execute(&test_instance());
        assert!(!result.is_success());
        assert_eq!(result.message(), "Log level is out of range");
        assert_eq!(factory.state().borrow().log_level, 0);
    }

    #[test]
    fn test_increment_at_ceiling_is_out_of_range() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let factory = MockSzigFactory::new(MockState::default());
        let ctx = running_context(&config, &factory);

        LogLevelAlgorithm::new(&ctx, LogLevelMode::Set(10)).execute(&test_instance());
        let result =
            LogLevelAlgorithm::new(&ctx, LogLevelMode::Increment).execute(&test_instance());
        assert!(!result.is_success());
        assert_eq!(result.message(), "Log level is out of range");
        assert_eq!(factory.state().borrow().log_level, 10);
    }

    #[test]
    fn test_increment_within_range() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let mut state = MockState::default();
        state.log_level = 3;
        let factory = MockSzigFactory::new(state);
        let ctx = running_context(&config, &factory);

        let result =
            LogLevelAlgorithm::new(&ctx, LogLevelMode::Increment).execute(&test_instance());
        assert!(result.is_success());
        assert_eq!(result.message(), "New verbose_level=4");
    }

    #[test]
    fn test_deadlock_check_get_and_set() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let factory = MockSzigFactory::new(MockState::default());
        let ctx = running_context(&config, &factory);

        let result = DeadlockCheckAlgorithm::new(&ctx, None).execute(&test_instance());
        assert_eq!(result.message(), "Deadlockcheck=false");

        let result = DeadlockCheckAlgorithm::new(&ctx, Some(true)).execute(&test_instance());
        assert_eq!(result.message(), "Deadlockcheck=true");
        assert!(factory.state().borrow().deadlock_check);
    }

    #[test]
    fn test_tunables_require_liveness() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let factory = MockSzigFactory::new(MockState::default());
        let ctx = ProcessContext::new(&config, &factory);

        let result = LogLevelAlgorithm::new(&ctx, LogLevelMode::Get).execute(&test_instance());
        assert_eq!(result.message(), "Process not running");
        let result = DeadlockCheckAlgorithm::new(&ctx, None).execute(&test_instance());
        assert_eq!(result.message(), "Process not running");
    }
}

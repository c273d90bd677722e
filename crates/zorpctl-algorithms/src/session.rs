//! Session control: authorize pending sessions and terminate live ones.

use zorpctl_common::{CommandResult, Instance};

use crate::handler::{channel_error, CommandHandler, ProcessContext};

/// Accept or reject a pending session on one instance process.
pub struct AuthorizeAlgorithm<'a> {
    ctx: &'a ProcessContext<'a>,
    accept: bool,
    session_id: String,
    description: String,
}

impl<'a> AuthorizeAlgorithm<'a> {
    pub fn new(
        ctx: &'a ProcessContext<'a>,
        accept: bool,
        session_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            ctx,
            accept,
            session_id: session_id.into(),
            description: description.into(),
        }
    }
}

impl CommandHandler for AuthorizeAlgorithm<'_> {
    fn execute(&mut self, instance: &Instance) -> CommandResult {
        let process_name = instance.process_name();

        if let Err(err) = self.ctx.liveness.check(&process_name) {
            return err.into();
        }
        let mut channel = match self.ctx.open_channel(&process_name) {
            Ok(channel) => channel,
            Err(failure) => return failure,
        };

        match channel.authorize(&self.session_id, self.accept, &self.description) {
            Ok(response) => CommandResult::success(response),
            Err(err) => channel_error(err).into(),
        }
    }
}

/// Terminate a session on one instance process.
pub struct StopSessionAlgorithm<'a> {
    ctx: &'a ProcessContext<'a>,
    session_id: String,
}

impl<'a> StopSessionAlgorithm<'a> {
    pub fn new(ctx: &'a ProcessContext<'a>, session_id: impl Into<String>) -> Self {
        Self {
            ctx,
            session_id: session_id.into(),
        }
    }
}

impl CommandHandler for StopSessionAlgorithm<'_> {
    fn execute(&mut self, instance: &Instance) -> CommandResult {
        let process_name = instance.process_name();

        if let Err(err) = self.ctx.liveness.check(&process_name) {
            return err.into();
        }
        let mut channel = match self.ctx.open_channel(&process_name) {
            Ok(channel) => channel,
            Err(failure) => return failure,
        };

        match channel.stop_session(&self.session_id) {
            Ok(response) => CommandResult::success(response),
            Err(err) => channel_error(err).into(),
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

    fn config_in(dir: &std::path::Path) -> ZorpctlConfig {
        ZorpctlConfig {
            pidfile_dir: dir.display().to_string(),
            ..ZorpctlConfig::default()
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

    #[test]
    fn test_authorize_accepts_a_session() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let factory = MockSzigFactory::new(MockState::default());
        let ctx = running_context(&config, &factory);

        let result = AuthorizeAlgorithm::new(&ctx, true, "svc/http:12", "allowed by admin")
            .execute(&test_instance());
        assert!(result.is_success());
        assert_eq!(result.message(), "Session svc/http:12 accepted");
        assert_eq!(
            factory
                .state()
                .borrow()
                .calls_matching("authorize(svc/http:12, true"),
            1
        );
    }

    #[test]
    fn test_authorize_rejects_a_session() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let factory = MockSzigFactory::new(MockState::default());
        let ctx = running_context(&config, &factory);

        let result = AuthorizeAlgorithm::new(&ctx, false, "svc/http:12", "blocked")
            .execute(&test_instance());
        assert!(result.is_success());
        assert_eq!(result.message(), "Session svc/http:12 rejected");
    }

    #[test]
    fn test_stop_session_reports_the_channel_response() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let factory = MockSzigFactory::new(MockState::default());
        let ctx = running_context(&config, &factory);

        let result = StopSessionAlgorithm::new(&ctx, "svc/http:12").execute(&test_instance());
        assert!(result.is_success());
        assert_eq!(result.message(), "Session svc/http:12 stopped");
    }

    #[test]
    fn test_session_control_requires_liveness() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let factory = MockSzigFactory::new(MockState::default());
        let ctx = ProcessContext::new(&config, &factory);

        let result =
            AuthorizeAlgorithm::new(&ctx, true, "svc/http:12", "").execute(&test_instance());
        assert!(!result.is_success());
        assert_eq!(result.message(), "Process not running");

        let result = StopSessionAlgorithm::new(&ctx, "svc/http:12").execute(&test_instance());
        assert!(!result.is_success());
        assert_eq!(result.message(), "Process not running");
    }

    #[test]
    fn test_channel_failures_are_reported() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let mut state = MockState::default();
        state.fail = Some("connection reset".to_string());
        let factory = MockSzigFactory::new(state);
        let ctx = running_context(&config, &factory);

        let result = StopSessionAlgorithm::new(&ctx, "svc/http:12").execute(&test_instance());
        assert!(!result.is_success());
        assert_eq!(
            result.message(),
            "Error while communicating through szig: connection reset"
        );
    }
}

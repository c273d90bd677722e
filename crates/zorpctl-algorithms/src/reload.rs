//! The reload algorithm.
//!
//! Triggers a policy reload through the stats channel, then queries the
//! boolean reload result. A not-running instance is nothing to reload and
//! reports success. Failures carry the instance's process name so a
//! caller driving several instances can tell them apart.

use zorpctl_common::{CommandResult, ControlResult, Instance};
use zorpctl_szig::SzigChannel;

use crate::handler::{channel_error, CommandHandler, ProcessContext};

/// Reload one instance process's policy.
pub struct ReloadAlgorithm<'a> {
    ctx: &'a ProcessContext<'a>,
}

impl<'a> ReloadAlgorithm<'a> {
    pub fn new(ctx: &'a ProcessContext<'a>) -> Self {
        Self { ctx }
    }

    fn reload(&self, channel: &mut dyn SzigChannel) -> ControlResult<bool> {
        channel.reload().map_err(channel_error)?;
        channel.reload_result().map_err(channel_error)
    }
}

impl CommandHandler for ReloadAlgorithm<'_> {
    fn execute(&mut self, instance: &Instance) -> CommandResult {
        let process_name = instance.process_name();

        if let Err(err) = self.ctx.liveness.check(&process_name) {
            // Nothing to reload.
            return CommandResult::success(err.to_string());
        }

        let mut channel = match self.ctx.open_channel(&process_name) {
            Ok(channel) => channel,
            Err(failure) => return failure.with_detail(process_name),
        };

        match self.reload(channel.as_mut()) {
            Ok(true) => CommandResult::success("Reload successful"),
            Ok(false) => CommandResult::failure("Reload failed").with_detail(process_name),
            Err(err) => CommandResult::from(err).with_detail(process_name),
        }
    }
}

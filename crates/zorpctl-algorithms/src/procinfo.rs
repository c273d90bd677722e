//! The proc-info algorithm: the raw 39-field process-accounting record of
//! a live instance, keyed by field name.

use zorpctl_common::{CommandResult, Instance};
use zorpctl_process::ProcReader;

use crate::handler::{CommandHandler, ProcessContext};

/// Report the procfs accounting record for one instance process.
pub struct ProcInfoAlgorithm<'a> {
    ctx: &'a ProcessContext<'a>,
    proc: ProcReader,
}

impl<'a> ProcInfoAlgorithm<'a> {
    pub fn new(ctx: &'a ProcessContext<'a>) -> Self {
        Self {
            ctx,
            proc: ProcReader::default(),
        }
    }

    pub fn with_proc_reader(mut self, proc: ProcReader) -> Self {
        self.proc = proc;
        self
    }
}

impl CommandHandler for ProcInfoAlgorithm<'_> {
    fn execute(&mut self, instance: &Instance) -> CommandResult {
        let pid = match self.ctx.liveness.check(&instance.process_name()) {
            Ok(pid) => pid,
            Err(err) => return err.into(),
        };

        match self.proc.process_stat(pid) {
            Ok(info) => CommandResult::success_with(format!("proc info for pid {}", pid), info.to_json()),
            Err(err) => err.into(),
        }
    }
}

//! Status introspection: process status, GUI status and the pid report.
//!
//! Status combines the pid registry, stats-channel counters and the
//! on-disk policy file's modification time into one ephemeral snapshot.
//! GUI status is the same data flattened into a fixed nine-field record
//! where every dynamic field degrades to the literal `"missing"` when the
//! instance is not running.

use std::fmt;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use zorpctl_common::{CommandResult, ControlError, ControlResult, Instance};
use zorpctl_szig::SzigChannel;

use crate::handler::{channel_error, CommandHandler, ProcessContext};

/// Ephemeral snapshot of one running instance process.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessStatus {
    pub name: String,
    pub pid: u32,
    pub threads: u32,
    pub policy_file: String,
    /// Policy load timestamp as known to the running process.
    pub policy_file_stamp: String,
    /// Policy reload timestamp as reported by the stats channel.
    pub reload_stamp: String,
    /// Whether the reload timestamp matches the policy file's on-disk
    /// modification time (whole seconds).
    pub reloaded: bool,
    pub details: Option<String>,
}

impl ProcessStatus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pid: 0,
            threads: 0,
            policy_file: String::new(),
            policy_file_stamp: String::new(),
            reload_stamp: String::new(),
            reloaded: true,
            details: None,
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pid > 0 {
            write!(f, "running")?;
        }
        if !self.reloaded {
            write!(f, ", policy NOT reloaded")?;
        }
        if self.threads > 0 {
            write!(f, ", {} threads active", self.threads)?;
        }
        if self.pid > 0 {
            write!(f, ", pid {}", self.pid)?;
        }
        if let Some(details) = &self.details {
            write!(f, "\n{}", details)?;
        }
        Ok(())
    }
}

/// Flattened snapshot for GUI consumers. Every field is always present;
/// dynamic fields default to `"missing"`.
#[derive(Debug, Clone, Serialize)]
pub struct GuiStatus {
    pub name: String,
    pub processnum: String,
    pub running: String,
    pub pid: String,
    pub threads_running: String,
    pub thread_number: String,
    pub thread_rate_avg1: String,
    pub thread_rate_avg5: String,
    pub thread_rate_avg15: String,
}

const MISSING: &str = "missing";

impl GuiStatus {
    /// The not-running rendition: identity fields filled, every dynamic
    /// field `"missing"`.
    pub fn missing(process_name: &str) -> Self {
        Self {
            name: process_name.to_string(),
            processnum: process_name
                .rsplit('#')
                .next()
                .unwrap_or_default()
                .to_string(),
            running: MISSING.to_string(),
            pid: MISSING.to_string(),
            threads_running: MISSING.to_string(),
            thread_number: MISSING.to_string(),
            thread_rate_avg1: MISSING.to_string(),
            thread_rate_avg5: MISSING.to_string(),
            thread_rate_avg15: MISSING.to_string(),
        }
    }
}

impl fmt::Display for GuiStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\"{}\";\"{}\";\"{}\";\"{}\";\"{}\";\"{}\";\"{}\";\"{}\";\"{}\"",
            self.name,
            self.processnum,
            self.running,
            self.pid,
            self.threads_running,
            self.thread_number,
            self.thread_rate_avg1,
            self.thread_rate_avg5,
            self.thread_rate_avg15
        )
    }
}

/// Whether a channel-reported timestamp matches a file modification time,
/// comparing whole seconds as text (fractional seconds ignored).
pub fn stamp_matches_mtime(stamp: &str, mtime_epoch_secs: f64) -> bool {
    stamp == (mtime_epoch_secs.trunc() as i64).to_string()
}

fn policy_mtime_epoch(path: &str) -> ControlResult<f64> {
    let modified = std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|e| ControlError::validation(format!("Can not stat policy file {}: {}", path, e)))?;
    let since_epoch = modified
        .duration_since(UNIX_EPOCH)
        .map_err(|e| ControlError::validation(format!("Policy file mtime before epoch: {}", e)))?;
    Ok(since_epoch.as_secs_f64())
}

fn required_value(channel: &mut dyn SzigChannel, path: &str) -> ControlResult<String> {
    channel
        .get_value(path)
        .map_err(channel_error)?
        .ok_or_else(|| ControlError::channel(format!("missing value at '{}'", path)))
}

/// Assemble a [`ProcessStatus`] for a live instance over an open channel.
pub(crate) fn collect_status(
    ctx: &ProcessContext<'_>,
    channel: &mut dyn SzigChannel,
    instance: &Instance,
) -> ControlResult<ProcessStatus> {
    let process_name = instance.process_name();
    let mut status = ProcessStatus::new(&process_name);

    status.pid = ctx.registry.read_pid(&process_name)?;
    status.threads = required_value(channel, "stats.threads_running")?
        .parse()
        .unwrap_or(0);
    status.policy_file = required_value(channel, "info.policy.file")?;
    status.policy_file_stamp = required_value(channel, "info.policy.file_stamp")?;
    status.reload_stamp = required_value(channel, "info.policy.reload_stamp")?;

    let mtime = policy_mtime_epoch(&status.policy_file)?;
    status.reloaded = stamp_matches_mtime(&status.reload_stamp, mtime);

    Ok(status)
}

fn status_result(status: &ProcessStatus) -> CommandResult {
    CommandResult::success_with(
        status.to_string(),
        serde_json::to_value(status).unwrap_or_default(),
    )
}

/// Report the status of one instance process.
pub struct StatusAlgorithm<'a> {
    ctx: &'a ProcessContext<'a>,
}

impl<'a> StatusAlgorithm<'a> {
    pub fn new(ctx: &'a ProcessContext<'a>) -> Self {
        Self { ctx }
    }
}

impl CommandHandler for StatusAlgorithm<'_> {
    fn execute(&mut self, instance: &Instance) -> CommandResult {
        let process_name = instance.process_name();

        if let Err(err) = self.ctx.liveness.check(&process_name) {
            return err.into();
        }
        let mut channel = match self.ctx.open_channel(&process_name) {
            Ok(channel) => channel,
            Err(failure) => return failure,
        };

        match collect_status(self.ctx, channel.as_mut(), instance) {
            Ok(status) => status_result(&status),
            Err(err) => err.into(),
        }
    }
}

/// Report the flattened GUI status of one instance process.
pub struct GuiStatusAlgorithm<'a> {
    ctx: &'a ProcessContext<'a>,
}

impl<'a> GuiStatusAlgorithm<'a> {
    pub fn new(ctx: &'a ProcessContext<'a>) -> Self {
        Self { ctx }
    }

    fn gui_status(
        &self,
        channel: &mut dyn SzigChannel,
        process_name: &str,
    ) -> ControlResult<GuiStatus> {
        let mut status = GuiStatus::missing(process_name);
        status.pid = self.ctx.registry.read_pid(process_name)?.to_string();
        status.running = "running".to_string();
        status.threads_running = required_value(channel, "stats.threads_running")?;
        status.thread_number = required_value(channel, "stats.thread_number")?;
        status.thread_rate_avg1 = required_value(channel, "stats.thread_rate_avg1")?;
        status.thread_rate_avg5 = required_value(channel, "stats.thread_rate_avg5")?;
        status.thread_rate_avg15 = required_value(channel, "stats.thread_rate_avg15")?;
        Ok(status)
    }
}

impl CommandHandler for GuiStatusAlgorithm<'_> {
    fn execute(&mut self, instance: &Instance) -> CommandResult {
        let process_name = instance.process_name();

        if self.ctx.liveness.check(&process_name).is_err() {
            let status = GuiStatus::missing(&process_name);
            return CommandResult::success_with(
                status.to_string(),
                serde_json::to_value(&status).unwrap_or_default(),
            );
        }

        let mut channel = match self.ctx.open_channel(&process_name) {
            Ok(channel) => channel,
            Err(failure) => return failure,
        };

        match self.gui_status(channel.as_mut(), &process_name) {
            Ok(status) => CommandResult::success_with(
                status.to_string(),
                serde_json::to_value(&status).unwrap_or_default(),
            ),
            Err(err) => err.into(),
        }
    }
}

/// Report the recorded pid for one instance process, without requiring
/// liveness.
pub struct PidAlgorithm<'a> {
    ctx: &'a ProcessContext<'a>,
}

impl<'a> PidAlgorithm<'a> {
    pub fn new(ctx: &'a ProcessContext<'a>) -> Self {
        Self { ctx }
    }
}

impl CommandHandler for PidAlgorithm<'_> {
    fn execute(&mut self, instance: &Instance) -> CommandResult {
        match self.ctx.registry.read_pid(&instance.process_name()) {
            Ok(pid) => {
                CommandResult::success_with(format!("pid {}", pid), serde_json::json!(pid))
            }
            Err(err) => ControlError::from(err).into(),
        }
    }
}

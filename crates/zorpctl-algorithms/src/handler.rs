//! The uniform command-handler contract and its shared capabilities.
//!
//! Every algorithm is an independent handler over injected capabilities
//! (pid registry, liveness checker, stats-channel factory, immutable
//! configuration). A handler is scoped to one target instance per call and
//! always returns exactly one [`CommandResult`].

use std::time::Duration;

use zorpctl_common::{CommandResult, ControlError, Instance};
use zorpctl_process::{LivenessChecker, PidRegistry};
use zorpctl_szig::{SzigChannel, SzigChannelFactory, SzigError};

use crate::config::ZorpctlConfig;

/// One control-plane command against one instance.
pub trait CommandHandler {
    fn execute(&mut self, instance: &Instance) -> CommandResult;
}

/// Capabilities shared by every handler.
pub struct ProcessContext<'a> {
    pub config: &'a ZorpctlConfig,
    pub registry: PidRegistry,
    pub liveness: LivenessChecker,
    pub szig: &'a dyn SzigChannelFactory,
}

impl<'a> ProcessContext<'a> {
    pub fn new(config: &'a ZorpctlConfig, szig: &'a dyn SzigChannelFactory) -> Self {
        let registry = PidRegistry::new(&config.pidfile_dir);
        let liveness = LivenessChecker::new(registry.clone());
        Self {
            config,
            registry,
            liveness,
            szig,
        }
    }

    /// Delay between liveness polls.
    pub fn check_delay(&self) -> Duration {
        Duration::from_secs(self.config.check_delay_secs)
    }

    /// Open the stats channel for a process; failure to acquire surfaces
    /// as a plain failure result (not the channel-protocol wrapper).
    pub(crate) fn open_channel(
        &self,
        process_name: &str,
    ) -> Result<Box<dyn SzigChannel>, CommandResult> {
        self.szig
            .open(process_name)
            .map_err(|e| CommandResult::failure(e.to_string()))
    }
}

/// Normalize a protocol error on an open channel into the single
/// channel-failure message format.
pub(crate) fn channel_error(err: SzigError) -> ControlError {
    match err {
        SzigError::Protocol(message) => ControlError::channel(message),
        other => ControlError::channel(other.to_string()),
    }
}

//! Error types for the zorpctl control plane.
//!
//! Every algorithm precondition and effect failure maps to exactly one
//! variant here; the `Display` string is the user-visible one-line message.

use thiserror::Error;

/// Result type alias for control-plane operations.
pub type ControlResult<T> = std::result::Result<T, ControlError>;

/// Error taxonomy for process-control operations.
///
/// Variants carry the diagnostic context that must appear in the rendered
/// message (pid, signal and timeout for a stop timeout, the unit name for a
/// systemd invocation failure).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControlError {
    /// No pid file, or the pid file does not name a live process start.
    #[error("Process not running")]
    NotRunning,

    /// The pid file exists but cannot be read by this user.
    #[error("Permission denied")]
    PermissionDenied,

    /// The pid file could not be read or parsed.
    #[error("Can not open pid file '{path}': {reason}")]
    PidUnavailable { path: String, reason: String },

    /// The pid file names a pid with no process-table entry.
    #[error("Invalid pid file: no running process with pid {pid}")]
    InvalidPid { pid: u32 },

    /// The instance did not become live within the polling budget.
    #[error("Did not start in time")]
    StartTimeout,

    /// The instance did not exit within the polling budget.
    #[error("Did not exit in time (pid='{pid}', signo='{signal}', timeout='{timeout}')")]
    StopTimeout { pid: u32, signal: i32, timeout: u32 },

    /// Signal delivery failed; carries the OS error text.
    #[error("{0}")]
    SignalDelivery(String),

    /// A tunable value was outside its accepted range.
    #[error("Log level is out of range")]
    OutOfRange,

    /// Any stats-channel failure, normalized to a single message format.
    #[error("Error while communicating through szig: {message}")]
    Channel { message: String },

    /// systemd invocation failed for the derived unit.
    #[error("Error invoking 'systemctl start {unit}'")]
    UnitInvocation { unit: String },

    /// Bad instance index or start policy.
    #[error("{message}")]
    Validation { message: String },
}

impl ControlError {
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn pid_unavailable(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PidUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

//! Pid-file registry.
//!
//! One pid file per process, `{pidfiledir}/zorp-{process_name}.pid`,
//! containing the decimal pid with an optional trailing newline. The file
//! is written by the spawned process itself; this registry only reads and
//! removes it.
//!
//! Read failures are split into distinguishable kinds so callers never
//! have to guess whether a missing pid means "not running" or "not allowed
//! to look" (the two must surface as different failures).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use zorpctl_common::ControlError;

/// Errors raised by pid-file access.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PidFileError {
    #[error("No pid file at '{path}'")]
    NotFound { path: String },

    #[error("Permission denied reading '{path}'")]
    PermissionDenied { path: String },

    #[error("Can not open pid file '{path}': {reason}")]
    Unreadable { path: String, reason: String },

    #[error("Could not remove pid file '{path}': {reason}")]
    RemoveFailed { path: String, reason: String },
}

impl From<PidFileError> for ControlError {
    fn from(err: PidFileError) -> Self {
        match err {
            PidFileError::NotFound { .. } => ControlError::NotRunning,
            PidFileError::PermissionDenied { .. } => ControlError::PermissionDenied,
            PidFileError::Unreadable { path, reason } => {
                ControlError::pid_unavailable(path, reason)
            }
            PidFileError::RemoveFailed { path, reason } => {
                ControlError::pid_unavailable(path, reason)
            }
        }
    }
}

/// Registry of on-disk pid files, rooted at the configured pid-file
/// directory. The only persisted state owned by the control plane.
#[derive(Debug, Clone)]
pub struct PidRegistry {
    pidfile_dir: PathBuf,
}

impl PidRegistry {
    pub fn new(pidfile_dir: impl Into<PathBuf>) -> Self {
        Self {
            pidfile_dir: pidfile_dir.into(),
        }
    }

    /// Path of the pid file for one process name.
    pub fn pid_path(&self, process_name: &str) -> PathBuf {
        self.pidfile_dir.join(format!("zorp-{}.pid", process_name))
    }

    /// Read the recorded pid for a process.
    ///
    /// Absence, access denial and corruption each map to their own error
    /// kind; callers match instead of probing.
    pub fn read_pid(&self, process_name: &str) -> Result<u32, PidFileError> {
        let path = self.pid_path(process_name);
        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PidFileError::NotFound {
                path: display(&path),
            },
            ErrorKind::PermissionDenied => PidFileError::PermissionDenied {
                path: display(&path),
            },
            _ => PidFileError::Unreadable {
                path: display(&path),
                reason: e.to_string(),
            },
        })?;

        content
            .trim()
            .parse::<u32>()
            .map_err(|e| PidFileError::Unreadable {
                path: display(&path),
                reason: format!("invalid pid content: {}", e),
            })
    }

    /// Remove the pid file for a process. Missing files are a no-op.
    pub fn remove_pid(&self, process_name: &str) -> Result<(), PidFileError> {
        let path = self.pid_path(process_name);
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| PidFileError::RemoveFailed {
                path: display(&path),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

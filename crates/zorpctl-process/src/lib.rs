//! # zorpctl process
//!
//! Low-level OS process operations for the zorpctl control plane:
//! - Liveness checking against the process table
//! - Signal delivery (graceful terminate, forced kill)
//! - Process spawning
//! - Pid-file registry
//! - procfs process-accounting readers
//!
//! Everything here is Linux-only: the control plane reads procfs and
//! delivers POSIX signals.

pub mod check;
pub mod execute;
pub mod pidfile;
pub mod procfs;
pub mod terminate;

pub use check::{process_exists, LivenessChecker};
pub use execute::{execute_command, strip_quotes};
pub use pidfile::{PidFileError, PidRegistry};
pub use procfs::{ProcInfo, ProcReader};
pub use terminate::{force_kill, send_signal, terminate_gracefully};

//! # zorpctl szig
//!
//! The capability interface of the SZIG stats/control channel exposed by a
//! running Zorp instance. The wire transport is out of scope for this
//! crate; consumers depend on the [`SzigChannel`] trait and open channels
//! through a [`SzigChannelFactory`].
//!
//! [`mock`] provides a scriptable in-memory channel for tests.

pub mod mock;

use thiserror::Error;

/// Errors raised by the stats channel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SzigError {
    /// The channel could not be opened for an instance.
    #[error("Failed to connect to '{process}': {reason}")]
    Connect { process: String, reason: String },

    /// Any protocol-level failure on an open channel.
    #[error("{0}")]
    Protocol(String),
}

impl SzigError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

/// Result type alias for channel operations.
pub type SzigResult<T> = std::result::Result<T, SzigError>;

/// One open stats/control channel to a running instance.
///
/// The namespace is a child/sibling-linked tree of dotted paths; scalar
/// values live on leaves. All operations are blocking round-trips.
pub trait SzigChannel {
    /// Read a node's scalar value; `None` when the node has no value.
    fn get_value(&mut self, path: &str) -> SzigResult<Option<String>>;

    /// First child of a node; `None` on leaves and empty nodes.
    fn get_child(&mut self, path: &str) -> SzigResult<Option<String>>;

    /// Next sibling of a node; `None` when siblings are exhausted.
    fn get_sibling(&mut self, path: &str) -> SzigResult<Option<String>>;

    /// Trigger a policy reload.
    fn reload(&mut self) -> SzigResult<()>;

    /// Whether the last triggered reload succeeded.
    fn reload_result(&mut self) -> SzigResult<bool>;

    /// Current log verbosity level.
    fn log_level(&mut self) -> SzigResult<i64>;

    /// Set the log verbosity level.
    fn set_log_level(&mut self, level: i64) -> SzigResult<()>;

    /// Active log specification string.
    fn log_spec(&mut self) -> SzigResult<String>;

    /// Whether deadlock detection is enabled.
    fn deadlock_check(&mut self) -> SzigResult<bool>;

    /// Enable or disable deadlock detection.
    fn set_deadlock_check(&mut self, enabled: bool) -> SzigResult<()>;

    /// Authorize or reject a pending session.
    fn authorize(&mut self, session_id: &str, accept: bool, description: &str)
        -> SzigResult<String>;

    /// Terminate a session.
    fn stop_session(&mut self, session_id: &str) -> SzigResult<String>;
}

/// Opens a channel for one instance's process name.
pub trait SzigChannelFactory {
    fn open(&self, process_name: &str) -> SzigResult<Box<dyn SzigChannel>>;
}

/// Factory for deployments without a wired transport; every open fails
/// with a connect error naming the process.
#[derive(Debug, Default)]
pub struct NoTransportFactory;

impl SzigChannelFactory for NoTransportFactory {
    fn open(&self, process_name: &str) -> SzigResult<Box<dyn SzigChannel>> {
        Err(SzigError::Connect {
            process: process_name.to_string(),
            reason: "no szig transport configured".to_string(),
        })
    }
}

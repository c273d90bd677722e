//! # zorpctl algorithms
//!
//! The control-plane algorithms of zorpctl: process lifecycle
//! (start/stop/reload), introspection (status, detailed status, GUI
//! status, proc info, stats-tree walk) and runtime tuning (log
//! verbosity, deadlock detection, session control).
//!
//! Every algorithm implements [`CommandHandler`] over a shared
//! [`ProcessContext`] and is invoked once per target instance process.

pub mod config;
pub mod detailed;
pub mod handler;
pub mod procinfo;
pub mod reload;
pub mod session;
pub mod start;
pub mod status;
pub mod stop;
pub mod tunables;
pub mod walk;

// Re-export main types
pub use config::ZorpctlConfig;
pub use detailed::DetailedStatusAlgorithm;
pub use handler::{CommandHandler, ProcessContext};
pub use procinfo::ProcInfoAlgorithm;
pub use reload::ReloadAlgorithm;
pub use session::{AuthorizeAlgorithm, StopSessionAlgorithm};
pub use start::{ProcessSpawner, Spawner, StartAlgorithm, SystemctlUnitControl, UnitControl};
pub use status::{GuiStatusAlgorithm, PidAlgorithm, StatusAlgorithm};
pub use stop::{OsSignalDelivery, SignalDelivery, StopAlgorithm};
pub use tunables::{DeadlockCheckAlgorithm, LogLevelAlgorithm, LogLevelMode};
pub use walk::SzigWalkAlgorithm;

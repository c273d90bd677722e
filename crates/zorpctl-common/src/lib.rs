//! # zorpctl common
//!
//! Shared domain types for the zorpctl control plane:
//! - [`CommandResult`]: the tagged outcome every public command returns
//! - [`ControlError`]: the error taxonomy behind failure results
//! - [`Instance`]: the immutable description of one Zorp instance

pub mod errors;
pub mod result;
pub mod types;

pub use errors::{ControlError, ControlResult};
pub use result::CommandResult;
pub use types::Instance;

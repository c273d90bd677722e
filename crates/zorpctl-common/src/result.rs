//! The tagged outcome type returned by every public command.
//!
//! Success or failure is always explicit; callers match on the variant
//! instead of probing for attributes. The optional payload is a
//! `serde_json::Value` so structured data (the stats tree, a numeric log
//! level) travels through the same type as plain confirmations.

use crate::errors::ControlError;
use serde_json::Value;
use std::fmt;

/// Outcome of one control-plane command against one instance.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// The command took effect (or the instance was already in the desired
    /// state). `value` carries an optional structured payload.
    Success {
        message: String,
        value: Option<Value>,
    },
    /// The command did not take effect. `message` is a one-line
    /// human-readable explanation; `detail` disambiguates the failing
    /// target when a caller drives several instances.
    Failure {
        message: String,
        detail: Option<String>,
    },
}

impl CommandResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self::Success {
            message: message.into(),
            value: None,
        }
    }

    pub fn success_with(message: impl Into<String>, value: Value) -> Self {
        Self::Success {
            message: message.into(),
            value: Some(value),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
            detail: None,
        }
    }

    pub fn failure_with(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Failure {
            message: message.into(),
            detail: Some(detail.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Success { message, .. } => message,
            Self::Failure { message, .. } => message,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Success { value, .. } => value.as_ref(),
            Self::Failure { .. } => None,
        }
    }

    /// Attach a disambiguating detail to a failure; successes pass through
    /// untouched.
    pub fn with_detail(self, detail: impl Into<String>) -> Self {
        match self {
            Self::Failure { message, .. } => Self::Failure {
                message,
                detail: Some(detail.into()),
            },
            success => success,
        }
    }
}

impl From<ControlError> for CommandResult {
    fn from(err: ControlError) -> Self {
        Self::failure(err.to_string())
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_with_payload() {
        let result = CommandResult::success_with("verbose_level=6", json!(6));
        assert!(result.is_success());
        assert_eq!(result.value(), Some(&json!(6)));
    }

    #[test]
    fn test_failure_from_error() {
        let result = CommandResult::from(ControlError::NotRunning);
        assert!(!result.is_success());
        assert_eq!(result.message(), "Process not running");
    }

    #[test]
    fn test_with_detail_only_touches_failures() {
        let failure = CommandResult::failure("Reload failed").with_detail("default#0");
        assert_eq!(
            failure,
            CommandResult::failure_with("Reload failed", "default#0")
        );

        let success = CommandResult::success("Reload successful").with_detail("default#0");
        assert_eq!(success, CommandResult::success("Reload successful"));
    }
}

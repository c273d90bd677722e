//! Process execution primitives.

use std::process::{Child, Command};
use zorpctl_common::{ControlError, ControlResult};

/// Spawn a process with the given executable and arguments, detached from
/// the caller.
pub fn execute_command(executable: &str, args: &[String]) -> ControlResult<Child> {
    Command::new(executable).args(args).spawn().map_err(|e| {
        ControlError::validation(format!("Failed to spawn '{}': {}", executable, e))
    })
}

/// Strip one layer of matching quote characters from a token.
///
/// Configured argument lists may carry shell-style quoting; a token both
/// starting and ending with the same `'` or `"` loses that outer pair.
pub fn strip_quotes(token: &str) -> &str {
    let bytes = token.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'\'' || bytes[0] == b'"')
        && bytes[0] == bytes[bytes.len() - 1]
    {
        &token[1..token.len() - 1]
    } else {
        token
    }
}

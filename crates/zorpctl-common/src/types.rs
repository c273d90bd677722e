//! Core domain types for the zorpctl control plane.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One logical Zorp instance, possibly fanned out into several OS
/// processes (one master plus slaves) by process index.
///
/// Immutable for the duration of a command; every algorithm receives it by
/// reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    /// Logical instance name as configured.
    pub name: String,

    /// Index of this process within the instance, `0` is the master.
    #[serde(default)]
    pub process_num: u32,

    /// Total number of processes configured for this instance name.
    #[serde(default = "default_number_of_processes")]
    pub number_of_processes: u32,

    /// Whether plain `start` may launch this instance.
    #[serde(default = "default_true")]
    pub auto_start: bool,

    /// Whether the master supervises and restarts its workers.
    #[serde(default = "default_true")]
    pub auto_restart: bool,

    /// Pass `--enable-core` to the spawned process.
    #[serde(default)]
    pub enable_core: bool,

    /// Extra arguments forwarded to the Zorp executable.
    #[serde(default)]
    pub zorp_args: Vec<String>,
}

fn default_number_of_processes() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl Instance {
    /// Per-process name used for pid files and the stats channel:
    /// `name#process_num`.
    pub fn process_name(&self) -> String {
        format!("{}#{}", self.name, self.process_num)
    }

    /// A copy of this instance re-pointed at another process index.
    pub fn with_process_num(&self, process_num: u32) -> Self {
        Self {
            process_num,
            ..self.clone()
        }
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.process_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(name: &str, num: u32) -> Instance {
        Instance {
            name: name.to_string(),
            process_num: num,
            number_of_processes: 4,
            auto_start: true,
            auto_restart: true,
            enable_core: false,
            zorp_args: vec![],
        }
    }

    #[test]
    fn test_process_name_includes_index() {
        assert_eq!(instance("default", 0).process_name(), "default#0");
        assert_eq!(instance("default", 3).process_name(), "default#3");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let instance: Instance = serde_yaml_like("name: default").unwrap();
        assert_eq!(instance.name, "default");
        assert_eq!(instance.number_of_processes, 1);
        assert!(instance.auto_start);
        assert!(instance.auto_restart);
        assert!(!instance.enable_core);
        assert!(instance.zorp_args.is_empty());
    }

    // serde_yaml lives one crate up; JSON exercises the same derive here.
    fn serde_yaml_like(s: &str) -> Result<Instance, serde_json::Error> {
        let (key, value) = s.split_once(": ").unwrap();
        serde_json::from_value(serde_json::json!({ key: value }))
    }
}

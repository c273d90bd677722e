//! zorpctl configuration.
//!
//! One immutable value loaded at process start and passed by reference to
//! every algorithm; there is no global lookup.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use zorpctl_common::Instance;

/// Top-level configuration for the control tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZorpctlConfig {
    /// Directory holding the Zorp executable.
    #[serde(default = "default_sbin_dir")]
    pub sbin_dir: String,

    /// Directory where running processes put their pid files.
    #[serde(default = "default_pidfile_dir")]
    pub pidfile_dir: String,

    /// Maximum liveness checks while waiting for a start.
    #[serde(default = "default_start_check_timeout")]
    pub start_check_timeout: u32,

    /// Maximum liveness checks while waiting for a stop.
    #[serde(default = "default_stop_check_timeout")]
    pub stop_check_timeout: u32,

    /// Delay between liveness checks, in seconds.
    #[serde(default = "default_check_delay_secs")]
    pub check_delay_secs: u64,

    /// Suffix of the packaged service family, part of the systemd unit
    /// name (`zorp<suffix>@<instance>.service`).
    #[serde(default)]
    pub package_suffix: String,

    /// Start and stop through systemd units instead of direct spawn.
    #[serde(default)]
    pub use_systemd: bool,

    /// Declared instances.
    #[serde(default)]
    pub instances: Vec<Instance>,
}

fn default_sbin_dir() -> String {
    "/usr/sbin".to_string()
}

fn default_pidfile_dir() -> String {
    "/var/run/zorp".to_string()
}

fn default_start_check_timeout() -> u32 {
    10
}

fn default_stop_check_timeout() -> u32 {
    5
}

fn default_check_delay_secs() -> u64 {
    1
}

impl Default for ZorpctlConfig {
    fn default() -> Self {
        Self {
            sbin_dir: default_sbin_dir(),
            pidfile_dir: default_pidfile_dir(),
            start_check_timeout: default_start_check_timeout(),
            stop_check_timeout: default_stop_check_timeout(),
            check_delay_secs: default_check_delay_secs(),
            package_suffix: String::new(),
            use_systemd: false,
            instances: Vec::new(),
        }
    }
}

impl ZorpctlConfig {
    /// Load configuration from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::load_from_string(&content)
    }

    /// Load configuration from a YAML string.
    pub fn load_from_string(content: &str) -> Result<Self> {
        let config: ZorpctlConfig =
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for instance in &self.instances {
            if instance.name.is_empty() {
                anyhow::bail!("Instance name cannot be empty");
            }
            if !seen.insert(instance.name.as_str()) {
                anyhow::bail!("Duplicate instance name: {}", instance.name);
            }
            if instance.number_of_processes == 0 {
                anyhow::bail!(
                    "Instance '{}' must have at least one process",
                    instance.name
                );
            }
        }
        Ok(())
    }

    /// Look up a declared instance by name.
    pub fn find_instance(&self, name: &str) -> Option<&Instance> {
        self.instances.iter().find(|i| i.name == name)
    }

    /// Path of the Zorp executable.
    pub fn zorp_executable(&self) -> String {
        format!("{}/zorp", self.sbin_dir)
    }

    /// Derived systemd unit name for an instance.
    pub fn systemd_unit(&self, instance_name: &str) -> String {
        format!("zorp{}@{}.service", self.package_suffix, instance_name)
    }
}

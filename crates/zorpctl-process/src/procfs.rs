//! procfs process-accounting readers.
//!
//! Three read-only inputs feed detailed status:
//! - `/proc/<pid>/stat`: the 39 positional per-process accounting fields
//! - `/proc/stat`: the aggregate `cpu ` line (5th numeric field is idle
//!   ticks)
//! - `/proc/uptime`: `uptime_seconds idle_seconds`
//!
//! The proc root is injectable so tests run against a scratch directory.

use std::collections::BTreeMap;
use std::path::PathBuf;

use zorpctl_common::{ControlError, ControlResult};

/// Field names of `/proc/<pid>/stat`, in on-disk order.
pub const PROC_STAT_FIELDS: [&str; 39] = [
    "pid",
    "comm",
    "state",
    "ppid",
    "pgrp",
    "session",
    "tty_nr",
    "tpgid",
    "flags",
    "minflt",
    "cminflt",
    "majflt",
    "cmajflt",
    "utime",
    "stime",
    "cutime",
    "cstime",
    "priority",
    "nice",
    "_dummyzero",
    "itrealvalue",
    "starttime",
    "vsize",
    "rss",
    "rlim",
    "startcode",
    "endcode",
    "startstack",
    "kstkesp",
    "kstkeip",
    "signal",
    "blocked",
    "sigignore",
    "sigcatch",
    "wchan",
    "nswap",
    "cnswap",
    "exit_signal",
    "processor",
];

/// One parsed per-process accounting record, keyed by field name.
#[derive(Debug, Clone)]
pub struct ProcInfo {
    fields: BTreeMap<&'static str, String>,
}

impl ProcInfo {
    /// Parse the whitespace-separated stat record, zipping values against
    /// the standard field layout.
    pub fn parse(content: &str) -> Self {
        let fields = PROC_STAT_FIELDS
            .iter()
            .zip(content.split_whitespace())
            .map(|(key, value)| (*key, value.to_string()))
            .collect();
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    fn numeric(&self, key: &'static str) -> ControlResult<f64> {
        self.get(key)
            .and_then(|v| v.parse::<f64>().ok())
            .ok_or_else(|| {
                ControlError::validation(format!("Missing field '{}' in process stat", key))
            })
    }

    /// CPU ticks spent in user mode.
    pub fn utime(&self) -> ControlResult<f64> {
        self.numeric("utime")
    }

    /// CPU ticks spent in kernel mode.
    pub fn stime(&self) -> ControlResult<f64> {
        self.numeric("stime")
    }

    /// Process start offset in ticks since boot.
    pub fn starttime(&self) -> ControlResult<f64> {
        self.numeric("starttime")
    }

    /// Virtual memory size in bytes.
    pub fn vsize(&self) -> ControlResult<u64> {
        self.numeric("vsize").map(|v| v as u64)
    }

    /// Resident set size in pages.
    pub fn rss(&self) -> ControlResult<u64> {
        self.numeric("rss").map(|v| v as u64)
    }

    /// The full record as a JSON object, keyed by field name.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }
}

/// Reader over a procfs-shaped directory tree.
#[derive(Debug, Clone)]
pub struct ProcReader {
    root: PathBuf,
}

impl Default for ProcReader {
    fn default() -> Self {
        Self::new("/proc")
    }
}

impl ProcReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read(&self, relative: &str) -> ControlResult<String> {
        let path = self.root.join(relative);
        std::fs::read_to_string(&path)
            .map_err(|_| ControlError::validation(format!("Can not open {}", path.display())))
    }

    /// The per-process accounting record for one pid.
    pub fn process_stat(&self, pid: u32) -> ControlResult<ProcInfo> {
        let content = self.read(&format!("{}/stat", pid))?;
        Ok(ProcInfo::parse(&content))
    }

    /// Machine-wide idle ticks: 5th field of the aggregate `cpu ` line.
    pub fn idle_jiffies(&self) -> ControlResult<f64> {
        let content = self.read("stat")?;
        for line in content.lines() {
            if let Some(rest) = line.strip_prefix("cpu ") {
                return rest
                    .split_whitespace()
                    .nth(3)
                    .and_then(|v| v.parse::<f64>().ok())
                    .ok_or_else(|| {
                        ControlError::validation("Malformed cpu line in stat source".to_string())
                    });
            }
        }
        Err(ControlError::validation(
            "No aggregate cpu line in stat source".to_string(),
        ))
    }

    /// Machine uptime in seconds (first field of the uptime source).
    pub fn uptime_seconds(&self) -> ControlResult<f64> {
        self.uptime_field(0)
    }

    /// Machine idle time in seconds (second field of the uptime source).
    pub fn idle_seconds(&self) -> ControlResult<f64> {
        self.uptime_field(1)
    }

    fn uptime_field(&self, index: usize) -> ControlResult<f64> {
        let content = self.read("uptime")?;
        content
            .split_whitespace()
            .nth(index)
            .and_then(|v| v.parse::<f64>().ok())
            .ok_or_else(|| ControlError::validation("Malformed uptime source".to_string()))
    }

    /// Scheduler ticks per second, derived from machine-wide idle
    /// accounting: `round(5 + idle_ticks / idle_seconds)` to the nearest
    /// ten.
    pub fn jiffies_per_sec(&self) -> ControlResult<u64> {
        let idle_jiffies = self.idle_jiffies()?;
        let idle_sec = self.idle_seconds()?;
        Ok(round_to_ten(5.0 + idle_jiffies / idle_sec))
    }
}

fn round_to_ten(value: f64) -> u64 {
    ((value / 10.0).round() * 10.0) as u64
}

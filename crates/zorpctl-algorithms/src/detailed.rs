//! Detailed status: process-accounting figures on top of the status
//! snapshot.
//!
//! Derives CPU time (user/system/real as minutes plus fractional
//! seconds), process start wall-clock time and memory usage from the
//! procfs accounting record, using the machine-wide idle counters to
//! estimate scheduler ticks per second.

use chrono::{DateTime, Local, TimeZone};
use zorpctl_common::{CommandResult, ControlError, ControlResult, Instance};
use zorpctl_process::{ProcInfo, ProcReader};

use crate::handler::{CommandHandler, ProcessContext};
use crate::status::{collect_status, ProcessStatus};

/// Resident pages are reported in 4 kB units.
const PAGE_SIZE_KB: u64 = 4;

#[derive(Debug, PartialEq)]
struct CpuTimes {
    real_min: u64,
    real_sec: f64,
    user_min: u64,
    user_sec: f64,
    sys_min: u64,
    sys_sec: f64,
}

/// Split user/system tick counters into minutes plus leftover seconds;
/// real time is the sum of the two leftover-carrying figures.
fn cpu_times(utime_ticks: f64, stime_ticks: f64, jiffies_per_sec: f64) -> CpuTimes {
    let mut user_sec = utime_ticks / jiffies_per_sec;
    let user_min = (user_sec / 60.0) as u64;
    user_sec -= (user_min * 60) as f64;

    let mut sys_sec = stime_ticks / jiffies_per_sec;
    let sys_min = (sys_sec / 60.0) as u64;
    sys_sec -= (sys_min * 60) as f64;

    let mut real_sec = user_sec + sys_sec;
    let real_min = (real_sec / 60.0) as u64;
    real_sec -= (real_min * 60) as f64;

    CpuTimes {
        real_min,
        real_sec,
        user_min,
        user_sec,
        sys_min,
        sys_sec,
    }
}

fn seconds(value: f64) -> chrono::Duration {
    chrono::Duration::milliseconds((value * 1000.0) as i64)
}

/// Detailed status of one instance process.
pub struct DetailedStatusAlgorithm<'a> {
    ctx: &'a ProcessContext<'a>,
    proc: ProcReader,
}

impl<'a> DetailedStatusAlgorithm<'a> {
    pub fn new(ctx: &'a ProcessContext<'a>) -> Self {
        Self {
            ctx,
            proc: ProcReader::default(),
        }
    }

    pub fn with_proc_reader(mut self, proc: ProcReader) -> Self {
        self.proc = proc;
        self
    }

    /// Process start wall-clock time: now, minus machine uptime, plus the
    /// process's start offset since boot.
    fn start_time(&self, info: &ProcInfo, jiffies_per_sec: u64) -> ControlResult<DateTime<Local>> {
        let uptime = self.proc.uptime_seconds()?;
        let start_offset = info.starttime()? / jiffies_per_sec as f64;
        Ok(Local::now() - seconds(uptime) + seconds(start_offset))
    }

    fn loaded_time(&self, reload_stamp: &str) -> ControlResult<DateTime<Local>> {
        let stamp = reload_stamp.parse::<f64>().map_err(|e| {
            ControlError::validation(format!("Malformed reload stamp '{}': {}", reload_stamp, e))
        })?;
        Local
            .timestamp_opt(stamp.trunc() as i64, 0)
            .single()
            .ok_or_else(|| {
                ControlError::validation(format!("Reload stamp out of range: {}", reload_stamp))
            })
    }

    fn assemble_details(
        &self,
        status: &ProcessStatus,
        info: &ProcInfo,
        jiffies_per_sec: u64,
    ) -> ControlResult<String> {
        let started = self.start_time(info, jiffies_per_sec)?;
        let loaded = self.loaded_time(&status.reload_stamp)?;
        let times = cpu_times(info.utime()?, info.stime()?, jiffies_per_sec as f64);

        Ok(format!(
            "started at: {}\n\
             policy: file={}, loaded={}\n\
             cpu: real={}:{:.6}, user={}:{:.6}, sys={}:{:.6}\n\
             memory: vsz={}kB, rss={}kB",
            started.format("%Y-%m-%d %H:%M:%S"),
            status.policy_file,
            loaded.format("%Y-%m-%d %H:%M:%S"),
            times.real_min,
            times.real_sec,
            times.user_min,
            times.user_sec,
            times.sys_min,
            times.sys_sec,
            info.vsize()? / 1024,
            info.rss()? * PAGE_SIZE_KB,
        ))
    }

    fn detailed_status(&self, instance: &Instance) -> ControlResult<ProcessStatus> {
        let process_name = instance.process_name();
        let mut channel = self
            .ctx
            .szig
            .open(&process_name)
            .map_err(|e| ControlError::validation(e.to_string()))?;
        let mut status = collect_status(self.ctx, channel.as_mut(), instance)?;

        let jiffies_per_sec = self.proc.jiffies_per_sec()?;
        let info = self.proc.process_stat(status.pid)?;

        status.details = Some(self.assemble_details(&status, &info, jiffies_per_sec)?);
        Ok(status)
    }
}

impl CommandHandler for DetailedStatusAlgorithm<'_> {
    fn execute(&mut self, instance: &Instance) -> CommandResult {
        if let Err(err) = self.ctx.liveness.check(&instance.process_name()) {
            return err.into();
        }

        match self.detailed_status(instance) {
            Ok(status) => CommandResult::success_with(
                status.to_string(),
                serde_json::to_value(&status).unwrap_or_default(),
            ),
            Err(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZorpctlConfig;
    use std::time::UNIX_EPOCH;
    use tempfile::tempdir;
    use zorpctl_szig::mock::{MockSzigFactory, MockState};

    #[test]
    fn test_cpu_times_split_minutes_and_leftover_seconds() {
        // 7500 user ticks at 100 ticks/s = 75 s = 1 min 15 s;
        // 3000 system ticks = 30 s; real = 45 s.
        let times = cpu_times(7500.0, 3000.0, 100.0);
        assert_eq!(times.user_min, 1);
        assert!((times.user_sec - 15.0).abs() < 1e-9);
        assert_eq!(times.sys_min, 0);
        assert!((times.sys_sec - 30.0).abs() < 1e-9);
        assert_eq!(times.real_min, 0);
        assert!((times.real_sec - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_detailed_status_renders_all_sections() {
        let dir = tempdir().unwrap();
        let config = ZorpctlConfig {
            pidfile_dir: dir.path().display().to_string(),
            ..ZorpctlConfig::default()
        };

        let policy = dir.path().join("policy.py");
        std::fs::write(&policy, "# policy").unwrap();
        let mtime = std::fs::metadata(&policy)
            .unwrap()
            .modified()
            .unwrap()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs_f64();
        let stamp = (mtime.trunc() as i64).to_string();

        let mut state = MockState::default();
        state
            .values
            .insert("stats.threads_running".to_string(), "4".to_string());
        state.values.insert(
            "info.policy.file".to_string(),
            policy.display().to_string(),
        );
        state
            .values
            .insert("info.policy.file_stamp".to_string(), stamp.clone());
        state
            .values
            .insert("info.policy.reload_stamp".to_string(), stamp);
        let factory = MockSzigFactory::new(state);

        let ctx = ProcessContext::new(&config, &factory);
        let pid = std::process::id();
        std::fs::write(ctx.registry.pid_path("default#0"), pid.to_string()).unwrap();

        // Fake proc tree: 100 ticks/s (950 idle jiffies / 10 idle sec
        // -> 95, plus 5 -> 100), one stat record for our pid.
        let proc_root = dir.path().join("proc");
        std::fs::create_dir_all(proc_root.join(pid.to_string())).unwrap();
        std::fs::write(
            proc_root.join("stat"),
            "cpu  100 0 50 950 20 0 0 0 0 0\n",
        )
        .unwrap();
        std::fs::write(proc_root.join("uptime"), "2000.00 10.00\n").unwrap();
        std::fs::write(
            proc_root.join(pid.to_string()).join("stat"),
            format!(
                "{} (zorp) S 1 1 1 0 -1 0 0 0 0 0 7500 3000 0 0 20 0 4 0 100000 \
                 104857600 2560 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0 17 1",
                pid
            ),
        )
        .unwrap();

        let instance = Instance {
            name: "default".to_string(),
            process_num: 0,
            number_of_processes: 1,
            auto_start: true,
            auto_restart: true,
            enable_core: false,
            zorp_args: vec![],
        };

        let mut algorithm = DetailedStatusAlgorithm::new(&ctx)
            .with_proc_reader(ProcReader::new(&proc_root));
        let result = algorithm.execute(&instance);
        assert!(result.is_success(), "unexpected failure: {}", result.message());

        let rendered = result.message().to_string();
        assert!(rendered.contains("started at: "));
        assert!(rendered.contains(&format!("policy: file={}", policy.display())));
        assert!(rendered.contains("cpu: real=0:45.000000, user=1:15.000000, sys=0:30.000000"));
        assert!(rendered.contains("memory: vsz=102400kB, rss=10240kB"));
    }

    #[test]
    fn test_detailed_status_requires_liveness() {
        let dir = tempdir().unwrap();
        let config = ZorpctlConfig {
            pidfile_dir: dir.path().display().to_string(),
            ..ZorpctlConfig::default()
        };
        let factory = MockSzigFactory::new(MockState::default());
        let ctx = ProcessContext::new(&config, &factory);

        let instance = Instance {
            name: "default".to_string(),
            process_num: 0,
            number_of_processes: 1,
            auto_start: true,
            auto_restart: true,
            enable_core: false,
            zorp_args: vec![],
        };

        let result = DetailedStatusAlgorithm::new(&ctx).execute(&instance);
        assert!(!result.is_success());
        assert_eq!(result.message(), "Process not running");
    }
}

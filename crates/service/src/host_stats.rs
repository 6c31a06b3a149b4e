//! Host load sampling for the small-window keepalive
//!
//! CPU and memory come from `sysinfo`, GPU from the first driver node found
//! under `/sys` or from a user script. Every value is clamped to `0..=99`,
//! the range the device renders.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sysinfo::System;
use tracing::{debug, info};

/// Time allowed for `nvidia-smi` or the GPU script.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// One set of load figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSample {
    pub cpu: u32,
    pub mem: u32,
    pub gpu: u32,
}

/// Source of host load figures for the keepalive.
pub trait StatsSource {
    fn sample(&mut self) -> HostSample;
}

pub fn clamp_percent(value: i64) -> u32 {
    u32::try_from(value.clamp(0, 99)).unwrap_or(0)
}

/// `used / total` as a clamped percentage.
pub fn memory_percent(used: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    let pct = used.saturating_mul(100) / total;
    u32::try_from(pct.min(99)).unwrap_or(99)
}

/// Rounds a `sysinfo` usage figure into the device range.
pub fn usage_percent(usage: f32) -> u32 {
    if !usage.is_finite() {
        return 0;
    }
    clamp_percent(usage.round() as i64)
}

/// First run of ASCII digits in `text`.
pub fn first_integer(text: &str) -> Option<i64> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Run a command and capture stdout, killing it after `timeout`.
pub fn run_with_timeout(mut command: Command, timeout: Duration) -> Option<String> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| debug!(error = %e, "spawn failed"))
        .ok()?;

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(_)) => break,
            Ok(None) if Instant::now() < deadline => std::thread::sleep(Duration::from_millis(10)),
            result => {
                debug!(?result, "command timed out, killing");
                if let Err(e) = child.kill() {
                    debug!(error = %e, "kill failed");
                }
                if let Err(e) = child.wait() {
                    debug!(error = %e, "wait failed");
                }
                return None;
            }
        }
    }

    let mut out = String::new();
    child.stdout.take()?.read_to_string(&mut out).ok()?;
    Some(out)
}

/// Where the GPU figure comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GpuSource {
    /// User script; first integer on stdout.
    Script(PathBuf),
    /// amdgpu `gpu_busy_percent`.
    AmdBusy(PathBuf),
    /// i915 actual over max frequency.
    IntelFrequency { actual: PathBuf, max: PathBuf },
    NvidiaSmi,
    /// devfreq `load`, formatted `<load>@<freq>Hz`.
    Devfreq(PathBuf),
    Unavailable,
}

fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map(|rd| rd.filter_map(|e| e.ok().map(|e| e.path())).collect())
        .unwrap_or_default();
    entries.sort();
    entries
}

impl GpuSource {
    /// Probe `sys_root` (normally `/sys`). A script always wins.
    pub fn detect(sys_root: &Path, script: Option<PathBuf>) -> Self {
        if let Some(script) = script {
            return GpuSource::Script(script);
        }

        let cards = sorted_entries(&sys_root.join("class/drm"))
            .into_iter()
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("card") && !n.contains('-'))
            })
            .collect::<Vec<_>>();

        for card in &cards {
            let busy = card.join("device/gpu_busy_percent");
            if busy.is_file() {
                return GpuSource::AmdBusy(busy);
            }
        }
        for card in &cards {
            let actual = card.join("gt_act_freq_mhz");
            let max = card.join("gt_max_freq_mhz");
            if actual.is_file() && max.is_file() {
                return GpuSource::IntelFrequency { actual, max };
            }
        }
        if sys_root.join("module/nvidia").is_dir() {
            return GpuSource::NvidiaSmi;
        }
        sorted_entries(&sys_root.join("class/devfreq"))
            .into_iter()
            .map(|dev| dev.join("load"))
            .find(|load| load.is_file())
            .map_or(GpuSource::Unavailable, GpuSource::Devfreq)
    }

    /// Current load, already clamped. Unreadable sources report 0.
    pub fn read(&self, timeout: Duration) -> u32 {
        let read_int = |path: &Path| {
            std::fs::read_to_string(path)
                .ok()
                .and_then(|s| first_integer(&s))
        };
        let value = match self {
            GpuSource::Script(path) => {
                run_with_timeout(Command::new(path), timeout).and_then(|s| first_integer(&s))
            }
            GpuSource::AmdBusy(path) | GpuSource::Devfreq(path) => read_int(path),
            GpuSource::IntelFrequency { actual, max } => match (read_int(actual), read_int(max)) {
                (Some(act), Some(max)) if max > 0 => Some(act.saturating_mul(100) / max),
                _ => None,
            },
            GpuSource::NvidiaSmi => {
                let mut cmd = Command::new("nvidia-smi");
                cmd.args(["--query-gpu=utilization.gpu", "--format=csv,noheader,nounits"]);
                run_with_timeout(cmd, timeout).and_then(|s| first_integer(&s))
            }
            GpuSource::Unavailable => None,
        };
        value.map_or(0, clamp_percent)
    }
}

/// Samples CPU and memory through `sysinfo` plus the detected GPU source.
pub struct HostStats {
    system: System,
    gpu: GpuSource,
    command_timeout: Duration,
}

impl std::fmt::Debug for HostStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostStats")
            .field("gpu", &self.gpu)
            .field("command_timeout", &self.command_timeout)
            .finish_non_exhaustive()
    }
}

impl HostStats {
    pub fn new(gpu_script: Option<PathBuf>) -> Self {
        Self::with_sys_root("/sys", gpu_script)
    }

    pub fn with_sys_root(sys_root: impl AsRef<Path>, gpu_script: Option<PathBuf>) -> Self {
        let gpu = GpuSource::detect(sys_root.as_ref(), gpu_script);
        info!(?gpu, "GPU load source");

        // CPU usage is a delta, so the first keepalive needs a baseline.
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();

        Self {
            system,
            gpu,
            command_timeout: COMMAND_TIMEOUT,
        }
    }

    fn cpu(&mut self) -> u32 {
        self.system.refresh_cpu_usage();
        usage_percent(self.system.global_cpu_usage())
    }

    fn mem(&mut self) -> u32 {
        self.system.refresh_memory();
        memory_percent(self.system.used_memory(), self.system.total_memory())
    }
}

impl StatsSource for HostStats {
    fn sample(&mut self) -> HostSample {
        let sample = HostSample {
            cpu: self.cpu(),
            mem: self.mem(),
            gpu: self.gpu.read(self.command_timeout),
        };
        debug!(?sample, "host stats");
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_percent() {
        assert_eq!(memory_percent(12_000, 16_000), 75);
        assert_eq!(memory_percent(10, 10), 99);
        assert_eq!(memory_percent(5, 0), 0);
    }

    #[test]
    fn test_usage_percent() {
        assert_eq!(usage_percent(37.4), 37);
        assert_eq!(usage_percent(37.6), 38);
        assert_eq!(usage_percent(-1.0), 0);
        assert_eq!(usage_percent(100.0), 99);
        assert_eq!(usage_percent(f32::NAN), 0);
    }

    #[test]
    fn test_first_integer() {
        assert_eq!(first_integer("45@800000000Hz\n"), Some(45));
        assert_eq!(first_integer("  gpu: 12 %"), Some(12));
        assert_eq!(first_integer("none"), None);
    }

    #[test]
    fn test_clamp_percent() {
        assert_eq!(clamp_percent(-5), 0);
        assert_eq!(clamp_percent(42), 42);
        assert_eq!(clamp_percent(250), 99);
    }

    #[test]
    fn test_run_with_timeout() {
        let mut echo = Command::new("sh");
        echo.args(["-c", "echo 37"]);
        assert_eq!(
            run_with_timeout(echo, Duration::from_secs(2)).as_deref(),
            Some("37\n")
        );

        let mut slow = Command::new("sh");
        slow.args(["-c", "sleep 5"]);
        let started = Instant::now();
        assert_eq!(run_with_timeout(slow, Duration::from_millis(100)), None);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_detect_prefers_amd_then_intel() -> std::io::Result<()> {
        let sys = tempfile::tempdir()?;
        let card = sys.path().join("class/drm/card0");
        std::fs::create_dir_all(card.join("device"))?;
        std::fs::create_dir_all(sys.path().join("class/drm/card0-DP-1"))?;
        std::fs::write(card.join("gt_act_freq_mhz"), "300\n")?;
        std::fs::write(card.join("gt_max_freq_mhz"), "1200\n")?;

        let intel = GpuSource::detect(sys.path(), None);
        assert!(matches!(intel, GpuSource::IntelFrequency { .. }));
        assert_eq!(intel.read(COMMAND_TIMEOUT), 25);

        std::fs::write(card.join("device/gpu_busy_percent"), "100\n")?;
        let amd = GpuSource::detect(sys.path(), None);
        assert_eq!(amd, GpuSource::AmdBusy(card.join("device/gpu_busy_percent")));
        assert_eq!(amd.read(COMMAND_TIMEOUT), 99);
        Ok(())
    }

    #[test]
    fn test_detect_devfreq_and_script() -> std::io::Result<()> {
        let sys = tempfile::tempdir()?;
        assert_eq!(GpuSource::detect(sys.path(), None), GpuSource::Unavailable);
        assert_eq!(GpuSource::Unavailable.read(COMMAND_TIMEOUT), 0);

        let dev = sys.path().join("class/devfreq/ff9a0000.gpu");
        std::fs::create_dir_all(&dev)?;
        std::fs::write(dev.join("load"), "63@500000000Hz\n")?;
        let devfreq = GpuSource::detect(sys.path(), None);
        assert_eq!(devfreq.read(COMMAND_TIMEOUT), 63);

        let script = PathBuf::from("/opt/gpu.sh");
        assert_eq!(
            GpuSource::detect(sys.path(), Some(script.clone())),
            GpuSource::Script(script)
        );
        Ok(())
    }

    #[test]
    fn test_host_stats_sample_in_range() -> std::io::Result<()> {
        let sys = tempfile::tempdir()?;
        let dev = sys.path().join("class/devfreq/gpu");
        std::fs::create_dir_all(&dev)?;
        std::fs::write(dev.join("load"), "41@300000000Hz\n")?;

        let mut stats = HostStats::with_sys_root(sys.path(), None);
        let sample = stats.sample();
        assert!(sample.cpu <= 99);
        assert!(sample.mem <= 99);
        assert_eq!(sample.gpu, 41);
        assert_eq!(stats.sample().gpu, 41);
        Ok(())
    }
}

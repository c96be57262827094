//! GPU acquisition backends and their per-tick reads.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use super::smi;
use crate::collector::traits::{CommandRunner, FileSystem};

/// Memory size reported by the simulated backend, in MB.
pub const SIMULATED_MEMORY_MB: f64 = 2048.0;

/// Power draw (W) treated as 0% utilization on the open NVIDIA driver.
const NVIDIA_IDLE_WATTS: f64 = 25.0;
/// Power draw (W) treated as 100% utilization on the open NVIDIA driver.
const NVIDIA_MAX_WATTS: f64 = 195.0;

/// Vendor families with a sysfs read path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SysfsVendor {
    Amd,
    /// NVIDIA hardware driven by the open-source `nouveau` driver.
    NvidiaOpen,
    Intel,
}

/// The acquisition strategy chosen for the GPU domain.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuBackend {
    /// Vendor diagnostic tool, re-run every tick. `index` is the tool's GPU line.
    NativeTool { index: usize },
    /// Fixed sysfs leaf files under the DRM device and its hwmon directory.
    Sysfs {
        vendor: SysfsVendor,
        device_path: PathBuf,
        hwmon_path: Option<PathBuf>,
    },
    /// Synthetic waveform.
    Simulated { phase: f64 },
}

/// Backend identity without its state, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GpuBackendKind {
    NativeTool,
    AmdSysfs,
    NvidiaOpenSysfs,
    IntelSysfs,
    Simulated,
}

impl GpuBackendKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            GpuBackendKind::NativeTool => "nvidia-smi",
            GpuBackendKind::AmdSysfs => "AMD sysfs",
            GpuBackendKind::NvidiaOpenSysfs => "nouveau sysfs",
            GpuBackendKind::IntelSysfs => "Intel sysfs",
            GpuBackendKind::Simulated => "simulated",
        }
    }
}

/// Current GPU values. Backends overwrite only what they could read.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GpuReading {
    /// Percent.
    pub utilization: f64,
    pub memory_used_mb: f64,
    pub memory_total_mb: f64,
    /// Degrees Celsius.
    pub temperature: f64,
    pub fan_rpm: f64,
    pub power_watts: f64,
}

impl GpuBackend {
    pub fn kind(&self) -> GpuBackendKind {
        match self {
            GpuBackend::NativeTool { .. } => GpuBackendKind::NativeTool,
            GpuBackend::Sysfs { vendor, .. } => match vendor {
                SysfsVendor::Amd => GpuBackendKind::AmdSysfs,
                SysfsVendor::NvidiaOpen => GpuBackendKind::NvidiaOpenSysfs,
                SysfsVendor::Intel => GpuBackendKind::IntelSysfs,
            },
            GpuBackend::Simulated { .. } => GpuBackendKind::Simulated,
        }
    }

    /// Refreshes `reading` from this backend.
    pub fn sample<F: FileSystem, R: CommandRunner>(
        &mut self,
        fs: &F,
        runner: &R,
        tool: &str,
        reading: &mut GpuReading,
    ) {
        match self {
            GpuBackend::NativeTool { index } => sample_tool(runner, tool, *index, reading),
            GpuBackend::Sysfs {
                vendor,
                device_path,
                hwmon_path,
            } => sample_sysfs(fs, *vendor, device_path, hwmon_path.as_deref(), reading),
            GpuBackend::Simulated { phase } => {
                *phase += 0.1;
                sample_simulated(*phase, reading);
            }
        }
    }
}

fn sample_tool<R: CommandRunner>(runner: &R, tool: &str, index: usize, reading: &mut GpuReading) {
    let sample = match smi::query_sample(runner, tool, index) {
        Ok(sample) => sample,
        Err(e) => {
            debug!(tool, error = %e, "gpu: diagnostic tool query failed");
            return;
        }
    };

    let fields = [
        (sample.utilization, &mut reading.utilization),
        (sample.memory_used_mb, &mut reading.memory_used_mb),
        (sample.memory_total_mb, &mut reading.memory_total_mb),
        (sample.temperature, &mut reading.temperature),
        (sample.power_watts, &mut reading.power_watts),
    ];
    for (value, slot) in fields {
        if let Some(v) = value {
            *slot = v;
        }
    }
}

/// Reads a numeric sysfs leaf.
///
/// `None` when the file does not exist; `Some(0.0)` when it exists but can't
/// be read or parsed.
fn read_leaf<F: FileSystem>(fs: &F, path: &Path) -> Option<f64> {
    if !fs.exists(path) {
        return None;
    }
    match fs.read_to_string(path) {
        Ok(content) => Some(content.trim().parse().unwrap_or(0.0)),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "gpu: sysfs leaf unreadable");
            Some(0.0)
        }
    }
}

fn sample_sysfs<F: FileSystem>(
    fs: &F,
    vendor: SysfsVendor,
    device: &Path,
    hwmon: Option<&Path>,
    reading: &mut GpuReading,
) {
    let hwmon_leaf = |name: &str| hwmon.and_then(|h| read_leaf(fs, &h.join(name)));

    if let Some(t) = hwmon_leaf("temp1_input") {
        reading.temperature = t / 1000.0;
    }

    match vendor {
        SysfsVendor::Amd => {
            if let Some(u) = read_leaf(fs, &device.join("gpu_busy_percent")) {
                reading.utilization = u;
            }
            if let Some(b) = read_leaf(fs, &device.join("mem_info_vram_used")) {
                reading.memory_used_mb = b / 1_048_576.0;
            }
            if let Some(b) = read_leaf(fs, &device.join("mem_info_vram_total")) {
                reading.memory_total_mb = b / 1_048_576.0;
            }
            if let Some(rpm) = hwmon_leaf("fan1_input") {
                reading.fan_rpm = rpm;
            }
            if let Some(uw) = hwmon_leaf("power1_average") {
                reading.power_watts = uw / 1_000_000.0;
            }
        }
        SysfsVendor::NvidiaOpen => {
            if let Some(rpm) = hwmon_leaf("fan1_input") {
                reading.fan_rpm = rpm;
            }
            if let Some(uw) = hwmon_leaf("power1_input") {
                let watts = uw / 1_000_000.0;
                reading.power_watts = watts;
                reading.utilization = ((watts - NVIDIA_IDLE_WATTS)
                    / (NVIDIA_MAX_WATTS - NVIDIA_IDLE_WATTS)
                    * 100.0)
                    .clamp(0.0, 100.0);
            }
        }
        SysfsVendor::Intel => {
            reading.utilization = 0.0;
            reading.memory_used_mb = 0.0;
            reading.memory_total_mb = 0.0;
            if let Some(uw) = hwmon_leaf("power1_average").or_else(|| hwmon_leaf("power1_input")) {
                reading.power_watts = uw / 1_000_000.0;
            }
        }
    }
}

fn sample_simulated(phase: f64, reading: &mut GpuReading) {
    let utilization = 30.0 + 25.0 * phase.sin();
    reading.utilization = utilization;
    reading.memory_used_mb = 512.0 + 256.0 * (0.3 * phase).sin();
    reading.memory_total_mb = SIMULATED_MEMORY_MB;
    reading.temperature = 45.0 + 0.4 * utilization;
    reading.power_watts = 20.0 + 1.5 * utilization;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{MockFs, MockRunner};

    const DEV: &str = "/sys/class/drm/card0/device";
    const HWMON: &str = "/sys/class/drm/card0/device/hwmon/hwmon3";

    fn sysfs(vendor: SysfsVendor, with_hwmon: bool) -> GpuBackend {
        GpuBackend::Sysfs {
            vendor,
            device_path: PathBuf::from(DEV),
            hwmon_path: with_hwmon.then(|| PathBuf::from(HWMON)),
        }
    }

    #[test]
    fn test_amd_reads_all_leaves() {
        let fs = MockFs::amd_gpu();
        let mut backend = sysfs(SysfsVendor::Amd, true);
        let mut reading = GpuReading::default();
        backend.sample(&fs, &MockRunner::new(), "nvidia-smi", &mut reading);

        assert_eq!(reading.utilization, 42.0);
        assert_eq!(reading.memory_used_mb, 2048.0);
        assert_eq!(reading.memory_total_mb, 16384.0);
        assert_eq!(reading.temperature, 55.0);
        assert_eq!(reading.fan_rpm, 1200.0);
        assert_eq!(reading.power_watts, 95.0);
    }

    #[test]
    fn test_absent_leaf_keeps_value_unreadable_yields_zero() {
        let mut fs = MockFs::new();
        fs.add_unreadable(format!("{DEV}/gpu_busy_percent"));
        fs.add_file(format!("{DEV}/mem_info_vram_total"), "1073741824\n");

        let mut backend = sysfs(SysfsVendor::Amd, false);
        let mut reading = GpuReading {
            utilization: 77.0,
            memory_used_mb: 300.0,
            temperature: 60.0,
            ..Default::default()
        };
        backend.sample(&fs, &MockRunner::new(), "nvidia-smi", &mut reading);

        assert_eq!(reading.utilization, 0.0);
        assert_eq!(reading.memory_used_mb, 300.0);
        assert_eq!(reading.memory_total_mb, 1024.0);
        assert_eq!(reading.temperature, 60.0);
    }

    #[test]
    fn test_nvidia_open_utilization_from_power() {
        let mut fs = MockFs::new();
        fs.add_file(format!("{HWMON}/power1_input"), "110000000\n");
        fs.add_file(format!("{HWMON}/temp1_input"), "48000\n");

        let mut backend = sysfs(SysfsVendor::NvidiaOpen, true);
        let mut reading = GpuReading::default();
        backend.sample(&fs, &MockRunner::new(), "nvidia-smi", &mut reading);
        assert!((reading.utilization - 50.0).abs() < 1e-9);
        assert_eq!(reading.power_watts, 110.0);
        assert_eq!(reading.temperature, 48.0);

        fs.add_file(format!("{HWMON}/power1_input"), "10000000\n");
        backend.sample(&fs, &MockRunner::new(), "nvidia-smi", &mut reading);
        assert_eq!(reading.utilization, 0.0);

        fs.add_file(format!("{HWMON}/power1_input"), "250000000\n");
        backend.sample(&fs, &MockRunner::new(), "nvidia-smi", &mut reading);
        assert_eq!(reading.utilization, 100.0);
    }

    #[test]
    fn test_intel_reports_zero_utilization_and_memory() {
        let mut fs = MockFs::new();
        fs.add_file(format!("{HWMON}/temp1_input"), "39000\n");

        let mut backend = sysfs(SysfsVendor::Intel, true);
        let mut reading = GpuReading {
            utilization: 12.0,
            memory_total_mb: 512.0,
            ..Default::default()
        };
        backend.sample(&fs, &MockRunner::new(), "nvidia-smi", &mut reading);

        assert_eq!(reading.utilization, 0.0);
        assert_eq!(reading.memory_total_mb, 0.0);
        assert_eq!(reading.temperature, 39.0);
        assert_eq!(backend.kind(), GpuBackendKind::IntelSysfs);
    }

    #[test]
    fn test_native_tool_partial_and_failed_output() {
        let runner = MockRunner::new().respond(
            "nvidia-smi",
            "utilization.gpu",
            "37, 1024, 8192, [N/A], 120.5\n",
        );
        let mut backend = GpuBackend::NativeTool { index: 0 };
        let mut reading = GpuReading {
            temperature: 50.0,
            ..Default::default()
        };
        backend.sample(&MockFs::new(), &runner, "nvidia-smi", &mut reading);

        assert_eq!(reading.utilization, 37.0);
        assert_eq!(reading.memory_total_mb, 8192.0);
        assert_eq!(reading.temperature, 50.0);
        assert_eq!(reading.power_watts, 120.5);

        let failing = MockRunner::new().fail("nvidia-smi", "utilization.gpu");
        let before = reading.clone();
        backend.sample(&MockFs::new(), &failing, "nvidia-smi", &mut reading);
        assert_eq!(reading, before);
    }

    #[test]
    fn test_simulated_waveform() {
        let mut backend = GpuBackend::Simulated { phase: 0.0 };
        let mut reading = GpuReading::default();
        backend.sample(&MockFs::new(), &MockRunner::new(), "nvidia-smi", &mut reading);

        let expected = 30.0 + 25.0 * 0.1f64.sin();
        assert!((reading.utilization - expected).abs() < 1e-9);
        assert!((reading.temperature - (45.0 + 0.4 * expected)).abs() < 1e-9);
        assert_eq!(reading.memory_total_mb, SIMULATED_MEMORY_MB);
        assert_eq!(backend, GpuBackend::Simulated { phase: 0.1 });
    }
}

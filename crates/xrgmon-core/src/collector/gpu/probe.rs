//! One-time selection of the GPU backend.
//!
//! Order: vendor diagnostic tool (only when the proprietary driver is bound),
//! then the first DRM card of a known vendor, then the simulator.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::backend::{GpuBackend, SIMULATED_MEMORY_MB, SysfsVendor};
use super::names::{VENDOR_AMD, VENDOR_INTEL, VENDOR_NVIDIA, device_name, parse_pci_id};
use super::smi;
use crate::collector::traits::{CommandRunner, FileSystem};

/// Driver name that signals the proprietary NVIDIA stack.
const PROPRIETARY_DRIVER: &str = "nvidia";

/// A display device found under `/sys/class/drm`.
#[derive(Debug, Clone, PartialEq)]
pub struct DrmCard {
    /// e.g. `card0`.
    pub name: String,
    pub device_path: PathBuf,
    pub vendor: Option<u16>,
    pub device: Option<u16>,
    /// Basename of the `device/driver` link target.
    pub driver: Option<String>,
}

/// Outcome of probing: the backend plus what the probe learned.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub backend: GpuBackend,
    pub name: String,
    /// 0 when only known after the first sample.
    pub memory_total_mb: f64,
}

/// Lists `card<N>` entries, connectors such as `card0-DP-1` excluded, by name.
pub fn list_cards<F: FileSystem>(fs: &F, sys_path: &Path) -> Vec<DrmCard> {
    let drm = sys_path.join("class/drm");
    let mut entries = match fs.read_dir(&drm) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(path = %drm.display(), error = %e, "gpu: no drm class");
            return Vec::new();
        }
    };
    entries.sort();

    entries
        .into_iter()
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            let index = name.strip_prefix("card")?;
            if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let device_path = path.join("device");
            let read_id = |leaf: &str| {
                fs.read_to_string(&device_path.join(leaf))
                    .ok()
                    .and_then(|s| parse_pci_id(&s))
            };
            let vendor = read_id("vendor");
            let device = read_id("device");
            let driver = fs
                .read_link(&device_path.join("driver"))
                .ok()
                .and_then(|t| t.file_name().map(|n| n.to_string_lossy().into_owned()));
            Some(DrmCard {
                name,
                device_path,
                vendor,
                device,
                driver,
            })
        })
        .collect()
}

/// First `hwmon*` directory under the card's device, by name.
fn find_hwmon<F: FileSystem>(fs: &F, device_path: &Path) -> Option<PathBuf> {
    let mut entries = fs.read_dir(&device_path.join("hwmon")).ok()?;
    entries.sort();
    entries.into_iter().find(|p| {
        p.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("hwmon"))
    })
}

fn sysfs_vendor(vendor: u16) -> Option<SysfsVendor> {
    match vendor {
        VENDOR_AMD => Some(SysfsVendor::Amd),
        VENDOR_NVIDIA => Some(SysfsVendor::NvidiaOpen),
        VENDOR_INTEL => Some(SysfsVendor::Intel),
        _ => None,
    }
}

/// Picks the GPU backend. Never fails: the simulator is the last resort.
///
/// The diagnostic tool is only spawned when an NVIDIA card has the
/// proprietary driver bound; with `nouveau` active the tool can hang.
pub fn probe<F: FileSystem, R: CommandRunner>(
    fs: &F,
    runner: &R,
    sys_path: &Path,
    tool: &str,
) -> ProbeResult {
    let cards = list_cards(fs, sys_path);

    let proprietary = cards.iter().any(|c| {
        c.vendor == Some(VENDOR_NVIDIA) && c.driver.as_deref() == Some(PROPRIETARY_DRIVER)
    });
    if proprietary {
        match smi::query_probe(runner, tool) {
            Ok((name, memory_total_mb)) => {
                info!(backend = "native", name = %name, "gpu: using diagnostic tool");
                return ProbeResult {
                    backend: GpuBackend::NativeTool { index: 0 },
                    name,
                    memory_total_mb,
                };
            }
            Err(e) => warn!(tool, error = %e, "gpu: diagnostic tool unusable"),
        }
    }

    for card in &cards {
        let Some(vendor_id) = card.vendor else { continue };
        let Some(vendor) = sysfs_vendor(vendor_id) else {
            debug!(card = %card.name, vendor = vendor_id, "gpu: unknown vendor");
            continue;
        };
        let hwmon_path = find_hwmon(fs, &card.device_path);
        let name = device_name(vendor_id, card.device.unwrap_or(0));
        info!(
            backend = "sysfs",
            card = %card.name,
            name = %name,
            driver = card.driver.as_deref().unwrap_or("none"),
            "gpu: using sysfs"
        );
        return ProbeResult {
            backend: GpuBackend::Sysfs {
                vendor,
                device_path: card.device_path.clone(),
                hwmon_path,
            },
            name,
            memory_total_mb: 0.0,
        };
    }

    info!(backend = "simulated", "gpu: no supported display device");
    ProbeResult {
        backend: GpuBackend::Simulated { phase: 0.0 },
        name: "Simulated GPU".to_string(),
        memory_total_mb: SIMULATED_MEMORY_MB,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::gpu::GpuBackendKind;
    use crate::collector::mock::{MockFs, MockRunner};

    #[test]
    fn test_no_display_devices_simulates() {
        let runner = MockRunner::new();
        let result = probe(&MockFs::typical_system(), &runner, Path::new("/sys"), "nvidia-smi");

        assert_eq!(result.backend, GpuBackend::Simulated { phase: 0.0 });
        assert_eq!(result.memory_total_mb, 2048.0);
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_list_cards_skips_connectors() {
        let fs = MockFs::amd_gpu();
        let cards = list_cards(&fs, Path::new("/sys"));

        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].name, "card0");
        assert_eq!(cards[0].vendor, Some(0x1002));
        assert_eq!(cards[0].device, Some(0x73bf));
        assert_eq!(cards[0].driver.as_deref(), Some("amdgpu"));
    }

    #[test]
    fn test_amd_selects_sysfs_with_hwmon() {
        let runner = MockRunner::new();
        let result = probe(&MockFs::amd_gpu(), &runner, Path::new("/sys"), "nvidia-smi");

        assert_eq!(result.name, "AMD Radeon RX 6800/6900");
        assert_eq!(
            result.backend,
            GpuBackend::Sysfs {
                vendor: SysfsVendor::Amd,
                device_path: PathBuf::from("/sys/class/drm/card0/device"),
                hwmon_path: Some(PathBuf::from("/sys/class/drm/card0/device/hwmon/hwmon3")),
            }
        );
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_nouveau_never_invokes_tool() {
        let runner = MockRunner::new().respond("nvidia-smi", "name", "GeForce GTX 680, 2048\n");
        let result = probe(&MockFs::nouveau_gpu(), &runner, Path::new("/sys"), "nvidia-smi");

        assert!(runner.calls().is_empty());
        assert_eq!(result.name, "NVIDIA GeForce GTX 680");
        assert!(matches!(
            result.backend,
            GpuBackend::Sysfs {
                vendor: SysfsVendor::NvidiaOpen,
                ..
            }
        ));
    }

    #[test]
    fn test_proprietary_driver_uses_tool() {
        let runner =
            MockRunner::new().respond("nvidia-smi", "name,memory.total", "NVIDIA GeForce RTX 3090, 24576\n");
        let result = probe(
            &MockFs::nvidia_proprietary(),
            &runner,
            Path::new("/sys"),
            "nvidia-smi",
        );

        assert_eq!(result.backend, GpuBackend::NativeTool { index: 0 });
        assert_eq!(result.name, "NVIDIA GeForce RTX 3090");
        assert_eq!(result.memory_total_mb, 24576.0);
        assert_eq!(runner.calls().len(), 1);
    }

    #[test]
    fn test_tool_failure_falls_back_to_sysfs() {
        let runner = MockRunner::new().fail("nvidia-smi", "name");
        let result = probe(
            &MockFs::nvidia_proprietary(),
            &runner,
            Path::new("/sys"),
            "nvidia-smi",
        );

        assert_eq!(runner.calls().len(), 1);
        assert!(matches!(
            result.backend,
            GpuBackend::Sysfs {
                vendor: SysfsVendor::NvidiaOpen,
                hwmon_path: None,
                ..
            }
        ));
        assert_eq!(result.name, "NVIDIA GeForce RTX 3090");
    }

    #[test]
    fn test_unknown_vendor_simulates() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/class/drm/card0/device/vendor", "0x1af4\n");
        fs.add_file("/sys/class/drm/card0/device/device", "0x1050\n");

        let result = probe(&fs, &MockRunner::new(), Path::new("/sys"), "nvidia-smi");
        assert_eq!(result.backend.kind(), GpuBackendKind::Simulated);
    }
}

//! Monitor configuration.

use std::path::PathBuf;

use crate::collector::battery::DEFAULT_BATTERY_HISTORY;
use crate::collector::sensors::DEFAULT_SENSOR_HISTORY;

/// Default number of samples kept per CPU, memory, network, disk and GPU series.
pub const DEFAULT_HISTORY: usize = 200;

/// Default program used by the native GPU backend.
pub const DEFAULT_GPU_TOOL: &str = "nvidia-smi";

/// Settings shared by every collector a `Monitor` owns.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Samples kept per series for CPU, memory, network, disk and GPU.
    pub history: usize,
    pub battery_history: usize,
    pub sensor_history: usize,
    /// Root of the proc filesystem.
    pub proc_path: PathBuf,
    /// Root of sysfs.
    pub sys_path: PathBuf,
    /// Program name of the vendor GPU diagnostic tool.
    pub gpu_tool: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            history: DEFAULT_HISTORY,
            battery_history: DEFAULT_BATTERY_HISTORY,
            sensor_history: DEFAULT_SENSOR_HISTORY,
            proc_path: PathBuf::from("/proc"),
            sys_path: PathBuf::from("/sys"),
            gpu_tool: DEFAULT_GPU_TOOL.to_string(),
        }
    }
}

impl MonitorConfig {
    /// Sets the history length of every collector, battery and sensors included.
    pub fn with_history(mut self, history: usize) -> Self {
        self.history = history;
        self.battery_history = history;
        self.sensor_history = history;
        self
    }

    pub fn with_proc_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.proc_path = path.into();
        self
    }

    pub fn with_sys_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.sys_path = path.into();
        self
    }

    pub fn with_gpu_tool(mut self, tool: impl Into<String>) -> Self {
        self.gpu_tool = tool.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.history, 200);
        assert_eq!(config.battery_history, 300);
        assert_eq!(config.sensor_history, 300);
        assert_eq!(config.proc_path, PathBuf::from("/proc"));
        assert_eq!(config.gpu_tool, "nvidia-smi");
    }

    #[test]
    fn test_builder() {
        let config = MonitorConfig::default()
            .with_history(60)
            .with_proc_path("/host/proc")
            .with_sys_path("/host/sys");

        assert_eq!(config.history, 60);
        assert_eq!(config.sensor_history, 60);
        assert_eq!(config.sys_path, PathBuf::from("/host/sys"));
    }
}

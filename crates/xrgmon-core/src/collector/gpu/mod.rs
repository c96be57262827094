//! GPU collector with per-vendor acquisition backends.
//!
//! The backend is chosen once, in [`GpuCollector::new`], and never
//! re-probed. Every tick dispatches to that backend and then appends
//! utilization and memory-used percentage to backend-agnostic series.

pub mod backend;
pub mod names;
pub mod probe;
pub mod smi;

use std::path::Path;
use std::time::Instant;

pub use backend::{GpuBackend, GpuBackendKind, GpuReading, SysfsVendor};
pub use probe::{DrmCard, ProbeResult, list_cards, probe};

use crate::collector::traits::{CommandRunner, FileSystem};
use crate::series::Series;

/// Samples one GPU through whichever backend the probe selected.
pub struct GpuCollector<F: FileSystem, R: CommandRunner> {
    fs: F,
    runner: R,
    tool: String,
    backend: GpuBackend,
    name: String,
    reading: GpuReading,
    utilization: Series,
    memory: Series,
}

impl<F: FileSystem, R: CommandRunner> GpuCollector<F, R> {
    /// Probes for a backend and creates the collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `runner` - Runs the vendor diagnostic tool
    /// * `sys_path` - Base path to sysfs (usually "/sys")
    /// * `tool` - Diagnostic tool program name (usually "nvidia-smi")
    /// * `history` - Number of samples kept per series
    pub fn new(
        fs: F,
        runner: R,
        sys_path: impl AsRef<Path>,
        tool: impl Into<String>,
        history: usize,
    ) -> Self {
        let tool = tool.into();
        let ProbeResult {
            backend,
            name,
            memory_total_mb,
        } = probe(&fs, &runner, sys_path.as_ref(), &tool);

        Self {
            fs,
            runner,
            tool,
            backend,
            name,
            reading: GpuReading {
                memory_total_mb,
                ..Default::default()
            },
            utilization: Series::new(history),
            memory: Series::new(history),
        }
    }

    pub fn update(&mut self) {
        self.update_at(Instant::now());
    }

    /// Runs one tick. GPU readings are instantaneous, `_now` is unused.
    pub fn update_at(&mut self, _now: Instant) {
        self.backend
            .sample(&self.fs, &self.runner, &self.tool, &mut self.reading);
        self.utilization.push(self.reading.utilization);
        self.memory.push(self.memory_used_percent());
    }

    pub fn set_history_size(&mut self, history: usize) {
        self.utilization.resize(history);
        self.memory.resize(history);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> &GpuBackend {
        &self.backend
    }

    pub fn backend_kind(&self) -> GpuBackendKind {
        self.backend.kind()
    }

    pub fn reading(&self) -> &GpuReading {
        &self.reading
    }

    pub fn utilization(&self) -> f64 {
        self.reading.utilization
    }

    pub fn memory_used_mb(&self) -> f64 {
        self.reading.memory_used_mb
    }

    pub fn memory_total_mb(&self) -> f64 {
        self.reading.memory_total_mb
    }

    /// Memory used as percent of total, 0 when the total is unknown.
    pub fn memory_used_percent(&self) -> f64 {
        if self.reading.memory_total_mb <= 0.0 {
            0.0
        } else {
            self.reading.memory_used_mb / self.reading.memory_total_mb * 100.0
        }
    }

    pub fn temperature(&self) -> f64 {
        self.reading.temperature
    }

    pub fn fan_rpm(&self) -> f64 {
        self.reading.fan_rpm
    }

    pub fn power_watts(&self) -> f64 {
        self.reading.power_watts
    }

    pub fn utilization_series(&self) -> &Series {
        &self.utilization
    }

    pub fn memory_series(&self) -> &Series {
        &self.memory
    }

    #[cfg(test)]
    pub(crate) fn runner(&self) -> &R {
        &self.runner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::{MockFs, MockRunner};

    #[test]
    fn test_simulated_utilization_bounds() {
        let mut collector =
            GpuCollector::new(MockFs::new(), MockRunner::new(), "/sys", "nvidia-smi", 200);
        assert_eq!(collector.backend_kind(), GpuBackendKind::Simulated);

        for _ in 0..100 {
            collector.update();
            let u = collector.utilization();
            assert!((5.0..=55.0).contains(&u), "utilization {} out of range", u);
        }
        assert_eq!(collector.utilization_series().len(), 100);
        assert!(collector.utilization_series().min() >= 5.0);
        assert!(collector.utilization_series().max() <= 55.0);
        assert_eq!(collector.memory_total_mb(), 2048.0);
    }

    #[test]
    fn test_nouveau_ticks_never_spawn_tool() {
        let runner = MockRunner::new().respond("nvidia-smi", "query", "1, 1, 1, 1, 1\n");
        let mut collector = GpuCollector::new(MockFs::nouveau_gpu(), runner, "/sys", "nvidia-smi", 10);
        for _ in 0..5 {
            collector.update();
        }

        assert!(collector.runner().calls().is_empty());
        assert_eq!(collector.backend_kind(), GpuBackendKind::NvidiaOpenSysfs);
        assert!((collector.utilization() - 50.0).abs() < 1e-9);
        assert_eq!(collector.memory_used_percent(), 0.0);
    }

    #[test]
    fn test_native_tool_ticks() {
        let runner = MockRunner::new()
            .respond("nvidia-smi", "name,memory.total", "NVIDIA GeForce RTX 3090, 24576\n")
            .respond("nvidia-smi", "utilization.gpu", "60, 6144, 24576, 70, 250.00\n");
        let mut collector =
            GpuCollector::new(MockFs::nvidia_proprietary(), runner, "/sys", "nvidia-smi", 10);
        collector.update();

        assert_eq!(collector.name(), "NVIDIA GeForce RTX 3090");
        assert_eq!(collector.backend_kind(), GpuBackendKind::NativeTool);
        assert_eq!(collector.utilization(), 60.0);
        assert_eq!(collector.memory_used_percent(), 25.0);
        assert_eq!(collector.memory_series().latest(), 25.0);
        assert_eq!(collector.temperature(), 70.0);
        assert_eq!(collector.power_watts(), 250.0);
        assert_eq!(collector.runner().calls().len(), 2);
    }

    #[test]
    fn test_amd_collector() {
        let mut collector =
            GpuCollector::new(MockFs::amd_gpu(), MockRunner::new(), "/sys", "nvidia-smi", 10);
        collector.update();

        assert_eq!(collector.utilization_series().latest(), 42.0);
        assert_eq!(collector.memory_used_percent(), 12.5);
        assert_eq!(collector.fan_rpm(), 1200.0);
    }

    #[test]
    fn test_set_history_size() {
        let mut collector =
            GpuCollector::new(MockFs::new(), MockRunner::new(), "/sys", "nvidia-smi", 10);
        for _ in 0..10 {
            collector.update();
        }
        collector.set_history_size(3);
        assert_eq!(collector.utilization_series().len(), 3);
        assert_eq!(collector.memory_series().capacity(), 3);
    }
}

//! Aggregate that owns one collector per domain and ticks them together.
//!
//! The `Monitor` struct is what a sampling loop drives: one `tick()` per
//! interval, then `snapshot()` or the per-collector accessors for reading.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::collector::battery::{BatteryCollector, BatteryStatus};
use crate::collector::cpu::CpuCollector;
use crate::collector::disk::DiskCollector;
use crate::collector::gpu::{GpuBackendKind, GpuCollector, GpuReading};
use crate::collector::memory::MemoryCollector;
use crate::collector::network::NetworkCollector;
use crate::collector::sensors::{SensorRegistry, SensorType};
use crate::collector::traits::{CommandRunner, FileSystem};
use crate::config::MonitorConfig;

/// Timing information for each collector phase.
///
/// Used for debugging and performance monitoring.
#[derive(Debug, Clone, Default)]
pub struct CollectorTiming {
    /// Total tick time.
    pub total: Duration,
    pub cpu: Duration,
    pub memory: Duration,
    pub network: Duration,
    pub disk: Duration,
    pub battery: Duration,
    /// Dominated by process spawn time with the native GPU backend.
    pub gpu: Duration,
    pub sensors: Duration,
}

#[derive(Debug, Clone, Serialize)]
pub struct CpuSnapshot {
    pub cores: usize,
    pub total_usage: f64,
    pub core_usage: Vec<f64>,
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
    pub procs_running: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemorySnapshot {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub used_percent: f64,
    pub swap_used_bytes: u64,
    pub swap_total_bytes: u64,
    /// Pages per second.
    pub page_activity: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkSnapshot {
    pub primary: String,
    pub download_mb: f64,
    pub upload_mb: f64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub interfaces: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiskSnapshot {
    pub primary: String,
    pub read_mb: f64,
    pub write_mb: f64,
    pub read_bytes: u64,
    pub write_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GpuSnapshot {
    pub name: String,
    pub backend: GpuBackendKind,
    pub backend_name: &'static str,
    #[serde(flatten)]
    pub reading: GpuReading,
    pub memory_used_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatterySnapshot {
    pub status: BatteryStatus,
    pub batteries: usize,
    pub charge_percent: u32,
    pub minutes_remaining: u32,
    pub charge_watts: f64,
    pub discharge_watts: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SensorSnapshot {
    pub key: String,
    pub sensor_type: SensorType,
    pub value: f64,
    pub unit: &'static str,
}

/// Current scalars of every collector after the last tick.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorSnapshot {
    pub cpu: CpuSnapshot,
    pub memory: MemorySnapshot,
    pub network: NetworkSnapshot,
    pub disk: DiskSnapshot,
    pub gpu: GpuSnapshot,
    pub battery: BatterySnapshot,
    pub sensors: Vec<SensorSnapshot>,
}

/// Owns every collector and drives them one tick at a time.
///
/// Ticks are serial and synchronous; the whole monitor can be moved to a
/// dedicated sampling thread since both seams are `Send + Sync`.
pub struct Monitor<F: FileSystem + Clone, R: CommandRunner> {
    cpu: CpuCollector<F>,
    memory: MemoryCollector<F>,
    network: NetworkCollector<F>,
    disk: DiskCollector<F>,
    battery: BatteryCollector<F>,
    gpu: GpuCollector<F, R>,
    sensors: SensorRegistry<F>,
    /// Timing information from the last tick.
    last_timing: Option<CollectorTiming>,
}

impl<F: FileSystem + Clone, R: CommandRunner> Monitor<F, R> {
    /// Creates every collector. Probes the GPU backend once.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `runner` - Runs the vendor GPU diagnostic tool
    /// * `config` - History lengths and filesystem roots
    pub fn new(fs: F, runner: R, config: &MonitorConfig) -> Self {
        let proc_path = &config.proc_path;
        let sys_path = &config.sys_path;
        let history = config.history;

        Self {
            cpu: CpuCollector::new(fs.clone(), proc_path, history),
            memory: MemoryCollector::new(fs.clone(), proc_path, history),
            network: NetworkCollector::new(fs.clone(), proc_path, history),
            disk: DiskCollector::new(fs.clone(), proc_path, history),
            battery: BatteryCollector::new(fs.clone(), sys_path, config.battery_history),
            gpu: GpuCollector::new(fs.clone(), runner, sys_path, &config.gpu_tool, history),
            sensors: SensorRegistry::new(fs, sys_path, config.sensor_history),
            last_timing: None,
        }
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// Runs one tick of every collector with `now` as the capture time.
    ///
    /// Also records timing information accessible via `last_timing()`.
    pub fn tick_at(&mut self, now: Instant) {
        let total_start = Instant::now();
        let mut timing = CollectorTiming::default();

        let start = Instant::now();
        self.cpu.update_at(now);
        timing.cpu = start.elapsed();

        let start = Instant::now();
        self.memory.update_at(now);
        timing.memory = start.elapsed();

        let start = Instant::now();
        self.network.update_at(now);
        timing.network = start.elapsed();

        let start = Instant::now();
        self.disk.update_at(now);
        timing.disk = start.elapsed();

        let start = Instant::now();
        self.battery.update_at(now);
        timing.battery = start.elapsed();

        let start = Instant::now();
        self.gpu.update_at(now);
        timing.gpu = start.elapsed();

        let start = Instant::now();
        self.sensors.update_at(now);
        timing.sensors = start.elapsed();

        timing.total = total_start.elapsed();
        self.last_timing = Some(timing);
    }

    /// Resizes the history of every collector, battery and sensors included.
    pub fn set_history_size(&mut self, history: usize) {
        self.cpu.set_history_size(history);
        self.memory.set_history_size(history);
        self.network.set_history_size(history);
        self.disk.set_history_size(history);
        self.battery.set_history_size(history);
        self.gpu.set_history_size(history);
        self.sensors.set_history_size(history);
    }

    /// Returns timing information from the last tick.
    pub fn last_timing(&self) -> Option<&CollectorTiming> {
        self.last_timing.as_ref()
    }

    pub fn cpu(&self) -> &CpuCollector<F> {
        &self.cpu
    }

    pub fn memory(&self) -> &MemoryCollector<F> {
        &self.memory
    }

    pub fn network(&self) -> &NetworkCollector<F> {
        &self.network
    }

    pub fn disk(&self) -> &DiskCollector<F> {
        &self.disk
    }

    pub fn battery(&self) -> &BatteryCollector<F> {
        &self.battery
    }

    pub fn gpu(&self) -> &GpuCollector<F, R> {
        &self.gpu
    }

    pub fn sensors(&self) -> &SensorRegistry<F> {
        &self.sensors
    }

    /// Copies the current scalars of every collector.
    pub fn snapshot(&self) -> MonitorSnapshot {
        let cpu = &self.cpu;
        let load = cpu.load_average();
        let memory = &self.memory;
        let network = &self.network;
        let disk = &self.disk;
        let gpu = &self.gpu;
        let battery = &self.battery;

        MonitorSnapshot {
            cpu: CpuSnapshot {
                cores: cpu.core_count(),
                total_usage: cpu.total_usage(),
                core_usage: (0..cpu.core_count()).map(|i| cpu.core_usage(i)).collect(),
                load1: load.load1,
                load5: load.load5,
                load15: load.load15,
                procs_running: cpu.procs_running(),
            },
            memory: MemorySnapshot {
                total_bytes: memory.total_bytes(),
                used_bytes: memory.used_bytes(),
                free_bytes: memory.free_bytes(),
                used_percent: memory.used_percent(),
                swap_used_bytes: memory.swap_used_bytes(),
                swap_total_bytes: memory.swap_total_bytes(),
                page_activity: memory.page_activity_series().latest(),
            },
            network: NetworkSnapshot {
                primary: network.primary_interface().to_string(),
                download_mb: network.download_mb(),
                upload_mb: network.upload_mb(),
                rx_bytes: network.total_rx_bytes(),
                tx_bytes: network.total_tx_bytes(),
                interfaces: network.interfaces().to_vec(),
            },
            disk: DiskSnapshot {
                primary: disk.primary_device().to_string(),
                read_mb: disk.read_mb(),
                write_mb: disk.write_mb(),
                read_bytes: disk.total_read_bytes(),
                write_bytes: disk.total_write_bytes(),
            },
            gpu: GpuSnapshot {
                name: gpu.name().to_string(),
                backend: gpu.backend_kind(),
                backend_name: gpu.backend_kind().display_name(),
                reading: gpu.reading().clone(),
                memory_used_percent: gpu.memory_used_percent(),
            },
            battery: BatterySnapshot {
                status: battery.status(),
                batteries: battery.batteries().len(),
                charge_percent: battery.charge_percent(),
                minutes_remaining: battery.minutes_remaining(),
                charge_watts: battery.charge_watts_series().latest(),
                discharge_watts: battery.discharge_watts_series().latest(),
            },
            sensors: self
                .sensors
                .iter()
                .map(|e| SensorSnapshot {
                    key: e.key.clone(),
                    sensor_type: e.sensor_type,
                    value: e.value,
                    unit: e.unit(),
                })
                .collect(),
        }
    }
}

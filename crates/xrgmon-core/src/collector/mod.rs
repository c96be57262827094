//! Telemetry collectors for Linux.
//!
//! This module provides one sampling collector per resource domain, reading
//! `/proc` and `/sys` through the `FileSystem` seam so every collector can be
//! tested on any host.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                             Monitor                              │
//! │  ┌──────────────┐  ┌──────────────┐  ┌────────────────────────┐  │
//! │  │ Cpu/Memory   │  │ Battery      │  │ GpuCollector           │  │
//! │  │ Network/Disk │  │ /sys/class/  │  │  probe once ──► backend│  │
//! │  │ /proc/*      │  │ power_supply │  │  NativeTool | Sysfs |  │  │
//! │  └──────┬───────┘  └──────┬───────┘  │  Simulated             │  │
//! │         │                 │          └───────┬──────────┬─────┘  │
//! │         │   ┌─────────────┴──────┐           │          │        │
//! │         │   │ SensorRegistry     │           │          │        │
//! │         │   │ /sys/class/hwmon   │           │          │        │
//! │         │   └─────────┬──────────┘           │          │        │
//! │         └─────────────┼──────────────────────┘          │        │
//! │                ┌──────▼──────┐                 ┌────────▼──────┐ │
//! │                │  FileSystem │ (trait)         │ CommandRunner │ │
//! │                └──────┬──────┘                 └────────┬──────┘ │
//! └───────────────────────┼─────────────────────────────────┼────────┘
//!              ┌──────────┴───────┐                ┌────────┴───────┐
//!       ┌──────▼──────┐    ┌──────▼──────┐  ┌──────▼──────┐  ┌──────▼──────┐
//!       │   RealFs    │    │   MockFs    │  │SystemRunner │  │ MockRunner  │
//!       │  (Linux)    │    │ + Scenarios │  │  (spawn)    │  │ (scripted)  │
//!       └─────────────┘    └─────────────┘  └─────────────┘  └─────────────┘
//! ```
//!
//! # Usage
//!
//! ## Production (Linux)
//!
//! ```ignore
//! use xrgmon_core::collector::{Monitor, RealFs, SystemRunner};
//! use xrgmon_core::config::MonitorConfig;
//!
//! let mut monitor = Monitor::new(RealFs::new(), SystemRunner::new(), &MonitorConfig::default());
//! monitor.tick();
//! println!("{:.1}%", monitor.cpu().total_usage());
//! ```
//!
//! ## Testing (with MockFs)
//!
//! ```
//! use xrgmon_core::collector::{MockFs, MockRunner, Monitor};
//! use xrgmon_core::config::MonitorConfig;
//!
//! let mut monitor = Monitor::new(MockFs::typical_system(), MockRunner::new(), &MonitorConfig::default());
//! monitor.tick();
//! assert_eq!(monitor.cpu().core_count(), 4);
//! ```

pub mod battery;
pub mod cpu;
pub mod disk;
mod error;
pub mod gpu;
pub mod memory;
pub mod mock;
mod monitor;
pub mod network;
pub mod primary;
pub mod procfs;
pub mod sensors;
pub mod traits;

pub use battery::{BatteryCollector, BatteryStatus};
pub use cpu::CpuCollector;
pub use disk::DiskCollector;
pub use error::CollectError;
pub use gpu::{GpuBackend, GpuBackendKind, GpuCollector};
pub use memory::MemoryCollector;
pub use mock::{MockFs, MockRunner};
pub use monitor::{CollectorTiming, Monitor, MonitorSnapshot};
pub use network::NetworkCollector;
pub use sensors::{SensorEntry, SensorRegistry, SensorType};
pub use traits::{CommandRunner, FileSystem, RealFs, SystemRunner};

//! xrgmon - System resource sampler.
//!
//! Builds a `Monitor` over the live `/proc` and `/sys`, ticks it at a fixed
//! interval and prints a readout (or one JSON line) per tick.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use clap::{Parser, ValueEnum};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use xrgmon_core::collector::{Monitor, RealFs, SensorType, SystemRunner};
use xrgmon_core::config::{DEFAULT_GPU_TOOL, DEFAULT_HISTORY, MonitorConfig};

/// System resource sampler.
#[derive(Parser)]
#[command(name = "xrgmon", about = "System resource sampler", version)]
struct Args {
    /// Sampling interval in seconds.
    #[arg(short, long, default_value = "1")]
    interval: u64,

    /// Number of ticks to run before exiting.
    #[arg(short = 'n', long, default_value = "1")]
    count: u64,

    /// Keep ticking until interrupted (overrides --count).
    #[arg(long = "loop")]
    run_forever: bool,

    /// Samples kept per series.
    #[arg(long, default_value_t = DEFAULT_HISTORY)]
    history: usize,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Path to /sys filesystem (for testing/mocking).
    #[arg(long, default_value = "/sys")]
    sys_path: String,

    /// GPU diagnostic tool used when the proprietary NVIDIA driver is loaded.
    #[arg(long, default_value = DEFAULT_GPU_TOOL)]
    gpu_tool: String,

    /// Only print these sections (comma-separated).
    #[arg(long, value_enum, value_delimiter = ',')]
    only: Vec<Section>,

    /// Print one JSON object per tick instead of the text readout.
    #[arg(long)]
    json: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Section {
    Cpu,
    Memory,
    Network,
    Disk,
    Gpu,
    Sensors,
    Battery,
}

impl Section {
    const ALL: [Section; 7] = [
        Section::Cpu,
        Section::Memory,
        Section::Network,
        Section::Disk,
        Section::Gpu,
        Section::Sensors,
        Section::Battery,
    ];

    /// Key of this section in the JSON snapshot.
    fn key(&self) -> &'static str {
        match self {
            Section::Cpu => "cpu",
            Section::Memory => "memory",
            Section::Network => "network",
            Section::Disk => "disk",
            Section::Gpu => "gpu",
            Section::Sensors => "sensors",
            Section::Battery => "battery",
        }
    }
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("xrgmon={}", level).parse().unwrap())
        .add_directive(format!("xrgmon_core={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Formats bytes as human-readable size string.
fn format_size(bytes: u64) -> String {
    const GB: u64 = 1024 * 1024 * 1024;
    const MB: u64 = 1024 * 1024;
    const KB: u64 = 1024;

    if bytes >= GB {
        format!("{:.1}G", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1}M", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1}K", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}

fn print_readout(monitor: &Monitor<RealFs, SystemRunner>, sections: &[Section], tick: u64) {
    println!(
        "--- tick {} at {} ---",
        tick,
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    );

    for section in sections {
        match section {
            Section::Cpu => {
                let cpu = monitor.cpu();
                let load = cpu.load_average();
                let cores: Vec<String> = (0..cpu.core_count())
                    .map(|i| format!("{:.0}", cpu.core_usage(i)))
                    .collect();
                println!(
                    "cpu      {:5.1}%  cores {} [{}]  load {:.2} {:.2} {:.2}  running {}",
                    cpu.total_usage(),
                    cpu.core_count(),
                    cores.join(" "),
                    load.load1,
                    load.load5,
                    load.load15,
                    cpu.procs_running()
                );
            }
            Section::Memory => {
                let mem = monitor.memory();
                println!(
                    "memory   {:5.1}%  {} / {}  swap {} / {}  paging {:.0}/s",
                    mem.used_percent(),
                    format_size(mem.used_bytes()),
                    format_size(mem.total_bytes()),
                    format_size(mem.swap_used_bytes()),
                    format_size(mem.swap_total_bytes()),
                    mem.page_activity_series().latest()
                );
            }
            Section::Network => {
                let net = monitor.network();
                println!(
                    "network  {:<8} down {:.2} MB/s  up {:.2} MB/s  ({} interfaces)",
                    if net.primary_interface().is_empty() {
                        "-"
                    } else {
                        net.primary_interface()
                    },
                    net.download_mb(),
                    net.upload_mb(),
                    net.interfaces().len()
                );
            }
            Section::Disk => {
                let disk = monitor.disk();
                println!(
                    "disk     {:<8} read {:.2} MB/s  write {:.2} MB/s",
                    if disk.primary_device().is_empty() {
                        "-"
                    } else {
                        disk.primary_device()
                    },
                    disk.read_mb(),
                    disk.write_mb()
                );
            }
            Section::Gpu => {
                let gpu = monitor.gpu();
                println!(
                    "gpu      {} [{}]  {:5.1}%  mem {:.0} / {:.0} MB  {:.0}°C  {:.0} RPM  {:.1} W",
                    gpu.name(),
                    gpu.backend_kind().display_name(),
                    gpu.utilization(),
                    gpu.memory_used_mb(),
                    gpu.memory_total_mb(),
                    gpu.temperature(),
                    gpu.fan_rpm(),
                    gpu.power_watts()
                );
            }
            Section::Sensors => {
                let sensors = monitor.sensors();
                if sensors.is_empty() {
                    println!("sensors  none");
                }
                for entry in sensors.iter() {
                    let precision = match entry.sensor_type {
                        SensorType::Fan => 0,
                        SensorType::Voltage => 3,
                        _ => 1,
                    };
                    println!(
                        "sensor   {:<28} {:>8.*} {}",
                        entry.key,
                        precision,
                        entry.value,
                        entry.unit()
                    );
                }
            }
            Section::Battery => {
                let battery = monitor.battery();
                println!(
                    "battery  {}  {}%  {} min  +{:.1} W / -{:.1} W",
                    battery.status().as_str(),
                    battery.charge_percent(),
                    battery.minutes_remaining(),
                    battery.charge_watts_series().latest(),
                    battery.discharge_watts_series().latest()
                );
            }
        }
    }
}

fn print_json(monitor: &Monitor<RealFs, SystemRunner>, sections: &[Section], tick: u64) {
    let mut value = match serde_json::to_value(monitor.snapshot()) {
        Ok(value) => value,
        Err(e) => {
            error!("Failed to serialize snapshot: {}", e);
            return;
        }
    };
    if let serde_json::Value::Object(map) = &mut value {
        map.retain(|key, _| sections.iter().any(|s| s.key() == key));
        map.insert(
            "timestamp".to_string(),
            serde_json::Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        map.insert("tick".to_string(), serde_json::Value::from(tick));
    }
    println!("{}", value);
}

/// Sleeps for `duration` in short slices, returning false once shutdown is requested.
fn sleep_interruptible(duration: Duration, running: &AtomicBool) -> bool {
    let sleep_interval = Duration::from_millis(100);
    let mut remaining = duration;
    while remaining > Duration::ZERO && running.load(Ordering::SeqCst) {
        let sleep_time = remaining.min(sleep_interval);
        std::thread::sleep(sleep_time);
        remaining = remaining.saturating_sub(sleep_time);
    }
    running.load(Ordering::SeqCst)
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let sections: Vec<Section> = if args.only.is_empty() {
        Section::ALL.to_vec()
    } else {
        args.only.clone()
    };

    let config = MonitorConfig::default()
        .with_history(args.history)
        .with_proc_path(&args.proc_path)
        .with_sys_path(&args.sys_path)
        .with_gpu_tool(&args.gpu_tool);

    info!(
        "Starting xrgmon with interval={}s, history={}",
        args.interval, config.history
    );

    let mut monitor = Monitor::new(RealFs::new(), SystemRunner::new(), &config);
    info!(
        "GPU backend: {} ({})",
        monitor.gpu().backend_kind().display_name(),
        monitor.gpu().name()
    );

    let interval = Duration::from_secs(args.interval);

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    // Collectors took their baseline reading in Monitor::new; every tick
    // reports the interval since the previous reading.
    let mut tick: u64 = 0;
    while running.load(Ordering::SeqCst) {
        if !sleep_interruptible(interval, &running) {
            break;
        }

        monitor.tick();
        tick += 1;

        if let Some(timing) = monitor.last_timing() {
            debug!(
                "Tick #{} took {:?} (gpu {:?}, sensors {:?})",
                tick, timing.total, timing.gpu, timing.sensors
            );
        }

        if args.json {
            print_json(&monitor, &sections, tick);
        } else {
            print_readout(&monitor, &sections, tick);
        }

        if !args.run_forever && tick >= args.count {
            break;
        }
    }

    info!("Shutdown complete");
}

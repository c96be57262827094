//! Network throughput collector over `/proc/net/dev`.

use std::path::PathBuf;
use std::time::Instant;

use tracing::debug;

use crate::collector::CollectError;
use crate::collector::primary::{is_loopback, select_primary};
use crate::collector::procfs::parser::{NetDevStats, parse_net_dev};
use crate::collector::traits::FileSystem;
use crate::rates::{CounterSnapshot, bytes_to_mb, counter_rate};
use crate::series::Series;

/// Samples download and upload rates of the primary interface.
///
/// Previous counters are matched by interface name, so interfaces appearing,
/// disappearing or changing order between ticks never produce bogus deltas.
pub struct NetworkCollector<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
    counters: CounterSnapshot<Vec<NetDevStats>>,
    download: Series,
    upload: Series,
    interfaces: Vec<String>,
    primary: Option<NetDevStats>,
    rx_rate: f64,
    tx_rate: f64,
}

impl<F: FileSystem> NetworkCollector<F> {
    /// Creates the collector and records the current counters as baseline.
    pub fn new(fs: F, proc_path: impl Into<PathBuf>, history: usize) -> Self {
        let now = Instant::now();
        let mut collector = Self {
            fs,
            proc_path: proc_path.into(),
            counters: CounterSnapshot::new(now),
            download: Series::new(history),
            upload: Series::new(history),
            interfaces: Vec::new(),
            primary: None,
            rx_rate: 0.0,
            tx_rate: 0.0,
        };
        match collector.read_net_dev() {
            Ok(devices) => collector.counters.store(devices, now),
            Err(e) => debug!(error = %e, "network: no initial net/dev reading"),
        }
        collector
    }

    pub fn update(&mut self) {
        self.update_at(Instant::now());
    }

    pub fn update_at(&mut self, now: Instant) {
        let devices = self.read_net_dev().unwrap_or_else(|e| {
            debug!(error = %e, "network: net/dev unavailable");
            Vec::new()
        });

        let idx = select_primary(
            &devices,
            |d| is_loopback(&d.interface),
            |d| d.rx_bytes > 0 || d.tx_bytes > 0,
        );

        match devices.get(idx) {
            Some(current) => {
                let elapsed = self.counters.elapsed_secs(now);
                let previous = self
                    .counters
                    .previous()
                    .and_then(|p| p.iter().find(|d| d.interface == current.interface));

                let rx = counter_rate(previous.map(|p| p.rx_bytes), current.rx_bytes, elapsed);
                let tx = counter_rate(previous.map(|p| p.tx_bytes), current.tx_bytes, elapsed);

                if rx.is_regressed() || tx.is_regressed() {
                    debug!(
                        interface = %current.interface,
                        "network: byte counters went backwards, re-baselining"
                    );
                    self.rx_rate = 0.0;
                    self.tx_rate = 0.0;
                } else {
                    self.rx_rate = rx.or_hold(self.rx_rate);
                    self.tx_rate = tx.or_hold(self.tx_rate);
                }
                self.primary = Some(current.clone());
            }
            None => {
                self.rx_rate = 0.0;
                self.tx_rate = 0.0;
                self.primary = None;
            }
        }

        self.download.push(self.download_mb());
        self.upload.push(self.upload_mb());

        self.interfaces = devices.iter().map(|d| d.interface.clone()).collect();
        self.counters.store(devices, now);
    }

    pub fn set_history_size(&mut self, history: usize) {
        self.download.resize(history);
        self.upload.resize(history);
    }

    /// Name of the primary interface, empty when there is none.
    pub fn primary_interface(&self) -> &str {
        self.primary
            .as_ref()
            .map(|d| d.interface.as_str())
            .unwrap_or("")
    }

    /// Interfaces seen on the last tick, in file order.
    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    /// Download rate of the primary interface in MB/s.
    pub fn download_mb(&self) -> f64 {
        bytes_to_mb(self.rx_rate)
    }

    /// Upload rate of the primary interface in MB/s.
    pub fn upload_mb(&self) -> f64 {
        bytes_to_mb(self.tx_rate)
    }

    pub fn total_rx_bytes(&self) -> u64 {
        self.primary.as_ref().map(|d| d.rx_bytes).unwrap_or(0)
    }

    pub fn total_tx_bytes(&self) -> u64 {
        self.primary.as_ref().map(|d| d.tx_bytes).unwrap_or(0)
    }

    pub fn download_series(&self) -> &Series {
        &self.download
    }

    pub fn upload_series(&self) -> &Series {
        &self.upload
    }

    fn read_net_dev(&self) -> Result<Vec<NetDevStats>, CollectError> {
        let content = self.fs.read_to_string(&self.proc_path.join("net/dev"))?;
        Ok(parse_net_dev(&content)?)
    }

    #[cfg(test)]
    pub(crate) fn fs_mut(&mut self) -> &mut F {
        &mut self.fs
    }
}

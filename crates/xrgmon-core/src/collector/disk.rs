//! Disk throughput collector over `/proc/diskstats`.

use std::path::PathBuf;
use std::time::Instant;

use tracing::debug;

use crate::collector::CollectError;
use crate::collector::primary::{is_partition, select_primary};
use crate::collector::procfs::parser::{DiskStats, parse_diskstats};
use crate::collector::traits::FileSystem;
use crate::rates::{CounterSnapshot, SECTOR_SIZE, bytes_to_mb, counter_rate};
use crate::series::Series;

/// Samples read and write throughput of the primary whole disk.
pub struct DiskCollector<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
    counters: CounterSnapshot<Vec<DiskStats>>,
    read: Series,
    write: Series,
    primary: Option<DiskStats>,
    read_rate: f64,
    write_rate: f64,
}

impl<F: FileSystem> DiskCollector<F> {
    /// Creates the collector and records the current counters as baseline.
    pub fn new(fs: F, proc_path: impl Into<PathBuf>, history: usize) -> Self {
        let now = Instant::now();
        let mut collector = Self {
            fs,
            proc_path: proc_path.into(),
            counters: CounterSnapshot::new(now),
            read: Series::new(history),
            write: Series::new(history),
            primary: None,
            read_rate: 0.0,
            write_rate: 0.0,
        };
        match collector.read_diskstats() {
            Ok(disks) => collector.counters.store(disks, now),
            Err(e) => debug!(error = %e, "disk: no initial diskstats reading"),
        }
        collector
    }

    pub fn update(&mut self) {
        self.update_at(Instant::now());
    }

    pub fn update_at(&mut self, now: Instant) {
        let disks = self.read_diskstats().unwrap_or_else(|e| {
            debug!(error = %e, "disk: diskstats unavailable");
            Vec::new()
        });

        let idx = select_primary(
            &disks,
            |d| is_partition(&d.device),
            |d| d.reads > 0 || d.writes > 0,
        );

        match disks.get(idx) {
            Some(current) => {
                let elapsed = self.counters.elapsed_secs(now);
                let previous = self
                    .counters
                    .previous()
                    .and_then(|p| p.iter().find(|d| d.device == current.device));

                let read = counter_rate(
                    previous.map(|p| p.read_sectors * SECTOR_SIZE),
                    current.read_sectors * SECTOR_SIZE,
                    elapsed,
                );
                let write = counter_rate(
                    previous.map(|p| p.write_sectors * SECTOR_SIZE),
                    current.write_sectors * SECTOR_SIZE,
                    elapsed,
                );

                if read.is_regressed() || write.is_regressed() {
                    debug!(
                        device = %current.device,
                        "disk: sector counters went backwards, re-baselining"
                    );
                    self.read_rate = 0.0;
                    self.write_rate = 0.0;
                } else {
                    self.read_rate = read.or_hold(self.read_rate);
                    self.write_rate = write.or_hold(self.write_rate);
                }
                self.primary = Some(current.clone());
            }
            None => {
                self.read_rate = 0.0;
                self.write_rate = 0.0;
                self.primary = None;
            }
        }

        self.read.push(self.read_mb());
        self.write.push(self.write_mb());
        self.counters.store(disks, now);
    }

    pub fn set_history_size(&mut self, history: usize) {
        self.read.resize(history);
        self.write.resize(history);
    }

    /// Name of the primary disk, empty when there is none.
    pub fn primary_device(&self) -> &str {
        self.primary
            .as_ref()
            .map(|d| d.device.as_str())
            .unwrap_or("")
    }

    pub fn read_mb(&self) -> f64 {
        bytes_to_mb(self.read_rate)
    }

    pub fn write_mb(&self) -> f64 {
        bytes_to_mb(self.write_rate)
    }

    pub fn total_read_bytes(&self) -> u64 {
        self.primary
            .as_ref()
            .map(|d| d.read_sectors * SECTOR_SIZE)
            .unwrap_or(0)
    }

    pub fn total_write_bytes(&self) -> u64 {
        self.primary
            .as_ref()
            .map(|d| d.write_sectors * SECTOR_SIZE)
            .unwrap_or(0)
    }

    pub fn read_series(&self) -> &Series {
        &self.read
    }

    pub fn write_series(&self) -> &Series {
        &self.write
    }

    fn read_diskstats(&self) -> Result<Vec<DiskStats>, CollectError> {
        let content = self.fs.read_to_string(&self.proc_path.join("diskstats"))?;
        Ok(parse_diskstats(&content)?)
    }

    #[cfg(test)]
    pub(crate) fn fs_mut(&mut self) -> &mut F {
        &mut self.fs
    }
}

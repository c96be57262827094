//! Memory and paging collector over `/proc/meminfo` and `/proc/vmstat`.

use std::path::PathBuf;
use std::time::Instant;

use tracing::debug;

use crate::collector::CollectError;
use crate::collector::procfs::parser::{MemInfo, VmstatInfo, parse_meminfo, parse_vmstat};
use crate::collector::traits::FileSystem;
use crate::rates::{CounterSnapshot, counter_rate};
use crate::series::Series;

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Samples memory breakdown percentages and paging activity.
///
/// All byte figures are converted from the kB values of `/proc/meminfo`.
/// Used memory is total minus available, so reclaimable cache is not
/// counted as used.
pub struct MemoryCollector<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
    counters: CounterSnapshot<VmstatInfo>,
    used: Series,
    wired: Series,
    cached: Series,
    swap: Series,
    page_activity: Series,
    info: MemInfo,
}

impl<F: FileSystem> MemoryCollector<F> {
    /// Creates the collector with the current paging counters as baseline.
    pub fn new(fs: F, proc_path: impl Into<PathBuf>, history: usize) -> Self {
        let now = Instant::now();
        let mut collector = Self {
            fs,
            proc_path: proc_path.into(),
            counters: CounterSnapshot::new(now),
            used: Series::new(history),
            wired: Series::new(history),
            cached: Series::new(history),
            swap: Series::new(history),
            page_activity: Series::new(history),
            info: MemInfo::default(),
        };
        match collector.read_vmstat() {
            Ok(vmstat) => collector.counters.store(vmstat, now),
            Err(e) => debug!(error = %e, "memory: no initial vmstat reading"),
        }
        collector
    }

    pub fn update(&mut self) {
        self.update_at(Instant::now());
    }

    pub fn update_at(&mut self, now: Instant) {
        self.info = self.read_meminfo().unwrap_or_else(|e| {
            debug!(error = %e, "memory: meminfo unavailable");
            MemInfo::default()
        });

        let info = &self.info;
        let total = info.mem_total;
        self.used
            .push(percent(total.saturating_sub(info.mem_available), total));
        self.wired.push(percent(info.buffers + info.slab, total));
        self.cached.push(percent(info.cached, total));
        self.swap.push(percent(
            info.swap_total.saturating_sub(info.swap_free),
            info.swap_total,
        ));

        let activity = match self.read_vmstat() {
            Ok(vmstat) => {
                let elapsed = self.counters.elapsed_secs(now);
                let previous = self.counters.previous();
                let page_in = counter_rate(previous.map(|p| p.pgpgin), vmstat.pgpgin, elapsed);
                let page_out = counter_rate(previous.map(|p| p.pgpgout), vmstat.pgpgout, elapsed);

                let activity = if page_in.is_regressed() || page_out.is_regressed() {
                    debug!("memory: paging counters went backwards, re-baselining");
                    0.0
                } else {
                    page_in.or_zero() + page_out.or_zero()
                };
                self.counters.store(vmstat, now);
                activity
            }
            Err(e) => {
                debug!(error = %e, "memory: vmstat unavailable");
                0.0
            }
        };
        self.page_activity.push(activity);
    }

    pub fn set_history_size(&mut self, history: usize) {
        for series in [
            &mut self.used,
            &mut self.wired,
            &mut self.cached,
            &mut self.swap,
            &mut self.page_activity,
        ] {
            series.resize(history);
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.info.mem_total * 1024
    }

    pub fn used_bytes(&self) -> u64 {
        self.info.mem_total.saturating_sub(self.info.mem_available) * 1024
    }

    /// Available memory in bytes (what could be handed out without swapping).
    pub fn free_bytes(&self) -> u64 {
        self.info.mem_available * 1024
    }

    pub fn used_percent(&self) -> f64 {
        percent(
            self.info.mem_total.saturating_sub(self.info.mem_available),
            self.info.mem_total,
        )
    }

    pub fn swap_used_bytes(&self) -> u64 {
        self.info.swap_total.saturating_sub(self.info.swap_free) * 1024
    }

    pub fn swap_total_bytes(&self) -> u64 {
        self.info.swap_total * 1024
    }

    pub fn used_series(&self) -> &Series {
        &self.used
    }

    /// Kernel-held memory (buffers + slab) as percent of total.
    pub fn wired_series(&self) -> &Series {
        &self.wired
    }

    pub fn cached_series(&self) -> &Series {
        &self.cached
    }

    pub fn swap_series(&self) -> &Series {
        &self.swap
    }

    /// Pages moved in plus out per second.
    pub fn page_activity_series(&self) -> &Series {
        &self.page_activity
    }

    fn read_meminfo(&self) -> Result<MemInfo, CollectError> {
        let content = self.fs.read_to_string(&self.proc_path.join("meminfo"))?;
        Ok(parse_meminfo(&content)?)
    }

    fn read_vmstat(&self) -> Result<VmstatInfo, CollectError> {
        let content = self.fs.read_to_string(&self.proc_path.join("vmstat"))?;
        Ok(parse_vmstat(&content)?)
    }

    #[cfg(test)]
    pub(crate) fn fs_mut(&mut self) -> &mut F {
        &mut self.fs
    }
}

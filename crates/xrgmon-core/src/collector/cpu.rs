//! CPU usage collector over `/proc/stat` and `/proc/loadavg`.

use std::path::PathBuf;
use std::time::Instant;

use tracing::debug;

use crate::collector::CollectError;
use crate::collector::procfs::parser::{
    CpuStat, GlobalStat, LoadAvg, parse_global_stat, parse_loadavg,
};
use crate::collector::traits::FileSystem;
use crate::rates::{CounterSnapshot, counter_delta};
use crate::series::Series;

/// Usage split derived from two jiffy readings, all in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuUsage {
    pub total: f64,
    pub system: f64,
    pub user: f64,
    pub nice: f64,
}

/// Computes usage between two readings of the same CPU line.
///
/// Returns `None` when any counter went backwards. A zero total delta gives
/// all-zero usage.
pub fn cpu_usage(prev: &CpuStat, curr: &CpuStat) -> Option<CpuUsage> {
    let total = counter_delta(curr.total(), prev.total())?;
    let idle = counter_delta(curr.idle_total(), prev.idle_total())?;
    let system = counter_delta(curr.system, prev.system)?;
    let user = counter_delta(curr.user, prev.user)?;
    let nice = counter_delta(curr.nice, prev.nice)?;

    if total == 0 {
        return Some(CpuUsage::default());
    }
    let pct = |v: u64| v as f64 / total as f64 * 100.0;
    Some(CpuUsage {
        total: pct(total.saturating_sub(idle)),
        system: pct(system),
        user: pct(user),
        nice: pct(nice),
    })
}

#[derive(Debug)]
struct CoreState {
    id: u32,
    usage: f64,
    series: Series,
}

/// Samples aggregate and per-core CPU usage once per tick.
///
/// Keeps `system`, `user` and `nice` series for the aggregate line plus one
/// total-usage series per core. Cores are added the first time they appear
/// and kept afterwards; a core missing from a later reading gets a 0 sample.
pub struct CpuCollector<F: FileSystem> {
    fs: F,
    proc_path: PathBuf,
    counters: CounterSnapshot<GlobalStat>,
    history: usize,
    system: Series,
    user: Series,
    nice: Series,
    cores: Vec<CoreState>,
    total_usage: f64,
    load: LoadAvg,
    procs_running: u64,
}

impl<F: FileSystem> CpuCollector<F> {
    /// Creates a new CPU collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    /// * `history` - Number of samples kept per series
    ///
    /// Reads `/proc/stat` once so the first `update` already has a baseline.
    pub fn new(fs: F, proc_path: impl Into<PathBuf>, history: usize) -> Self {
        let now = Instant::now();
        let mut collector = Self {
            fs,
            proc_path: proc_path.into(),
            counters: CounterSnapshot::new(now),
            history,
            system: Series::new(history),
            user: Series::new(history),
            nice: Series::new(history),
            cores: Vec::new(),
            total_usage: 0.0,
            load: LoadAvg::default(),
            procs_running: 0,
        };
        match collector.read_stat() {
            Ok(stat) => collector.counters.store(stat, now),
            Err(e) => debug!(error = %e, "cpu: no initial stat reading"),
        }
        collector
    }

    pub fn update(&mut self) {
        self.update_at(Instant::now());
    }

    /// Runs one tick using `now` as the capture time.
    pub fn update_at(&mut self, now: Instant) {
        let stat = match self.read_stat() {
            Ok(stat) => Some(stat),
            Err(e) => {
                debug!(error = %e, "cpu: stat unavailable");
                None
            }
        };

        self.load = self.read_loadavg().unwrap_or_else(|e| {
            debug!(error = %e, "cpu: loadavg unavailable");
            LoadAvg::default()
        });

        let Some(stat) = stat else {
            self.total_usage = 0.0;
            self.push_aggregate(CpuUsage::default());
            for core in &mut self.cores {
                core.usage = 0.0;
                core.series.push(0.0);
            }
            return;
        };

        self.procs_running = stat.procs_running;

        let previous = self.counters.previous();
        let aggregate = match (
            previous.and_then(|p| p.aggregate()),
            stat.aggregate(),
        ) {
            (Some(prev), Some(curr)) => cpu_usage(prev, curr).unwrap_or_else(|| {
                debug!("cpu: aggregate counters went backwards, re-baselining");
                CpuUsage::default()
            }),
            _ => CpuUsage::default(),
        };

        let mut seen = Vec::with_capacity(self.cores.len());
        for curr in stat.cores() {
            let Some(id) = curr.cpu_id else { continue };
            let prev = previous.and_then(|p| p.cores().find(|c| c.cpu_id == Some(id)));
            let usage = prev
                .and_then(|prev| cpu_usage(prev, curr))
                .map(|u| u.total)
                .unwrap_or(0.0);
            seen.push((id, usage));
        }

        self.total_usage = aggregate.total;
        self.push_aggregate(aggregate);

        for (id, _) in &seen {
            if !self.cores.iter().any(|c| c.id == *id) {
                self.cores.push(CoreState {
                    id: *id,
                    usage: 0.0,
                    series: Series::new(self.history),
                });
            }
        }
        for core in &mut self.cores {
            core.usage = seen
                .iter()
                .find(|(id, _)| *id == core.id)
                .map(|(_, u)| *u)
                .unwrap_or(0.0);
            core.series.push(core.usage);
        }

        self.counters.store(stat, now);
    }

    /// Resizes every series, keeping the most recent samples.
    pub fn set_history_size(&mut self, history: usize) {
        self.history = history;
        self.system.resize(history);
        self.user.resize(history);
        self.nice.resize(history);
        for core in &mut self.cores {
            core.series.resize(history);
        }
    }

    /// Number of cores seen so far.
    pub fn core_count(&self) -> usize {
        self.cores.len()
    }

    /// Aggregate usage of the last tick, in percent.
    pub fn total_usage(&self) -> f64 {
        self.total_usage
    }

    /// Usage of the `index`-th core in percent, 0 when out of range.
    pub fn core_usage(&self, index: usize) -> f64 {
        self.cores.get(index).map(|c| c.usage).unwrap_or(0.0)
    }

    pub fn core_series(&self, index: usize) -> Option<&Series> {
        self.cores.get(index).map(|c| &c.series)
    }

    pub fn system_series(&self) -> &Series {
        &self.system
    }

    pub fn user_series(&self) -> &Series {
        &self.user
    }

    pub fn nice_series(&self) -> &Series {
        &self.nice
    }

    pub fn load_average(&self) -> &LoadAvg {
        &self.load
    }

    pub fn procs_running(&self) -> u64 {
        self.procs_running
    }

    fn push_aggregate(&mut self, usage: CpuUsage) {
        self.system.push(usage.system);
        self.user.push(usage.user);
        self.nice.push(usage.nice);
    }

    fn read_stat(&self) -> Result<GlobalStat, CollectError> {
        let content = self.fs.read_to_string(&self.proc_path.join("stat"))?;
        Ok(parse_global_stat(&content)?)
    }

    fn read_loadavg(&self) -> Result<LoadAvg, CollectError> {
        let content = self.fs.read_to_string(&self.proc_path.join("loadavg"))?;
        Ok(parse_loadavg(&content)?)
    }

    #[cfg(test)]
    pub(crate) fn fs_mut(&mut self) -> &mut F {
        &mut self.fs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;
    use std::time::Duration;

    const STAT_T0: &str = "\
cpu  100 0 100 800 0 0 0 0
cpu0 50 0 50 400 0 0 0 0
cpu1 50 0 50 400 0 0 0 0
procs_running 3
";

    const STAT_T1: &str = "\
cpu  150 10 140 900 0 0 0 0
cpu0 100 0 50 450 0 0 0 0
cpu1 50 10 90 450 0 0 0 0
procs_running 5
";

    fn fs_with_stat(stat: &str) -> MockFs {
        let mut fs = MockFs::new();
        fs.add_file("/proc/stat", stat);
        fs.add_file("/proc/loadavg", "0.50 0.40 0.30 2/300 4242\n");
        fs
    }

    #[test]
    fn test_cpu_usage_split() {
        let prev = CpuStat {
            user: 100,
            system: 100,
            idle: 800,
            ..Default::default()
        };
        let curr = CpuStat {
            user: 150,
            nice: 10,
            system: 140,
            idle: 900,
            ..Default::default()
        };
        let usage = cpu_usage(&prev, &curr).unwrap();
        assert!((usage.total - 50.0).abs() < 1e-9);
        assert!((usage.user - 25.0).abs() < 1e-9);
        assert!((usage.system - 20.0).abs() < 1e-9);
        assert!((usage.nice - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_cpu_usage_regression_and_idle() {
        let prev = CpuStat {
            user: 100,
            idle: 800,
            ..Default::default()
        };
        let back = CpuStat {
            user: 50,
            idle: 800,
            ..Default::default()
        };
        assert!(cpu_usage(&prev, &back).is_none());
        assert_eq!(cpu_usage(&prev, &prev), Some(CpuUsage::default()));
    }

    #[test]
    fn test_first_tick_appends_zero() {
        let mut collector = CpuCollector::new(fs_with_stat(STAT_T0), "/proc", 10);
        collector.update();

        assert_eq!(collector.core_count(), 2);
        assert_eq!(collector.total_usage(), 0.0);
        assert_eq!(collector.system_series().len(), 1);
        assert_eq!(collector.core_series(1).unwrap().len(), 1);
        assert_eq!(collector.procs_running(), 3);
        assert_eq!(collector.load_average().load1, 0.50);
    }

    #[test]
    fn test_second_tick_computes_usage() {
        let t0 = Instant::now();
        let mut collector = CpuCollector::new(fs_with_stat(STAT_T0), "/proc", 10);
        collector.update_at(t0);

        collector.fs_mut().add_file("/proc/stat", STAT_T1);
        collector.update_at(t0 + Duration::from_secs(1));

        assert!((collector.total_usage() - 50.0).abs() < 1e-9);
        assert!((collector.user_series().latest() - 25.0).abs() < 1e-9);
        assert!((collector.core_usage(0) - 50.0).abs() < 1e-9);
        assert!((collector.core_usage(1) - 50.0).abs() < 1e-9);
        assert_eq!(collector.core_usage(7), 0.0);
        assert_eq!(collector.procs_running(), 5);
    }

    #[test]
    fn test_first_update_measures_from_construction() {
        let mut collector = CpuCollector::new(fs_with_stat(STAT_T0), "/proc", 10);
        collector.fs_mut().add_file("/proc/stat", STAT_T1);
        collector.update();

        assert!((collector.total_usage() - 50.0).abs() < 1e-9);
        assert!((collector.system_series().latest() - 20.0).abs() < 1e-9);
        assert!((collector.core_usage(1) - 50.0).abs() < 1e-9);
        assert_eq!(collector.system_series().len(), 1);
    }

    #[test]
    fn test_missing_stat_still_appends() {
        let mut collector = CpuCollector::new(MockFs::new(), "/proc", 10);
        collector.update();
        collector.update();

        assert_eq!(collector.core_count(), 0);
        assert_eq!(collector.system_series().len(), 2);
        assert_eq!(collector.load_average(), &LoadAvg::default());
    }

    #[test]
    fn test_set_history_size() {
        let mut collector = CpuCollector::new(fs_with_stat(STAT_T0), "/proc", 10);
        for _ in 0..6 {
            collector.update();
        }
        collector.set_history_size(4);

        assert_eq!(collector.system_series().capacity(), 4);
        assert_eq!(collector.system_series().len(), 4);
        assert_eq!(collector.core_series(0).unwrap().capacity(), 4);
    }
}

//! Battery collector over `/sys/class/power_supply`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::collector::traits::FileSystem;
use crate::series::Series;

/// Default number of samples kept for battery power history.
pub const DEFAULT_BATTERY_HISTORY: usize = 300;

/// Overall battery state, derived from the first battery found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum BatteryStatus {
    #[default]
    NoBattery,
    Discharging,
    Charging,
    Full,
    NotCharging,
}

impl BatteryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatteryStatus::NoBattery => "no battery",
            BatteryStatus::Discharging => "discharging",
            BatteryStatus::Charging => "charging",
            BatteryStatus::Full => "full",
            BatteryStatus::NotCharging => "not charging",
        }
    }
}

/// Which pair of sysfs files the charge figures came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeUnit {
    /// `energy_now`/`energy_full`, µWh.
    MicroWattHours,
    /// `charge_now`/`charge_full`, µAh.
    MicroAmpHours,
}

/// One battery as read on the last tick.
#[derive(Debug, Clone, PartialEq)]
pub struct BatteryInfo {
    pub name: String,
    pub is_charging: bool,
    pub is_full: bool,
    pub is_plugged_in: bool,
    /// Raw charge in `unit`.
    pub charge: u64,
    /// Raw full capacity in `unit`.
    pub capacity: u64,
    pub unit: ChargeUnit,
    /// Volts.
    pub voltage: f64,
    /// Amperes; negative while not charging.
    pub current: f64,
    pub minutes_remaining: u32,
}

impl BatteryInfo {
    /// Signed power in watts: positive while charging.
    pub fn watts(&self) -> f64 {
        self.current * self.voltage
    }

    fn estimate_minutes(&self) -> u32 {
        if self.current == 0.0 || self.capacity == 0 {
            return 0;
        }
        let remaining = if self.is_charging {
            self.capacity.saturating_sub(self.charge)
        } else {
            self.charge
        };
        // µWh over W, or µAh over A, both give µh.
        let rate = match self.unit {
            ChargeUnit::MicroWattHours => self.watts().abs(),
            ChargeUnit::MicroAmpHours => self.current.abs(),
        };
        if rate == 0.0 {
            return 0;
        }
        let hours = remaining as f64 / (rate * 1_000_000.0);
        (hours * 60.0) as u32
    }
}

/// Samples every battery once per tick.
///
/// The battery list is rebuilt from scratch on each tick; the charge and
/// discharge power series persist across ticks.
pub struct BatteryCollector<F: FileSystem> {
    fs: F,
    supply_path: PathBuf,
    batteries: Vec<BatteryInfo>,
    charge_watts: Series,
    discharge_watts: Series,
}

impl<F: FileSystem> BatteryCollector<F> {
    /// Creates a new battery collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `sys_path` - Base path to sysfs (usually "/sys")
    /// * `history` - Number of samples kept per series
    pub fn new(fs: F, sys_path: impl AsRef<Path>, history: usize) -> Self {
        Self {
            fs,
            supply_path: sys_path.as_ref().join("class/power_supply"),
            batteries: Vec::new(),
            charge_watts: Series::new(history),
            discharge_watts: Series::new(history),
        }
    }

    pub fn update(&mut self) {
        self.update_at(Instant::now());
    }

    /// Runs one tick. Battery readings carry no counters, so `_now` only
    /// keeps the signature uniform across collectors.
    pub fn update_at(&mut self, _now: Instant) {
        self.batteries.clear();

        match self.fs.read_dir(&self.supply_path) {
            Ok(mut entries) => {
                entries.sort();
                for entry in entries {
                    if let Some(info) = self.read_battery(&entry) {
                        self.batteries.push(info);
                    }
                }
            }
            Err(e) => {
                debug!(
                    path = %self.supply_path.display(),
                    error = %e,
                    "battery: power_supply unavailable"
                );
            }
        }

        let (mut charging, mut discharging) = (0.0, 0.0);
        for battery in &self.batteries {
            let watts = battery.watts();
            if watts < 0.0 {
                discharging += -watts;
            } else {
                charging += watts;
            }
        }
        self.charge_watts.push(charging);
        self.discharge_watts.push(discharging);
    }

    pub fn set_history_size(&mut self, history: usize) {
        self.charge_watts.resize(history);
        self.discharge_watts.resize(history);
    }

    pub fn batteries(&self) -> &[BatteryInfo] {
        &self.batteries
    }

    pub fn status(&self) -> BatteryStatus {
        let Some(battery) = self.batteries.first() else {
            return BatteryStatus::NoBattery;
        };
        match (battery.is_plugged_in, battery.is_full, battery.is_charging) {
            (true, true, _) => BatteryStatus::Full,
            (true, false, true) => BatteryStatus::Charging,
            (true, false, false) => BatteryStatus::NotCharging,
            (false, _, _) => BatteryStatus::Discharging,
        }
    }

    /// Largest time-remaining estimate over all batteries.
    pub fn minutes_remaining(&self) -> u32 {
        self.batteries
            .iter()
            .map(|b| b.minutes_remaining)
            .max()
            .unwrap_or(0)
    }

    pub fn total_charge(&self) -> u64 {
        self.batteries.iter().map(|b| b.charge).sum()
    }

    pub fn total_capacity(&self) -> u64 {
        self.batteries.iter().map(|b| b.capacity).sum()
    }

    /// Charge over capacity, rounded to the nearest percent.
    pub fn charge_percent(&self) -> u32 {
        let (charge, capacity) = (self.total_charge(), self.total_capacity());
        if charge == 0 || capacity == 0 {
            return 0;
        }
        (100.0 * charge as f64 / capacity as f64 + 0.5) as u32
    }

    pub fn charge_watts_series(&self) -> &Series {
        &self.charge_watts
    }

    pub fn discharge_watts_series(&self) -> &Series {
        &self.discharge_watts
    }

    fn read_battery(&self, dir: &Path) -> Option<BatteryInfo> {
        if self.read_string(&dir.join("type"))? != "Battery" {
            return None;
        }
        let name = dir.file_name()?.to_string_lossy().into_owned();

        let status = self.read_string(&dir.join("status")).unwrap_or_default();
        let is_charging = status == "Charging";
        let is_full = status == "Full";
        let is_plugged_in = is_charging || is_full || status == "Not charging";

        let energy_now = self.read_u64(&dir.join("energy_now"));
        let energy_full = self.read_u64(&dir.join("energy_full"));
        let (charge, capacity, unit) = if energy_now > 0 || energy_full > 0 {
            (energy_now, energy_full, ChargeUnit::MicroWattHours)
        } else {
            (
                self.read_u64(&dir.join("charge_now")),
                self.read_u64(&dir.join("charge_full")),
                ChargeUnit::MicroAmpHours,
            )
        };

        let voltage = self.read_i64(&dir.join("voltage_now")) as f64 / 1_000_000.0;
        let mut current = self.read_i64(&dir.join("current_now")) as f64 / 1_000_000.0;
        if !is_charging && current > 0.0 {
            current = -current;
        }

        let mut info = BatteryInfo {
            name,
            is_charging,
            is_full,
            is_plugged_in,
            charge,
            capacity,
            unit,
            voltage,
            current,
            minutes_remaining: 0,
        };
        info.minutes_remaining = info.estimate_minutes();
        Some(info)
    }

    fn read_string(&self, path: &Path) -> Option<String> {
        self.fs
            .read_to_string(path)
            .ok()
            .map(|s| s.trim().to_string())
    }

    fn read_i64(&self, path: &Path) -> i64 {
        self.read_string(path)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }

    fn read_u64(&self, path: &Path) -> u64 {
        self.read_i64(path).max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    #[test]
    fn test_no_battery() {
        let mut collector = BatteryCollector::new(MockFs::typical_system(), "/sys", 10);
        collector.update();

        assert_eq!(collector.status(), BatteryStatus::NoBattery);
        assert_eq!(collector.charge_percent(), 0);
        assert_eq!(collector.minutes_remaining(), 0);
        assert_eq!(collector.charge_watts_series().len(), 1);
    }

    #[test]
    fn test_discharging_laptop() {
        let mut collector = BatteryCollector::new(MockFs::laptop_battery(), "/sys", 10);
        collector.update();

        // AC adapter is skipped, only BAT0 counts
        assert_eq!(collector.batteries().len(), 1);
        let bat = &collector.batteries()[0];
        assert_eq!(bat.name, "BAT0");
        assert_eq!(bat.unit, ChargeUnit::MicroWattHours);
        assert!((bat.voltage - 12.0).abs() < 1e-9);
        assert!((bat.current + 1.5).abs() < 1e-9);

        assert_eq!(collector.status(), BatteryStatus::Discharging);
        assert_eq!(collector.charge_percent(), 75);
        // 36 Wh left at 18 W
        assert_eq!(collector.minutes_remaining(), 120);
        assert!((collector.discharge_watts_series().latest() - 18.0).abs() < 1e-9);
        assert_eq!(collector.charge_watts_series().latest(), 0.0);
    }

    #[test]
    fn test_charging_with_charge_files() {
        let mut fs = MockFs::new();
        let bat = "/sys/class/power_supply/BAT1";
        fs.add_file(format!("{bat}/type"), "Battery\n");
        fs.add_file(format!("{bat}/status"), "Charging\n");
        fs.add_file(format!("{bat}/charge_now"), "2000000\n");
        fs.add_file(format!("{bat}/charge_full"), "4000000\n");
        fs.add_file(format!("{bat}/voltage_now"), "10000000\n");
        fs.add_file(format!("{bat}/current_now"), "1000000\n");

        let mut collector = BatteryCollector::new(fs, "/sys", 10);
        collector.update();

        assert_eq!(collector.status(), BatteryStatus::Charging);
        assert_eq!(collector.batteries()[0].unit, ChargeUnit::MicroAmpHours);
        assert_eq!(collector.charge_percent(), 50);
        // 2 Ah to go at 1 A
        assert_eq!(collector.minutes_remaining(), 120);
        assert!((collector.charge_watts_series().latest() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_full_and_not_charging_status() {
        let mut fs = MockFs::new();
        fs.add_file("/sys/class/power_supply/BAT0/type", "Battery\n");
        fs.add_file("/sys/class/power_supply/BAT0/status", "Full\n");
        let mut collector = BatteryCollector::new(fs, "/sys", 10);
        collector.update();
        assert_eq!(collector.status(), BatteryStatus::Full);

        let mut fs = MockFs::new();
        fs.add_file("/sys/class/power_supply/BAT0/type", "Battery\n");
        fs.add_file("/sys/class/power_supply/BAT0/status", "Not charging\n");
        let mut collector = BatteryCollector::new(fs, "/sys", 10);
        collector.update();
        assert_eq!(collector.status(), BatteryStatus::NotCharging);
    }

    #[test]
    fn test_battery_list_rebuilt_each_tick() {
        let mut collector = BatteryCollector::new(MockFs::laptop_battery(), "/sys", 10);
        collector.update();
        collector.update();

        assert_eq!(collector.batteries().len(), 1);
        assert_eq!(collector.discharge_watts_series().len(), 2);
    }
}

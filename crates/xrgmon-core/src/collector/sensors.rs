//! Hardware sensor registry over `/sys/class/hwmon`.
//!
//! Sensors are not known ahead of time. Each chip directory is scanned every
//! tick for `temp<N>_input`, `fan<N>_input`, `in<N>_input` and
//! `power<N>_input` files; every metric found is keyed by
//! `<chip>_<label>` and registered on first sight. Entries are never removed
//! within a run, and iteration follows registration order.
//!
//! Two chips can report the same name (one `nvme` chip per drive). The first
//! one in directory order keeps the plain name; later ones are keyed as
//! `<name>-<hwmon dir>`, e.g. `nvme-hwmon3_Composite`.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, trace};

use crate::collector::traits::FileSystem;
use crate::series::Series;

/// Default number of samples kept per sensor.
pub const DEFAULT_SENSOR_HISTORY: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SensorType {
    Temperature,
    Fan,
    Voltage,
    Power,
}

impl SensorType {
    /// Filename prefix of the metric, e.g. `temp` in `temp1_input`.
    fn prefix(&self) -> &'static str {
        match self {
            SensorType::Temperature => "temp",
            SensorType::Fan => "fan",
            SensorType::Voltage => "in",
            SensorType::Power => "power",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            SensorType::Temperature => "°C",
            SensorType::Fan => "RPM",
            SensorType::Voltage => "V",
            SensorType::Power => "W",
        }
    }

    /// Plausible (min, max) range for display scaling.
    pub fn default_range(&self) -> (f64, f64) {
        match self {
            SensorType::Temperature => (0.0, 100.0),
            SensorType::Fan => (0.0, 5000.0),
            SensorType::Voltage => (0.0, 15.0),
            SensorType::Power => (0.0, 300.0),
        }
    }

    /// Converts the raw sysfs integer to the display unit.
    fn convert(&self, raw: f64) -> f64 {
        match self {
            SensorType::Temperature => raw / 1000.0,
            SensorType::Fan => raw,
            SensorType::Voltage => raw / 1000.0,
            SensorType::Power => raw / 1_000_000.0,
        }
    }

    /// Matches `<prefix><N>_input` and returns the type and `N`.
    fn from_input_file(file_name: &str) -> Option<(SensorType, &str)> {
        let stem = file_name.strip_suffix("_input")?;
        [
            SensorType::Power,
            SensorType::Temperature,
            SensorType::Fan,
            SensorType::Voltage,
        ]
        .into_iter()
        .find_map(|t| {
            let index = stem.strip_prefix(t.prefix())?;
            (!index.is_empty() && index.bytes().all(|b| b.is_ascii_digit())).then_some((t, index))
        })
    }
}

/// One discovered sensor and its history.
#[derive(Debug)]
pub struct SensorEntry {
    pub key: String,
    pub chip: String,
    pub label: String,
    pub sensor_type: SensorType,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    series: Series,
}

impl SensorEntry {
    fn new(chip: String, label: String, sensor_type: SensorType, history: usize) -> Self {
        let (min, max) = sensor_type.default_range();
        Self {
            key: format!("{}_{}", chip, label),
            chip,
            label,
            sensor_type,
            value: 0.0,
            min,
            max,
            series: Series::new(history),
        }
    }

    pub fn unit(&self) -> &'static str {
        self.sensor_type.unit()
    }

    pub fn series(&self) -> &Series {
        &self.series
    }
}

/// Insertion-ordered registry of runtime-discovered sensors.
#[derive(Debug)]
pub struct SensorRegistry<F: FileSystem> {
    fs: F,
    hwmon_path: PathBuf,
    history: usize,
    entries: Vec<SensorEntry>,
    index: HashMap<String, usize>,
}

impl<F: FileSystem> SensorRegistry<F> {
    /// Creates an empty registry reading chips under `<sys_path>/class/hwmon`.
    pub fn new(fs: F, sys_path: impl AsRef<Path>, history: usize) -> Self {
        Self {
            fs,
            hwmon_path: sys_path.as_ref().join("class/hwmon"),
            history,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn update(&mut self) {
        self.update_at(Instant::now());
    }

    /// Scans every chip once. Sensor values are instantaneous, `_now` is unused.
    pub fn update_at(&mut self, _now: Instant) {
        let mut chips = match self.fs.read_dir(&self.hwmon_path) {
            Ok(chips) => chips,
            Err(e) => {
                debug!(
                    path = %self.hwmon_path.display(),
                    error = %e,
                    "sensors: hwmon unavailable"
                );
                return;
            }
        };
        chips.sort();

        let mut seen_chips = HashSet::with_capacity(chips.len());
        for chip_dir in chips {
            let mut chip = self.chip_name(&chip_dir);
            if !seen_chips.insert(chip.clone()) {
                let dir = chip_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                chip = format!("{}-{}", chip, dir);
                seen_chips.insert(chip.clone());
            }
            let Ok(mut files) = self.fs.read_dir(&chip_dir) else {
                continue;
            };
            files.sort();

            for file in files {
                let Some(file_name) = file.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let Some((sensor_type, idx)) = SensorType::from_input_file(file_name) else {
                    continue;
                };
                let label = self.label(&chip_dir, sensor_type, idx);
                let value = self.read_value(&file, sensor_type);
                self.record(&chip, label, sensor_type, value);
            }
        }
    }

    /// Updates (or creates) the entry for `chip`/`label` and appends `value`.
    pub fn record(&mut self, chip: &str, label: String, sensor_type: SensorType, value: f64) {
        let key = format!("{}_{}", chip, label);
        let pos = match self.index.get(&key) {
            Some(&pos) => pos,
            None => {
                trace!(key = %key, "sensors: new sensor");
                self.entries.push(SensorEntry::new(
                    chip.to_string(),
                    label,
                    sensor_type,
                    self.history,
                ));
                self.index.insert(key, self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        let entry = &mut self.entries[pos];
        entry.value = value;
        entry.series.push(value);
    }

    /// Resizes every entry's series; new entries use the new length too.
    pub fn set_history_size(&mut self, history: usize) {
        self.history = history;
        for entry in &mut self.entries {
            entry.series.resize(history);
        }
    }

    pub fn get(&self, key: &str) -> Option<&SensorEntry> {
        self.index.get(key).map(|&pos| &self.entries[pos])
    }

    /// Current value for `key`, 0 when unknown.
    pub fn value(&self, key: &str) -> f64 {
        self.get(key).map(|e| e.value).unwrap_or(0.0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.key.as_str())
    }

    /// Entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &SensorEntry> {
        self.entries.iter()
    }

    /// Entries of one type, in registration order.
    pub fn by_type(&self, sensor_type: SensorType) -> impl Iterator<Item = &SensorEntry> {
        self.entries
            .iter()
            .filter(move |e| e.sensor_type == sensor_type)
    }

    fn chip_name(&self, chip_dir: &Path) -> String {
        self.fs
            .read_to_string(&chip_dir.join("name"))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .or_else(|| {
                chip_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_default()
    }

    fn label(&self, chip_dir: &Path, sensor_type: SensorType, idx: &str) -> String {
        let synthesized = format!("{}{}", sensor_type.prefix(), idx);
        self.fs
            .read_to_string(&chip_dir.join(format!("{}_label", synthesized)))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(synthesized)
    }

    fn read_value(&self, path: &Path, sensor_type: SensorType) -> f64 {
        match self.fs.read_to_string(path) {
            Ok(content) => content
                .trim()
                .parse::<f64>()
                .map(|raw| sensor_type.convert(raw))
                .unwrap_or(0.0),
            Err(e) => {
                trace!(path = %path.display(), error = %e, "sensors: unreadable input");
                0.0
            }
        }
    }
}

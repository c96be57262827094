//! Counter-to-rate conversion shared by every sampling collector.
//!
//! This module is the single place where two readings of a monotonically
//! increasing OS counter become a per-second rate. A counter that goes
//! backwards (device reset, driver reload, 32-bit wrap) never produces a
//! rate; the caller re-baselines on the new reading instead.

use std::time::Instant;

/// Bytes per megabyte (2^20) used for every MB/s figure.
pub const BYTES_PER_MB: f64 = 1_048_576.0;

/// Size of a `/proc/diskstats` sector in bytes, independent of the device.
pub const SECTOR_SIZE: u64 = 512;

pub fn bytes_to_mb(bytes: f64) -> f64 {
    bytes / BYTES_PER_MB
}

// ---------------------------------------------------------------------------
// Delta helpers
// ---------------------------------------------------------------------------

/// Compute u64 delta, returning `None` on counter regression.
pub fn counter_delta(curr: u64, prev: u64) -> Option<u64> {
    (curr >= prev).then(|| curr - prev)
}

/// Outcome of turning a pair of counter readings into a rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateSample {
    /// No previous reading to compare against.
    Baseline,
    /// No time elapsed since the previous reading.
    Stalled,
    /// The counter went backwards.
    Regressed,
    /// Per-second rate.
    Rate(f64),
}

impl RateSample {
    pub fn value(self) -> Option<f64> {
        match self {
            RateSample::Rate(r) => Some(r),
            _ => None,
        }
    }

    /// Rate, or 0.0 for every other outcome.
    pub fn or_zero(self) -> f64 {
        self.value().unwrap_or(0.0)
    }

    /// Rate, `held` when no time elapsed, 0.0 on baseline or regression.
    pub fn or_hold(self, held: f64) -> f64 {
        match self {
            RateSample::Rate(r) => r,
            RateSample::Stalled => held,
            RateSample::Baseline | RateSample::Regressed => 0.0,
        }
    }

    pub fn is_regressed(self) -> bool {
        matches!(self, RateSample::Regressed)
    }
}

/// Per-second rate of a cumulative counter.
///
/// `elapsed` is in seconds.
pub fn counter_rate(prev: Option<u64>, curr: u64, elapsed: f64) -> RateSample {
    let Some(prev) = prev else {
        return RateSample::Baseline;
    };
    let Some(delta) = counter_delta(curr, prev) else {
        return RateSample::Regressed;
    };
    if elapsed <= 0.0 {
        return RateSample::Stalled;
    }
    RateSample::Rate(delta as f64 / elapsed)
}

// ---------------------------------------------------------------------------
// Snapshot state
// ---------------------------------------------------------------------------

/// Previous counter readings of one collector plus their capture time.
#[derive(Debug, Clone)]
pub struct CounterSnapshot<T> {
    previous: Option<T>,
    last: Instant,
}

impl<T> CounterSnapshot<T> {
    pub fn new(now: Instant) -> Self {
        Self {
            previous: None,
            last: now,
        }
    }

    /// Seconds between the last stored reading and `now` (0 if `now` is earlier).
    pub fn elapsed_secs(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.last).as_secs_f64()
    }

    pub fn previous(&self) -> Option<&T> {
        self.previous.as_ref()
    }

    /// Stores `current` as the previous reading for the next tick.
    pub fn store(&mut self, current: T, now: Instant) {
        self.previous = Some(current);
        self.last = now;
    }

    /// Advances the clock without replacing the stored reading.
    pub fn touch(&mut self, now: Instant) {
        self.last = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_counter_rate_exact() {
        assert_eq!(
            counter_rate(Some(1000), 1500, 2.0),
            RateSample::Rate(250.0)
        );
    }

    #[test]
    fn test_counter_rate_edge_cases() {
        assert_eq!(counter_rate(None, 1500, 2.0), RateSample::Baseline);
        assert_eq!(counter_rate(Some(1000), 1500, 0.0), RateSample::Stalled);
        assert_eq!(counter_rate(Some(1500), 1000, 2.0), RateSample::Regressed);
        assert_eq!(counter_rate(Some(7), 7, 1.0), RateSample::Rate(0.0));
    }

    #[test]
    fn test_rate_sample_policies() {
        assert_eq!(RateSample::Rate(3.0).or_hold(9.0), 3.0);
        assert_eq!(RateSample::Stalled.or_hold(9.0), 9.0);
        assert_eq!(RateSample::Regressed.or_hold(9.0), 0.0);
        assert_eq!(RateSample::Baseline.or_hold(9.0), 0.0);
        assert_eq!(RateSample::Stalled.or_zero(), 0.0);
        assert!(RateSample::Regressed.is_regressed());
    }

    #[test]
    fn test_bytes_to_mb() {
        assert_eq!(bytes_to_mb(2_097_152.0), 2.0);
        assert_eq!(bytes_to_mb(0.0), 0.0);
    }

    #[test]
    fn test_counter_delta() {
        assert_eq!(counter_delta(10, 4), Some(6));
        assert_eq!(counter_delta(4, 10), None);
    }

    #[test]
    fn test_counter_snapshot_elapsed() {
        let t0 = Instant::now();
        let mut snap: CounterSnapshot<u64> = CounterSnapshot::new(t0);
        assert!(snap.previous().is_none());

        let t1 = t0 + Duration::from_millis(1500);
        assert!((snap.elapsed_secs(t1) - 1.5).abs() < 1e-9);

        snap.store(42, t1);
        assert_eq!(snap.previous(), Some(&42));
        assert_eq!(snap.elapsed_secs(t1), 0.0);
        assert_eq!(snap.elapsed_secs(t0), 0.0);
    }
}

//! xrgmon-core - data acquisition and history for the xrgmon system monitor.
//!
//! Provides:
//! - `series` - fixed-capacity ring buffer with streaming min/max/sum
//! - `rates` - counter deltas to per-second rates
//! - `collector` - per-domain samplers (CPU, memory, network, disk, battery,
//!   GPU backends, hwmon sensors) and the `Monitor` aggregate
//! - `config` - history lengths and filesystem roots

pub mod collector;
pub mod config;
pub mod rates;
pub mod series;

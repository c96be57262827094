//! Choosing one representative device among several candidates.
//!
//! Network and disk collectors chart a single "primary" device. Pseudo
//! devices (loopback, partitions) are never preferred over a real one.

/// Picks the primary candidate by a two-pass rule.
///
/// First pass: the first candidate that is not a pseudo-device and has
/// nonzero cumulative activity. Second pass: the first non-pseudo candidate.
/// Falls back to index 0 when every candidate is a pseudo-device or the list
/// is empty; callers must check the index with `get` before reading.
pub fn select_primary<T>(
    candidates: &[T],
    is_pseudo: impl Fn(&T) -> bool,
    has_activity: impl Fn(&T) -> bool,
) -> usize {
    candidates
        .iter()
        .position(|c| !is_pseudo(c) && has_activity(c))
        .or_else(|| candidates.iter().position(|c| !is_pseudo(c)))
        .unwrap_or(0)
}

/// Returns true for the loopback network device (`lo`, `lo0`, ...).
pub fn is_loopback(interface: &str) -> bool {
    interface.starts_with("lo")
}

/// Returns true when a block device name denotes a partition or pseudo disk.
///
/// A trailing digit marks a partition (`sda1`, `vda2`, `loop0`). NVMe names
/// follow `nvme<ctrl>n<ns>[p<part>]`, so for them only a `p` after the
/// namespace id marks a partition.
pub fn is_partition(device: &str) -> bool {
    if let Some(rest) = device.strip_prefix("nvme") {
        let Some(ns) = rest.find('n') else {
            return false;
        };
        return rest[ns + 1..]
            .trim_start_matches(|c: char| c.is_ascii_digit())
            .starts_with('p');
    }
    device.ends_with(|c: char| c.is_ascii_digit())
}

//! Parsers for `/proc` filesystem files.
//!
//! These are pure functions that parse the content of various `/proc` files
//! into structured data. Rows that are short or carry non-numeric counters
//! are skipped; the rest of the file is still parsed.

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

fn field(parts: &[&str], idx: usize) -> Option<u64> {
    parts.get(idx).and_then(|s| s.parse().ok())
}

/// Parsed data from `/proc/meminfo`. All values are in kB.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemInfo {
    pub mem_total: u64,
    pub mem_free: u64,
    pub mem_available: u64,
    pub buffers: u64,
    pub cached: u64,
    pub slab: u64,
    pub swap_total: u64,
    pub swap_free: u64,
}

/// Parses `/proc/meminfo` content.
///
/// Format: `Key:   value kB`, one per line. Kernels older than 3.14 have no
/// `MemAvailable`; it is then estimated as free + buffers + cached.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, ParseError> {
    let mut info = MemInfo::default();
    let mut saw_available = false;

    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let Some(value) = rest.split_whitespace().next().and_then(|s| s.parse().ok()) else {
            continue;
        };

        match key.trim() {
            "MemTotal" => info.mem_total = value,
            "MemFree" => info.mem_free = value,
            "MemAvailable" => {
                info.mem_available = value;
                saw_available = true;
            }
            "Buffers" => info.buffers = value,
            "Cached" => info.cached = value,
            "Slab" => info.slab = value,
            "SwapTotal" => info.swap_total = value,
            "SwapFree" => info.swap_free = value,
            _ => {}
        }
    }

    if info.mem_total == 0 {
        return Err(ParseError::new("MemTotal missing from meminfo"));
    }
    if !saw_available {
        info.mem_available = info.mem_free + info.buffers + info.cached;
    }

    Ok(info)
}

/// Paging counters from `/proc/vmstat`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VmstatInfo {
    pub pgpgin: u64,
    pub pgpgout: u64,
}

/// Parses `/proc/vmstat` content (`key value` per line).
pub fn parse_vmstat(content: &str) -> Result<VmstatInfo, ParseError> {
    let mut info = VmstatInfo::default();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }
        let Some(value) = field(&parts, 1) else {
            continue;
        };

        match parts[0] {
            "pgpgin" => info.pgpgin = value,
            "pgpgout" => info.pgpgout = value,
            _ => {}
        }
    }

    Ok(info)
}

/// CPU jiffy counters for the aggregate (`cpu`) or one core (`cpuN`) line.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuStat {
    /// None for the aggregate line.
    pub cpu_id: Option<u32>,
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: u64,
    pub irq: u64,
    pub softirq: u64,
    pub steal: u64,
}

impl CpuStat {
    pub fn idle_total(&self) -> u64 {
        self.idle + self.iowait
    }

    pub fn busy_total(&self) -> u64 {
        self.user + self.nice + self.system + self.irq + self.softirq + self.steal
    }

    pub fn total(&self) -> u64 {
        self.idle_total() + self.busy_total()
    }
}

/// Parsed data from `/proc/stat`.
#[derive(Debug, Clone, Default)]
pub struct GlobalStat {
    /// Aggregate line first (if present), then cores in file order.
    pub cpus: Vec<CpuStat>,
    pub procs_running: u64,
}

impl GlobalStat {
    pub fn aggregate(&self) -> Option<&CpuStat> {
        self.cpus.iter().find(|c| c.cpu_id.is_none())
    }

    pub fn cores(&self) -> impl Iterator<Item = &CpuStat> {
        self.cpus.iter().filter(|c| c.cpu_id.is_some())
    }
}

/// Parses `/proc/stat` content.
///
/// CPU lines need at least user, nice, system and idle; the later columns
/// (iowait, irq, softirq, steal) default to 0 on old kernels.
pub fn parse_global_stat(content: &str) -> Result<GlobalStat, ParseError> {
    let mut stat = GlobalStat::default();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        if let Some(suffix) = parts[0].strip_prefix("cpu") {
            let cpu_id = if suffix.is_empty() {
                None
            } else {
                match suffix.parse() {
                    Ok(id) => Some(id),
                    Err(_) => continue,
                }
            };

            let (Some(user), Some(nice), Some(system), Some(idle)) = (
                field(&parts, 1),
                field(&parts, 2),
                field(&parts, 3),
                field(&parts, 4),
            ) else {
                continue;
            };
            let opt = |idx: usize| field(&parts, idx).unwrap_or(0);

            stat.cpus.push(CpuStat {
                cpu_id,
                user,
                nice,
                system,
                idle,
                iowait: opt(5),
                irq: opt(6),
                softirq: opt(7),
                steal: opt(8),
            });
        } else if parts[0] == "procs_running" {
            stat.procs_running = field(&parts, 1).unwrap_or(0);
        }
    }

    Ok(stat)
}

/// Parsed data from `/proc/loadavg`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadAvg {
    pub load1: f64,
    pub load5: f64,
    pub load15: f64,
}

/// Parses `/proc/loadavg` content.
///
/// Format: `0.15 0.10 0.05 1/150 1234`
pub fn parse_loadavg(content: &str) -> Result<LoadAvg, ParseError> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(ParseError::new("not enough fields in loadavg"));
    }

    let parse = |idx: usize, name: &str| -> Result<f64, ParseError> {
        parts[idx]
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}", name)))
    };

    Ok(LoadAvg {
        load1: parse(0, "load1")?,
        load5: parse(1, "load5")?,
        load15: parse(2, "load15")?,
    })
}

/// One row of `/proc/diskstats`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskStats {
    pub major: u32,
    pub minor: u32,
    pub device: String,
    pub reads: u64,
    pub read_sectors: u64,
    pub writes: u64,
    pub write_sectors: u64,
}

/// Parses `/proc/diskstats` content.
///
/// Format: `major minor name reads r_merged r_sectors r_time writes w_merged w_sectors ...`
pub fn parse_diskstats(content: &str) -> Result<Vec<DiskStats>, ParseError> {
    let mut disks = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 11 {
            continue; // Skip malformed lines
        }

        let (Some(major), Some(minor)) = (field(&parts, 0), field(&parts, 1)) else {
            continue;
        };
        let (Some(reads), Some(read_sectors), Some(writes), Some(write_sectors)) = (
            field(&parts, 3),
            field(&parts, 5),
            field(&parts, 7),
            field(&parts, 9),
        ) else {
            continue;
        };

        disks.push(DiskStats {
            major: major as u32,
            minor: minor as u32,
            device: parts[2].to_string(),
            reads,
            read_sectors,
            writes,
            write_sectors,
        });
    }

    Ok(disks)
}

/// One interface row of `/proc/net/dev`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetDevStats {
    pub interface: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
}

/// Parses `/proc/net/dev` content.
///
/// The two header lines contain `|` and are skipped. Each row is
/// `iface: rx_bytes rx_packets ... (8 rx columns) tx_bytes tx_packets ...`.
pub fn parse_net_dev(content: &str) -> Result<Vec<NetDevStats>, ParseError> {
    let mut devices = Vec::new();

    for line in content.lines() {
        if line.contains('|') || line.trim().is_empty() {
            continue;
        }

        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };
        let values: Vec<&str> = rest.split_whitespace().collect();
        let (Some(rx_bytes), Some(tx_bytes)) = (field(&values, 0), field(&values, 8)) else {
            continue;
        };

        devices.push(NetDevStats {
            interface: name.trim().to_string(),
            rx_bytes,
            rx_packets: field(&values, 1).unwrap_or(0),
            tx_bytes,
            tx_packets: field(&values, 9).unwrap_or(0),
        });
    }

    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_meminfo() {
        let content = "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
SwapTotal:       4096000 kB
SwapFree:        3072000 kB
Slab:             512000 kB
";
        let info = parse_meminfo(content).unwrap();

        assert_eq!(info.mem_total, 16384000);
        assert_eq!(info.mem_available, 12000000);
        assert_eq!(info.cached, 2048000);
        assert_eq!(info.slab, 512000);
        assert_eq!(info.swap_free, 3072000);
    }

    #[test]
    fn test_parse_meminfo_without_available() {
        let content = "MemTotal: 1000 kB\nMemFree: 100 kB\nBuffers: 50 kB\nCached: 250 kB\n";
        let info = parse_meminfo(content).unwrap();
        assert_eq!(info.mem_available, 400);
    }

    #[test]
    fn test_parse_meminfo_empty() {
        assert!(parse_meminfo("").is_err());
        assert!(parse_meminfo("garbage\nMemFree: x kB\n").is_err());
    }

    #[test]
    fn test_parse_vmstat() {
        let content = "nr_free_pages 12345\npgpgin 123456\npgpgout 654321\npswpin 100\npswpout 200\npgfault 999999\nbroken\n";
        let info = parse_vmstat(content).unwrap();

        assert_eq!(info.pgpgin, 123456);
        assert_eq!(info.pgpgout, 654321);
    }

    #[test]
    fn test_parse_global_stat() {
        let content = "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 5000 250 1500 40000 500 100 50 0 0 0
cpu1 5000 250 1500 40000 500 100 50 0 0 0
cpufreq junk
cpu2 1 2
intr 1000000 50 0
ctxt 500000
processes 10000
procs_running 3
";
        let stat = parse_global_stat(content).unwrap();

        assert_eq!(stat.cpus.len(), 3);
        let agg = stat.aggregate().unwrap();
        assert_eq!(agg.user, 10000);
        assert_eq!(agg.idle_total(), 81000);
        assert_eq!(agg.busy_total(), 13800);
        assert_eq!(stat.cores().count(), 2);
        assert_eq!(stat.cpus[2].cpu_id, Some(1));
        assert_eq!(stat.procs_running, 3);
    }

    #[test]
    fn test_parse_global_stat_old_kernel_columns() {
        let stat = parse_global_stat("cpu 10 20 30 40\n").unwrap();
        let agg = stat.aggregate().unwrap();
        assert_eq!(agg.total(), 100);
        assert_eq!(agg.iowait, 0);
    }

    #[test]
    fn test_parse_loadavg() {
        let load = parse_loadavg("0.15 0.10 0.05 1/150 1234\n").unwrap();
        assert!((load.load1 - 0.15).abs() < 1e-9);
        assert!((load.load15 - 0.05).abs() < 1e-9);

        assert!(parse_loadavg("0.15\n").is_err());
        assert!(parse_loadavg("a b c\n").is_err());
    }

    #[test]
    fn test_parse_diskstats() {
        let content = "\
   8       0 sda 12345 100 987654 5000 6789 50 456789 3000 0 4000 8000 0 0 0 0
   8       1 sda1 10000 80 800000 4000 5000 40 400000 2500 0 3500 6500 0 0 0 0
   8       2 short 1 2 3
 259       0 nvme0n1 50000 200 2000000 10000 30000 150 1500000 8000 5 15000 18000 0 0 0 0
   x       0 bad 1 2 3 4 5 6 7 8 9 10 11
";
        let disks = parse_diskstats(content).unwrap();

        assert_eq!(disks.len(), 3);
        assert_eq!(disks[0].device, "sda");
        assert_eq!(disks[0].read_sectors, 987654);
        assert_eq!(disks[0].write_sectors, 456789);
        assert_eq!(disks[2].major, 259);
        assert_eq!(disks[2].reads, 50000);
        assert_eq!(disks[2].writes, 30000);
    }

    #[test]
    fn test_parse_net_dev() {
        let content = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 12345678     9876    0    0    0     0          0         0 12345678     9876    0    0    0     0       0          0
  eth0: 987654321   654321    5   10    0     0          0       100 123456789   456789    2    5    0     0       0          0
 wlan0: 1 2 3
";
        let devices = parse_net_dev(content).unwrap();

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].interface, "lo");
        assert_eq!(devices[1].interface, "eth0");
        assert_eq!(devices[1].rx_bytes, 987654321);
        assert_eq!(devices[1].tx_bytes, 123456789);
        assert_eq!(devices[1].tx_packets, 456789);
    }
}

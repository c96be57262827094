//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` and `/sys` states for the
//! hardware combinations the collectors have to handle.

use super::filesystem::MockFs;

#[allow(dead_code)]
impl MockFs {
    /// Creates a typical desktop: 4 cores, one SATA disk plus NVMe, wired
    /// ethernet, three hwmon chips, no GPU and no battery.
    pub fn typical_system() -> Self {
        let mut fs = Self::new();

        fs.add_file("/proc/loadavg", "0.15 0.10 0.05 1/150 1234\n");
        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
Active:          4096000 kB
Inactive:        2048000 kB
SwapTotal:       4096000 kB
SwapFree:        4096000 kB
Dirty:              1024 kB
Slab:             512000 kB
SReclaimable:     256000 kB
",
        );
        fs.add_file(
            "/proc/stat",
            "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 2500 125 750 20000 250 50 25 0 0 0
cpu1 2500 125 750 20000 250 50 25 0 0 0
cpu2 2500 125 750 20000 250 50 25 0 0 0
cpu3 2500 125 750 20000 250 50 25 0 0 0
intr 1000000 50 0 0 0 0 0 0 0 1 0 0 0 100 0 0 1000
ctxt 500000
btime 1700000000
processes 10000
procs_running 2
procs_blocked 0
",
        );
        fs.add_file(
            "/proc/vmstat",
            "\
pgpgin 123456
pgpgout 654321
pswpin 100
pswpout 200
pgfault 999999
pgmajfault 1234
",
        );
        fs.add_file(
            "/proc/diskstats",
            "\
   8       0 sda 12345 100 987654 5000 6789 50 456789 3000 0 4000 8000 0 0 0 0
   8       1 sda1 10000 80 800000 4000 5000 40 400000 2500 0 3500 6500 0 0 0 0
 259       0 nvme0n1 50000 200 2000000 10000 30000 150 1500000 8000 5 15000 18000 0 0 0 0
",
        );
        fs.add_file(
            "/proc/net/dev",
            "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 12345678     9876    0    0    0     0          0         0 12345678     9876    0    0    0     0       0          0
  eth0: 987654321   654321    5   10    0     0          0       100 123456789   456789    2    5    0     0       0          0
",
        );

        // CPU package sensor with labels
        fs.add_file("/sys/class/hwmon/hwmon0/name", "k10temp\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp1_input", "52500\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp1_label", "Tctl\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp3_input", "45000\n");
        fs.add_file("/sys/class/hwmon/hwmon0/temp3_label", "Tccd1\n");

        // Super I/O chip: fan, voltage, unlabeled temperature
        fs.add_file("/sys/class/hwmon/hwmon1/name", "nct6775\n");
        fs.add_file("/sys/class/hwmon/hwmon1/fan1_input", "1100\n");
        fs.add_file("/sys/class/hwmon/hwmon1/in0_input", "1200\n");
        fs.add_file("/sys/class/hwmon/hwmon1/in0_label", "Vcore\n");
        fs.add_file("/sys/class/hwmon/hwmon1/temp1_input", "38000\n");

        fs.add_file("/sys/class/hwmon/hwmon2/name", "nvme\n");
        fs.add_file("/sys/class/hwmon/hwmon2/temp1_input", "41850\n");
        fs.add_file("/sys/class/hwmon/hwmon2/temp1_label", "Composite\n");
        fs.add_symlink("/sys/class/hwmon/hwmon2/device", "../../nvme0");

        fs.add_dir("/sys/class/drm");
        fs.add_dir("/sys/class/power_supply");

        fs
    }

    /// Creates a system under memory pressure with swap in use.
    pub fn memory_pressure() -> Self {
        let mut fs = Self::typical_system();

        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:          256000 kB
MemAvailable:     512000 kB
Buffers:           64000 kB
Cached:           256000 kB
SwapTotal:       4096000 kB
SwapFree:        1024000 kB
Slab:             384000 kB
",
        );

        fs
    }

    /// Creates a laptop discharging on one battery, AC adapter offline.
    ///
    /// BAT0: 36 of 48 Wh, 12 V, 1.5 A drawn.
    pub fn laptop_battery() -> Self {
        let mut fs = Self::typical_system();

        let ac = "/sys/class/power_supply/AC";
        fs.add_file(format!("{ac}/type"), "Mains\n");
        fs.add_file(format!("{ac}/online"), "0\n");

        let bat = "/sys/class/power_supply/BAT0";
        fs.add_file(format!("{bat}/type"), "Battery\n");
        fs.add_file(format!("{bat}/status"), "Discharging\n");
        fs.add_file(format!("{bat}/energy_now"), "36000000\n");
        fs.add_file(format!("{bat}/energy_full"), "48000000\n");
        fs.add_file(format!("{bat}/voltage_now"), "12000000\n");
        fs.add_file(format!("{bat}/current_now"), "1500000\n");

        fs
    }

    /// Creates a desktop with an AMD Radeon RX 6800 on `amdgpu`.
    pub fn amd_gpu() -> Self {
        let mut fs = Self::typical_system();

        let dev = "/sys/class/drm/card0/device";
        fs.add_file(format!("{dev}/vendor"), "0x1002\n");
        fs.add_file(format!("{dev}/device"), "0x73bf\n");
        fs.add_symlink(format!("{dev}/driver"), "../../../bus/pci/drivers/amdgpu");
        fs.add_file(format!("{dev}/gpu_busy_percent"), "42\n");
        fs.add_file(format!("{dev}/mem_info_vram_used"), "2147483648\n");
        fs.add_file(format!("{dev}/mem_info_vram_total"), "17179869184\n");
        fs.add_file(format!("{dev}/hwmon/hwmon3/temp1_input"), "55000\n");
        fs.add_file(format!("{dev}/hwmon/hwmon3/fan1_input"), "1200\n");
        fs.add_file(format!("{dev}/hwmon/hwmon3/power1_average"), "95000000\n");

        // Connector and render node entries are not cards
        fs.add_file("/sys/class/drm/card0-DP-1/status", "connected\n");
        fs.add_dir("/sys/class/drm/renderD128");
        fs.add_file("/sys/class/drm/version", "drm 1.1.0 20060810\n");

        fs
    }

    /// Creates a desktop with a GeForce GTX 680 on the open `nouveau` driver.
    pub fn nouveau_gpu() -> Self {
        let mut fs = Self::typical_system();

        let dev = "/sys/class/drm/card0/device";
        fs.add_file(format!("{dev}/vendor"), "0x10de\n");
        fs.add_file(format!("{dev}/device"), "0x1180\n");
        fs.add_symlink(format!("{dev}/driver"), "../../../bus/pci/drivers/nouveau");
        fs.add_file(format!("{dev}/hwmon/hwmon1/temp1_input"), "47000\n");
        fs.add_file(format!("{dev}/hwmon/hwmon1/fan1_input"), "900\n");
        fs.add_file(format!("{dev}/hwmon/hwmon1/power1_input"), "110000000\n");

        fs
    }

    /// Creates a desktop with an RTX 3090 on the proprietary driver.
    ///
    /// The proprietary driver exposes no hwmon directory.
    pub fn nvidia_proprietary() -> Self {
        let mut fs = Self::typical_system();

        let dev = "/sys/class/drm/card0/device";
        fs.add_file(format!("{dev}/vendor"), "0x10de\n");
        fs.add_file(format!("{dev}/device"), "0x2204\n");
        fs.add_symlink(format!("{dev}/driver"), "../../../bus/pci/drivers/nvidia");

        fs
    }
}

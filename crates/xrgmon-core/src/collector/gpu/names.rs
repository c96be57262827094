//! PCI vendor/device IDs of display adapters we can name.

pub const VENDOR_NVIDIA: u16 = 0x10de;
pub const VENDOR_AMD: u16 = 0x1002;
pub const VENDOR_INTEL: u16 = 0x8086;

const DEVICE_NAMES: &[(u16, u16, &str)] = &[
    (VENDOR_NVIDIA, 0x1180, "NVIDIA GeForce GTX 680"),
    (VENDOR_NVIDIA, 0x1b80, "NVIDIA GeForce GTX 1080"),
    (VENDOR_NVIDIA, 0x2204, "NVIDIA GeForce RTX 3090"),
    (VENDOR_NVIDIA, 0x2684, "NVIDIA GeForce RTX 4090"),
    (VENDOR_AMD, 0x67df, "AMD Radeon RX 470/480/570/580"),
    (VENDOR_AMD, 0x687f, "AMD Radeon RX Vega 56/64"),
    (VENDOR_AMD, 0x73bf, "AMD Radeon RX 6800/6900"),
    (VENDOR_AMD, 0x744c, "AMD Radeon RX 7900 XT/XTX"),
    (VENDOR_INTEL, 0x3e92, "Intel UHD Graphics 630"),
    (VENDOR_INTEL, 0x9a49, "Intel Iris Xe Graphics"),
    (VENDOR_INTEL, 0x56a0, "Intel Arc A770"),
];

pub fn vendor_name(vendor: u16) -> &'static str {
    match vendor {
        VENDOR_NVIDIA => "NVIDIA",
        VENDOR_AMD => "AMD",
        VENDOR_INTEL => "Intel",
        _ => "Unknown",
    }
}

/// Human-readable adapter name, synthesized from the IDs when not in the table.
pub fn device_name(vendor: u16, device: u16) -> String {
    DEVICE_NAMES
        .iter()
        .find(|(v, d, _)| *v == vendor && *d == device)
        .map(|(_, _, name)| name.to_string())
        .unwrap_or_else(|| format!("{} GPU 0x{:04x}", vendor_name(vendor), device))
}

/// Parses a sysfs ID file such as `0x10de\n`.
pub fn parse_pci_id(content: &str) -> Option<u16> {
    let s = content.trim();
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u16::from_str_radix(hex, 16).ok()
}

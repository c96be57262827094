//! Parsers for the Linux `/proc` filesystem.
//!
//! The sampling collectors in `collector::{cpu, memory, network, disk}` read
//! their files through `FileSystem` and hand the content to these parsers.

pub mod parser;

pub use parser::{
    CpuStat, DiskStats, GlobalStat, LoadAvg, MemInfo, NetDevStats, ParseError, VmstatInfo,
};

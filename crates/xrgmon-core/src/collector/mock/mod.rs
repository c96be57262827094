//! Test doubles for the host seams.
//!
//! `MockFs` and its pre-built scenarios stand in for `/proc` and `/sys`;
//! `MockRunner` stands in for the vendor diagnostic tool. Together they let
//! every collector run on any host, GPU or not.

mod filesystem;
mod runner;
mod scenarios;

pub use filesystem::MockFs;
pub use runner::MockRunner;

//! Adapter implementations for the [`ScanSampler`](crate::port::ScanSampler) port.
//!
//! - [`IwScanSampler`]: Linux, parses `iw dev <iface> scan` output.
//! - [`ScriptedSampler`]: deterministic playback double for tests and demos.

mod iw_sampler;
mod scripted;

pub use iw_sampler::{parse_iw_scan_output, IwScanSampler};
pub use scripted::{ScanScript, ScriptedSampler};

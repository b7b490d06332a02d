//! Ports abstracting the external radio collaborator.

mod scan_port;

pub use scan_port::{ScanOutcome, ScanSampler, ScanTicket};

//! Domain value objects for fingerprint calibration and localization.

pub mod bssid;
pub mod record;
pub mod scan;

pub use bssid::BssidId;
pub use record::{FingerprintRecord, PointKey};
pub use scan::{LiveScan, ScanObservation};

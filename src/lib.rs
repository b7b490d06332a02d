//! # wifi-fingerloc
//!
//! Fingerprint storage and localization matching for a floor-plan-based
//! indoor positioning aid.
//!
//! A user calibrates a floor-plan by recording Wi-Fi access-point signal
//! fingerprints at tapped points ("wardriving"); later, a fresh scan is
//! matched against the stored fingerprints to estimate the most likely
//! calibration point. This crate is the engine behind that flow:
//!
//! - **Domain types**: [`BssidId`], [`FingerprintRecord`], [`PointKey`],
//!   [`LiveScan`]
//! - **Store**: [`FingerprintStore`] -- durable, append-only record file
//!   with point-scoped deletion
//! - **Engine**: [`LocalizationEngine`] -- signal-strength distance scoring
//!   with a minimum-overlap acceptance rule
//! - **Scheduler**: [`ScanScheduler`] -- periodic attempts with two-level
//!   retry backoff and clean cancellation
//! - **Port**: [`ScanSampler`] -- trait abstracting the platform scan
//!   backend, with an `iw`-based Linux adapter and a scripted test double
//!
//! The graphical floor-plan surface (touch mapping, markers, dialogs) is an
//! external collaborator: it consumes the store operations and the
//! scheduler's sink callback, and supplies a [`ScanSampler`].

pub mod adapter;
pub mod domain;
pub mod engine;
pub mod error;
pub mod port;
pub mod scheduler;
pub mod store;

// Re-export key types at the crate root for convenience.
pub use adapter::{IwScanSampler, ScriptedSampler};
pub use domain::{BssidId, FingerprintRecord, LiveScan, PointKey, ScanObservation};
pub use engine::{LocalizationEngine, PositionEstimate, MIN_OVERLAP, OVERLAP_WEIGHT};
pub use error::{Error, Result, SampleError, StoreError};
pub use port::{ScanOutcome, ScanSampler, ScanTicket};
pub use scheduler::{LocalizationSink, ScanScheduler, SchedulerConfig, SchedulerState};
pub use store::FingerprintStore;

//! The primary port for requesting Wi-Fi scans.
//!
//! The platform's broadcast-style scan delivery is re-expressed here as an
//! explicit request/ticket interface: `request_scan` either refuses
//! synchronously (the radio could not even start a scan) or hands back a
//! [`ScanTicket`] that resolves once with the scan outcome. Dropping the
//! ticket abandons the request, so a result arriving for a cancelled
//! attempt has nowhere to land and is provably discarded.

use tokio::sync::oneshot;

use crate::domain::ScanObservation;
use crate::error::SampleError;

/// The delivered outcome of an accepted scan request.
pub type ScanOutcome = Result<Vec<ScanObservation>, SampleError>;

/// One-shot handle for an in-flight scan.
pub struct ScanTicket {
    rx: oneshot::Receiver<ScanOutcome>,
}

impl ScanTicket {
    /// Create a ticket and the sender half the adapter delivers through.
    pub fn new() -> (oneshot::Sender<ScanOutcome>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// Wait for the scan outcome.
    ///
    /// Resolves to [`SampleError::ResultLost`] if the adapter dropped the
    /// sender without delivering.
    pub async fn recv(self) -> ScanOutcome {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(SampleError::ResultLost),
        }
    }
}

/// Port that abstracts the platform Wi-Fi scanning backend.
///
/// Implementations include:
/// - [`crate::adapter::IwScanSampler`] -- Linux, shells out to `iw`.
/// - [`crate::adapter::ScriptedSampler`] -- deterministic test double.
pub trait ScanSampler: Send + Sync {
    /// Ask the radio for a fresh scan.
    ///
    /// `Err` means the request itself was not accepted (radio busy or
    /// disabled, permission denied); no ticket exists and nothing will be
    /// delivered. `Ok` means a result (or a delivery-time failure) will
    /// eventually arrive through the ticket.
    fn request_scan(&self) -> Result<ScanTicket, SampleError>;
}

//! Error types for the wifi-fingerloc crate.
//!
//! The taxonomy follows the recovery policy of the system: almost everything
//! is recovered locally (a skipped line, a `None` localization result, a
//! longer retry interval). The only class that propagates to the caller as a
//! hard failure is a storage write that cannot be made durable.

use thiserror::Error;

/// A specialized `Result` type for wifi-fingerloc operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the crate.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Fingerprint store error
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Scan sampling error
    #[error("scan error: {0}")]
    Sample(#[from] SampleError),

    /// Failed to parse a MAC address string (expected `aa:bb:cc:dd:ee:ff`).
    #[error("failed to parse MAC address from '{input}'")]
    MacParseFailed {
        /// The input string that could not be parsed.
        input: String,
    },

    /// The BSSID MAC address bytes are invalid (must be exactly 6 bytes).
    #[error("invalid MAC address: expected 6 bytes, got {len}")]
    InvalidMac {
        /// The number of bytes that were provided.
        len: usize,
    },
}

/// Errors from the durable fingerprint store.
///
/// Reads never fail on record content: a malformed persisted line is skipped
/// on load and the store is not considered corrupt. Write I/O is the fatal
/// case.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    /// Underlying I/O failure during a durable write or load.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The atomic rewrite could not replace the backing file.
    #[error("failed to replace store file: {0}")]
    Replace(String),
}

/// Errors from the scan sampling collaborator.
///
/// None of these abort a session: the scheduler converts them into either a
/// backoff interval or a skipped tick.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum SampleError {
    /// The platform refused the scan request for lack of permissions.
    #[error("scan permission denied: {reason}")]
    PermissionDenied {
        /// Platform-provided description.
        reason: String,
    },

    /// The scan request itself was not accepted (radio busy or disabled).
    #[error("scan request failed: {reason}")]
    RequestFailed {
        /// Why the request was rejected.
        reason: String,
    },

    /// The scan backend ran but produced an error.
    #[error("scan failed: {reason}")]
    ScanFailed {
        /// Human-readable description of what went wrong.
        reason: String,
    },

    /// The in-flight result was dropped before delivery.
    #[error("scan result was dropped before delivery")]
    ResultLost,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: StoreError = io.into();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn error_display_is_prefixed() {
        let err = Error::Sample(SampleError::RequestFailed {
            reason: "radio off".into(),
        });
        assert_eq!(err.to_string(), "scan error: scan request failed: radio off");
    }
}

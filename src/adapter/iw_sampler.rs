//! Adapter that samples visible access points by invoking `iw dev <iface> scan`.
//!
//! # Design
//!
//! `request_scan` spawns the subprocess on a blocking task and returns a
//! ticket immediately; stdout is parsed into [`ScanObservation`] values and
//! delivered through the ticket. Only the fields the matcher consumes are
//! kept: SSID, BSSID, and signal level.
//!
//! # Permissions
//!
//! `iw dev <iface> scan` requires `CAP_NET_ADMIN` (typically root). A
//! permission refusal from `iw` is delivered as
//! [`SampleError::PermissionDenied`].

use std::process::Command;

use crate::domain::{BssidId, ScanObservation};
use crate::error::SampleError;
use crate::port::{ScanSampler, ScanTicket};

/// Wi-Fi sampler that shells out to `iw dev <interface> scan`.
pub struct IwScanSampler {
    /// Wireless interface name (e.g. `"wlan0"`, `"wlp2s0"`).
    interface: String,
}

impl IwScanSampler {
    /// Create a sampler for the default interface `wlan0`.
    pub fn new() -> Self {
        Self {
            interface: "wlan0".to_owned(),
        }
    }

    /// Create a sampler for a specific wireless interface.
    pub fn with_interface(iface: impl Into<String>) -> Self {
        Self {
            interface: iface.into(),
        }
    }

    /// Run `iw dev <iface> scan` and parse the output synchronously.
    fn scan_blocking(interface: &str) -> Result<Vec<ScanObservation>, SampleError> {
        let output = Command::new("iw")
            .args(["dev", interface, "scan"])
            .output()
            .map_err(|e| SampleError::ScanFailed {
                reason: format!("failed to run `iw dev {interface} scan`: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            if stderr.contains("not permitted") || stderr.contains("Permission denied") {
                return Err(SampleError::PermissionDenied {
                    reason: stderr.to_owned(),
                });
            }
            return Err(SampleError::ScanFailed {
                reason: format!("iw exited with {}: {stderr}", output.status),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_iw_scan_output(&stdout))
    }
}

impl Default for IwScanSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanSampler for IwScanSampler {
    fn request_scan(&self) -> Result<ScanTicket, SampleError> {
        let (tx, ticket) = ScanTicket::new();
        let interface = self.interface.clone();

        tokio::task::spawn_blocking(move || {
            let outcome = Self::scan_blocking(&interface);
            if let Err(e) = &outcome {
                tracing::warn!(interface, error = %e, "iw scan attempt failed");
            }
            // A dropped ticket means the caller cancelled; nothing to do.
            let _ = tx.send(outcome);
        });

        Ok(ticket)
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Intermediate accumulator for fields within a single BSS stanza.
#[derive(Default)]
struct BssStanza {
    bssid: Option<String>,
    ssid: Option<String>,
    signal_dbm: Option<f64>,
}

impl BssStanza {
    /// Flush this stanza into a [`ScanObservation`], if we have enough data.
    fn flush(self) -> Option<ScanObservation> {
        let bssid = BssidId::parse(&self.bssid?).ok()?;
        let level_dbm = self.signal_dbm.unwrap_or(-90.0).round() as i32;
        Some(ScanObservation {
            bssid,
            ssid: self.ssid.unwrap_or_default(),
            level_dbm,
        })
    }
}

/// Parse the text output of `iw dev <iface> scan`.
///
/// The output consists of BSS stanzas, each starting with:
/// ```text
/// BSS aa:bb:cc:dd:ee:ff(on wlan0)
/// ```
/// followed by indented key-value lines. Stanzas missing a parseable BSSID
/// are dropped; a missing signal defaults to -90 dBm.
pub fn parse_iw_scan_output(output: &str) -> Vec<ScanObservation> {
    let mut results = Vec::new();
    let mut current: Option<BssStanza> = None;

    for line in output.lines() {
        // New BSS stanza starts with "BSS " at column 0.
        if let Some(rest) = line.strip_prefix("BSS ") {
            if let Some(stanza) = current.take() {
                if let Some(obs) = stanza.flush() {
                    results.push(obs);
                }
            }

            // "BSS aa:bb:cc:dd:ee:ff(on wlan0)" or
            // "BSS aa:bb:cc:dd:ee:ff -- associated".
            let mac_end = rest
                .find(|c: char| !c.is_ascii_hexdigit() && c != ':')
                .unwrap_or(rest.len());
            let mac = &rest[..mac_end];

            if mac.len() == 17 {
                current = Some(BssStanza {
                    bssid: Some(mac.to_lowercase()),
                    ..BssStanza::default()
                });
            }
            continue;
        }

        // Indented lines belong to the current stanza.
        let trimmed = line.trim();
        if let Some(ref mut stanza) = current {
            if let Some(rest) = trimmed.strip_prefix("SSID:") {
                stanza.ssid = Some(rest.trim().to_owned());
            } else if let Some(rest) = trimmed.strip_prefix("signal:") {
                // "signal: -52.00 dBm"
                stanza.signal_dbm = parse_signal_dbm(rest);
            }
        }
    }

    if let Some(stanza) = current.take() {
        if let Some(obs) = stanza.flush() {
            results.push(obs);
        }
    }

    results
}

/// Parse a signal strength string like "-52.00 dBm" into dBm.
fn parse_signal_dbm(s: &str) -> Option<f64> {
    s.split_whitespace().next()?.parse().ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

//! Persisted fingerprint records and calibration-point keys.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::bssid::BssidId;

/// Quantization scale for calibration-point keys: 1/10_000 of the
/// normalized image coordinate range.
const KEY_SCALE: f32 = 10_000.0;

// ---------------------------------------------------------------------------
// PointKey -- Value Object
// ---------------------------------------------------------------------------

/// The identity of a calibration point on the floor-plan.
///
/// Coordinates are normalized image coordinates (conceptually `[0, 1]`, not
/// enforced), quantized to 1e-4 resolution at key-derivation time so that
/// "same location" is an exact integer comparison rather than a float
/// equality. A calibration point exists exactly as long as at least one
/// record carries its key.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct PointKey {
    qx: i32,
    qy: i32,
}

impl PointKey {
    /// Derive the key for a coordinate pair.
    pub fn from_coords(x: f32, y: f32) -> Self {
        Self {
            qx: (x * KEY_SCALE).round() as i32,
            qy: (y * KEY_SCALE).round() as i32,
        }
    }

    /// The canonical x coordinate this key represents.
    pub fn x(&self) -> f32 {
        self.qx as f32 / KEY_SCALE
    }

    /// The canonical y coordinate this key represents.
    pub fn y(&self) -> f32 {
        self.qy as f32 / KEY_SCALE
    }
}

impl fmt::Display for PointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.x(), self.y())
    }
}

// ---------------------------------------------------------------------------
// FingerprintRecord
// ---------------------------------------------------------------------------

/// One persisted fingerprint measurement: a single access point observed at
/// a calibration point at a moment in time.
///
/// Records are append-only; corrections are delete-then-append, never
/// in-place mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FingerprintRecord {
    /// Normalized x coordinate of the calibration point.
    pub x: f32,
    /// Normalized y coordinate of the calibration point.
    pub y: f32,
    /// Capture time in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    /// Network name as reported by the scan. Display-only.
    pub ssid: String,
    /// Access-point identity used for matching.
    pub bssid: BssidId,
    /// Received signal strength in dBm.
    pub level_dbm: i32,
}

impl FingerprintRecord {
    /// The calibration-point key this record belongs to.
    pub fn point_key(&self) -> PointKey {
        PointKey::from_coords(self.x, self.y)
    }

    /// Serialize as one line of the persisted table:
    /// `x,y,timestamp,ssid,bssid,level`.
    ///
    /// The SSID is written unescaped. An SSID containing a comma will
    /// produce a line that fails to parse back; this is the documented
    /// format limitation, and such lines are skipped on load.
    pub fn to_line(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            self.x, self.y, self.timestamp_ms, self.ssid, self.bssid, self.level_dbm
        )
    }

    /// Parse one persisted line back into a record.
    ///
    /// Returns `None` for any line that does not have exactly six fields
    /// with parseable numeric values and a parseable BSSID. Callers treat
    /// `None` as "skip this line", never as a fatal condition.
    pub fn parse_line(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() != 6 {
            return None;
        }

        Some(Self {
            x: parts[0].parse().ok()?,
            y: parts[1].parse().ok()?,
            timestamp_ms: parts[2].parse().ok()?,
            ssid: parts[3].to_owned(),
            bssid: BssidId::parse(parts[4]).ok()?,
            level_dbm: parts[5].parse().ok()?,
        })
    }
}

//! Nearest-fingerprint localization scoring.
//!
//! Given one live scan and the full record set, the engine groups records by
//! calibration point, accumulates a squared signal-strength distance over
//! the access points each point shares with the live scan, discards points
//! sharing fewer than two access points, and picks the highest-scoring
//! survivor. All score arithmetic is `i64` so the comparison is exactly
//! reproducible across platforms.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{FingerprintRecord, LiveScan, PointKey};

/// Score units awarded per overlapping access point, before the squared
/// signal-strength distance is subtracted.
pub const OVERLAP_WEIGHT: i64 = 200;

/// Minimum number of access points a candidate must share with the live
/// scan. A match on a single shared access point is statistically
/// unreliable and is never selected.
pub const MIN_OVERLAP: usize = 2;

/// The engine's best guess at the user's position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionEstimate {
    /// The matched calibration point.
    pub point: PointKey,
    /// Final score (`overlap * 200 - squared_distance`); higher is better.
    pub score: i64,
    /// Number of access points shared between the live scan and the
    /// matched point's records.
    pub overlap: usize,
}

impl PositionEstimate {
    /// Normalized x coordinate of the matched point.
    pub fn x(&self) -> f32 {
        self.point.x()
    }

    /// Normalized y coordinate of the matched point.
    pub fn y(&self) -> f32 {
        self.point.y()
    }
}

/// Per-candidate accumulator while walking the record set.
#[derive(Debug)]
struct Candidate {
    key: PointKey,
    squared_distance: i64,
    overlap: usize,
}

/// Stateless nearest-fingerprint matcher.
#[derive(Debug, Default)]
pub struct LocalizationEngine;

impl LocalizationEngine {
    /// Create a new engine.
    pub fn new() -> Self {
        Self
    }

    /// Match a live scan against the stored record set.
    ///
    /// Returns `None` for an empty scan, an empty record set, or when no
    /// candidate point shares at least [`MIN_OVERLAP`] access points with
    /// the scan; all of these are "no usable match", never an error.
    ///
    /// Ties on the final score are broken deterministically: the candidate
    /// whose records appear first in storage order wins.
    pub fn localize(
        &self,
        scan: &LiveScan,
        records: &[FingerprintRecord],
    ) -> Option<PositionEstimate> {
        if scan.is_empty() || records.is_empty() {
            tracing::debug!(
                scan_aps = scan.len(),
                records = records.len(),
                "localization skipped: nothing to compare"
            );
            return None;
        }

        // Group in first-encountered (storage) order so the tie-break below
        // is stable across runs.
        let mut candidates: Vec<Candidate> = Vec::new();
        let mut index: HashMap<PointKey, usize> = HashMap::new();

        for rec in records {
            let Some(live_level) = scan.level(&rec.bssid) else {
                continue;
            };
            let key = rec.point_key();
            let idx = *index.entry(key).or_insert_with(|| {
                candidates.push(Candidate {
                    key,
                    squared_distance: 0,
                    overlap: 0,
                });
                candidates.len() - 1
            });

            let diff = i64::from(live_level) - i64::from(rec.level_dbm);
            candidates[idx].squared_distance += diff * diff;
            candidates[idx].overlap += 1;
        }

        let mut best: Option<PositionEstimate> = None;
        for cand in &candidates {
            if cand.overlap < MIN_OVERLAP {
                tracing::debug!(
                    point = %cand.key,
                    overlap = cand.overlap,
                    "candidate discarded: insufficient overlap"
                );
                continue;
            }
            let score = cand.overlap as i64 * OVERLAP_WEIGHT - cand.squared_distance;
            // Strictly greater: the first-encountered candidate keeps ties.
            if best.map_or(true, |b| score > b.score) {
                best = Some(PositionEstimate {
                    point: cand.key,
                    score,
                    overlap: cand.overlap,
                });
            }
        }

        match &best {
            Some(est) => tracing::debug!(
                point = %est.point,
                score = est.score,
                overlap = est.overlap,
                "localization matched"
            ),
            None => tracing::debug!("no candidate shares enough access points with the live scan"),
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BssidId, ScanObservation};

    fn mac(n: u8) -> BssidId {
        BssidId([0xaa, 0xbb, 0xcc, 0xdd, 0xee, n])
    }

    fn record(x: f32, y: f32, bssid: BssidId, level: i32) -> FingerprintRecord {
        FingerprintRecord {
            x,
            y,
            timestamp_ms: 0,
            ssid: "net".to_owned(),
            bssid,
            level_dbm: level,
        }
    }

    fn scan(levels: &[(BssidId, i32)]) -> LiveScan {
        let observations: Vec<ScanObservation> = levels
            .iter()
            .map(|&(bssid, level_dbm)| ScanObservation {
                bssid,
                ssid: String::new(),
                level_dbm,
            })
            .collect();
        LiveScan::from_observations(&observations)
    }

    #[test]
    fn empty_inputs_yield_none() {
        let engine = LocalizationEngine::new();
        let records = vec![record(0.1, 0.1, mac(1), -50), record(0.1, 0.1, mac(2), -60)];

        assert!(engine.localize(&scan(&[]), &records).is_none());
        assert!(engine.localize(&scan(&[(mac(1), -50)]), &[]).is_none());
    }

    #[test]
    fn non_overlapping_scan_yields_none() {
        let engine = LocalizationEngine::new();
        let records = vec![record(0.1, 0.1, mac(1), -50), record(0.1, 0.1, mac(2), -60)];
        let live = scan(&[(mac(8), -40), (mac(9), -45)]);
        assert!(engine.localize(&live, &records).is_none());
    }

    #[test]
    fn single_shared_ap_is_never_selected() {
        let engine = LocalizationEngine::new();
        // Perfect agreement on one AP is still below the overlap floor.
        let records = vec![record(0.1, 0.1, mac(1), -50), record(0.1, 0.1, mac(2), -60)];
        let live = scan(&[(mac(1), -50)]);
        assert!(engine.localize(&live, &records).is_none());
    }

    #[test]
    fn broad_agreement_beats_exact_but_narrow() {
        let engine = LocalizationEngine::new();
        // Point A: 3 overlapping APs, total squared distance 50.
        // Point B: 2 overlapping APs, total squared distance 0.
        // Scores: A = 3*200 - 50 = 550, B = 2*200 - 0 = 400.
        let records = vec![
            record(0.1, 0.1, mac(1), -50),
            record(0.1, 0.1, mac(2), -60),
            record(0.1, 0.1, mac(3), -70),
            record(0.9, 0.9, mac(1), -55),
            record(0.9, 0.9, mac(2), -60),
        ];
        let live = scan(&[(mac(1), -55), (mac(2), -65), (mac(3), -70)]);

        let est = engine.localize(&live, &records).unwrap();
        assert_eq!(est.point, PointKey::from_coords(0.1, 0.1));
        assert_eq!(est.score, 550);
        assert_eq!(est.overlap, 3);
    }

    #[test]
    fn tie_breaks_to_first_in_storage_order() {
        let engine = LocalizationEngine::new();
        // Both points match the scan exactly on the same two APs.
        let records = vec![
            record(0.3, 0.3, mac(1), -50),
            record(0.3, 0.3, mac(2), -60),
            record(0.7, 0.7, mac(1), -50),
            record(0.7, 0.7, mac(2), -60),
        ];
        let live = scan(&[(mac(1), -50), (mac(2), -60)]);

        let est = engine.localize(&live, &records).unwrap();
        assert_eq!(est.point, PointKey::from_coords(0.3, 0.3));
        assert_eq!(est.score, 400);
    }

    #[test]
    fn records_absent_from_scan_contribute_nothing() {
        let engine = LocalizationEngine::new();
        // mac(3) is not visible in the live scan: it must affect neither
        // the distance nor the overlap of the candidate.
        let records = vec![
            record(0.1, 0.1, mac(1), -50),
            record(0.1, 0.1, mac(2), -60),
            record(0.1, 0.1, mac(3), -90),
        ];
        let live = scan(&[(mac(1), -53), (mac(2), -64)]);

        let est = engine.localize(&live, &records).unwrap();
        // overlap 2, squared distance 9 + 16 = 25.
        assert_eq!(est.overlap, 2);
        assert_eq!(est.score, 2 * OVERLAP_WEIGHT - 25);
    }

    #[test]
    fn split_coordinates_group_by_quantized_key() {
        let engine = LocalizationEngine::new();
        // Sub-resolution coordinate jitter still lands in one candidate.
        let records = vec![
            record(0.100_004, 0.2, mac(1), -50),
            record(0.099_996, 0.2, mac(2), -60),
        ];
        let live = scan(&[(mac(1), -50), (mac(2), -60)]);

        let est = engine.localize(&live, &records).unwrap();
        assert_eq!(est.overlap, 2);
        assert_eq!(est.point, PointKey::from_coords(0.1, 0.2));
    }
}

//! Live scan types: what the radio reports right now.
//!
//! A [`LiveScan`] is transient by design. It is built fresh for each
//! localization attempt, handed to the engine once, and discarded; it is
//! never persisted.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::bssid::BssidId;

/// A single access point observed once in a Wi-Fi scan.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanObservation {
    /// The MAC address of the observed access point.
    pub bssid: BssidId,
    /// The SSID (network name). May be empty for hidden networks.
    /// Display-only; never used for matching.
    pub ssid: String,
    /// Received signal strength in dBm (more negative = weaker).
    pub level_dbm: i32,
}

/// A transient bssid → level map for one localization attempt.
#[derive(Clone, Debug, Default)]
pub struct LiveScan {
    levels: HashMap<BssidId, i32>,
}

impl LiveScan {
    /// Build a live scan from raw observations.
    ///
    /// When the same BSSID appears more than once, the later observation
    /// wins.
    pub fn from_observations(observations: &[ScanObservation]) -> Self {
        let mut levels = HashMap::with_capacity(observations.len());
        for obs in observations {
            levels.insert(obs.bssid, obs.level_dbm);
        }
        Self { levels }
    }

    /// The observed level for a BSSID, if it is visible in this scan.
    pub fn level(&self, bssid: &BssidId) -> Option<i32> {
        self.levels.get(bssid).copied()
    }

    /// Number of distinct access points in this scan.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// True when no access points were observed.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(mac: &str, level: i32) -> ScanObservation {
        ScanObservation {
            bssid: BssidId::parse(mac).unwrap(),
            ssid: "net".to_owned(),
            level_dbm: level,
        }
    }

    #[test]
    fn builds_level_map() {
        let scan = LiveScan::from_observations(&[
            obs("aa:bb:cc:dd:ee:01", -40),
            obs("aa:bb:cc:dd:ee:02", -70),
        ]);
        assert_eq!(scan.len(), 2);
        assert_eq!(scan.level(&BssidId::parse("aa:bb:cc:dd:ee:01").unwrap()), Some(-40));
        assert_eq!(scan.level(&BssidId::parse("aa:bb:cc:dd:ee:03").unwrap()), None);
    }

    #[test]
    fn duplicate_bssid_last_wins() {
        let scan = LiveScan::from_observations(&[
            obs("aa:bb:cc:dd:ee:01", -40),
            obs("aa:bb:cc:dd:ee:01", -55),
        ]);
        assert_eq!(scan.len(), 1);
        assert_eq!(scan.level(&BssidId::parse("aa:bb:cc:dd:ee:01").unwrap()), Some(-55));
    }

    #[test]
    fn empty_scan() {
        let scan = LiveScan::from_observations(&[]);
        assert!(scan.is_empty());
    }
}

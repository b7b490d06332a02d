//! Durable, file-backed fingerprint record store.
//!
//! One text file per floor-plan session, one record per line in the fixed
//! order `x,y,timestamp,ssid,bssid,level`, no header. The store is
//! append-only except for point-scoped deletion, which rewrites the file
//! through a temporary in the same directory and atomically replaces the
//! original, so an interrupted delete can never leave a truncated file.
//!
//! Every mutating operation is synchronously durable before it returns:
//! appends fsync the file, deletions fsync the replacement before the
//! rename. A caller that saw `Ok` can rely on the operation surviving a
//! crash.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tempfile::NamedTempFile;

use crate::domain::{FingerprintRecord, PointKey};
use crate::error::StoreError;

/// Durable set of fingerprint records for the current floor-plan session.
///
/// Records are held in storage (arrival) order both on disk and in the
/// in-memory cache; reads are served from the cache, which is kept in
/// lockstep with the file by the mutating operations.
pub struct FingerprintStore {
    path: PathBuf,
    records: RwLock<Vec<FingerprintRecord>>,
}

impl FingerprintStore {
    /// Open the store backed by `path`, loading any existing records.
    ///
    /// A missing file is an empty store, not an error. Lines that fail to
    /// parse are skipped with a warning; one corrupt line never poisons the
    /// rest of the file.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut records = Vec::new();
        let mut skipped = 0usize;

        match fs::read_to_string(&path) {
            Ok(contents) => {
                for line in contents.lines() {
                    if line.is_empty() {
                        continue;
                    }
                    match FingerprintRecord::parse_line(line) {
                        Some(rec) => records.push(rec),
                        None => {
                            skipped += 1;
                            tracing::warn!(line, "skipping malformed fingerprint line");
                        }
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            path = %path.display(),
            loaded = records.len(),
            skipped,
            "fingerprint store opened"
        );

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append records to durable storage, preserving arrival order.
    ///
    /// The write is flushed and fsynced before the in-memory cache is
    /// updated and before this method returns.
    pub fn append(&self, new_records: &[FingerprintRecord]) -> Result<(), StoreError> {
        if new_records.is_empty() {
            return Ok(());
        }

        let mut buf = String::new();
        for rec in new_records {
            buf.push_str(&rec.to_line());
            buf.push('\n');
        }

        let mut records = self.records.write();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(buf.as_bytes())?;
        file.sync_all()?;

        records.extend_from_slice(new_records);
        tracing::debug!(appended = new_records.len(), total = records.len(), "records appended");
        Ok(())
    }

    /// Remove every record belonging to the calibration point `key`.
    ///
    /// Returns the number of records removed; a point with no records is a
    /// no-op that touches neither the file nor the cache.
    pub fn delete_by_point(&self, key: PointKey) -> Result<usize, StoreError> {
        let mut records = self.records.write();
        let before = records.len();
        let remaining: Vec<FingerprintRecord> = records
            .iter()
            .filter(|rec| rec.point_key() != key)
            .cloned()
            .collect();
        let removed = before - remaining.len();
        if removed == 0 {
            return Ok(0);
        }

        self.rewrite(&remaining)?;
        *records = remaining;
        tracing::info!(point = %key, removed, "calibration point deleted");
        Ok(removed)
    }

    /// All records belonging to the calibration point `key`, in storage
    /// order. For inspection, not for matching.
    pub fn query_by_point(&self, key: PointKey) -> Vec<FingerprintRecord> {
        self.records
            .read()
            .iter()
            .filter(|rec| rec.point_key() == key)
            .cloned()
            .collect()
    }

    /// Snapshot of every record currently stored, in storage order.
    pub fn load_all(&self) -> Vec<FingerprintRecord> {
        self.records.read().clone()
    }

    /// Distinct calibration points with their record counts, in first-seen
    /// storage order.
    pub fn points(&self) -> Vec<(PointKey, usize)> {
        let records = self.records.read();
        let mut order: Vec<PointKey> = Vec::new();
        let mut counts: std::collections::HashMap<PointKey, usize> = std::collections::HashMap::new();
        for rec in records.iter() {
            let key = rec.point_key();
            if !counts.contains_key(&key) {
                order.push(key);
            }
            *counts.entry(key).or_insert(0) += 1;
        }
        order.into_iter().map(|key| (key, counts[&key])).collect()
    }

    /// Remove all records and delete the backing file. Invoked when the
    /// floor-plan is discarded.
    pub fn clear(&self) -> Result<(), StoreError> {
        let mut records = self.records.write();
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        records.clear();
        tracing::info!(path = %self.path.display(), "fingerprint store cleared");
        Ok(())
    }

    /// Number of records currently stored.
    pub fn record_count(&self) -> usize {
        self.records.read().len()
    }

    /// True when no records are stored.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Rewrite the backing file with `remaining` through a same-directory
    /// temporary and an atomic rename.
    fn rewrite(&self, remaining: &[FingerprintRecord]) -> Result<(), StoreError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = NamedTempFile::new_in(dir)?;
        for rec in remaining {
            tmp.write_all(rec.to_line().as_bytes())?;
            tmp.write_all(b"\n")?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .map_err(|e| StoreError::Replace(e.to_string()))?;
        Ok(())
    }
}

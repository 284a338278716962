//! Save slots and the persistence boundary
//!
//! The coordinator wraps opaque engine state blobs into versioned, timestamped
//! records, one per slot at a stable `prefix + slot` key. It never interprets
//! the blob. Persistence failures never escape this module as panics or
//! errors: a save reports `false`, a load of anything malformed reports
//! "absent". A record is either fully well-formed or treated as missing.

use chrono::{DateTime, Utc};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// The slot used by quick save / quick load.
pub const QUICK_SLOT: usize = 0;

/// One persisted save. All three fields are required: a reader that finds a
/// record missing any of them treats the whole record as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRecord {
    pub timestamp: DateTime<Utc>,
    /// Opaque engine state blob.
    pub state: String,
    /// Semantic version of the build that wrote the record.
    pub version: String,
}

/// Slot listing entry (the record body is not loaded for listings).
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSummary {
    pub slot: usize,
    pub timestamp: Option<DateTime<Utc>>,
    pub version: Option<String>,
}

impl SlotSummary {
    pub fn is_empty(&self) -> bool {
        self.timestamp.is_none()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage quota exceeded")]
    QuotaExceeded,

    #[error("storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Key/value persistence capability (localStorage analog). Implementations
/// must make writes atomic per key: a reader never observes a half-written
/// value.
pub trait SaveStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store, with an optional byte quota for exercising the
/// quota-exceeded path.
#[derive(Default)]
pub struct MemorySaveStore {
    entries: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemorySaveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Raw write bypassing the quota, for seeding corrupt data in tests.
    pub fn put_raw(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .expect("save store lock poisoned")
            .insert(key.to_string(), value.to_string());
    }
}

impl SaveStore for MemorySaveStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().expect("save store lock poisoned");
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("save store lock poisoned");
        if let Some(quota) = self.quota_bytes {
            let used: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(StoreError::QuotaExceeded);
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("save store lock poisoned");
        entries.remove(key);
        Ok(())
    }
}

/// One file per key under a directory. Writes go through a temp file and a
/// rename so a crashed write never leaves a partial record behind.
pub struct DirectorySaveStore {
    dir: PathBuf,
}

impl DirectorySaveStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SaveStore for DirectorySaveStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Backend(e.into())),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::Backend(e.into()))?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let map_err = |e: std::io::Error| {
            if e.kind() == std::io::ErrorKind::StorageFull {
                StoreError::QuotaExceeded
            } else {
                StoreError::Backend(e.into())
            }
        };
        std::fs::write(&tmp, value).map_err(map_err)?;
        std::fs::rename(&tmp, &path).map_err(map_err)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Backend(e.into())),
        }
    }
}

/// Versioned slot persistence for opaque engine state blobs.
pub struct SaveCoordinator {
    store: Arc<dyn SaveStore>,
    prefix: String,
    slots: usize,
    version: String,
}

impl SaveCoordinator {
    pub fn new(store: Arc<dyn SaveStore>, prefix: impl Into<String>, slots: usize) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            slots,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    fn key(&self, slot: usize) -> String {
        format!("{}{}", self.prefix, slot)
    }

    fn valid_slot(&self, slot: usize) -> bool {
        if slot >= self.slots {
            error!("invalid save slot {slot} (have {} slots)", self.slots);
            return false;
        }
        true
    }

    /// Wrap `state` into a record and persist it under `slot`. Returns
    /// `false` on an invalid slot or any storage failure.
    pub fn save(&self, slot: usize, state: &str) -> bool {
        if !self.valid_slot(slot) {
            return false;
        }

        let record = SaveRecord {
            timestamp: Utc::now(),
            state: state.to_string(),
            version: self.version.clone(),
        };
        let json = match serde_json::to_string(&record) {
            Ok(json) => json,
            Err(e) => {
                error!("failed to serialize save record: {e}");
                return false;
            }
        };

        match self.store.write(&self.key(slot), &json) {
            Ok(()) => true,
            Err(StoreError::QuotaExceeded) => {
                error!("storage quota exceeded, cannot save slot {slot}");
                false
            }
            Err(e) => {
                error!("failed to save slot {slot}: {e}");
                false
            }
        }
    }

    /// Load the record at `slot`. Missing keys, malformed JSON and records
    /// missing required fields all read as `None`; a major-version mismatch
    /// is logged but the record is still returned.
    pub fn load(&self, slot: usize) -> Option<SaveRecord> {
        if !self.valid_slot(slot) {
            return None;
        }

        let raw = match self.store.read(&self.key(slot)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                error!("failed to read slot {slot}: {e}");
                return None;
            }
        };

        let record: SaveRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!("slot {slot} holds a malformed record, treating as empty: {e}");
                return None;
            }
        };

        if !self.is_version_compatible(&record.version) {
            warn!(
                "save version {} may not be compatible with current version {}",
                record.version, self.version
            );
        }
        Some(record)
    }

    pub fn delete(&self, slot: usize) -> bool {
        if !self.valid_slot(slot) {
            return false;
        }
        match self.store.remove(&self.key(slot)) {
            Ok(()) => true,
            Err(e) => {
                error!("failed to delete slot {slot}: {e}");
                false
            }
        }
    }

    /// Listing of every slot, loaded records reduced to their metadata.
    pub fn slot_summaries(&self) -> Vec<SlotSummary> {
        (0..self.slots)
            .map(|slot| match self.load(slot) {
                Some(record) => SlotSummary {
                    slot,
                    timestamp: Some(record.timestamp),
                    version: Some(record.version),
                },
                None => SlotSummary {
                    slot,
                    timestamp: None,
                    version: None,
                },
            })
            .collect()
    }

    /// Only the major component matters; minor and patch drift is assumed
    /// forward/backward compatible.
    fn is_version_compatible(&self, saved: &str) -> bool {
        major_of(saved) == major_of(&self.version)
    }
}

fn major_of(version: &str) -> Option<u32> {
    version.split('.').next()?.parse().ok()
}

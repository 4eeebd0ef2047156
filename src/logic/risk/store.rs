//! Risk Store - Durable snapshot of the risk map
//!
//! One fixed key holds the whole serialized `RiskState`. Readers only ever
//! see a complete snapshot: the file backend writes a temp file and renames
//! it over the previous one.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;

use super::types::RiskState;
use crate::constants::RISK_DATA_KEY;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("risk store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("risk snapshot is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("risk store unavailable: {0}")]
    Unavailable(String),
}

/// Durable key/value home of the risk snapshot
pub trait RiskStore: Send + Sync {
    /// Replace the stored snapshot with `state`
    fn persist(&self, state: &RiskState) -> Result<(), StoreError>;

    /// Last persisted snapshot, or an empty map when nothing was stored
    fn load(&self) -> Result<RiskState, StoreError>;

    /// When the snapshot was last written, if known
    fn last_updated(&self) -> Option<DateTime<Utc>> {
        None
    }
}

// ============================================================================
// FILE STORE
// ============================================================================

/// `<dir>/riskData.json`
#[derive(Debug, Clone)]
pub struct FileRiskStore {
    file_path: PathBuf,
}

impl FileRiskStore {
    /// Store under `dir`, creating it if needed
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        Ok(Self {
            file_path: dir.join(format!("{}.json", RISK_DATA_KEY)),
        })
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.file_path.clone(),
            source,
        }
    }
}

impl RiskStore for FileRiskStore {
    fn persist(&self, state: &RiskState) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(state)?;
        write_atomic(&self.file_path, &bytes).map_err(|e| self.io_error(e))?;
        log::debug!("[RiskStore] Persisted {} edges to {:?}", state.len(), self.file_path);
        Ok(())
    }

    fn load(&self) -> Result<RiskState, StoreError> {
        match fs::read(&self.file_path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(RiskState::new()),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn last_updated(&self) -> Option<DateTime<Utc>> {
        let modified = fs::metadata(&self.file_path).ok()?.modified().ok()?;
        Some(DateTime::<Utc>::from(modified))
    }
}

/// Write to a sibling temp file, sync it, then rename over `path`
fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    let written = fs::File::create(&tmp).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });
    if let Err(e) = written.and_then(|()| fs::rename(&tmp, path)) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

// ============================================================================
// MEMORY STORE
// ============================================================================

/// In-process store holding the serialized blob
///
/// Used by tests and by embedders without a data directory.
#[derive(Debug, Default)]
pub struct MemoryRiskStore {
    blob: Mutex<Option<Vec<u8>>>,
    written_at: Mutex<Option<DateTime<Utc>>>,
    fail_writes: Mutex<bool>,
    writes: Mutex<u64>,
}

impl MemoryRiskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `persist` fail
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    /// Number of successful writes
    pub fn writes(&self) -> u64 {
        *self.writes.lock()
    }

    /// Raw stored JSON
    pub fn raw(&self) -> Option<String> {
        self.blob
            .lock()
            .as_ref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

impl RiskStore for MemoryRiskStore {
    fn persist(&self, state: &RiskState) -> Result<(), StoreError> {
        if *self.fail_writes.lock() {
            return Err(StoreError::Unavailable("simulated write failure".to_string()));
        }
        let bytes = serde_json::to_vec(state)?;
        *self.blob.lock() = Some(bytes);
        *self.written_at.lock() = Some(Utc::now());
        *self.writes.lock() += 1;
        Ok(())
    }

    fn load(&self) -> Result<RiskState, StoreError> {
        match self.blob.lock().as_deref() {
            Some(bytes) => Ok(serde_json::from_slice(bytes)?),
            None => Ok(RiskState::new()),
        }
    }

    fn last_updated(&self) -> Option<DateTime<Utc>> {
        *self.written_at.lock()
    }
}

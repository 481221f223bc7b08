//! Response cache: content-addressable store for generation results.
//!
//! Keys are SHA-256 fingerprints of the exact prompt bytes, so an unchanged
//! prompt replays its earlier result without another external call.
//!
//! Failure policy: `get` never fails (a bad record is a miss) and `put`
//! failures are reported to the caller, who only logs them.

use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("cache persist error: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("cache lock poisoned")]
    Poisoned,
}

// ────────────────────────────────────────────────────────────────────────────
// Fingerprint
// ────────────────────────────────────────────────────────────────────────────

/// Deterministic digest of a request payload. Hex-encoded SHA-256.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestFingerprint(String);

impl RequestFingerprint {
    /// Hashes the payload's UTF-8 bytes. No salts, no timestamps.
    pub fn of(payload: &str) -> Self {
        let digest = Sha256::digest(payload.as_bytes());
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 hex chars, for log lines.
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Display for RequestFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait
// ────────────────────────────────────────────────────────────────────────────

/// Injected into the generator at construction; swap the file store for the
/// in-memory one in tests.
pub trait ResponseCache: Send + Sync {
    /// Returns the cached text, or `None` on a miss. A corrupt entry is a miss.
    fn get(&self, fingerprint: &RequestFingerprint) -> Option<String>;

    /// Stores `text` under `fingerprint`. Best-effort: callers log failures.
    fn put(&self, fingerprint: &RequestFingerprint, text: &str) -> Result<(), CacheError>;
}

// ────────────────────────────────────────────────────────────────────────────
// File-backed cache
// ────────────────────────────────────────────────────────────────────────────

/// On-disk record. The fingerprint is stored alongside the text so a record
/// copied under the wrong name is detected and ignored.
#[derive(Debug, Serialize, Deserialize)]
struct CacheRecord {
    fingerprint: String,
    text: String,
}

/// One JSON file per entry, named `<fingerprint>.json`.
pub struct FileResponseCache {
    dir: PathBuf,
}

impl FileResponseCache {
    /// Opens (and creates if needed) the cache directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, fingerprint: &RequestFingerprint) -> PathBuf {
        self.dir.join(format!("{}.json", fingerprint.as_str()))
    }
}

impl ResponseCache for FileResponseCache {
    fn get(&self, fingerprint: &RequestFingerprint) -> Option<String> {
        let path = self.entry_path(fingerprint);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(fingerprint = %fingerprint.short(), "Cache miss");
                return None;
            }
            Err(e) => {
                warn!("Failed reading cache entry {}: {e}. Treating as miss.", path.display());
                return None;
            }
        };

        let record: CacheRecord = match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(e) => {
                warn!("Corrupt cache entry {}: {e}. Treating as miss.", path.display());
                return None;
            }
        };

        if record.fingerprint != fingerprint.as_str() {
            warn!(
                "Cache entry {} holds fingerprint {}. Treating as miss.",
                path.display(),
                record.fingerprint
            );
            return None;
        }

        debug!(fingerprint = %fingerprint.short(), "Cache hit");
        Some(record.text)
    }

    fn put(&self, fingerprint: &RequestFingerprint, text: &str) -> Result<(), CacheError> {
        let record = CacheRecord {
            fingerprint: fingerprint.as_str().to_string(),
            text: text.to_string(),
        };
        let encoded = serde_json::to_vec(&record)?;

        // Write beside the target, then rename over it.
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&encoded)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.entry_path(fingerprint))?;

        debug!(fingerprint = %fingerprint.short(), "Saved response to cache");
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory cache
// ────────────────────────────────────────────────────────────────────────────

/// Process-local cache. Nothing survives the process.
#[derive(Default)]
pub struct MemoryResponseCache {
    entries: Mutex<HashMap<RequestFingerprint, String>>,
}

impl MemoryResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }
}

impl ResponseCache for MemoryResponseCache {
    fn get(&self, fingerprint: &RequestFingerprint) -> Option<String> {
        self.entries.lock().ok()?.get(fingerprint).cloned()
    }

    fn put(&self, fingerprint: &RequestFingerprint, text: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.insert(fingerprint.clone(), text.to_string());
        Ok(())
    }
}

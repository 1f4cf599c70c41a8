//! Cache entries and the on-disk snapshot format.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use epd_image::ConversionParams;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::key::CacheKey;
use crate::policy::PathPolicy;
use crate::{CacheError, Result};

/// The only snapshot schema this build reads or writes.
pub const SNAPSHOT_VERSION: u64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub temp_path: PathBuf,
    pub source_path: PathBuf,
    pub params: ConversionParams,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Recency tick; larger is more recently used.
    #[serde(default)]
    pub last_used: u64,
}

#[derive(Serialize)]
struct SnapshotOut<'a> {
    version: u64,
    entries: BTreeMap<&'a str, &'a CacheEntry>,
}

#[derive(Deserialize)]
struct SnapshotIn {
    version: Option<u64>,
    #[serde(default)]
    entries: serde_json::Map<String, Value>,
}

/// Atomically replace the snapshot at `path` with `entries`.
pub(crate) fn write_snapshot(path: &Path, entries: &HashMap<CacheKey, CacheEntry>) -> Result<()> {
    let snapshot = SnapshotOut {
        version: SNAPSHOT_VERSION,
        entries: entries.iter().map(|(k, v)| (k.as_str(), v)).collect(),
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, &snapshot)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| CacheError::Io(e.error))?;

    debug!(path = %path.display(), entries = entries.len(), "Wrote cache snapshot");
    Ok(())
}

/// Load the snapshot at `path`, keeping only entries that validate.
///
/// Never fails: an unreadable file, malformed JSON or an unknown version all
/// yield an empty map, and bad entries are dropped one by one.
pub(crate) fn read_snapshot(path: &Path, policy: &PathPolicy) -> HashMap<CacheKey, CacheEntry> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashMap::new(),
        Err(e) => {
            report(CacheError::Io(e), path);
            return HashMap::new();
        }
    };

    let snapshot: SnapshotIn = match serde_json::from_str(&raw) {
        Ok(s) => s,
        Err(e) => {
            report(CacheError::Json(e), path);
            return HashMap::new();
        }
    };

    if snapshot.version != Some(SNAPSHOT_VERSION) {
        report(
            CacheError::Corrupt(format!(
                "unsupported snapshot version {:?}, expected {SNAPSHOT_VERSION}",
                snapshot.version
            )),
            path,
        );
        return HashMap::new();
    }

    let mut entries = HashMap::with_capacity(snapshot.entries.len());
    for (key, value) in snapshot.entries {
        match validate_entry(value, policy) {
            Ok(entry) => {
                entries.insert(CacheKey::from(key), entry);
            }
            Err(e) => warn!(key = %key, error = %e, "Dropping cache entry"),
        }
    }
    entries
}

fn validate_entry(value: Value, policy: &PathPolicy) -> Result<CacheEntry> {
    let entry: CacheEntry =
        serde_json::from_value(value).map_err(|e| CacheError::Corrupt(e.to_string()))?;
    policy.check(&entry.temp_path)?;
    if !entry.temp_path.is_file() {
        return Err(CacheError::Corrupt(format!(
            "artifact {} no longer exists",
            entry.temp_path.display()
        )));
    }
    Ok(entry)
}

fn report(error: CacheError, path: &Path) {
    warn!(path = %path.display(), error = %error, "Ignoring cache snapshot");
}

//! The shared cache handle.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use epd_image::ConversionParams;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::entry::{self, CacheEntry};
use crate::key::CacheKey;
use crate::policy::PathPolicy;
use crate::{CacheError, Result};

pub const DEFAULT_MAX_ENTRIES: usize = 100;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Entry count at which the least recently used entry is evicted.
    pub max_size: usize,
    /// Snapshot location; `None` keeps the index in memory only.
    pub persist_path: Option<PathBuf>,
    /// Where artifacts are allowed to live. Everything under these roots
    /// may be deleted by the cache, so keep it to temp and cache directories.
    pub policy: PathPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_ENTRIES,
            persist_path: None,
            policy: PathPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub max_size: usize,
    /// Size of the distinct artifact files still on disk.
    pub total_bytes: u64,
    pub persist_enabled: bool,
}

#[derive(Default)]
struct State {
    entries: HashMap<CacheKey, CacheEntry>,
    tick: u64,
}

impl State {
    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn is_shared(&self, path: &Path) -> bool {
        self.entries.values().any(|e| e.temp_path == path)
    }

    /// Remove `key`, deleting its file unless another entry still points at it.
    fn discard(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        let entry = self.entries.remove(key)?;
        if !self.is_shared(&entry.temp_path) {
            remove_file_quietly(&entry.temp_path);
        }
        Some(entry)
    }

    fn evict_oldest(&mut self) -> Option<CacheKey> {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.last_used)
            .map(|(k, _)| k.clone())?;
        self.discard(&oldest);
        Some(oldest)
    }
}

struct Inner {
    state: Mutex<State>,
    config: CacheConfig,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if self.config.persist_path.is_some() {
            return;
        }
        let state = self.state.get_mut().unwrap_or_else(|e| e.into_inner());
        let paths: HashSet<PathBuf> = state.entries.drain().map(|(_, e)| e.temp_path).collect();
        for path in &paths {
            remove_file_quietly(path);
        }
        if !paths.is_empty() {
            debug!(files = paths.len(), "Removed cached artifacts on shutdown");
        }
    }
}

/// Thread-safe LRU index of converted artifacts.
///
/// Clones share the same index. The cache owns every registered file: it
/// deletes them on eviction, on [`clear`](Self::clear), and (for a
/// non-persistent cache) when the last handle is dropped.
#[derive(Clone)]
pub struct ImageCache {
    inner: Arc<Inner>,
}

impl ImageCache {
    /// Build a cache, loading the snapshot at `config.persist_path` if present.
    pub fn new(config: CacheConfig) -> Self {
        let mut state = State::default();
        if let Some(path) = &config.persist_path {
            state.entries = entry::read_snapshot(path, &config.policy);
            state.tick = state.entries.values().map(|e| e.last_used).max().unwrap_or(0);
            while state.entries.len() > config.max_size.max(1) && state.evict_oldest().is_some() {}
            info!(
                path = %path.display(),
                entries = state.entries.len(),
                "Loaded image cache"
            );
        }

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                config,
            }),
        }
    }

    /// A non-persistent cache confined to the system temp directory.
    pub fn in_memory(max_size: usize) -> Self {
        Self::new(CacheConfig {
            max_size,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    pub fn max_size(&self) -> usize {
        self.inner.config.max_size.max(1)
    }

    pub fn is_persistent(&self) -> bool {
        self.inner.config.persist_path.is_some()
    }

    fn with_state<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut State) -> Result<R>,
    {
        let mut state = self
            .inner
            .state
            .lock()
            .map_err(|_| CacheError::LockPoisoned)?;
        f(&mut state)
    }

    /// Snapshot the index if persistence is on. Failures are logged only.
    fn persist(&self, state: &State) {
        let Some(path) = &self.inner.config.persist_path else {
            return;
        };
        if let Err(e) = entry::write_snapshot(path, &state.entries) {
            warn!(path = %path.display(), error = %e, "Failed to persist image cache");
        }
    }

    /// Look up `key`, promoting it to most recently used.
    ///
    /// An entry whose file has vanished is dropped and reported as a miss.
    pub fn get(&self, key: &CacheKey) -> Result<Option<PathBuf>> {
        self.with_state(|state| {
            let Some(existing) = state.entries.get(key) else {
                return Ok(None);
            };
            if !existing.temp_path.is_file() {
                debug!(key = %key, path = %existing.temp_path.display(), "Dropping stale cache entry");
                state.entries.remove(key);
                return Ok(None);
            }

            let tick = state.next_tick();
            let Some(entry) = state.entries.get_mut(key) else {
                return Ok(None);
            };
            entry.last_used = tick;
            debug!(key = %key, path = %entry.temp_path.display(), "Cache hit");
            Ok(Some(entry.temp_path.clone()))
        })
    }

    /// Register `temp_path` as the artifact for `key`.
    ///
    /// Returns the path the caller should use: when a live entry for `key`
    /// already exists its path wins and `temp_path` is left for the caller
    /// to discard.
    pub fn put(
        &self,
        key: CacheKey,
        temp_path: &Path,
        source_path: &Path,
        params: &ConversionParams,
    ) -> Result<PathBuf> {
        let temp_path = self.inner.config.policy.check(temp_path)?;
        let max_size = self.max_size();

        self.with_state(|state| {
            if let Some(existing) = state.entries.get(&key) {
                if existing.temp_path.is_file() {
                    let path = existing.temp_path.clone();
                    let tick = state.next_tick();
                    if let Some(e) = state.entries.get_mut(&key) {
                        e.last_used = tick;
                    }
                    debug!(key = %key, path = %path.display(), "Entry already cached");
                    return Ok(path);
                }
                state.entries.remove(&key);
            }

            while state.entries.len() >= max_size {
                let Some(evicted) = state.evict_oldest() else {
                    break;
                };
                debug!(key = %evicted, "Evicted least recently used entry");
            }

            let last_used = state.next_tick();
            state.entries.insert(
                key.clone(),
                CacheEntry {
                    temp_path: temp_path.clone(),
                    source_path: source_path.to_path_buf(),
                    params: *params,
                    created_at: Utc::now(),
                    last_used,
                },
            );
            debug!(key = %key, path = %temp_path.display(), entries = state.entries.len(), "Cached artifact");

            self.persist(state);
            Ok(temp_path)
        })
    }

    /// Drop one entry and its file. Returns whether it existed.
    pub fn remove(&self, key: &CacheKey) -> Result<bool> {
        self.with_state(|state| {
            let removed = state.discard(key).is_some();
            if removed {
                self.persist(state);
            }
            Ok(removed)
        })
    }

    /// Remove every entry, its file, and the snapshot.
    pub fn clear(&self) -> Result<()> {
        self.with_state(|state| {
            let count = state.entries.len();
            let paths: HashSet<PathBuf> = state.entries.drain().map(|(_, e)| e.temp_path).collect();
            for path in &paths {
                remove_file_quietly(path);
            }
            state.tick = 0;

            if let Some(snapshot) = &self.inner.config.persist_path {
                match std::fs::remove_file(snapshot) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            }
            info!(entries = count, "Cleared image cache");
            Ok(())
        })
    }

    pub fn stats(&self) -> Result<CacheStats> {
        self.with_state(|state| {
            let files: HashSet<&Path> = state.entries.values().map(|e| e.temp_path.as_path()).collect();
            let total_bytes = files
                .into_iter()
                .filter_map(|p| std::fs::metadata(p).ok())
                .map(|m| m.len())
                .sum();
            Ok(CacheStats {
                entries: state.entries.len(),
                max_size: self.max_size(),
                total_bytes,
                persist_enabled: self.is_persistent(),
            })
        })
    }

    pub fn len(&self) -> Result<usize> {
        self.with_state(|state| Ok(state.entries.len()))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Copy of the entry for `key` without touching its recency.
    pub fn entry(&self, key: &CacheKey) -> Result<Option<CacheEntry>> {
        self.with_state(|state| Ok(state.entries.get(key).cloned()))
    }
}

fn remove_file_quietly(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed cached artifact"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove cached artifact"),
    }
}

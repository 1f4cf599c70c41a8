//! Size-bounded LRU cache of converted e-paper artifacts.
//!
//! Maps a fingerprint of (source file identity, conversion parameters) to the
//! path of a previously written artifact, optionally persisting the index as
//! a versioned JSON snapshot so later processes can reuse the files.

pub mod cache;
pub mod entry;
pub mod key;
pub mod policy;

use std::path::PathBuf;

pub use cache::{CacheConfig, CacheStats, DEFAULT_MAX_ENTRIES, ImageCache};
pub use entry::{CacheEntry, SNAPSHOT_VERSION};
pub use key::CacheKey;
pub use policy::PathPolicy;

/// Cache error type.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Invalid cache path {}: {reason}", path.display())]
    InvalidPath { path: PathBuf, reason: String },

    /// Snapshot or entry failed validation. Recovered locally and logged.
    #[error("Corrupt cache data: {0}")]
    Corrupt(String),

    #[error("Cache lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests;

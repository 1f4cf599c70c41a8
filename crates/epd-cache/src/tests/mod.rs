use std::path::{Path, PathBuf};

use epd_image::ConversionParams;
use tempfile::TempDir;

use crate::{CacheConfig, CacheKey, ImageCache, PathPolicy};

/// Scratch directory that doubles as the only allowed root.
struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn policy(&self) -> PathPolicy {
        PathPolicy::new([self.path().to_path_buf()])
    }

    fn cache(&self, max_size: usize) -> ImageCache {
        ImageCache::new(CacheConfig {
            max_size,
            persist_path: None,
            policy: self.policy(),
        })
    }

    fn persistent_cache(&self, max_size: usize) -> ImageCache {
        ImageCache::new(CacheConfig {
            max_size,
            persist_path: Some(self.snapshot_path()),
            policy: self.policy(),
        })
    }

    fn snapshot_path(&self) -> PathBuf {
        self.path().join("cache_index.json")
    }

    /// Write a small artifact file and return its path.
    fn artifact(&self, name: &str) -> PathBuf {
        let path = self.path().join(name);
        std::fs::write(&path, [0xFFu8; 16]).expect("Failed to write artifact");
        path
    }
}

fn key(n: u32) -> CacheKey {
    CacheKey::from(format!("key-{n:04}"))
}

fn params() -> ConversionParams {
    ConversionParams::default()
}

/// Insert `key(n)` backed by a fresh artifact file.
fn put_new(fx: &Fixture, cache: &ImageCache, n: u32) -> PathBuf {
    let artifact = fx.artifact(&format!("eink_auto_{n}.png"));
    cache
        .put(key(n), &artifact, Path::new("/src/image.png"), &params())
        .unwrap()
}

mod paths;

//! Allowed-directory checks for source images and cached artifacts.

use std::path::{Component, Path, PathBuf};

use crate::{CacheError, Result};

/// Allow-list of directory roots.
///
/// A path passes when it contains no `..` or `~` components and its absolute
/// form lies under one of the roots. Roots are compared lexically and never
/// canonicalized, so a symlink inside a root is trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPolicy {
    roots: Vec<PathBuf>,
}

impl Default for PathPolicy {
    /// The system temp directory only. This is where cached artifacts may
    /// live unless a cache directory is added with [`with_root`](Self::with_root).
    fn default() -> Self {
        Self::new([std::env::temp_dir()])
    }
}

impl PathPolicy {
    /// Roots for reading source images: the temp directory and the user's
    /// home directory. Never hand this to a cache, which deletes what it owns.
    pub fn sources() -> Self {
        let policy = Self::default();
        match dirs::home_dir() {
            Some(home) => policy.with_root(home),
            None => policy,
        }
    }

    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut policy = Self { roots: Vec::new() };
        for root in roots {
            policy.push_root(root);
        }
        policy
    }

    /// Builder: allow one more root.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.push_root(root.into());
        self
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn push_root(&mut self, root: PathBuf) {
        let root = std::path::absolute(&root).unwrap_or(root);
        if !self.roots.contains(&root) {
            self.roots.push(root);
        }
    }

    /// Validate `path`, returning its absolute form.
    pub fn check(&self, path: &Path) -> Result<PathBuf> {
        let invalid = |reason: &str| CacheError::InvalidPath {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        for component in path.components() {
            match component {
                Component::ParentDir => return Err(invalid("parent directory traversal")),
                Component::Normal(part) if part.to_string_lossy().starts_with('~') => {
                    return Err(invalid("home directory shorthand"));
                }
                _ => {}
            }
        }

        let absolute = std::path::absolute(path).map_err(|e| invalid(&e.to_string()))?;
        if self.roots.iter().any(|root| absolute.starts_with(root)) {
            Ok(absolute)
        } else {
            Err(invalid("outside allowed directories"))
        }
    }

    pub fn is_allowed(&self, path: &Path) -> bool {
        self.check(path).is_ok()
    }
}

//! Conversion fingerprints.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use epd_image::ConversionParams;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Modification time recorded for sources that cannot be stat'ed.
const MISSING_MTIME: i64 = -1;

/// Hex-encoded SHA-256 over the source identity and every conversion parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Fingerprint `source` as it currently exists on disk under `params`.
    ///
    /// Touching the file changes its mtime and therefore the key, so stale
    /// artifacts are never returned for an edited image. Missing files all
    /// share the `-1` mtime class.
    pub fn for_source(source: &Path, params: &ConversionParams) -> Self {
        let absolute = absolute_path(source);
        let mtime = source_mtime(&absolute);

        let mut hasher = Sha256::new();
        hasher.update(absolute.as_os_str().as_encoded_bytes());
        hasher.update([0u8]);
        hasher.update(mtime.to_le_bytes());
        hasher.update(param_material(params).as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CacheKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn absolute_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Nanoseconds since the epoch, or [`MISSING_MTIME`].
fn source_mtime(path: &Path) -> i64 {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .and_then(|d| i64::try_from(d.as_nanos()).ok())
        .unwrap_or(MISSING_MTIME)
}

/// Stable textual form of every field, independent of serde layout.
fn param_material(p: &ConversionParams) -> String {
    let crop = |c: Option<u32>| c.map_or_else(|| "-".to_string(), |v| v.to_string());
    format!(
        "{}x{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
        p.target_width,
        p.target_height,
        p.scaling,
        p.dithering,
        p.rotation.degrees(),
        p.h_flip,
        p.v_flip,
        crop(p.crop_x),
        crop(p.crop_y),
        p.invert,
        p.format,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use epd_image::{ArtifactFormat, DitheringMethod, Rotation};
    use std::fs::File;
    use std::time::{Duration, SystemTime};

    #[test]
    fn test_key_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, b"x").unwrap();
        let params = ConversionParams::default();

        let a = CacheKey::for_source(&path, &params);
        let b = CacheKey::for_source(&path, &params);
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_every_param_changes_key() {
        let path = Path::new("/nonexistent/source.png");
        let base = ConversionParams::default();
        let variants = [
            ConversionParams::new(240, 416),
            base.with_dithering(DitheringMethod::Sierra),
            base.with_rotation(Rotation::Rotate90),
            base.with_flip(true, false),
            base.with_flip(false, true),
            base.with_crop(Some(0), None),
            base.with_crop(None, Some(0)),
            base.with_invert(true),
            base.with_format(ArtifactFormat::Raw),
        ];
        let base_key = CacheKey::for_source(path, &base);
        for params in variants {
            assert_ne!(CacheKey::for_source(path, &params), base_key, "{params:?}");
        }
    }

    #[test]
    fn test_mtime_change_invalidates_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, b"x").unwrap();
        let params = ConversionParams::default();

        let before = CacheKey::for_source(&path, &params);
        let file = File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(3600))
            .unwrap();
        let after = CacheKey::for_source(&path, &params);
        assert_ne!(before, after);
    }

    #[test]
    fn test_missing_source_differs_from_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("later.png");
        let params = ConversionParams::default();

        let missing = CacheKey::for_source(&path, &params);
        assert_eq!(missing, CacheKey::for_source(&path, &params));

        std::fs::write(&path, b"x").unwrap();
        assert_ne!(CacheKey::for_source(&path, &params), missing);
    }

    #[test]
    fn test_relative_and_absolute_paths_agree() {
        let params = ConversionParams::default();
        let cwd = std::env::current_dir().unwrap();
        let relative = Path::new("no_such_image.png");
        assert_eq!(
            CacheKey::for_source(relative, &params),
            CacheKey::for_source(&cwd.join(relative), &params)
        );
    }
}

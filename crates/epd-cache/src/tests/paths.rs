use std::path::{Path, PathBuf};

use serde_json::json;

use super::{Fixture, key, params};
use crate::{CacheConfig, CacheError, ImageCache, PathPolicy, SNAPSHOT_VERSION};

/// The home directory, when it is distinct from the temp directory.
fn home_outside_temp() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    let temp = std::env::temp_dir();
    (!home.starts_with(&temp) && !temp.starts_with(&home)).then_some(home)
}

#[test]
fn test_put_outside_allowed_roots_is_rejected() {
    let fx = Fixture::new();
    let cache = fx.cache(4);
    let outside = tempfile::tempdir().unwrap();
    let stray = outside.path().join("eink_auto_1.png");
    std::fs::write(&stray, b"x").unwrap();

    let err = cache
        .put(key(1), &stray, Path::new("/src/a.png"), &params())
        .unwrap_err();
    assert!(matches!(err, CacheError::InvalidPath { .. }));
    assert!(cache.is_empty().unwrap());
}

#[test]
fn test_traversal_is_rejected_even_inside_root() {
    let fx = Fixture::new();
    let policy = fx.policy();
    std::fs::create_dir(fx.path().join("sub")).unwrap();
    let sneaky = fx.path().join("sub").join("..").join("x.png");

    assert!(matches!(
        policy.check(&sneaky),
        Err(CacheError::InvalidPath { .. })
    ));
    assert!(!policy.is_allowed(Path::new("~/x.png")));
    assert!(policy.is_allowed(&fx.path().join("sub").join("x.png")));
}

#[test]
fn test_relative_paths_resolve_against_cwd() {
    let cwd = std::env::current_dir().unwrap();
    let policy = PathPolicy::new([cwd.clone()]);
    assert_eq!(policy.check(Path::new("a/b.png")).unwrap(), cwd.join("a/b.png"));
}

#[test]
fn test_root_prefix_is_component_wise() {
    let policy = PathPolicy::new([PathBuf::from("/srv/eink")]);
    assert!(policy.is_allowed(Path::new("/srv/eink/frame.png")));
    assert!(!policy.is_allowed(Path::new("/srv/einkother/frame.png")));
    assert!(!policy.is_allowed(Path::new("/etc/passwd")));
}

#[test]
fn test_default_policy_covers_temp_dir() {
    let policy = PathPolicy::default();
    assert_eq!(policy.roots().len(), 1);
    assert!(policy.is_allowed(&std::env::temp_dir().join("eink_auto_x.png")));

    let policy = policy.with_root("/opt/distiller-cm5-sdk");
    assert!(policy.is_allowed(Path::new("/opt/distiller-cm5-sdk/images/logo.png")));
    assert!(policy.roots().len() >= 2);
}

#[test]
fn test_source_policy_adds_home() {
    let Some(home) = home_outside_temp() else {
        return;
    };
    assert!(!PathPolicy::default().is_allowed(&home.join("photo.png")));
    assert!(PathPolicy::sources().is_allowed(&home.join("photo.png")));
}

#[test]
fn test_put_of_home_path_is_rejected() {
    let Some(home) = home_outside_temp() else {
        return;
    };
    let cache = ImageCache::in_memory(4);
    let target = home.join("important_document.pdf");

    let err = cache
        .put(key(1), &target, Path::new("/src/a.png"), &params())
        .unwrap_err();
    assert!(matches!(err, CacheError::InvalidPath { .. }));
    assert!(cache.is_empty().unwrap());
}

#[test]
fn test_snapshot_entry_under_home_is_dropped_and_survives_clear() {
    let Some(home) = home_outside_temp() else {
        return;
    };
    let Ok(victim) = tempfile::Builder::new()
        .prefix("important_document")
        .suffix(".pdf")
        .tempfile_in(&home)
    else {
        return;
    };

    let fx = Fixture::new();
    let doc = json!({
        "version": SNAPSHOT_VERSION,
        "entries": {
            "abc": {
                "temp_path": victim.path(),
                "source_path": "/src/a.png",
                "params": params(),
            }
        }
    });
    std::fs::write(fx.snapshot_path(), doc.to_string()).unwrap();

    let cache = ImageCache::new(CacheConfig {
        max_size: 4,
        persist_path: Some(fx.snapshot_path()),
        policy: PathPolicy::default().with_root(fx.path()),
    });
    assert!(cache.is_empty().unwrap());

    cache.clear().unwrap();
    drop(cache);
    assert!(victim.path().exists());
}

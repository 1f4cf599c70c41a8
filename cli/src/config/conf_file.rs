//! `eink.conf` parsing.
//!
//! The SDK ships a flat `key=value` file. Keys are case-insensitive and may
//! omit the `EPD_` prefix; `firmware=` is the historical spelling.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Config files read at startup, lowest precedence first.
pub fn default_locations(install_dir: &Path) -> Vec<PathBuf> {
    locations(install_dir, dirs::home_dir().as_deref())
}

/// The install-dir file, `./eink.conf`, then `<home>/.distiller/eink.conf`.
fn locations(install_dir: &Path, home: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = vec![install_dir.join("eink.conf"), PathBuf::from("eink.conf")];
    if let Some(home) = home {
        paths.push(home.join(".distiller").join("eink.conf"));
    }
    paths
}

/// Parse `key=value` lines into canonical `EPD_*` keys.
pub fn parse(text: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            warn!(line = lineno + 1, "Ignoring malformed eink.conf line");
            continue;
        };
        let value = value.trim().trim_matches('"');
        values.insert(canonical_key(key), value.to_string());
    }
    values
}

fn canonical_key(key: &str) -> String {
    let key = key.trim().to_ascii_uppercase();
    if key.starts_with("EPD_") {
        key
    } else {
        format!("EPD_{key}")
    }
}

/// Read and merge every existing file in `paths`; later files win.
pub fn load(paths: &[PathBuf]) -> HashMap<String, String> {
    let mut merged = HashMap::new();
    for path in paths {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let values = parse(&text);
                debug!(path = %path.display(), keys = values.len(), "Loaded eink.conf");
                merged.extend(values);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to read eink.conf"),
        }
    }
    merged
}

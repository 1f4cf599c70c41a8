//! All setting definitions with their default values.

use std::collections::HashMap;
use std::sync::LazyLock;

type DefTuple = (&'static str, &'static str, &'static str);

/// `(key, default, description)`. An empty default means "computed at load".
const DEFS: &[DefTuple] = &[
    ("EPD_FIRMWARE", "EPD128x250", "Panel firmware (EPD128x250 or EPD240x416)"),
    ("EPD_CACHE_ENABLED", "true", "Reuse previous conversions"),
    ("EPD_CACHE_MAX_ENTRIES", "100", "Cached conversions kept before LRU eviction"),
    ("EPD_CACHE_PERSIST", "true", "Keep the cache index and artifacts across runs"),
    ("EPD_CACHE_DIR", "", "Directory for the cache index and persistent artifacts"),
    ("EPD_INSTALL_DIR", "/opt/distiller-cm5-sdk", "SDK installation directory"),
    ("EPD_ALLOWED_DIRS", "", "Extra source directories, comma separated"),
    ("EPD_SCALING", "letterbox", "Default scaling method"),
    ("EPD_DITHERING", "floyd-steinberg", "Default dithering method"),
    ("EPD_OUTPUT_FORMAT", "png", "Default artifact format (png or raw)"),
];

/// A single setting definition.
#[derive(Debug, Clone)]
pub struct SettingDef {
    pub key: &'static str,
    pub default: &'static str,
    pub description: &'static str,
}

/// Global setting definitions indexed by key.
pub static DEFAULT_SETTINGS: LazyLock<HashMap<&'static str, SettingDef>> = LazyLock::new(|| {
    DEFS.iter()
        .map(|&(key, default, description)| {
            (
                key,
                SettingDef {
                    key,
                    default,
                    description,
                },
            )
        })
        .collect()
});

/// Setting keys in declaration order.
pub fn keys() -> impl Iterator<Item = &'static str> {
    DEFS.iter().map(|&(key, _, _)| key)
}

/// Get the default value for a setting key, or `None` if not defined.
pub fn get_default(key: &str) -> Option<&'static str> {
    DEFAULT_SETTINGS.get(key).map(|d| d.default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_has_a_definition() {
        assert_eq!(keys().count(), DEFAULT_SETTINGS.len());
        assert_eq!(get_default("EPD_CACHE_MAX_ENTRIES"), Some("100"));
        assert_eq!(get_default("NOPE"), None);
    }
}

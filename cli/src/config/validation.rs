//! Setting value validation.

use std::sync::LazyLock;

use epd_image::{ArtifactFormat, DitheringMethod, ScalingMethod};
use regex::Regex;

static RE_FIRMWARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)(epd)?(128x250|240x416)$").unwrap());

/// Validate a setting value. Returns `Ok(())` if valid, or an error message.
pub fn validate_setting(key: &str, value: &str) -> Result<(), String> {
    match key {
        "EPD_FIRMWARE" => {
            if !RE_FIRMWARE.is_match(value.trim()) {
                return Err("must be 'EPD128x250' or 'EPD240x416'".into());
            }
        }
        "EPD_CACHE_MAX_ENTRIES" => validate_int_range(value, 1, 10_000)?,
        "EPD_SCALING" => {
            value
                .parse::<ScalingMethod>()
                .map_err(|_| "must be letterbox, crop-center or stretch")?;
        }
        "EPD_DITHERING" => {
            value
                .parse::<DitheringMethod>()
                .map_err(|_| "must be threshold, floyd-steinberg, sierra, sierra2-row or sierra-lite")?;
        }
        "EPD_OUTPUT_FORMAT" => {
            value
                .parse::<ArtifactFormat>()
                .map_err(|_| "must be 'png' or 'raw'")?;
        }
        "EPD_CACHE_DIR" | "EPD_INSTALL_DIR" => {
            if value.split('/').any(|part| part == "..") {
                return Err("must not contain '..'".into());
            }
        }
        "EPD_ALLOWED_DIRS" => {
            for dir in split_list(value) {
                if !std::path::Path::new(dir).is_absolute() {
                    return Err(format!("'{dir}' is not an absolute path"));
                }
            }
        }
        k if is_boolean_setting(k) => {
            if value != "true" && value != "false" {
                return Err("must be 'true' or 'false'".into());
            }
        }
        _ => {}
    }
    Ok(())
}

/// Split a comma separated list, dropping empty items.
pub fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

fn validate_int_range(value: &str, min: i64, max: i64) -> Result<(), String> {
    let v: i64 = value.trim().parse().map_err(|_| "must be an integer")?;
    if v < min || v > max {
        return Err(format!("must be between {min} and {max}"));
    }
    Ok(())
}

fn is_boolean_setting(key: &str) -> bool {
    matches!(key, "EPD_CACHE_ENABLED" | "EPD_CACHE_PERSIST")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_firmware() {
        assert!(validate_setting("EPD_FIRMWARE", "EPD128x250").is_ok());
        assert!(validate_setting("EPD_FIRMWARE", "240X416").is_ok());
        assert!(validate_setting("EPD_FIRMWARE", "EPD300x400").is_err());
    }

    #[test]
    fn test_cache_size_bounds() {
        assert!(validate_setting("EPD_CACHE_MAX_ENTRIES", "1").is_ok());
        assert!(validate_setting("EPD_CACHE_MAX_ENTRIES", "10000").is_ok());
        assert!(validate_setting("EPD_CACHE_MAX_ENTRIES", "0").is_err());
        assert!(validate_setting("EPD_CACHE_MAX_ENTRIES", "10001").is_err());
        assert!(validate_setting("EPD_CACHE_MAX_ENTRIES", "lots").is_err());
    }

    #[test]
    fn test_methods_and_booleans() {
        assert!(validate_setting("EPD_DITHERING", "sierra-lite").is_ok());
        assert!(validate_setting("EPD_DITHERING", "5").is_ok());
        assert!(validate_setting("EPD_DITHERING", "bayer").is_err());
        assert!(validate_setting("EPD_SCALING", "crop_center").is_ok());
        assert!(validate_setting("EPD_OUTPUT_FORMAT", "jpeg").is_err());
        assert!(validate_setting("EPD_CACHE_PERSIST", "yes").is_err());
        assert!(validate_setting("EPD_CACHE_ENABLED", "false").is_ok());
    }

    #[test]
    fn test_directories() {
        assert!(validate_setting("EPD_ALLOWED_DIRS", "/srv/images, /mnt/usb").is_ok());
        assert!(validate_setting("EPD_ALLOWED_DIRS", "").is_ok());
        assert!(validate_setting("EPD_ALLOWED_DIRS", "/srv,relative/dir").is_err());
        assert!(validate_setting("EPD_INSTALL_DIR", "/opt/../etc").is_err());
    }
}

//! Runtime configuration loaded from eink.conf + environment overrides.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use epd_cache::{CacheConfig, DEFAULT_MAX_ENTRIES, PathPolicy};
use epd_image::{ArtifactFormat, ConversionParams, DitheringMethod, ScalingMethod};
use epd_panel::{DisplaySpec, FirmwareType};
use tracing::warn;

use super::defaults::{self, DEFAULT_SETTINGS};
use super::validation::{split_list, validate_setting};
use super::{SettingInfo, SettingSource, conf_file};

/// Legacy environment variable honoured as an alias of `EPD_FIRMWARE`.
const LEGACY_FIRMWARE_ENV: &str = "DISTILLER_EINK_FIRMWARE";

/// Name of the snapshot file inside the cache directory.
const CACHE_INDEX_FILE: &str = "cache_index.json";

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub firmware: FirmwareType,
    pub cache_enabled: bool,
    pub cache_max_entries: usize,
    pub cache_persist: bool,
    pub cache_dir: PathBuf,
    pub install_dir: PathBuf,
    pub allowed_dirs: Vec<PathBuf>,
    pub scaling: ScalingMethod,
    pub dithering: DitheringMethod,
    pub output_format: ArtifactFormat,
    settings: Vec<SettingInfo>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_sources(&HashMap::new(), |_| None)
    }
}

impl AppConfig {
    /// Load from the eink.conf files and the process environment.
    pub fn load() -> Self {
        let env = |key: &str| std::env::var(key).ok();
        let install_dir = env("EPD_INSTALL_DIR")
            .or_else(|| defaults::get_default("EPD_INSTALL_DIR").map(String::from))
            .unwrap_or_default();
        let file = conf_file::load(&conf_file::default_locations(Path::new(&install_dir)));
        Self::from_sources(&file, env)
    }

    /// Resolve every setting: environment, then `file`, then the default.
    /// Invalid values fall back to the default with a warning.
    pub fn from_sources<F>(file: &HashMap<String, String>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Vec::with_capacity(DEFAULT_SETTINGS.len());
        for key in defaults::keys() {
            let def = &DEFAULT_SETTINGS[key];
            let env_value = env(key).or_else(|| {
                if key == "EPD_FIRMWARE" {
                    env(LEGACY_FIRMWARE_ENV)
                } else {
                    None
                }
            });

            let (mut value, mut source) = match (env_value, file.get(key)) {
                (Some(v), _) => (v, SettingSource::Env),
                (None, Some(v)) => (v.clone(), SettingSource::File),
                (None, None) => (def.default.to_string(), SettingSource::Default),
            };

            if source != SettingSource::Default {
                if let Err(reason) = validate_setting(key, &value) {
                    warn!(key, value = %value, %reason, "Invalid setting, using default");
                    value = def.default.to_string();
                    source = SettingSource::Default;
                }
            }

            settings.push(SettingInfo {
                key: key.to_string(),
                value,
                source,
                description: def.description.to_string(),
            });
        }

        Self::from_settings(settings)
    }

    fn from_settings(settings: Vec<SettingInfo>) -> Self {
        let g = |key: &str| -> &str {
            settings
                .iter()
                .find(|s| s.key == key)
                .map(|s| s.value.as_str())
                .unwrap_or_default()
        };

        let cache_dir = match g("EPD_CACHE_DIR") {
            "" => default_cache_dir(),
            dir => PathBuf::from(dir),
        };

        Self {
            firmware: g("EPD_FIRMWARE").parse().unwrap_or_default(),
            cache_enabled: g("EPD_CACHE_ENABLED") == "true",
            cache_max_entries: g("EPD_CACHE_MAX_ENTRIES")
                .trim()
                .parse()
                .unwrap_or(DEFAULT_MAX_ENTRIES),
            cache_persist: g("EPD_CACHE_PERSIST") == "true",
            cache_dir,
            install_dir: PathBuf::from(g("EPD_INSTALL_DIR")),
            allowed_dirs: split_list(g("EPD_ALLOWED_DIRS")).map(PathBuf::from).collect(),
            scaling: g("EPD_SCALING").parse().unwrap_or_default(),
            dithering: g("EPD_DITHERING").parse().unwrap_or_default(),
            output_format: g("EPD_OUTPUT_FORMAT").parse().unwrap_or_default(),
            settings,
        }
    }

    /// Effective settings with their sources.
    pub fn settings(&self) -> &[SettingInfo] {
        &self.settings
    }

    pub fn display_spec(&self) -> DisplaySpec {
        self.firmware.spec()
    }

    /// Conversion parameters for the configured panel and defaults.
    pub fn default_params(&self) -> ConversionParams {
        let spec = self.display_spec();
        ConversionParams::new(spec.width, spec.height)
            .with_scaling(self.scaling)
            .with_dithering(self.dithering)
            .with_format(self.output_format)
    }

    /// Where source images may be read from: home, temp, the install dir,
    /// the cache dir and any extra directories.
    pub fn source_policy(&self) -> PathPolicy {
        let policy = PathPolicy::sources()
            .with_root(&self.install_dir)
            .with_root(&self.cache_dir);
        self.allowed_dirs
            .iter()
            .fold(policy, |policy, dir| policy.with_root(dir))
    }

    /// Where cached artifacts may live: temp and the cache dir only.
    pub fn artifact_policy(&self) -> PathPolicy {
        PathPolicy::default().with_root(&self.cache_dir)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            max_size: self.cache_max_entries,
            persist_path: self
                .cache_persist
                .then(|| self.cache_dir.join(CACHE_INDEX_FILE)),
            policy: self.artifact_policy(),
        }
    }

    /// Where new artifacts are written.
    pub fn artifact_dir(&self) -> PathBuf {
        if self.cache_enabled && self.cache_persist {
            self.cache_dir.clone()
        } else {
            std::env::temp_dir()
        }
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("epd-convert")
}

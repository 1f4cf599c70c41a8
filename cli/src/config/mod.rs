//! Configuration management: defaults, validation, loading from eink.conf + environment.

pub mod app_config;
pub mod conf_file;
pub mod defaults;
pub mod validation;

pub use app_config::AppConfig;

use serde::Serialize;

/// Where an effective setting value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingSource {
    Default,
    File,
    Env,
}

impl SettingSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::File => "eink.conf",
            Self::Env => "env",
        }
    }
}

/// A resolved setting, as reported by `epd-convert info`.
#[derive(Debug, Clone, Serialize)]
pub struct SettingInfo {
    pub key: String,
    pub value: String,
    pub source: SettingSource,
    pub description: String,
}

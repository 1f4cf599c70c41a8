//! Library side of `epd-convert`: configuration, the conversion pipeline and
//! startup wiring shared by the binary and integration code.

pub mod config;
pub mod services;

use anyhow::Context;
use epd_cache::ImageCache;

pub use config::AppConfig;
pub use services::pipeline::{Conversion, Pipeline, PipelineError};

/// Load .env from multiple candidate paths.
pub fn load_dotenv() {
    let candidates = [".env", "../.env", "../../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
    tracing::debug!("No .env file found, using system environment variables");
}

/// Load configuration and wire up the shared cache and pipeline.
pub fn init_foundation() -> Result<(AppConfig, Pipeline), anyhow::Error> {
    load_dotenv();
    let config = AppConfig::load();

    let cache = if config.cache_enabled {
        if config.cache_persist {
            std::fs::create_dir_all(&config.cache_dir).with_context(|| {
                format!("creating cache directory {}", config.cache_dir.display())
            })?;
        }
        Some(ImageCache::new(config.cache_config()))
    } else {
        None
    };

    let pipeline = Pipeline::new(cache)
        .with_source_policy(config.source_policy())
        .with_artifact_dir(config.artifact_dir());

    tracing::info!(
        firmware = %config.firmware,
        cache_enabled = config.cache_enabled,
        cache_persist = config.cache_persist,
        "Configuration loaded"
    );
    Ok((config, pipeline))
}

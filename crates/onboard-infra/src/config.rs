//! Engine configuration loader for Onboard.
//!
//! Reads an `engine.toml` and deserializes it into [`EngineConfig`]. Falls
//! back to sensible defaults when the file is missing or malformed.

use std::path::Path;

use onboard_types::config::EngineConfig;

/// File name looked up by [`load_engine_config_from_dir`].
pub const ENGINE_CONFIG_FILE: &str = "engine.toml";

/// Load engine configuration from `path`.
///
/// - If the file does not exist, returns [`EngineConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_engine_config(path: &Path) -> EngineConfig {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No engine config found at {}, using defaults", path.display());
            return EngineConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", path.display());
            return EngineConfig::default();
        }
    };

    match toml::from_str::<EngineConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!("Failed to parse {}: {err}, using defaults", path.display());
            EngineConfig::default()
        }
    }
}

/// Load `{dir}/engine.toml`.
pub async fn load_engine_config_from_dir(dir: &Path) -> EngineConfig {
    load_engine_config(&dir.join(ENGINE_CONFIG_FILE)).await
}

//! Configuration loading

use crate::{ConfigFormat, PluginsConfig};
use dynwire_core::{Error, Result};
use dynwire_plugins::expand_env_vars;
use std::fs;
use std::path::Path;

/// Load configuration from a file
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<PluginsConfig> {
    let path = path.as_ref();

    let content = fs::read_to_string(path)
        .map_err(|e| Error::config(format!("Failed to read config file: {e}")))?;

    let format = ConfigFormat::from_path(path)?;

    load_from_str(&content, format)
}

/// Load configuration from a string, expanding `${VAR}` and `${VAR:-default}`
/// references before parsing
pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<PluginsConfig> {
    let expanded_content = expand_env_vars(content)?;

    let config = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(&expanded_content)
            .map_err(|e| Error::config(format!("Failed to parse YAML: {e}")))?,
        ConfigFormat::Toml => toml::from_str(&expanded_content)
            .map_err(|e| Error::config(format!("Failed to parse TOML: {e}")))?,
        ConfigFormat::Json => serde_json::from_str(&expanded_content)
            .map_err(|e| Error::config(format!("Failed to parse JSON: {e}")))?,
    };

    Ok(config)
}

/// Load and validate configuration
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PluginsConfig> {
    let path = path.as_ref();
    let config = load_from_file(path)?;

    crate::validator::validate_config(&config)?;

    tracing::info!(
        path = %path.display(),
        plugins = config.plugins.len(),
        sets = config.sets.len(),
        "Plugin configuration loaded"
    );

    Ok(config)
}

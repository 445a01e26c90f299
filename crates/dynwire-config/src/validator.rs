//! Configuration validation

use crate::types::{parse_descriptor, BindingsConfig};
use crate::PluginsConfig;
use dynwire_core::{Error, Result};
use dynwire_symbols::BindingRequest;

/// Validate configuration.
///
/// Malformed binding descriptors are not rejected here; they become fatal
/// registrations when the configuration is applied.
pub fn validate_config(config: &PluginsConfig) -> Result<()> {
    validate_plugins(config)?;

    validate_sets(config)?;

    Ok(())
}

fn validate_plugins(config: &PluginsConfig) -> Result<()> {
    for (index, plugin) in config.plugins.iter().enumerate() {
        if plugin.path.trim().is_empty() {
            return Err(Error::config(format!("plugins[{index}]: path cannot be empty")));
        }

        if plugin.anonymous && (plugin.name.is_some() || plugin.group.is_some()) {
            tracing::warn!(
                path = %plugin.path,
                "Anonymous plugin has a name or group, which will be ignored"
            );
        }

        validate_bindings(&format!("plugins[{index}]"), &plugin.bindings)?;
    }

    Ok(())
}

fn validate_sets(config: &PluginsConfig) -> Result<()> {
    for (index, set) in config.sets.iter().enumerate() {
        if set.paths.is_empty() {
            return Err(Error::config(format!("sets[{index}]: paths cannot be empty")));
        }

        if set.paths.iter().any(|p| p.trim().is_empty()) {
            return Err(Error::config(format!("sets[{index}]: path cannot be empty")));
        }

        validate_bindings(&format!("sets[{index}]"), &set.bindings)?;
    }

    Ok(())
}

fn validate_bindings(owner: &str, bindings: &BindingsConfig) -> Result<()> {
    for (index, raw) in bindings.symbols.iter().enumerate() {
        match parse_descriptor(raw) {
            Some(BindingRequest::ByName(name)) if name.is_empty() => {
                return Err(Error::config(format!(
                    "{owner}.symbols[{index}]: symbol name cannot be empty"
                )));
            }
            Some(BindingRequest::Annotated(annotated)) => {
                if annotated.target.is_empty() {
                    return Err(Error::config(format!(
                        "{owner}.symbols[{index}]: target cannot be empty"
                    )));
                }
                if annotated.name.is_some() && annotated.group.is_some() {
                    return Err(Error::config(format!(
                        "{owner}.symbols[{index}]: name and group are mutually exclusive"
                    )));
                }
            }
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PluginConfig, PluginSetConfig};
    use serde_json::json;

    fn minimal_config() -> PluginsConfig {
        PluginsConfig {
            plugins: vec![PluginConfig {
                path: "/usr/lib/dynwire/sample.so".to_string(),
                ..PluginConfig::default()
            }],
            sets: vec![PluginSetConfig {
                paths: vec!["/usr/lib/dynwire/ext/*.so".to_string()],
                ..PluginSetConfig::default()
            }],
        }
    }

    #[test]
    fn test_valid_minimal_config() {
        assert!(validate_config(&minimal_config()).is_ok());
        assert!(validate_config(&PluginsConfig::default()).is_ok());
    }

    #[test]
    fn test_empty_plugin_path() {
        let mut config = minimal_config();
        config.plugins[0].path = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_set_without_paths() {
        let mut config = minimal_config();
        config.sets[0].paths.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_annotated_without_target() {
        let mut config = minimal_config();
        config.plugins[0].bindings.symbols = vec![json!({ "name": "x", "target": "" })];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_annotated_with_name_and_group() {
        let mut config = minimal_config();
        config.sets[0].bindings.symbols =
            vec![json!({ "name": "x", "group": "y", "target": "New" })];

        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"));
    }

    #[test]
    fn test_malformed_descriptor_is_left_for_provide() {
        let mut config = minimal_config();
        config.plugins[0].bindings.symbols = vec![json!(42), json!("New")];
        assert!(validate_config(&config).is_ok());
    }
}

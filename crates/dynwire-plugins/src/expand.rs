//! Module location expansion

use dynwire_core::{Error, Result};
use regex::Regex;
use std::env;
use std::path::PathBuf;

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `${VAR:-default}`. A variable that is unset and has
/// no default is a configuration error.
pub fn expand_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(:-([^}]*))?\}")
        .map_err(|e| Error::config(format!("Invalid regex: {e}")))?;

    let mut result = String::with_capacity(content.len());
    let mut last_match = 0;

    for cap in re.captures_iter(content) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let var_name = var_name.as_str();

        let value = match (env::var(var_name), cap.get(3)) {
            (Ok(val), _) => val,
            (Err(_), Some(default)) => default.as_str().to_string(),
            (Err(_), None) => {
                return Err(Error::config(format!(
                    "Environment variable '{var_name}' not set and no default provided"
                )));
            }
        };

        result.push_str(&content[last_match..full_match.start()]);
        result.push_str(&value);
        last_match = full_match.end();
    }

    result.push_str(&content[last_match..]);

    Ok(result)
}

/// Turns one module location into zero or more concrete paths
pub trait LocationExpander: Send + Sync {
    /// Expand `location`; failures are [`Error::PatternExpansion`]
    fn expand(&self, location: &str) -> Result<Vec<PathBuf>>;
}

/// Expands environment variables, then glob patterns.
///
/// A location without glob metacharacters is returned as-is even when nothing
/// exists there, so the failure surfaces when the module is opened. Glob
/// matches are returned sorted so module load order is deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobExpander;

impl GlobExpander {
    /// Create an expander
    pub fn new() -> Self {
        Self
    }
}

impl LocationExpander for GlobExpander {
    fn expand(&self, location: &str) -> Result<Vec<PathBuf>> {
        let expanded = expand_env_vars(location).map_err(|e| Error::pattern(location, e))?;

        if !is_pattern(&expanded) {
            return Ok(vec![PathBuf::from(expanded)]);
        }

        let mut paths = glob::glob(&expanded)
            .map_err(|e| Error::pattern(location, e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::pattern(location, e))?;
        paths.sort();

        tracing::debug!(location = %location, matches = paths.len(), "Expanded plugin location");
        Ok(paths)
    }
}

fn is_pattern(location: &str) -> bool {
    location.contains(&['*', '?', '['][..])
}

//! Configuration types

use dynwire_core::{Batch, Error};
use dynwire_plugins::{
    DylibOpener, GlobExpander, LocationExpander, ModuleOpener, PluginSet, PluginSpec,
};
use dynwire_symbols::{Annotated, BindingRequest, Bindings, Lifecycle};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level plugin configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Individually configured modules
    pub plugins: Vec<PluginConfig>,

    /// Module sets
    pub sets: Vec<PluginSetConfig>,
}

impl PluginsConfig {
    /// Build registrations for every module, opening shared libraries
    pub fn provide(&self) -> Batch {
        self.provide_with(&GlobExpander, &DylibOpener)
    }

    /// Build registrations with the given collaborators.
    ///
    /// Plugin locations go through `expander` the same way set locations do;
    /// a single plugin location must expand to exactly one path.
    pub fn provide_with(&self, expander: &dyn LocationExpander, opener: &dyn ModuleOpener) -> Batch {
        let mut batch = Batch::new();

        for plugin in &self.plugins {
            batch.append(plugin.provide_with(expander, opener));
        }

        for set in &self.sets {
            batch.append(set.provide_with(expander, opener));
        }

        tracing::debug!(
            plugins = self.plugins.len(),
            sets = self.sets.len(),
            registrations = batch.len(),
            "Plugin configuration applied"
        );

        batch
    }
}

/// Binding descriptors as written in a configuration file.
///
/// Each descriptor is either a symbol name or a map with a `target` and an
/// optional `name` or `group`. Descriptors of any other form are reported as
/// malformed when the configuration is applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingsConfig {
    /// Raw binding descriptors, in registration order
    pub symbols: Vec<Value>,

    /// Skip absent symbols instead of failing startup
    pub ignore_missing: bool,
}

impl BindingsConfig {
    /// Parse descriptors into bindings, recording malformed ones as
    /// rejections at their position
    pub fn parse(&self) -> Bindings {
        let mut bindings = Bindings::new().ignore_missing(self.ignore_missing);

        for (index, raw) in self.symbols.iter().enumerate() {
            bindings = match parse_descriptor(raw) {
                Some(request) => bindings.bind(request),
                None => bindings.reject(index, raw),
            };
        }

        bindings
    }
}

/// Interpret one raw descriptor
pub(crate) fn parse_descriptor(raw: &Value) -> Option<BindingRequest> {
    match raw {
        Value::String(name) => Some(BindingRequest::ByName(name.clone())),
        Value::Object(_) => serde_json::from_value::<Annotated>(raw.clone())
            .ok()
            .map(BindingRequest::Annotated),
        _ => None,
    }
}

/// One module
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Component name of the module
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Value group of the module
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Do not register the module itself
    pub anonymous: bool,

    /// Module location; may reference environment variables
    pub path: String,

    /// Symbols to bind
    #[serde(flatten)]
    pub bindings: BindingsConfig,

    /// Lifecycle callbacks to bind
    pub lifecycle: Lifecycle,
}

impl PluginConfig {
    /// Build registrations for this module.
    ///
    /// Malformed binding descriptors are fatal registrations placed among
    /// the module's bindings in descriptor order.
    pub fn provide_with(&self, expander: &dyn LocationExpander, opener: &dyn ModuleOpener) -> Batch {
        let mut batch = Batch::new();
        let symbols = self.bindings.parse();

        let path = match expander.expand(&self.path) {
            Ok(paths) if paths.len() == 1 => paths.into_iter().next(),
            Ok(paths) => {
                batch.fatal(Error::pattern(
                    &self.path,
                    format!("expected exactly one module, found {}", paths.len()),
                ));
                None
            }
            Err(err) => {
                batch.fatal(err);
                None
            }
        };

        if let Some(path) = path {
            let spec = PluginSpec {
                name: self.name.clone(),
                group: self.group.clone(),
                anonymous: self.anonymous,
                path,
                symbols,
                lifecycle: self.lifecycle.clone(),
            };
            batch.append(spec.provide_with(opener));
        } else {
            for err in symbols.rejections() {
                batch.fatal(err);
            }
        }

        batch
    }
}

/// A set of modules sharing bindings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginSetConfig {
    /// Value group for every module; modules are anonymous without one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Module locations; glob patterns and environment variables are expanded
    pub paths: Vec<String>,

    /// Symbols to bind from every module
    #[serde(flatten)]
    pub bindings: BindingsConfig,

    /// Lifecycle callbacks to bind from every module
    pub lifecycle: Lifecycle,
}

impl PluginSetConfig {
    /// Build registrations for every module in the set
    pub fn provide_with(&self, expander: &dyn LocationExpander, opener: &dyn ModuleOpener) -> Batch {
        let set = PluginSet {
            group: self.group.clone(),
            paths: self.paths.clone(),
            symbols: self.bindings.parse(),
            lifecycle: self.lifecycle.clone(),
        };
        set.provide_with(expander, opener)
    }
}

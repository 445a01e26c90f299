//! Single modules and module sets

use crate::expand::{GlobExpander, LocationExpander};
use crate::module::{DylibOpener, ModuleOpener, Plugin};
use dynwire_core::{Batch, BoxError, Error, Fallible, Function, Registration};
use dynwire_symbols::{Bindings, Lifecycle, SymbolTable};
use std::path::PathBuf;
use std::sync::Arc;

/// How to load one module and integrate it into the container.
///
/// Besides the module's own bindings, the opened module itself may be
/// registered as a component of type [`Plugin`]: under a name, into a group,
/// or unnamed. The component is registered even when opening failed; its
/// provider then yields the open error, so the container reports the failure
/// wherever the module is depended upon.
#[derive(Debug, Clone, Default)]
pub struct PluginSpec {
    /// Component name of the module; ignored when anonymous
    pub name: Option<String>,

    /// Value group for the module; ignored when anonymous
    pub group: Option<String>,

    /// Do not register the module itself. A failure to open is then reported
    /// as a fatal registration instead.
    pub anonymous: bool,

    /// Module path
    pub path: PathBuf,

    /// Symbols bound from the module
    pub symbols: Bindings,

    /// Lifecycle callbacks bound from the module
    pub lifecycle: Lifecycle,
}

impl PluginSpec {
    /// Describe the module at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Register the module under a component name
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Register the module into a value group
    pub fn grouped(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Do not register the module itself
    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }

    /// Symbols to bind
    pub fn symbols(mut self, symbols: Bindings) -> Self {
        self.symbols = symbols;
        self
    }

    /// Lifecycle callbacks to bind
    pub fn lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// Open the module as a shared library and build its registrations
    pub fn provide(&self) -> Batch {
        self.provide_with(&DylibOpener)
    }

    /// Open the module with `opener` and build its registrations
    pub fn provide_with(&self, opener: &dyn ModuleOpener) -> Batch {
        let mut batch = Batch::new();

        let (plugin, err): (Plugin, Option<Error>) = match opener.open(&self.path) {
            Ok(plugin) => {
                batch.append(self.symbols.provide(plugin.as_ref()));
                batch.append(self.lifecycle.provide(plugin.as_ref()));
                (plugin, None)
            }
            Err(err) => {
                tracing::debug!(path = %self.path.display(), error = %err, "Plugin failed to open");
                for rejection in self.symbols.rejections() {
                    batch.fatal(rejection);
                }
                let placeholder: Plugin = Arc::new(SymbolTable::new());
                (placeholder, Some(err))
            }
        };

        if self.anonymous {
            if let Some(err) = err {
                batch.fatal(err);
            }
            return batch;
        }

        let provider = component(plugin, err);
        let name = non_empty(&self.name);
        let group = non_empty(&self.group);

        if name.is_some() || group.is_some() {
            batch.push(Registration::ProvideAnnotated {
                name,
                group,
                target: provider,
            });
        } else {
            batch.push(Registration::Provide(provider));
        }

        batch
    }
}

/// Provider yielding the module together with its open outcome
fn component(plugin: Plugin, err: Option<Error>) -> Function {
    let err = err.map(Arc::new);
    Function::new(move || -> (Plugin, Fallible) {
        let outcome = match &err {
            Some(err) => Err(Box::new(Arc::clone(err)) as BoxError),
            None => Ok(()),
        };
        (Arc::clone(&plugin), outcome)
    })
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// A bundle of modules sharing the same bindings.
///
/// Each location may be a glob pattern and may reference environment
/// variables. With a group set, every opened module joins that value group;
/// without one, modules are anonymous.
#[derive(Debug, Clone, Default)]
pub struct PluginSet {
    /// Value group for the modules
    pub group: Option<String>,

    /// Module locations, in load order
    pub paths: Vec<String>,

    /// Symbols bound from every module
    pub symbols: Bindings,

    /// Lifecycle callbacks bound from every module
    pub lifecycle: Lifecycle,
}

impl PluginSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Place every module into a value group
    pub fn grouped(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Append a module location
    pub fn path(mut self, location: impl Into<String>) -> Self {
        self.paths.push(location.into());
        self
    }

    /// Symbols to bind from every module
    pub fn symbols(mut self, symbols: Bindings) -> Self {
        self.symbols = symbols;
        self
    }

    /// Lifecycle callbacks to bind from every module
    pub fn lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    /// Expand locations with [`GlobExpander`] and open shared libraries
    pub fn provide(&self) -> Batch {
        self.provide_with(&GlobExpander, &DylibOpener)
    }

    /// Expand and open with the given collaborators.
    ///
    /// A location that fails to expand yields a fatal registration and the
    /// remaining locations are still processed. Rejected binding descriptors
    /// are reported by every module, or once when no module is found.
    pub fn provide_with(&self, expander: &dyn LocationExpander, opener: &dyn ModuleOpener) -> Batch {
        let mut batch = Batch::new();
        let group = non_empty(&self.group);
        let mut modules = 0;

        for location in &self.paths {
            let paths = match expander.expand(location) {
                Ok(paths) => paths,
                Err(err) => {
                    batch.fatal(err);
                    continue;
                }
            };

            for path in paths {
                modules += 1;
                let spec = PluginSpec {
                    name: None,
                    group: group.clone(),
                    anonymous: group.is_none(),
                    path,
                    symbols: self.symbols.clone(),
                    lifecycle: self.lifecycle.clone(),
                };
                batch.append(spec.provide_with(opener));
            }
        }

        if modules == 0 {
            for rejection in self.symbols.rejections() {
                batch.fatal(rejection);
            }
        }

        batch
    }
}

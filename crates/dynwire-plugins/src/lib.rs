//! # Dynwire Plugins
//!
//! Loading of dynamically linked modules and their integration into a
//! registration batch.
//!
//! - [`PluginSpec`]: one module, optionally registered itself as a component
//! - [`PluginSet`]: many modules from glob patterns, sharing bindings
//! - [`ModuleOpener`] / [`DylibOpener`]: opening modules with `libloading`
//! - [`LocationExpander`] / [`GlobExpander`]: `${VAR}` and glob expansion
//!
//! ## Example
//!
//! ```rust,no_run
//! use dynwire_plugins::PluginSpec;
//! use dynwire_symbols::{Bindings, Lifecycle};
//!
//! let batch = PluginSpec::new("/usr/lib/dynwire/sample.so")
//!     .named("sample")
//!     .symbols(Bindings::new().bind("New"))
//!     .lifecycle(Lifecycle::new().on_start("Initialize"))
//!     .provide();
//!
//! for err in batch.errors() {
//!     eprintln!("{err}");
//! }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod expand;
pub mod loader;
pub mod module;

pub use expand::{expand_env_vars, GlobExpander, LocationExpander};
pub use loader::{PluginSet, PluginSpec};
pub use module::{DylibModule, DylibOpener, MemoryOpener, ModuleOpener, Plugin};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::expand::{GlobExpander, LocationExpander};
    pub use crate::loader::{PluginSet, PluginSpec};
    pub use crate::module::{DylibOpener, MemoryOpener, ModuleOpener, Plugin};
}

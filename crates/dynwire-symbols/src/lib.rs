//! # Dynwire Symbols
//!
//! Resolution and classification of named symbols, and the orchestration that
//! turns a declarative list of bindings into a registration batch.
//!
//! - [`SymbolSource`]: anything that can look up a symbol by name
//! - [`SymbolTable`]: an in-memory source for tests and in-process defaults
//! - [`lookup`] / [`find`] / [`each_symbol`]: error-normalizing lookup,
//!   fallback chains and visiting several names
//! - [`classify`]: role contracts (constructor, target, invocation, lifecycle)
//! - [`Bindings`] and [`Lifecycle`]: per-source registration builders
//!
//! ## Example
//!
//! ```rust
//! use dynwire_core::{Fallible, Symbol};
//! use dynwire_symbols::{Annotated, Bindings, SymbolTable};
//!
//! let mut table = SymbolTable::new();
//! table.set("NewCounter", Symbol::function(|| (0u64,)));
//! table.set("NewLabel", Symbol::function(|| ("label".to_string(), Ok(()) as Fallible)));
//!
//! let batch = Bindings::new()
//!     .bind("NewCounter")
//!     .bind(Annotated::named("label", "NewLabel"))
//!     .provide(&table);
//!
//! assert_eq!(batch.kinds(), vec!["provide", "provide-annotated"]);
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod bindings;
pub mod classify;
pub mod lifecycle;
pub mod source;
pub mod table;

pub use bindings::{malformed, Annotated, BindingRequest, Bindings, Rejected};
pub use classify::{
    classify, classify_simple, lookup_constructor, lookup_lifecycle, lookup_target, Classification,
    Role,
};
pub use lifecycle::Lifecycle;
pub use source::{each_symbol, find, lookup, SymbolSource};
pub use table::SymbolTable;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::bindings::{Annotated, BindingRequest, Bindings};
    pub use crate::classify::{Classification, Role};
    pub use crate::lifecycle::Lifecycle;
    pub use crate::source::{each_symbol, find, lookup, SymbolSource};
    pub use crate::table::SymbolTable;
}

//! # Dynwire Core
//!
//! Core types for wiring dynamically loaded modules into a dependency-injection
//! container.
//!
//! This crate provides the foundational abstractions used throughout dynwire:
//! - Runtime type descriptors and call shapes
//! - Type-erased symbols and callables
//! - Registration batches handed to the container
//! - Error types
//! - Export macros for module authors

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod error;
pub mod export;
pub mod registration;
pub mod symbol;
pub mod types;

pub use error::{Error, Result};
pub use export::ABI_VERSION;
pub use registration::{Batch, Hook, HookFn, Registration};
pub use symbol::{take_failure, Arg, Function, IntoFunction, Outputs, Symbol, Value, ValueSymbol};
pub use types::{BoxError, Context, Fallible, Shape, TypeDesc, ERROR_TYPE};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::registration::{Batch, Hook, HookFn, Registration};
    pub use crate::symbol::{Function, IntoFunction, Symbol};
    pub use crate::types::{BoxError, Context, Fallible, Shape, TypeDesc};
}

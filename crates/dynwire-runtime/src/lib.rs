//! # Dynwire Runtime
//!
//! A reference dependency-injection container that applies registration
//! batches produced by dynwire.
//!
//! ## Features
//!
//! - **Fatal aggregation**: every fatal registration is reported at once
//! - **Lazy providers**: resolved by type, name or value group, at most once
//! - **Invocations**: run in registration order when the app is built
//! - **Lifecycle**: startup hooks with rollback, shutdown hooks in reverse
//!
//! ## Example
//!
//! ```rust
//! use dynwire_core::{Batch, Context, Function, Registration};
//! use dynwire_runtime::App;
//!
//! let mut batch = Batch::new();
//! batch.push(Registration::Provide(Function::new(|| (42u32,))));
//!
//! let app = App::new(batch);
//! assert!(app.err().is_none());
//! assert_eq!(app.get::<u32>().unwrap(), 42);
//!
//! let ctx = Context::new();
//! app.start(&ctx).unwrap();
//! app.stop(&ctx).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod app;
pub mod error;

pub use app::{App, AppState};
pub use error::{Errors, Result, RuntimeError};

/// Prelude module with commonly used types
pub mod prelude {
    pub use crate::app::{App, AppState};
    pub use crate::error::{Errors, Result, RuntimeError};
    pub use dynwire_core::prelude::*;
}

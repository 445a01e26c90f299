//! Export macros for module authors
//!
//! A dynwire module is a `cdylib` (or `dylib`) that exports each symbol as a
//! Rust-ABI function returning its [`Symbol`](crate::Symbol). The function is
//! linked under [`SYMBOL_PREFIX`] followed by the symbol name, so a lookup of
//! `New` only ever resolves `dynwire_symbol__New` and never an unrelated libc
//! or runtime export of the same name.
//!
//! The host and the module must be built with the same compiler and the same
//! version of this crate. Every module carries [`export_abi_version!`]; the
//! host refuses libraries without it, and those built against a different
//! symbol model.
//!
//! ```rust,ignore
//! use dynwire_core::{export_abi_version, export_symbol, Fallible, Symbol};
//!
//! export_abi_version!();
//! export_symbol!(Value => Symbol::value(12i32));
//! export_symbol!(New => Symbol::function(|| (67.5f64, Ok(()) as Fallible)));
//! ```

/// Version of the exported-symbol convention understood by this crate
pub const ABI_VERSION: u32 = 1;

/// Name of the static a module exports to declare its ABI version
pub const ABI_VERSION_SYMBOL: &str = "DYNWIRE_ABI_VERSION";

/// Prefix of the linker name under which [`export_symbol!`] exports a symbol
pub const SYMBOL_PREFIX: &str = "dynwire_symbol__";

/// Linker name of the exported symbol `name`
pub fn export_name(name: &str) -> String {
    format!("{SYMBOL_PREFIX}{name}")
}

/// Export a symbol under the given name.
///
/// The generated function keeps `$name` as its Rust name and is linked as
/// `dynwire_symbol__$name`.
#[macro_export]
macro_rules! export_symbol {
    ($name:ident => $symbol:expr) => {
        #[export_name = concat!("dynwire_symbol__", stringify!($name))]
        #[allow(non_snake_case)]
        pub fn $name() -> $crate::Symbol {
            $symbol
        }
    };
}

/// Export the ABI version this module was built against
#[macro_export]
macro_rules! export_abi_version {
    () => {
        #[no_mangle]
        pub static DYNWIRE_ABI_VERSION: u32 = $crate::ABI_VERSION;
    };
}

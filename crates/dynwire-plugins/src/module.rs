//! Opening modules
//!
//! A module is a shared library built with the export macros from
//! `dynwire_core`: every exported name is a Rust-ABI function returning a
//! [`Symbol`], linked under the `dynwire_symbol__` prefix, and the library
//! declares its ABI version. Modules are never unloaded once opened; symbols
//! handed out by a module may reference code inside it.

use dynwire_core::export::{export_name, ABI_VERSION_SYMBOL};
use dynwire_core::{BoxError, Error, Result, Symbol, ABI_VERSION};
use dynwire_symbols::SymbolSource;
use libloading::Library;
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::mem::ManuallyDrop;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An opened module, shared between the registrations that use it
pub type Plugin = Arc<dyn SymbolSource>;

/// Opens modules by path
pub trait ModuleOpener: Send + Sync {
    /// Open the module at `path`; failures are [`Error::Open`]
    fn open(&self, path: &Path) -> Result<Plugin>;
}

/// Opens shared libraries with `libloading`
#[derive(Debug, Clone, Copy, Default)]
pub struct DylibOpener;

impl DylibOpener {
    /// Create an opener
    pub fn new() -> Self {
        Self
    }
}

impl ModuleOpener for DylibOpener {
    fn open(&self, path: &Path) -> Result<Plugin> {
        // SAFETY: module initialisers run here; loading a library is only as
        // sound as the library itself, which the host vouches for by listing it.
        let module = unsafe { DylibModule::open(path)? };
        Ok(Arc::new(module))
    }
}

/// A shared library opened as a [`SymbolSource`]
#[derive(Debug)]
pub struct DylibModule {
    path: PathBuf,
    library: ManuallyDrop<Library>,
}

impl DylibModule {
    /// Load the library at `path` and check its declared ABI version.
    ///
    /// A library that does not export `DYNWIRE_ABI_VERSION` is not a dynwire
    /// module and fails to open.
    ///
    /// # Safety
    ///
    /// Loading runs the library's initialisers. The library must have been
    /// built with the same compiler and the same `dynwire-core` as the host,
    /// and every `dynwire_symbol__` export looked up through this module must
    /// be a `fn() -> Symbol` as produced by `export_symbol!`.
    pub unsafe fn open(path: &Path) -> Result<Self> {
        let library = Library::new(path).map_err(|e| Error::open(path, e))?;

        let version = match library.get::<*const u32>(ABI_VERSION_SYMBOL.as_bytes()) {
            Ok(version) => Some(**version),
            Err(_) => None,
        };
        check_abi(path, version)?;

        tracing::info!(path = %path.display(), "Plugin opened");

        Ok(Self {
            path: path.to_path_buf(),
            library: ManuallyDrop::new(library),
        })
    }

    /// Path the module was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SymbolSource for DylibModule {
    fn lookup(&self, name: &str) -> std::result::Result<Symbol, BoxError> {
        let export = export_name(name);
        // SAFETY: prefixed exports are `fn() -> Symbol` per the contract of
        // `DylibModule::open`, and the library is never unloaded.
        unsafe {
            let constructor = self.library.get::<fn() -> Symbol>(export.as_bytes())?;
            Ok(constructor())
        }
    }
}

/// Validate the ABI version a library declared, `None` when it declared none
fn check_abi(path: &Path, version: Option<u32>) -> Result<()> {
    match version {
        None => Err(Error::open(
            path,
            Error::MissingExport(ABI_VERSION_SYMBOL.to_string()),
        )),
        Some(actual) if actual != ABI_VERSION => Err(Error::open(
            path,
            Error::AbiMismatch {
                expected: ABI_VERSION,
                actual,
            },
        )),
        Some(_) => Ok(()),
    }
}

/// An in-process registry of modules keyed by path.
///
/// Stands in for the filesystem in tests, and lets hosts ship statically
/// linked modules through the same configuration as dynamic ones.
#[derive(Default, Clone)]
pub struct MemoryOpener {
    modules: HashMap<PathBuf, Plugin>,
}

impl MemoryOpener {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module under `path`
    pub fn with(mut self, path: impl Into<PathBuf>, module: impl SymbolSource + 'static) -> Self {
        self.modules.insert(path.into(), Arc::new(module));
        self
    }
}

impl ModuleOpener for MemoryOpener {
    fn open(&self, path: &Path) -> Result<Plugin> {
        self.modules.get(path).cloned().ok_or_else(|| {
            Error::open(
                path,
                io::Error::new(io::ErrorKind::NotFound, "no such module"),
            )
        })
    }
}

impl fmt::Debug for MemoryOpener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<_> = self.modules.keys().collect();
        paths.sort();
        f.debug_struct("MemoryOpener").field("modules", &paths).finish()
    }
}

//! In-memory symbol table

use crate::source::SymbolSource;
use dynwire_core::{BoxError, Error, IntoFunction, Symbol};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// An in-memory [`SymbolSource`].
///
/// Useful as a stand-in for a module in tests, or as a table of in-process
/// defaults consulted through [`find`](crate::find). The default value is a
/// usable, empty table. Mutation requires `&mut self`; share a table across
/// threads only behind your own synchronization.
#[derive(Clone, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
}

impl SymbolTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Establish a symbol, replacing any existing symbol with that name
    pub fn set(&mut self, name: impl Into<String>, symbol: impl Into<Symbol>) {
        self.symbols.insert(name.into(), symbol.into());
    }

    /// Establish a callable symbol
    pub fn set_function<Args, F: IntoFunction<Args>>(&mut self, name: impl Into<String>, f: F) {
        self.set(name, Symbol::function(f));
    }

    /// Establish a plain value, boxed behind a shared reference the way a
    /// module exports its variables
    pub fn set_value<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) {
        self.set(name, Symbol::value(value));
    }

    /// Builder form of [`SymbolTable::set`]
    pub fn with(mut self, name: impl Into<String>, symbol: impl Into<Symbol>) -> Self {
        self.set(name, symbol);
        self
    }

    /// Remove a symbol, returning it if it was present
    pub fn delete(&mut self, name: &str) -> Option<Symbol> {
        self.symbols.remove(name)
    }

    /// Whether a symbol with this name exists
    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// Number of symbols
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbol names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.symbols.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl SymbolSource for SymbolTable {
    fn lookup(&self, name: &str) -> Result<Symbol, BoxError> {
        self.symbols
            .get(name)
            .cloned()
            .ok_or_else(|| Error::missing_symbol(name).into())
    }
}

impl fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymbolTable")
            .field("symbols", &self.names())
            .finish()
    }
}

impl<K: Into<String>> FromIterator<(K, Symbol)> for SymbolTable {
    fn from_iter<I: IntoIterator<Item = (K, Symbol)>>(iter: I) -> Self {
        Self {
            symbols: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

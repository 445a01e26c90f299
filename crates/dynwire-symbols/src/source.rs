//! Symbol sources and error-normalizing lookup

use dynwire_core::{BoxError, Error, Fallible, Result, Symbol};
use std::sync::Arc;

/// Something that can look up exported symbols by name.
///
/// Opened modules and [`SymbolTable`](crate::SymbolTable)s implement this
/// trait. Implementations report a missing symbol in whatever form is natural
/// for them; [`lookup`] normalizes that into [`Error::MissingSymbol`].
/// Lookups must be idempotent and free of observable side effects.
#[cfg_attr(test, mockall::automock)]
pub trait SymbolSource: Send + Sync {
    /// Return the symbol exported under `name`
    fn lookup(&self, name: &str) -> std::result::Result<Symbol, BoxError>;
}

impl<T: SymbolSource + ?Sized> SymbolSource for Arc<T> {
    fn lookup(&self, name: &str) -> std::result::Result<Symbol, BoxError> {
        (**self).lookup(name)
    }
}

impl<T: SymbolSource + ?Sized> SymbolSource for Box<T> {
    fn lookup(&self, name: &str) -> std::result::Result<Symbol, BoxError> {
        (**self).lookup(name)
    }
}

/// Look up `name` and normalize any failure to [`Error::MissingSymbol`].
///
/// A failure that already is a missing symbol error is passed through as-is.
/// A failure wrapping one somewhere in its source chain keeps that symbol's
/// name and becomes the cause; anything else becomes the cause of a missing
/// symbol error for `name`.
pub fn lookup(source: &dyn SymbolSource, name: &str) -> Result<Symbol> {
    source.lookup(name).map_err(|err| normalize(name, err))
}

fn normalize(name: &str, err: BoxError) -> Error {
    let err = match err.downcast::<Error>() {
        Ok(err) if err.is_missing_symbol() => return *err,
        Ok(err) => err as BoxError,
        Err(err) => err,
    };

    let name = missing_in_chain(&*err).unwrap_or(name).to_string();
    Error::MissingSymbol {
        name,
        cause: Some(err),
    }
}

/// Name carried by the first missing symbol error in the chain of `err`
fn missing_in_chain<'a>(err: &'a (dyn std::error::Error + 'static)) -> Option<&'a str> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(Error::MissingSymbol { name, .. }) = e.downcast_ref::<Error>() {
            return Some(name);
        }
        current = e.source();
    }
    None
}

/// Look up each of `names` in order and hand the outcome to `visitor`.
///
/// Lookup failures are normalized as by [`lookup`] and passed to the visitor
/// rather than ending the walk; the first error the visitor returns does.
pub fn each_symbol<I, F>(source: &dyn SymbolSource, names: I, mut visitor: F) -> Fallible
where
    I: IntoIterator,
    I::Item: AsRef<str>,
    F: FnMut(&str, Result<Symbol>) -> Fallible,
{
    for name in names {
        let name = name.as_ref();
        visitor(name, lookup(source, name))?;
    }
    Ok(())
}

/// Resolve `name` from the first source that has it.
///
/// Absent (`None`) sources are skipped, which lets callers express optional
/// overrides and in-process fallbacks in one chain. When no source resolves
/// the name, a missing symbol error without a cause is returned.
pub fn find(name: &str, sources: &[Option<&dyn SymbolSource>]) -> Result<Symbol> {
    for source in sources.iter().flatten() {
        if let Ok(symbol) = source.lookup(name) {
            return Ok(symbol);
        }
    }

    tracing::trace!(symbol = %name, sources = sources.len(), "Symbol not found in any source");
    Err(Error::missing_symbol(name))
}

//! Error types for dynwire

use crate::types::{BoxError, Shape};
use std::path::PathBuf;

/// Result type alias using [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for dynwire
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A requested symbol does not exist in its source
    #[error("Missing symbol {name}{}", .cause.as_ref().map(|e| format!(": {e}")).unwrap_or_default())]
    MissingSymbol {
        /// Symbol name
        name: String,
        /// Source-specific failure, if any
        #[source]
        cause: Option<BoxError>,
    },

    /// A module could not be opened
    #[error("Unable to load plugin from path {}: {cause}", .path.display())]
    Open {
        /// Module path
        path: PathBuf,
        /// Underlying failure
        #[source]
        cause: BoxError,
    },

    /// A module was built against an incompatible ABI
    #[error("ABI version mismatch: expected {expected}, module exports {actual}")]
    AbiMismatch {
        /// Version this host understands
        expected: u32,
        /// Version the module exports
        actual: u32,
    },

    /// Symbol is not usable as a constructor
    #[error("Symbol {name} of type {shape} is not a valid constructor")]
    InvalidConstructor {
        /// Symbol name
        name: String,
        /// Observed shape
        shape: Shape,
    },

    /// Symbol is not usable as an annotated target
    #[error("Symbol {name} of type {shape} is not a valid target")]
    InvalidTarget {
        /// Symbol name
        name: String,
        /// Observed shape
        shape: Shape,
    },

    /// Symbol is not usable as a lifecycle callback
    #[error("Symbol {name} of type {shape} is not a valid lifecycle callback")]
    InvalidLifecycle {
        /// Symbol name
        name: String,
        /// Observed shape
        shape: Shape,
    },

    /// A module lacks an export every module must carry
    #[error("Missing export: {0}")]
    MissingExport(String),

    /// A binding descriptor is neither a name nor an annotated target
    #[error("Binding #{index} is malformed: {descriptor}")]
    MalformedRequest {
        /// Position in the binding list
        index: usize,
        /// Rendering of the offending descriptor
        descriptor: String,
    },

    /// A module location pattern could not be expanded
    #[error("Invalid plugin location '{pattern}': {cause}")]
    PatternExpansion {
        /// The location as written
        pattern: String,
        /// Underlying failure
        #[source]
        cause: BoxError,
    },

    /// A type-erased call received arguments it cannot accept
    #[error("Call error: {0}")]
    Call(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a missing symbol error without a cause
    pub fn missing_symbol(name: impl Into<String>) -> Self {
        Error::MissingSymbol {
            name: name.into(),
            cause: None,
        }
    }

    /// Create an open error
    pub fn open(path: impl Into<PathBuf>, cause: impl Into<BoxError>) -> Self {
        Error::Open {
            path: path.into(),
            cause: cause.into(),
        }
    }

    /// Create a pattern expansion error
    pub fn pattern(pattern: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Error::PatternExpansion {
            pattern: pattern.into(),
            cause: cause.into(),
        }
    }

    /// Create a call error
    pub fn call(msg: impl std::fmt::Display) -> Self {
        Error::Call(msg.to_string())
    }

    /// Create a configuration error
    pub fn config(msg: impl std::fmt::Display) -> Self {
        Error::Config(msg.to_string())
    }

    /// Whether this error reports an absent symbol
    pub fn is_missing_symbol(&self) -> bool {
        matches!(self, Error::MissingSymbol { .. })
    }

    /// Whether this error reports a module that failed to open
    pub fn is_open(&self) -> bool {
        matches!(self, Error::Open { .. })
    }

    /// Whether this error reports a symbol of the wrong shape
    pub fn is_invalid_shape(&self) -> bool {
        matches!(
            self,
            Error::InvalidConstructor { .. }
                | Error::InvalidTarget { .. }
                | Error::InvalidLifecycle { .. }
        )
    }

    /// Name of the symbol this error concerns, if any
    pub fn symbol_name(&self) -> Option<&str> {
        match self {
            Error::MissingSymbol { name, .. }
            | Error::InvalidConstructor { name, .. }
            | Error::InvalidTarget { name, .. }
            | Error::InvalidLifecycle { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Whether `err`, or anything in its source chain, is a missing symbol error
pub fn is_missing_symbol(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.downcast_ref::<Error>().is_some_and(Error::is_missing_symbol) {
            return true;
        }
        current = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeDesc;
    use std::error::Error as _;

    #[test]
    fn test_missing_symbol_display() {
        let err = Error::missing_symbol("New");
        assert_eq!(err.to_string(), "Missing symbol New");
        assert!(err.source().is_none());

        let err = Error::MissingSymbol {
            name: "New".to_string(),
            cause: Some("undefined symbol".into()),
        };
        assert_eq!(err.to_string(), "Missing symbol New: undefined symbol");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_open_error() {
        let err = Error::open("/tmp/nope.so", "file not found");
        assert!(err.is_open());
        assert!(err.to_string().contains("/tmp/nope.so"));
        assert_eq!(err.source().unwrap().to_string(), "file not found");
    }

    #[test]
    fn test_invalid_shape_predicates() {
        let err = Error::InvalidTarget {
            name: "T".to_string(),
            shape: Shape::Value(TypeDesc::of::<u32>()),
        };
        assert!(err.is_invalid_shape());
        assert!(!err.is_missing_symbol());
        assert_eq!(err.symbol_name(), Some("T"));
        assert!(err.to_string().contains("not a valid target"));
    }

    #[test]
    fn test_missing_symbol_in_chain() {
        let inner = Error::missing_symbol("Inner");
        let outer = Error::open("/plugin.so", inner);
        assert!(is_missing_symbol(&outer));
        assert!(!is_missing_symbol(&Error::config("nope")));
    }
}

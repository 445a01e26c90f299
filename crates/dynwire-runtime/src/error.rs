//! Runtime error types

use dynwire_core::BoxError;
use std::fmt;

/// Runtime error type
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The registration batch contained fatal entries
    #[error("Startup failed: {0}")]
    Startup(Errors),

    /// No provider for a requested component
    #[error("Missing dependency: {0}")]
    Dependency(String),

    /// Dependency cycle detected
    #[error("Dependency cycle detected: {0}")]
    DependencyCycle(String),

    /// A provider returned an error
    #[error("Provider {provider} failed: {source}")]
    Provider {
        /// Description of the provider
        provider: String,
        /// Failure it returned
        #[source]
        source: BoxError,
    },

    /// An invoked function returned an error
    #[error("Invoke #{index} failed: {source}")]
    Invoke {
        /// Position among the batch's invocations
        index: usize,
        /// Failure it returned
        #[source]
        source: BoxError,
    },

    /// A lifecycle hook returned an error
    #[error("Lifecycle hook #{index} failed: {source}")]
    Hook {
        /// Position among the batch's hooks
        index: usize,
        /// Failure it returned
        #[source]
        source: BoxError,
    },

    /// Shutdown hooks failed
    #[error("Shutdown failed: {0}")]
    Shutdown(Errors),

    /// Invalid state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A type-erased call failed
    #[error(transparent)]
    Core(#[from] dynwire_core::Error),
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

impl RuntimeError {
    /// Create a new missing dependency error
    pub fn dependency(what: impl fmt::Display) -> Self {
        Self::Dependency(what.to_string())
    }

    /// Create a new dependency cycle error
    pub fn dependency_cycle(msg: impl fmt::Display) -> Self {
        Self::DependencyCycle(msg.to_string())
    }

    /// Create a new invalid state error
    pub fn invalid_state(msg: impl fmt::Display) -> Self {
        Self::InvalidState(msg.to_string())
    }

    /// The collected errors, for startup and shutdown failures
    pub fn errors(&self) -> Option<&Errors> {
        match self {
            Self::Startup(errors) | Self::Shutdown(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Several independent errors reported together
#[derive(Debug, Default)]
pub struct Errors {
    errors: Vec<BoxError>,
}

impl Errors {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error
    pub fn push(&mut self, err: impl Into<BoxError>) {
        self.errors.push(err.into());
    }

    /// Number of errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether the report is empty
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterate over the errors in the order they were collected
    pub fn iter(&self) -> impl Iterator<Item = &(dyn std::error::Error + Send + Sync + 'static)> {
        self.errors.iter().map(|err| &**err)
    }

    /// Errors of type `E`, in order
    pub fn of<E: std::error::Error + 'static>(&self) -> impl Iterator<Item = &E> {
        self.errors.iter().filter_map(|err| err.downcast_ref::<E>())
    }
}

impl fmt::Display for Errors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [] => f.write_str("no errors"),
            [only] => write!(f, "{only}"),
            errors => {
                write!(f, "{} errors occurred:", errors.len())?;
                for err in errors {
                    write!(f, "\n\t* {err}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Errors {}

impl FromIterator<BoxError> for Errors {
    fn from_iter<I: IntoIterator<Item = BoxError>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

//! Registration batches handed to the dependency-injection container

use crate::error::Error;
use crate::symbol::Function;
use crate::types::{Context, Fallible};
use std::fmt;
use std::sync::Arc;

/// Normalized lifecycle callback
pub type HookFn = Arc<dyn Fn(Context) -> Fallible + Send + Sync>;

/// A pair of lifecycle callbacks run at container startup and shutdown
#[derive(Clone, Default)]
pub struct Hook {
    /// Run during the container's startup phase
    pub on_start: Option<HookFn>,
    /// Run during the container's shutdown phase
    pub on_stop: Option<HookFn>,
}

impl Hook {
    /// Whether neither callback is set
    pub fn is_empty(&self) -> bool {
        self.on_start.is_none() && self.on_stop.is_none()
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("on_start", &self.on_start.is_some())
            .field("on_stop", &self.on_stop.is_some())
            .finish()
    }
}

/// One action for the container
#[derive(Debug)]
pub enum Registration {
    /// Register a constructor; each non-error output becomes a component
    Provide(Function),

    /// Register a single-value target under a name and/or group
    ProvideAnnotated {
        /// Component name
        name: Option<String>,
        /// Value group
        group: Option<String>,
        /// Constructor with exactly one non-error output
        target: Function,
    },

    /// Run a function for its side effect once the graph is built
    Invoke(Function),

    /// Append lifecycle callbacks
    AppendHook(Hook),

    /// Block startup with an error; other registrations are still recorded
    Fatal(Error),
}

impl Registration {
    /// Short name of the action, for logs and diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Registration::Provide(_) => "provide",
            Registration::ProvideAnnotated { .. } => "provide-annotated",
            Registration::Invoke(_) => "invoke",
            Registration::AppendHook(_) => "append-hook",
            Registration::Fatal(_) => "fatal",
        }
    }

    /// The error, if this is a fatal registration
    pub fn as_fatal(&self) -> Option<&Error> {
        match self {
            Registration::Fatal(err) => Some(err),
            _ => None,
        }
    }
}

/// Ordered sequence of registrations produced by one orchestration pass
#[derive(Debug, Default)]
pub struct Batch {
    entries: Vec<Registration>,
}

impl Batch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a registration
    pub fn push(&mut self, registration: Registration) {
        self.entries.push(registration);
    }

    /// Append a fatal error
    pub fn fatal(&mut self, err: Error) {
        tracing::warn!(error = %err, "Fatal registration");
        self.entries.push(Registration::Fatal(err));
    }

    /// Append all registrations of another batch, preserving order
    pub fn append(&mut self, mut other: Batch) {
        self.entries.append(&mut other.entries);
    }

    /// Number of registrations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over registrations in order
    pub fn iter(&self) -> std::slice::Iter<'_, Registration> {
        self.entries.iter()
    }

    /// Fatal errors in the batch, in order
    pub fn errors(&self) -> impl Iterator<Item = &Error> {
        self.entries.iter().filter_map(Registration::as_fatal)
    }

    /// Whether any registration is fatal
    pub fn has_fatal(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Kinds of each registration, in order
    pub fn kinds(&self) -> Vec<&'static str> {
        self.entries.iter().map(Registration::kind).collect()
    }
}

impl IntoIterator for Batch {
    type Item = Registration;
    type IntoIter = std::vec::IntoIter<Registration>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Registration;
    type IntoIter = std::slice::Iter<'a, Registration>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<Registration> for Batch {
    fn from_iter<I: IntoIterator<Item = Registration>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<Registration> for Batch {
    fn extend<I: IntoIterator<Item = Registration>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

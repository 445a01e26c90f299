//! Binding orchestration
//!
//! [`Bindings`] turns an ordered list of requested symbols into a registration
//! batch for one symbol source. Each request is handled independently: a
//! failure becomes a [`Registration::Fatal`] entry in place and processing
//! moves on, so the container sees every failure in one pass.

use crate::classify::{classify_simple, lookup_target, Role};
use crate::source::SymbolSource;
use dynwire_core::{Batch, Error, Registration, Result};
use serde::{Deserialize, Serialize};

/// A target symbol registered under a component name or value group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotated {
    /// Component name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Value group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Name of the target symbol
    pub target: String,
}

impl Annotated {
    /// Register `target` under a component name
    pub fn named(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            group: None,
            target: target.into(),
        }
    }

    /// Register `target` into a value group
    pub fn grouped(group: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            name: None,
            group: Some(group.into()),
            target: target.into(),
        }
    }
}

/// One requested binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingRequest {
    /// A bare symbol name; provided or invoked depending on its outputs
    ByName(String),
    /// A target registered under a name or group
    Annotated(Annotated),
}

impl BindingRequest {
    /// Name of the symbol this request resolves
    pub fn symbol(&self) -> &str {
        match self {
            BindingRequest::ByName(name) => name,
            BindingRequest::Annotated(annotated) => &annotated.target,
        }
    }
}

impl From<&str> for BindingRequest {
    fn from(name: &str) -> Self {
        BindingRequest::ByName(name.to_string())
    }
}

impl From<String> for BindingRequest {
    fn from(name: String) -> Self {
        BindingRequest::ByName(name)
    }
}

impl From<Annotated> for BindingRequest {
    fn from(annotated: Annotated) -> Self {
        BindingRequest::Annotated(annotated)
    }
}

/// A descriptor that could not be turned into a [`BindingRequest`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejected {
    /// Position of the descriptor among all descriptors, requests included
    pub index: usize,
    /// Rendering of the descriptor
    pub descriptor: String,
}

impl Rejected {
    /// The fatal error reported for this descriptor
    pub fn error(&self) -> Error {
        malformed(self.index, &self.descriptor)
    }
}

/// Symbols to bind from a source, with an ignore-missing policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    /// Requests, in registration order
    pub requests: Vec<BindingRequest>,

    /// Descriptors rejected before resolution, ordered by index. Each one
    /// is reported at its index relative to the requests around it.
    pub rejected: Vec<Rejected>,

    /// When set, absent symbols are skipped instead of failing startup.
    /// Symbols that exist but have the wrong shape always fail.
    pub ignore_missing: bool,
}

impl Bindings {
    /// Create an empty set of bindings
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request
    pub fn bind(mut self, request: impl Into<BindingRequest>) -> Self {
        self.requests.push(request.into());
        self
    }

    /// Record a descriptor at `index` that is not a valid request
    pub fn reject(mut self, index: usize, descriptor: impl std::fmt::Display) -> Self {
        let at = self.rejected.partition_point(|r| r.index <= index);
        self.rejected.insert(
            at,
            Rejected {
                index,
                descriptor: descriptor.to_string(),
            },
        );
        self
    }

    /// Set the ignore-missing policy
    pub fn ignore_missing(mut self, ignore: bool) -> Self {
        self.ignore_missing = ignore;
        self
    }

    /// Whether there is nothing to bind or report
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty() && self.rejected.is_empty()
    }

    /// Errors for the rejected descriptors, for callers with no source to
    /// resolve the requests against
    pub fn rejections(&self) -> impl Iterator<Item = Error> + '_ {
        self.rejected.iter().map(Rejected::error)
    }

    /// Resolve every request against `source`.
    ///
    /// The batch holds one entry per descriptor, in descriptor order: a
    /// registration or fatal error per request, a fatal error per rejected
    /// descriptor. Missing symbols skipped under the ignore-missing policy
    /// leave no entry.
    pub fn provide(&self, source: &dyn SymbolSource) -> Batch {
        let mut batch = Batch::new();
        let mut rejected = self.rejected.iter().peekable();
        let mut position = 0;

        for request in &self.requests {
            while let Some(r) = rejected.next_if(|r| r.index <= position) {
                batch.fatal(r.error());
                position += 1;
            }
            position += 1;

            match resolve(source, request) {
                Ok(registration) => {
                    tracing::debug!(
                        symbol = %request.symbol(),
                        kind = registration.kind(),
                        "Symbol bound"
                    );
                    batch.push(registration);
                }
                Err(err) if err.is_missing_symbol() && self.ignore_missing => {
                    tracing::debug!(symbol = %request.symbol(), "Ignoring missing symbol");
                }
                Err(err) => batch.fatal(err),
            }
        }

        for r in rejected {
            batch.fatal(r.error());
        }

        batch
    }
}

fn resolve(source: &dyn SymbolSource, request: &BindingRequest) -> Result<Registration> {
    match request {
        BindingRequest::ByName(name) => {
            let (role, f) = classify_simple(source, name).into_result()?;
            Ok(match role {
                Role::Invocation => Registration::Invoke(f),
                _ => Registration::Provide(f),
            })
        }
        BindingRequest::Annotated(annotated) => {
            let target = lookup_target(source, &annotated.target)?;
            Ok(Registration::ProvideAnnotated {
                name: annotated.name.clone(),
                group: annotated.group.clone(),
                target,
            })
        }
    }
}

/// Error for a binding descriptor that arrived in an unusable form
pub fn malformed(index: usize, descriptor: impl std::fmt::Display) -> Error {
    Error::MalformedRequest {
        index,
        descriptor: descriptor.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::SymbolTable;
    use dynwire_core::Fallible;

    fn sample() -> SymbolTable {
        let mut table = SymbolTable::new();
        table.set_function("Ctor1", || (Vec::<u8>::new(),));
        table.set_function("Ctor2", |buf: Vec<u8>| (buf.len(), Ok(()) as Fallible));
        table.set_function("Tgt1", || (String::from("target"),));
        table.set_function("Invoke1", || ());
        table.set_function("Invoke2", || -> Fallible { Ok(()) });
        table.set_value("NotAFunction", 123i32);
        table
    }

    fn mixed() -> Bindings {
        Bindings::new()
            .bind("Ctor1")
            .bind(Annotated::named("X", "Tgt1"))
            .bind("Missing1")
    }

    #[test]
    fn test_provide_mixed_requests() {
        let batch = mixed().provide(&sample());
        assert_eq!(batch.kinds(), vec!["provide", "provide-annotated", "fatal"]);

        let err = batch.errors().next().unwrap();
        assert!(err.is_missing_symbol());
        assert_eq!(err.symbol_name(), Some("Missing1"));
    }

    #[test]
    fn test_provide_ignore_missing() {
        let batch = mixed().ignore_missing(true).provide(&sample());
        assert_eq!(batch.kinds(), vec!["provide", "provide-annotated"]);
        assert!(!batch.has_fatal());
    }

    #[test]
    fn test_annotated_carries_name_and_group() {
        let batch = Bindings::new()
            .bind(Annotated::named("Annotated", "Tgt1"))
            .bind(Annotated::grouped("ALovelyGroup", "Tgt1"))
            .provide(&sample());

        let entries: Vec<_> = batch.into_iter().collect();
        assert!(matches!(
            &entries[0],
            Registration::ProvideAnnotated { name: Some(n), group: None, .. } if n == "Annotated"
        ));
        assert!(matches!(
            &entries[1],
            Registration::ProvideAnnotated { name: None, group: Some(g), .. } if g == "ALovelyGroup"
        ));
    }

    #[test]
    fn test_invocations_inferred() {
        let batch = Bindings::new()
            .bind("Ctor2")
            .bind("Invoke1")
            .bind("Invoke2")
            .provide(&sample());
        assert_eq!(batch.kinds(), vec!["provide", "invoke", "invoke"]);
    }

    #[test]
    fn test_invalid_shapes_are_fatal_even_when_ignoring_missing() {
        let mut table = sample();
        table.set_function("BadTarget", || (1u8, 2.0f64));

        let batch = Bindings::new()
            .bind("NotAFunction")
            .bind(Annotated::named("Bad", "BadTarget"))
            .bind("Ctor1")
            .ignore_missing(true)
            .provide(&table);

        assert_eq!(batch.kinds(), vec!["fatal", "fatal", "provide"]);
        let errors: Vec<_> = batch.errors().collect();
        assert!(matches!(errors[0], Error::InvalidConstructor { .. }));
        assert!(matches!(errors[1], Error::InvalidTarget { .. }));
    }

    #[test]
    fn test_empty_bindings() {
        let bindings = Bindings::new();
        assert!(bindings.is_empty());
        assert!(bindings.provide(&sample()).is_empty());
    }

    #[test]
    fn test_rejected_descriptors_stay_in_place() {
        let bindings = Bindings::new()
            .bind("Ctor1")
            .reject(1, 12)
            .bind(Annotated::named("X", "Tgt1"))
            .reject(3, "[]")
            .reject(4, "null")
            .bind("Ctor2");

        let batch = bindings.provide(&sample());
        assert_eq!(
            batch.kinds(),
            vec!["provide", "fatal", "provide-annotated", "fatal", "fatal", "provide"]
        );

        let indexes: Vec<_> = batch
            .errors()
            .map(|err| match err {
                Error::MalformedRequest { index, .. } => *index,
                other => panic!("unexpected error: {other}"),
            })
            .collect();
        assert_eq!(indexes, vec![1, 3, 4]);
    }

    #[test]
    fn test_rejected_ignores_missing_policy() {
        let bindings = Bindings::new()
            .reject(0, 7)
            .bind("Missing1")
            .ignore_missing(true);
        assert!(!bindings.is_empty());

        let batch = bindings.provide(&sample());
        assert_eq!(batch.kinds(), vec!["fatal"]);
        assert_eq!(bindings.rejections().count(), 1);
    }

    #[test]
    fn test_reject_keeps_index_order() {
        let bindings = Bindings::new().reject(5, "b").reject(2, "a");
        let indexes: Vec<_> = bindings.rejected.iter().map(|r| r.index).collect();
        assert_eq!(indexes, vec![2, 5]);
    }

    #[test]
    fn test_malformed() {
        let err = malformed(3, 38472983712u64);
        assert!(matches!(err, Error::MalformedRequest { index: 3, .. }));
        assert!(err.to_string().contains("38472983712"));
    }
}

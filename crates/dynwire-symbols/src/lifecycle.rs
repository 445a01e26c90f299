//! Lifecycle binding

use crate::classify::lookup_lifecycle;
use crate::source::SymbolSource;
use dynwire_core::{Batch, Hook, HookFn, Registration};
use serde::{Deserialize, Serialize};

/// How a source's symbols bind to the container's startup and shutdown.
///
/// Either callback may have any of the shapes `fn()`, `fn() -> Fallible`,
/// `fn(Context)` or `fn(Context) -> Fallible`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lifecycle {
    /// Symbol run at startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_start: Option<String>,

    /// Symbol run at shutdown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_stop: Option<String>,

    /// When set, an absent callback symbol is skipped. A callback that exists
    /// with the wrong shape always fails.
    pub ignore_missing: bool,
}

impl Lifecycle {
    /// Create an empty lifecycle binding
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the startup symbol
    pub fn on_start(mut self, name: impl Into<String>) -> Self {
        self.on_start = Some(name.into());
        self
    }

    /// Set the shutdown symbol
    pub fn on_stop(mut self, name: impl Into<String>) -> Self {
        self.on_stop = Some(name.into());
        self
    }

    /// Set the ignore-missing policy
    pub fn ignore_missing(mut self, ignore: bool) -> Self {
        self.ignore_missing = ignore;
        self
    }

    /// Whether neither callback is requested
    pub fn is_empty(&self) -> bool {
        requested(&self.on_start).is_none() && requested(&self.on_stop).is_none()
    }

    /// Resolve both callbacks against `source`.
    ///
    /// Produces a single hook registration when at least one callback resolved
    /// and nothing failed; otherwise only the fatal entries, if any.
    pub fn provide(&self, source: &dyn SymbolSource) -> Batch {
        let mut batch = Batch::new();
        let mut hook = Hook::default();

        for (slot, name) in [
            (&mut hook.on_start, &self.on_start),
            (&mut hook.on_stop, &self.on_stop),
        ] {
            if let Some(name) = requested(name) {
                *slot = self.resolve(source, name, &mut batch);
            }
        }

        if batch.is_empty() && !hook.is_empty() {
            batch.push(Registration::AppendHook(hook));
        }

        batch
    }

    fn resolve(&self, source: &dyn SymbolSource, name: &str, batch: &mut Batch) -> Option<HookFn> {
        match lookup_lifecycle(source, name) {
            Ok(hook) => {
                tracing::debug!(symbol = %name, "Lifecycle callback bound");
                Some(hook)
            }
            Err(err) if err.is_missing_symbol() && self.ignore_missing => {
                tracing::debug!(symbol = %name, "Ignoring missing lifecycle callback");
                None
            }
            Err(err) => {
                batch.fatal(err);
                None
            }
        }
    }
}

fn requested(name: &Option<String>) -> Option<&str> {
    name.as_deref().filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::SymbolTable;
    use dynwire_core::{Context, Error, Fallible};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn hook_of(batch: Batch) -> Hook {
        match batch.into_iter().next() {
            Some(Registration::AppendHook(hook)) => hook,
            other => panic!("expected a hook registration, got {other:?}"),
        }
    }

    #[test]
    fn test_ignore_missing() {
        let batch = Lifecycle::new()
            .on_start("NosuchOnStart")
            .on_stop("NosuchOnStop")
            .ignore_missing(true)
            .provide(&SymbolTable::new());
        assert!(batch.is_empty());
    }

    #[test]
    fn test_missing_is_fatal() {
        let batch = Lifecycle::new()
            .on_start("NoSuch")
            .provide(&SymbolTable::new());
        assert_eq!(batch.kinds(), vec!["fatal"]);
        assert!(batch.errors().next().unwrap().is_missing_symbol());
    }

    #[test]
    fn test_both_callbacks() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut table = SymbolTable::new();
        let started = Arc::clone(&calls);
        table.set_function("Start", move |_: Context| -> Fallible {
            started.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let stopped = Arc::clone(&calls);
        table.set_function("Stop", move || {
            stopped.fetch_add(10, Ordering::SeqCst);
        });

        let hook = hook_of(
            Lifecycle::new()
                .on_start("Start")
                .on_stop("Stop")
                .provide(&table),
        );

        (hook.on_start.unwrap())(Context::new()).unwrap();
        (hook.on_stop.unwrap())(Context::new()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn test_only_stop() {
        let mut table = SymbolTable::new();
        table.set_function("Stop", || -> Fallible { Err("stop failed".into()) });

        let hook = hook_of(Lifecycle::new().on_stop("Stop").provide(&table));
        assert!(hook.on_start.is_none());
        let err = (hook.on_stop.unwrap())(Context::new()).unwrap_err();
        assert_eq!(err.to_string(), "stop failed");
    }

    #[test]
    fn test_invalid_shape_is_fatal_even_when_ignoring_missing() {
        let mut table = SymbolTable::new();
        table.set_function("Start", || ());
        table.set_function("Stop", |x: i32| (x > 0,));

        let batch = Lifecycle::new()
            .on_start("Start")
            .on_stop("Stop")
            .ignore_missing(true)
            .provide(&table);

        assert_eq!(batch.kinds(), vec!["fatal"]);
        assert!(matches!(
            batch.errors().next().unwrap(),
            Error::InvalidLifecycle { name, .. } if name == "Stop"
        ));
    }

    #[test]
    fn test_missing_start_with_valid_stop_registers_nothing() {
        let mut table = SymbolTable::new();
        table.set_function("Stop", || ());

        let batch = Lifecycle::new()
            .on_start("Absent")
            .on_stop("Stop")
            .provide(&table);
        assert_eq!(batch.kinds(), vec!["fatal"]);
    }

    #[test]
    fn test_empty_names_are_ignored() {
        let lifecycle = Lifecycle {
            on_start: Some(String::new()),
            on_stop: None,
            ignore_missing: false,
        };
        assert!(lifecycle.is_empty());
        assert!(lifecycle.provide(&SymbolTable::new()).is_empty());
    }
}

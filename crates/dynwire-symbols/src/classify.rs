//! Role classification of resolved symbols
//!
//! Each role a symbol can play is a contract on its call shape alone:
//!
//! | Role | Accepted shape |
//! |---|---|
//! | [`Role::Constructor`] | callable, at least one non-error output |
//! | [`Role::Target`] | callable, one or two outputs, exactly one of them non-error |
//! | [`Role::Invocation`] | callable, every output error-shaped (zero outputs included) |
//! | [`Role::Lifecycle`] | `fn()`, `fn() -> Fallible`, `fn(Context)`, `fn(Context) -> Fallible` |
//!
//! Nothing beyond arity and error-shaped positions is checked; argument and
//! output types must otherwise suit the container.

use crate::source::{lookup, SymbolSource};
use dynwire_core::{
    take_failure, Arg, Context, Error, Fallible, Function, HookFn, Result, Shape, Symbol,
    TypeDesc,
};
use std::fmt;
use std::sync::Arc;

/// The way a symbol is meant to be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Registered so the container can build components from its outputs
    Constructor,
    /// A constructor with a single non-error output, registered by name or group
    Target,
    /// Run for its side effect, producing at most errors
    Invocation,
    /// Bound to container startup or shutdown
    Lifecycle,
}

impl Role {
    /// Whether a callable satisfies this role's contract
    pub fn accepts(&self, f: &Function) -> bool {
        let outputs = f.outputs();
        match self {
            Role::Constructor => f.value_outputs() >= 1,
            Role::Target => matches!(outputs.len(), 1 | 2) && f.value_outputs() == 1,
            Role::Invocation => f.only_errors(),
            Role::Lifecycle => {
                let inputs_ok = match f.inputs() {
                    [] => true,
                    [ctx] => ctx.is_context(),
                    _ => false,
                };
                let outputs_ok = match outputs {
                    [] => true,
                    [err] => err.is_error(),
                    _ => false,
                };
                inputs_ok && outputs_ok
            }
        }
    }

    /// The role a by-name binding takes on: an invocation when every output
    /// is error-shaped, a constructor otherwise
    pub fn infer(f: &Function) -> Role {
        if f.only_errors() {
            Role::Invocation
        } else {
            Role::Constructor
        }
    }

    /// The error reported when a symbol of `shape` fails this role
    pub fn invalid(&self, name: impl Into<String>, shape: Shape) -> Error {
        let name = name.into();
        match self {
            Role::Constructor | Role::Invocation => Error::InvalidConstructor { name, shape },
            Role::Target => Error::InvalidTarget { name, shape },
            Role::Lifecycle => Error::InvalidLifecycle { name, shape },
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Constructor => "constructor",
            Role::Target => "target",
            Role::Invocation => "invocation",
            Role::Lifecycle => "lifecycle",
        })
    }
}

/// Outcome of classifying one requested name
#[derive(Debug)]
pub enum Classification {
    /// The symbol exists and satisfies the role
    Valid(Role, Function),

    /// The symbol does not exist; always an [`Error::MissingSymbol`]
    Missing(Error),

    /// The symbol exists but its shape does not satisfy the role
    InvalidShape {
        /// Symbol name
        name: String,
        /// Observed shape
        shape: Shape,
        /// Role that was required
        role: Role,
    },
}

impl Classification {
    /// Classify an already-resolved symbol against `role`
    pub fn of(name: &str, symbol: Symbol, role: Role) -> Self {
        match symbol {
            Symbol::Function(f) if role.accepts(&f) => Classification::Valid(role, f),
            other => Classification::InvalidShape {
                name: name.to_string(),
                shape: other.shape(),
                role,
            },
        }
    }

    /// Whether the symbol was valid
    pub fn is_valid(&self) -> bool {
        matches!(self, Classification::Valid(..))
    }

    /// Convert into a result, mapping shape failures to the role-specific error
    pub fn into_result(self) -> Result<(Role, Function)> {
        match self {
            Classification::Valid(role, f) => Ok((role, f)),
            Classification::Missing(err) => Err(err),
            Classification::InvalidShape { name, shape, role } => Err(role.invalid(name, shape)),
        }
    }
}

/// Look up `name` and classify it against `role`
pub fn classify(source: &dyn SymbolSource, name: &str, role: Role) -> Classification {
    match lookup(source, name) {
        Ok(symbol) => Classification::of(name, symbol, role),
        Err(err) => Classification::Missing(err),
    }
}

/// Look up `name` for a by-name binding, inferring its role from its outputs.
///
/// Any callable qualifies; a non-callable symbol is an invalid constructor.
pub fn classify_simple(source: &dyn SymbolSource, name: &str) -> Classification {
    match lookup(source, name) {
        Ok(Symbol::Function(f)) => Classification::Valid(Role::infer(&f), f),
        Ok(other) => Classification::InvalidShape {
            name: name.to_string(),
            shape: other.shape(),
            role: Role::Constructor,
        },
        Err(err) => Classification::Missing(err),
    }
}

/// Look up a symbol usable as a constructor
pub fn lookup_constructor(source: &dyn SymbolSource, name: &str) -> Result<Function> {
    classify(source, name, Role::Constructor)
        .into_result()
        .map(|(_, f)| f)
}

/// Look up a symbol usable as an annotated target
pub fn lookup_target(source: &dyn SymbolSource, name: &str) -> Result<Function> {
    classify(source, name, Role::Target)
        .into_result()
        .map(|(_, f)| f)
}

/// Look up a lifecycle callback and normalize it to a [`HookFn`]
pub fn lookup_lifecycle(source: &dyn SymbolSource, name: &str) -> Result<HookFn> {
    classify(source, name, Role::Lifecycle)
        .into_result()
        .map(|(_, f)| normalize_hook(f))
}

/// Wrap a callable of any accepted lifecycle shape as a uniform hook.
///
/// Shapes without a context parameter ignore the context they are given;
/// shapes without an error output always succeed.
pub fn normalize_hook(f: Function) -> HookFn {
    let takes_context = f.inputs().first().is_some_and(TypeDesc::is_context);

    Arc::new(move |ctx: Context| -> Fallible {
        let values = if takes_context {
            let arg: Arg<'_> = &ctx;
            f.call(&[arg])?
        } else {
            f.call(&[])?
        };

        for value in values {
            take_failure(value)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::SymbolTable;
    use dynwire_core::BoxError;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn ok() -> Fallible {
        Ok(())
    }

    fn fail(msg: &str) -> Fallible {
        Err(BoxError::from(msg.to_string()))
    }

    #[test]
    fn test_constructor_shapes() {
        let with_error = Function::new(|| (5u32, ok()));
        assert!(Role::Constructor.accepts(&with_error));

        let many = Function::new(|| (5u32, "x".to_string(), ok()));
        assert!(Role::Constructor.accepts(&many));

        let error_first = Function::new(|| (ok(), 5u32));
        assert!(Role::Constructor.accepts(&error_first));

        let error_only = Function::new(|| -> Fallible { Ok(()) });
        assert!(!Role::Constructor.accepts(&error_only));

        let nothing = Function::new(|| ());
        assert!(!Role::Constructor.accepts(&nothing));
    }

    #[test]
    fn test_infer_role() {
        assert_eq!(Role::infer(&Function::new(|| (5u32, ok()))), Role::Constructor);
        assert_eq!(Role::infer(&Function::new(ok)), Role::Invocation);
        assert_eq!(Role::infer(&Function::new(|| ())), Role::Invocation);
        assert_eq!(Role::infer(&Function::new(|x: u8| (ok(), ok(), x))), Role::Constructor);
    }

    #[test]
    fn test_target_shapes() {
        assert!(Role::Target.accepts(&Function::new(|| (1u8,))));
        assert!(Role::Target.accepts(&Function::new(|| (1u8, ok()))));
        assert!(Role::Target.accepts(&Function::new(|| (ok(), 1u8))));

        assert!(!Role::Target.accepts(&Function::new(|| ())));
        assert!(!Role::Target.accepts(&Function::new(ok)));
        assert!(!Role::Target.accepts(&Function::new(|| (1u8, 2.0f64))));
        assert!(!Role::Target.accepts(&Function::new(|| (ok(), ok()))));
        assert!(!Role::Target.accepts(&Function::new(|| (1u8, 2.0f64, ok()))));
    }

    #[test]
    fn test_lifecycle_shapes() {
        assert!(Role::Lifecycle.accepts(&Function::new(|| ())));
        assert!(Role::Lifecycle.accepts(&Function::new(ok)));
        assert!(Role::Lifecycle.accepts(&Function::new(|_: Context| ())));
        assert!(Role::Lifecycle.accepts(&Function::new(|_: Context| ok())));

        assert!(!Role::Lifecycle.accepts(&Function::new(|x: i32| (x > 0,))));
        assert!(!Role::Lifecycle.accepts(&Function::new(|_: u8| ())));
        assert!(!Role::Lifecycle.accepts(&Function::new(|| (1u8,))));
        assert!(!Role::Lifecycle.accepts(&Function::new(|_: Context, _: Context| ())));
    }

    #[test]
    fn test_classify_missing() {
        let table = SymbolTable::new();
        match classify(&table, "Nope", Role::Target) {
            Classification::Missing(err) => assert!(err.is_missing_symbol()),
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn test_classify_value_is_invalid() {
        let mut table = SymbolTable::new();
        table.set_value("NotAFunction", 123i32);

        let err = lookup_constructor(&table, "NotAFunction").unwrap_err();
        assert!(matches!(err, Error::InvalidConstructor { .. }));

        let err = lookup_target(&table, "NotAFunction").unwrap_err();
        assert!(matches!(err, Error::InvalidTarget { .. }));

        let err = lookup_lifecycle(&table, "NotAFunction").err().unwrap();
        assert!(matches!(err, Error::InvalidLifecycle { .. }));
        assert!(err.to_string().contains("value of type i32"));
    }

    #[test]
    fn test_classify_simple() {
        let mut table = SymbolTable::new();
        table.set_function("Ctor", || (1u8, ok()));
        table.set_function("Run", || ());
        table.set_value("Value", 1u8);

        assert!(matches!(
            classify_simple(&table, "Ctor"),
            Classification::Valid(Role::Constructor, _)
        ));
        assert!(matches!(
            classify_simple(&table, "Run"),
            Classification::Valid(Role::Invocation, _)
        ));

        let err = classify_simple(&table, "Value").into_result().unwrap_err();
        assert!(matches!(err, Error::InvalidConstructor { .. }));
    }

    #[test]
    fn test_hooks_preserve_outcome() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        let simple = normalize_hook(Function::new(move || flag.store(true, Ordering::SeqCst)));
        assert!(simple(Context::new()).is_ok());
        assert!(called.load(Ordering::SeqCst));

        let failing = normalize_hook(Function::new(|| fail("no start")));
        assert_eq!(failing(Context::new()).unwrap_err().to_string(), "no start");

        let sees_context = normalize_hook(Function::new(|ctx: Context| {
            if ctx.is_cancelled() {
                fail("cancelled")
            } else {
                ok()
            }
        }));
        assert!(sees_context(Context::new()).is_ok());
        let cancelled = Context::new();
        cancelled.cancel();
        assert_eq!(sees_context(cancelled).unwrap_err().to_string(), "cancelled");

        let observed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&observed);
        let context_only = normalize_hook(Function::new(move |ctx: Context| {
            flag.store(!ctx.is_cancelled(), Ordering::SeqCst)
        }));
        assert!(context_only(Context::new()).is_ok());
        assert!(observed.load(Ordering::SeqCst));
    }
}

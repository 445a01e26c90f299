//! Type-erased symbols
//!
//! A [`Symbol`] is whatever a module exports under a name: either a
//! [`Function`] whose call shape can be inspected at runtime, or a boxed value.
//! Functions are built from ordinary closures through [`IntoFunction`]; their
//! parameter and output types are recorded as [`TypeDesc`]s so the classifier
//! can decide which roles a symbol may play without knowing its static type.

use crate::error::{Error, Result};
use crate::types::{Fallible, Shape, TypeDesc, ERROR_TYPE};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// An owned output produced by calling a [`Function`]
pub type Value = Box<dyn Any + Send + Sync>;

/// Borrowed argument passed to a [`Function`]
pub type Arg<'a> = &'a (dyn Any + Send + Sync);

type Invoker = dyn Fn(&[Arg<'_>]) -> Result<Vec<Value>> + Send + Sync;

/// A callable with a runtime-inspectable shape
#[derive(Clone)]
pub struct Function {
    inputs: Vec<TypeDesc>,
    outputs: Vec<TypeDesc>,
    invoker: Arc<Invoker>,
}

impl Function {
    /// Wrap a closure
    pub fn new<Args, F: IntoFunction<Args>>(f: F) -> Self {
        f.into_function()
    }

    /// Build a function from an explicit shape and invoker.
    ///
    /// The invoker receives arguments already checked for arity; it must
    /// return exactly one value per declared output.
    pub fn from_raw<I>(inputs: Vec<TypeDesc>, outputs: Vec<TypeDesc>, invoker: I) -> Self
    where
        I: Fn(&[Arg<'_>]) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        Self {
            inputs,
            outputs,
            invoker: Arc::new(invoker),
        }
    }

    /// Parameter types, in order
    pub fn inputs(&self) -> &[TypeDesc] {
        &self.inputs
    }

    /// Output types, in order
    pub fn outputs(&self) -> &[TypeDesc] {
        &self.outputs
    }

    /// The call shape of this function
    pub fn shape(&self) -> Shape {
        Shape::Function {
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
        }
    }

    /// Number of outputs that are not error-shaped
    pub fn value_outputs(&self) -> usize {
        self.outputs.iter().filter(|ty| !ty.is_error()).count()
    }

    /// Whether every output is error-shaped (vacuously true with no outputs)
    pub fn only_errors(&self) -> bool {
        self.outputs.iter().all(TypeDesc::is_error)
    }

    /// Call the function.
    ///
    /// Arguments are matched positionally against [`Function::inputs`].
    pub fn call(&self, args: &[Arg<'_>]) -> Result<Vec<Value>> {
        if args.len() != self.inputs.len() {
            return Err(Error::call(format!(
                "{} expects {} argument(s), got {}",
                self.shape(),
                self.inputs.len(),
                args.len()
            )));
        }

        let values = (self.invoker)(args)?;
        if values.len() != self.outputs.len() {
            return Err(Error::call(format!(
                "{} produced {} value(s)",
                self.shape(),
                values.len()
            )));
        }

        Ok(values)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Function").field(&self.shape()).finish()
    }
}

/// Extract the failure carried by an error-shaped output value.
///
/// Values of any other type are treated as success.
pub fn take_failure(value: Value) -> Fallible {
    match value.downcast::<Fallible>() {
        Ok(fallible) => *fallible,
        Err(_) => Ok(()),
    }
}

/// Output types a wrapped closure may return.
///
/// Implemented for `()` (no outputs), [`Fallible`] (a single error output) and
/// tuples of one to three values.
pub trait Outputs: Send + 'static {
    /// Descriptors of each output position
    fn types() -> Vec<TypeDesc>;

    /// Split into one boxed value per output position
    fn into_values(self) -> Vec<Value>;
}

impl Outputs for () {
    fn types() -> Vec<TypeDesc> {
        Vec::new()
    }

    fn into_values(self) -> Vec<Value> {
        Vec::new()
    }
}

impl Outputs for Fallible {
    fn types() -> Vec<TypeDesc> {
        vec![*ERROR_TYPE]
    }

    fn into_values(self) -> Vec<Value> {
        vec![Box::new(self)]
    }
}

macro_rules! impl_outputs {
    ($($ty:ident $idx:tt),+) => {
        impl<$($ty: Any + Send + Sync),+> Outputs for ($($ty,)+) {
            fn types() -> Vec<TypeDesc> {
                vec![$(TypeDesc::of::<$ty>()),+]
            }

            fn into_values(self) -> Vec<Value> {
                vec![$(Box::new(self.$idx) as Value),+]
            }
        }
    };
}

impl_outputs!(O1 0);
impl_outputs!(O1 0, O2 1);
impl_outputs!(O1 0, O2 1, O3 2);

/// Conversion of a closure into a [`Function`].
///
/// Implemented for `Fn` closures of zero to four arguments. Arguments are
/// cloned out of the values the caller supplies, so each parameter type must
/// be `Clone`; share heavy components behind an `Arc`.
pub trait IntoFunction<Args>: Sized {
    /// Perform the conversion
    fn into_function(self) -> Function;
}

macro_rules! impl_into_function {
    ($($ty:ident $var:ident),*) => {
        impl<F, R, $($ty,)*> IntoFunction<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> R + Send + Sync + 'static,
            R: Outputs,
            $($ty: Any + Clone + Send + Sync,)*
        {
            #[allow(unused_mut, unused_variables)]
            fn into_function(self) -> Function {
                Function::from_raw(
                    vec![$(TypeDesc::of::<$ty>()),*],
                    R::types(),
                    move |args: &[Arg<'_>]| {
                        let mut args = args.iter();
                        $(
                            let $var = args
                                .next()
                                .and_then(|arg| (**arg).downcast_ref::<$ty>())
                                .cloned()
                                .ok_or_else(|| {
                                    Error::call(format!(
                                        "expected argument of type {}",
                                        std::any::type_name::<$ty>()
                                    ))
                                })?;
                        )*
                        Ok((self)($($var),*).into_values())
                    },
                )
            }
        }
    };
}

impl_into_function!();
impl_into_function!(A1 a1);
impl_into_function!(A1 a1, A2 a2);
impl_into_function!(A1 a1, A2 a2, A3 a3);
impl_into_function!(A1 a1, A2 a2, A3 a3, A4 a4);

/// A value exported by a module
#[derive(Clone)]
pub struct ValueSymbol {
    ty: TypeDesc,
    value: Arc<dyn Any + Send + Sync>,
}

impl ValueSymbol {
    /// Type of the boxed value
    pub fn type_desc(&self) -> TypeDesc {
        self.ty
    }

    /// Shared handle to the boxed value
    pub fn get(&self) -> Arc<dyn Any + Send + Sync> {
        Arc::clone(&self.value)
    }
}

impl fmt::Debug for ValueSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueSymbol").field("ty", &self.ty).finish()
    }
}

/// A named export of a module
#[derive(Clone, Debug)]
pub enum Symbol {
    /// A callable
    Function(Function),
    /// A value behind a shared reference
    Value(ValueSymbol),
}

impl Symbol {
    /// Export a closure
    pub fn function<Args, F: IntoFunction<Args>>(f: F) -> Self {
        Symbol::Function(f.into_function())
    }

    /// Export a plain value; it is boxed behind a shared reference
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Symbol::Value(ValueSymbol {
            ty: TypeDesc::of::<T>(),
            value: Arc::new(value),
        })
    }

    /// The symbol's shape
    pub fn shape(&self) -> Shape {
        match self {
            Symbol::Function(f) => f.shape(),
            Symbol::Value(v) => Shape::Value(v.ty),
        }
    }

    /// Borrow the callable, if this symbol is one
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Symbol::Function(f) => Some(f),
            Symbol::Value(_) => None,
        }
    }

    /// Take the callable, if this symbol is one
    pub fn into_function(self) -> Option<Function> {
        match self {
            Symbol::Function(f) => Some(f),
            Symbol::Value(_) => None,
        }
    }

    /// Borrow the boxed value as `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Symbol::Value(v) => v.value.downcast_ref::<T>(),
            Symbol::Function(_) => None,
        }
    }
}

impl From<Function> for Symbol {
    fn from(f: Function) -> Self {
        Symbol::Function(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoxError;

    #[test]
    fn test_function_shape() {
        let f = Function::new(|x: u32, s: String| (format!("{s}{x}"), Ok(()) as Fallible));
        assert_eq!(f.inputs(), &[TypeDesc::of::<u32>(), TypeDesc::of::<String>()]);
        assert_eq!(f.outputs().len(), 2);
        assert_eq!(f.value_outputs(), 1);
        assert!(!f.only_errors());
    }

    #[test]
    fn test_function_call() {
        let f = Function::new(|x: u32| (x * 2,));
        let x: Arg<'_> = &21u32;
        let values = f.call(&[x]).unwrap();
        assert_eq!(values[0].downcast_ref::<u32>(), Some(&42));
    }

    #[test]
    fn test_function_call_wrong_arity() {
        let f = Function::new(|x: u32| (x,));
        let err = f.call(&[]).unwrap_err();
        assert!(matches!(err, Error::Call(_)));
    }

    #[test]
    fn test_function_call_wrong_type() {
        let f = Function::new(|x: u32| (x,));
        let s = "nope".to_string();
        let err = f.call(&[&s as Arg<'_>]).unwrap_err();
        assert!(err.to_string().contains("u32"));
    }

    #[test]
    fn test_error_only_function() {
        let f = Function::new(|| -> Fallible { Err("boom".into()) });
        assert!(f.only_errors());
        let mut values = f.call(&[]).unwrap();
        let failure = take_failure(values.remove(0));
        assert_eq!(failure.unwrap_err().to_string(), "boom");

        let g = Function::new(|| ());
        assert!(g.only_errors());
        assert!(g.outputs().is_empty());
    }

    #[test]
    fn test_value_symbol() {
        let symbol = Symbol::value(12i32);
        assert_eq!(symbol.shape(), Shape::Value(TypeDesc::of::<i32>()));
        assert_eq!(symbol.downcast_ref::<i32>(), Some(&12));
        assert!(symbol.as_function().is_none());
    }

    #[test]
    fn test_take_failure_ignores_other_values() {
        assert!(take_failure(Box::new(5u8)).is_ok());
        let err: BoxError = "bad".into();
        assert!(take_failure(Box::new(Err(err) as Fallible)).is_err());
    }
}

//! Runtime type descriptors and call shapes

use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Boxed, thread-safe error used for foreign and plugin-produced failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The canonical error-shaped output type.
///
/// A function output of this type is the failure indicator for its call:
/// `Ok(())` means success and `Err(_)` carries the failure.
pub type Fallible = Result<(), BoxError>;

/// Cancellation context handed to lifecycle hooks
pub type Context = tokio_util::sync::CancellationToken;

/// Descriptor of [`Fallible`], shared by every shape check in the process.
pub static ERROR_TYPE: Lazy<TypeDesc> = Lazy::new(TypeDesc::of::<Fallible>);

/// Descriptor of [`Context`].
pub static CONTEXT_TYPE: Lazy<TypeDesc> = Lazy::new(TypeDesc::of::<Context>);

/// Runtime descriptor of a Rust type.
///
/// Two descriptors are equal when they describe the same [`TypeId`]; the
/// name is carried for diagnostics only.
#[derive(Clone, Copy)]
pub struct TypeDesc {
    id: TypeId,
    name: &'static str,
}

impl TypeDesc {
    /// Describe `T`
    pub fn of<T: ?Sized + Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The underlying [`TypeId`]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Human-readable type name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this descriptor describes `T`
    pub fn is<T: ?Sized + Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Whether this is the canonical error-shaped type
    pub fn is_error(&self) -> bool {
        *self == *ERROR_TYPE
    }

    /// Whether this is the lifecycle context type
    pub fn is_context(&self) -> bool {
        *self == *CONTEXT_TYPE
    }
}

impl PartialEq for TypeDesc {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDesc {}

impl Hash for TypeDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl TypeDesc {
    fn display_name(&self) -> &'static str {
        if self.is_error() {
            "Fallible"
        } else if self.is_context() {
            "Context"
        } else {
            self.name
        }
    }
}

/// Introspectable shape of a symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// A callable with ordered input and output types
    Function {
        /// Parameter types
        inputs: Vec<TypeDesc>,
        /// Output types
        outputs: Vec<TypeDesc>,
    },

    /// A plain value; not callable
    Value(TypeDesc),
}

impl Shape {
    /// Whether the symbol can be called
    pub fn is_callable(&self) -> bool {
        matches!(self, Shape::Function { .. })
    }

    /// Number of outputs, or `None` for values
    pub fn num_outputs(&self) -> Option<usize> {
        match self {
            Shape::Function { outputs, .. } => Some(outputs.len()),
            Shape::Value(_) => None,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Function { inputs, outputs } => {
                f.write_str("fn(")?;
                for (i, input) in inputs.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{input}")?;
                }
                f.write_str(")")?;
                match outputs.as_slice() {
                    [] => Ok(()),
                    [single] => write!(f, " -> {single}"),
                    many => {
                        f.write_str(" -> (")?;
                        for (i, output) in many.iter().enumerate() {
                            if i > 0 {
                                f.write_str(", ")?;
                            }
                            write!(f, "{output}")?;
                        }
                        f.write_str(")")
                    }
                }
            }
            Shape::Value(ty) => write!(f, "value of type {ty}"),
        }
    }
}

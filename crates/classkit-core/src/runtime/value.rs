//! Dynamic value type.

use std::fmt;

use crate::entries::{ClassRef, ModuleRef, ObjectRef};
use crate::error::{InstanceError, NativeError, Result};

use super::NativeFn;

/// A dynamically typed value.
///
/// Everything that flows through fields, arguments, return values, class
/// attributes and namespace bindings is a `Value`. Classes, objects and modules
/// are shared handles, so cloning a `Value` never deep-copies them.
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value
    #[default]
    Nil,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value (owned)
    Str(String),
    /// Callable
    Function(NativeFn),
    /// Class descriptor
    Class(ClassRef),
    /// Live object
    Object(ObjectRef),
    /// Module namespace
    Module(ModuleRef),
}

impl Value {
    /// Get a human-readable name for this value's type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Function(_) => "function",
            Value::Class(_) => "class",
            Value::Object(_) => "object",
            Value::Module(_) => "module",
        }
    }

    /// Check if this value is nil.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Check if this value can be called.
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Class(_))
    }

    /// Borrow the string payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get the integer payload, if any.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the callable payload, if any.
    pub fn as_function(&self) -> Option<&NativeFn> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Get the class payload, if any.
    pub fn as_class(&self) -> Option<&ClassRef> {
        match self {
            Value::Class(c) => Some(c),
            _ => None,
        }
    }

    /// Get the object payload, if any.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Get the module payload, if any.
    pub fn as_module(&self) -> Option<&ModuleRef> {
        match self {
            Value::Module(m) => Some(m),
            _ => None,
        }
    }

    /// Call this value.
    ///
    /// Functions are called without a receiver, classes are instantiated, and
    /// objects dispatch to their `__call` hook.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        match self {
            Value::Function(f) => f.invoke(None, args),
            Value::Class(c) => c.call(args).map(Value::Object),
            Value::Object(o) => o.apply_operator(crate::Operator::Call, args),
            other => Err(InstanceError::NotCallable {
                type_name: other.type_name(),
            }
            .into()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Bool(v) => write!(f, "Bool({})", v),
            Value::Int(v) => write!(f, "Int({})", v),
            Value::Float(v) => write!(f, "Float({})", v),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Function(func) => write!(f, "Function({})", func.id),
            Value::Class(c) => write!(f, "Class({})", c.name()),
            Value::Object(o) => write!(f, "Object({})", o.class().name()),
            Value::Module(m) => write!(f, "Module({})", m.name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.same_body(b),
            (Value::Class(a), Value::Class(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Module(a), Value::Module(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<NativeFn> for Value {
    fn from(v: NativeFn) -> Self {
        Value::Function(v)
    }
}

impl From<ClassRef> for Value {
    fn from(v: ClassRef) -> Self {
        Value::Class(v)
    }
}

impl From<ObjectRef> for Value {
    fn from(v: ObjectRef) -> Self {
        Value::Object(v)
    }
}

impl From<ModuleRef> for Value {
    fn from(v: ModuleRef) -> Self {
        Value::Module(v)
    }
}

/// Typed extraction from a [`Value`], used by `CallContext::arg`.
pub trait FromValue: Sized {
    /// Convert, failing with a type mismatch.
    fn from_value(value: &Value) -> std::result::Result<Self, NativeError>;
}

macro_rules! impl_from_value {
    ($ty:ty, $expected:literal, $pat:pat => $out:expr) => {
        impl FromValue for $ty {
            fn from_value(value: &Value) -> std::result::Result<Self, NativeError> {
                match value {
                    $pat => Ok($out),
                    other => Err(NativeError::TypeMismatch {
                        expected: $expected,
                        actual: other.type_name(),
                    }),
                }
            }
        }
    };
}

impl_from_value!(bool, "bool", Value::Bool(v) => *v);
impl_from_value!(i64, "int", Value::Int(v) => *v);
impl_from_value!(f64, "float", Value::Float(v) => *v);
impl_from_value!(String, "string", Value::Str(v) => v.clone());
impl_from_value!(NativeFn, "function", Value::Function(v) => v.clone());
impl_from_value!(ClassRef, "class", Value::Class(v) => v.clone());
impl_from_value!(ObjectRef, "object", Value::Object(v) => v.clone());
impl_from_value!(ModuleRef, "module", Value::Module(v) => v.clone());

impl FromValue for Value {
    fn from_value(value: &Value) -> std::result::Result<Self, NativeError> {
        Ok(value.clone())
    }
}

//! Call context bridging the metamodel and user callables.

use std::fmt;

use crate::entries::ObjectRef;
use crate::error::NativeError;

use super::{FromValue, Value};

/// Context for a single call.
///
/// Methods receive the object they were called on as the receiver; static
/// methods, module functions and hooks called without an object have none.
///
/// ## Typed Argument Access
///
/// ```ignore
/// let name: String = ctx.arg(0)?;
/// let count: i64 = ctx.arg(1)?;
/// ```
pub struct CallContext<'a> {
    /// Receiver, if this is a method call
    this: Option<&'a Value>,
    /// Positional arguments
    args: &'a [Value],
}

impl<'a> CallContext<'a> {
    /// Create a new call context.
    pub fn new(this: Option<&'a Value>, args: &'a [Value]) -> Self {
        Self { this, args }
    }

    /// Get the number of arguments (excluding the receiver).
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// All positional arguments.
    pub fn args(&self) -> &'a [Value] {
        self.args
    }

    /// Get a raw reference to an argument.
    pub fn arg_value(&self, index: usize) -> Result<&'a Value, NativeError> {
        self.args
            .get(index)
            .ok_or(NativeError::ArgumentIndexOutOfBounds {
                index,
                count: self.arg_count(),
            })
    }

    /// Get a typed argument.
    pub fn arg<T: FromValue>(&self, index: usize) -> Result<T, NativeError> {
        T::from_value(self.arg_value(index)?)
    }

    /// Get an argument, or nil if it was not passed.
    pub fn arg_or_nil(&self, index: usize) -> Value {
        self.args.get(index).cloned().unwrap_or_default()
    }

    /// Get the raw receiver.
    pub fn this_value(&self) -> Option<&'a Value> {
        self.this
    }

    /// Get the receiver as an object.
    ///
    /// # Errors
    ///
    /// Returns [`NativeError::MissingReceiver`] for receiver-less calls and a
    /// type mismatch if the receiver is not an object.
    pub fn this(&self) -> Result<&'a ObjectRef, NativeError> {
        match self.this {
            Some(Value::Object(object)) => Ok(object),
            Some(other) => Err(NativeError::TypeMismatch {
                expected: "object",
                actual: other.type_name(),
            }),
            None => Err(NativeError::MissingReceiver),
        }
    }
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("has_receiver", &self.this.is_some())
            .field("arg_count", &self.arg_count())
            .finish()
    }
}

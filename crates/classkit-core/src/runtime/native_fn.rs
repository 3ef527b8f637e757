//! Callable storage.

use std::fmt;
use std::rc::Rc;

use crate::BodyHash;
use crate::error::Result;

use super::{CallContext, Value};

/// Type-erased callable used for methods, static methods, module functions,
/// observers' payloads and hooks.
///
/// Each `NativeFn` carries a [`BodyHash`] identifying its body. Clones share
/// both the callable and the identity, so a method copied down into a subclass
/// or mixed into another class compares identical to its source.
#[derive(Clone)]
pub struct NativeFn {
    /// Identity of the body, compared by redefinition checks
    pub id: BodyHash,
    inner: Rc<dyn NativeCallable>,
}

impl NativeFn {
    /// Wrap a callable under a fresh identity.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<Value> + 'static,
    {
        Self {
            id: BodyHash::unique(),
            inner: Rc::new(f),
        }
    }

    /// Wrap a callable whose identity is derived from its body text.
    ///
    /// Two callables built from the same text are treated as the same body,
    /// which lets a class be re-declared from unchanged source.
    pub fn with_body<F>(body: &str, f: F) -> Self
    where
        F: Fn(&mut CallContext<'_>) -> Result<Value> + 'static,
    {
        Self {
            id: BodyHash::from_body(body),
            inner: Rc::new(f),
        }
    }

    /// Call with a prepared context.
    pub fn call(&self, ctx: &mut CallContext<'_>) -> Result<Value> {
        self.inner.call(ctx)
    }

    /// Call with an optional receiver and positional arguments.
    pub fn invoke(&self, this: Option<Value>, args: &[Value]) -> Result<Value> {
        let mut ctx = CallContext::new(this.as_ref(), args);
        self.call(&mut ctx)
    }

    /// Check if both callables share a body identity.
    pub fn same_body(&self, other: &NativeFn) -> bool {
        self.id == other.id
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Trait for callables.
pub trait NativeCallable {
    /// Call this function with the given context.
    fn call(&self, ctx: &mut CallContext<'_>) -> Result<Value>;
}

impl<F> NativeCallable for F
where
    F: Fn(&mut CallContext<'_>) -> Result<Value>,
{
    fn call(&self, ctx: &mut CallContext<'_>) -> Result<Value> {
        (self)(ctx)
    }
}

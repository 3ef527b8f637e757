//! Values and callables.
//!
//! ## Key Types
//!
//! - [`Value`]: dynamically typed value (primitives, functions, classes, objects, modules)
//! - [`NativeFn`]: type-erased callable with a body identity
//! - [`CallContext`]: receiver and arguments for one call

mod call_context;
mod native_fn;
mod value;

pub use call_context::CallContext;
pub use native_fn::{NativeCallable, NativeFn};
pub use value::{FromValue, Value};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, InstanceError, NativeError};

    fn add() -> NativeFn {
        NativeFn::new(|ctx: &mut CallContext<'_>| {
            let a: i64 = ctx.arg(0)?;
            let b: i64 = ctx.arg(1)?;
            Ok(Value::Int(a + b))
        })
    }

    #[test]
    fn value_type_names() {
        assert_eq!(Value::Nil.type_name(), "nil");
        assert_eq!(Value::Int(0).type_name(), "int");
        assert_eq!(Value::Float(0.0).type_name(), "float");
        assert_eq!(Value::Bool(false).type_name(), "bool");
        assert_eq!(Value::from("").type_name(), "string");
        assert_eq!(Value::from(add()).type_name(), "function");
    }

    #[test]
    fn value_default_is_nil() {
        assert!(Value::default().is_nil());
    }

    #[test]
    fn native_fn_call_with_args() {
        let result = add().invoke(None, &[Value::Int(2), Value::Int(3)]).unwrap();
        assert_eq!(result, Value::Int(5));
    }

    #[test]
    fn native_fn_argument_errors() {
        let err = add().invoke(None, &[Value::Int(2)]).unwrap_err();
        assert_eq!(
            err,
            Error::Native(NativeError::ArgumentIndexOutOfBounds { index: 1, count: 1 })
        );

        let err = add()
            .invoke(None, &[Value::Int(2), Value::from("x")])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Native(NativeError::TypeMismatch { expected: "int", actual: "string" })
        ));
    }

    #[test]
    fn missing_receiver() {
        let f = NativeFn::new(|ctx: &mut CallContext<'_>| {
            ctx.this()?;
            Ok(Value::Nil)
        });
        assert_eq!(
            f.invoke(None, &[]).unwrap_err(),
            Error::Native(NativeError::MissingReceiver)
        );
    }

    #[test]
    fn body_identity() {
        let a = NativeFn::with_body("return 1", |_: &mut CallContext<'_>| Ok(Value::Int(1)));
        let b = NativeFn::with_body("return 1", |_: &mut CallContext<'_>| Ok(Value::Int(1)));
        let c = add();

        assert!(a.same_body(&b));
        assert!(!a.same_body(&c));
        assert!(c.same_body(&c.clone()));
        assert_eq!(Value::from(a), Value::from(b));
    }

    #[test]
    fn calling_plain_values_fails() {
        let err = Value::Int(1).call(&[]).unwrap_err();
        assert_eq!(
            err,
            Error::Instance(InstanceError::NotCallable { type_name: "int" })
        );
    }
}

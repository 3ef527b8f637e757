//! Serialization hook surface.
//!
//! classkit does not define a wire format. A serializer needs three things
//! from the object model, all provided here: the class name of an object, a
//! class by name ([`Runtime::get_class`]), and the serialization hooks a class
//! declares.
//!
//! [`Snapshot`] shows the protocol end to end: the `__serialize` method is used
//! when the class defines one, otherwise the plain fields are recorded under a
//! class-name tag. Restoring resolves the tag through the runtime and either
//! calls the class's `__deserialize` static or repopulates the fields.

use classkit_core::{
    ClassRef, InstanceError, NativeError, NativeFn, ObjectRef, Result, Value,
};

use crate::runtime::Runtime;

/// Method that turns an instance into a payload value.
pub const SERIALIZE_HOOK: &str = "__serialize";

/// Static method that builds an instance from a payload value.
pub const DESERIALIZE_HOOK: &str = "__deserialize";

/// The qualified class name of an object.
pub fn class_name_of(object: &ObjectRef) -> String {
    object.class().name()
}

/// Serialization hooks declared by a class.
#[derive(Debug, Clone, Default)]
pub struct SerializationHooks {
    /// The `__serialize` method, called with the instance as receiver.
    pub serialize: Option<NativeFn>,
    /// The `__deserialize` static, called with the payload.
    pub deserialize: Option<NativeFn>,
}

impl SerializationHooks {
    /// Check if the class declares neither hook.
    pub fn is_empty(&self) -> bool {
        self.serialize.is_none() && self.deserialize.is_none()
    }
}

/// Look up the serialization hooks a class declares.
pub fn hooks_for(class: &ClassRef) -> SerializationHooks {
    SerializationHooks {
        serialize: class.method(SERIALIZE_HOOK),
        deserialize: class.static_method(DESERIALIZE_HOOK),
    }
}

/// What a snapshot recorded for the object.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// The value returned by the class's `__serialize` hook.
    Hook(Value),
    /// The object's fields, sorted by name.
    Fields(Vec<(String, Value)>),
}

/// A class-tagged capture of one object.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Qualified name of the object's class.
    pub class: String,
    /// The recorded state.
    pub payload: Payload,
}

impl Snapshot {
    /// Capture an object, preferring its class's `__serialize` hook.
    ///
    /// # Errors
    ///
    /// Whatever the `__serialize` hook raises.
    pub fn capture(object: &ObjectRef) -> Result<Snapshot> {
        let class = object.class();
        let payload = match hooks_for(&class).serialize {
            Some(hook) => Payload::Hook(hook.invoke(Some(Value::Object(object.clone())), &[])?),
            None => Payload::Fields(object.fields()),
        };
        Ok(Snapshot {
            class: class.name(),
            payload,
        })
    }
}

impl Runtime {
    /// Rebuild an object from a snapshot.
    ///
    /// Field payloads are written straight into a freshly allocated object; the
    /// constructor does not run. Hook payloads are handed to the class's
    /// `__deserialize` static, which must return an instance.
    ///
    /// # Errors
    ///
    /// - any error from resolving the class name
    /// - [`InstanceError::NoSuchMethod`] for a hook payload when the class has
    ///   no `__deserialize` static
    /// - [`NativeError::TypeMismatch`] if `__deserialize` returns a non-object
    pub fn restore(&self, snapshot: &Snapshot) -> Result<ObjectRef> {
        let class = self.get_class(&snapshot.class)?;
        match &snapshot.payload {
            Payload::Fields(fields) => {
                let object = class.allocate();
                for (name, value) in fields {
                    object.set_field(name, value.clone());
                }
                Ok(object)
            }
            Payload::Hook(value) => {
                let hook = hooks_for(&class).deserialize.ok_or_else(|| {
                    InstanceError::NoSuchMethod {
                        class: class.name(),
                        method: DESERIALIZE_HOOK.to_string(),
                    }
                })?;
                match hook.invoke(None, &[Value::Class(class.clone()), value.clone()])? {
                    Value::Object(object) => Ok(object),
                    other => Err(NativeError::TypeMismatch {
                        expected: "object",
                        actual: other.type_name(),
                    }
                    .into()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use classkit_core::{CallContext, Error};

    #[test]
    fn fields_round_trip_without_constructor() {
        let runtime = Runtime::new();
        let point = runtime.class("Point").unwrap();
        point
            .define_method(
                "init",
                NativeFn::new(|ctx: &mut CallContext<'_>| {
                    ctx.this()?.set("x", Value::Int(1))?;
                    ctx.this()?.set("created", Value::Bool(true))?;
                    Ok(Value::Nil)
                }),
            )
            .unwrap();

        let p = point.instantiate(&[]).unwrap();
        p.set("x", Value::Int(9)).unwrap();
        let snapshot = Snapshot::capture(&p).unwrap();
        assert_eq!(snapshot.class, "Point");

        let restored = runtime.restore(&snapshot).unwrap();
        assert!(!restored.ptr_eq(&p));
        assert_eq!(restored.get("x").unwrap(), Value::Int(9));
        assert_eq!(restored.fields(), p.fields());
    }

    #[test]
    fn hooks_are_preferred() {
        let runtime = Runtime::new();
        let token = runtime.class("Token").unwrap();
        token
            .define_method(
                SERIALIZE_HOOK,
                NativeFn::new(|ctx: &mut CallContext<'_>| ctx.this()?.get("text")),
            )
            .unwrap();
        token
            .define_static_method(
                DESERIALIZE_HOOK,
                NativeFn::new(|ctx: &mut CallContext<'_>| {
                    let class: ClassRef = ctx.arg(0)?;
                    let object = class.allocate();
                    object.set("text", ctx.arg_value(1)?.clone())?;
                    object.set("restored", Value::Bool(true))?;
                    Ok(Value::Object(object))
                }),
            )
            .unwrap();

        let hooks = hooks_for(&token);
        assert!(hooks.serialize.is_some() && hooks.deserialize.is_some());

        let t = token.instantiate(&[]).unwrap();
        t.set("text", Value::from("abc")).unwrap();
        let snapshot = Snapshot::capture(&t).unwrap();
        assert_eq!(snapshot.payload, Payload::Hook(Value::from("abc")));

        let restored = runtime.restore(&snapshot).unwrap();
        assert_eq!(class_name_of(&restored), "Token");
        assert_eq!(restored.get("restored").unwrap(), Value::Bool(true));
    }

    #[test]
    fn hook_payload_needs_deserializer() {
        let runtime = Runtime::new();
        runtime.class("Opaque").unwrap();
        let snapshot = Snapshot {
            class: "Opaque".into(),
            payload: Payload::Hook(Value::Int(1)),
        };
        assert!(matches!(
            runtime.restore(&snapshot),
            Err(Error::Instance(InstanceError::NoSuchMethod { .. }))
        ));
    }

    #[test]
    fn unknown_class_tag() {
        let runtime = Runtime::new();
        let snapshot = Snapshot {
            class: "Gone".into(),
            payload: Payload::Fields(Vec::new()),
        };
        assert!(runtime.restore(&snapshot).is_err());
        assert!(hooks_for(&runtime.class("Plain").unwrap()).is_empty());
    }
}

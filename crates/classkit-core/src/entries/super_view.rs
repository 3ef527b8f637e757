//! Parent-dispatch view.

use crate::error::{InstanceError, Result};
use crate::runtime::{NativeFn, Value};

use super::{ClassRef, ObjectRef};

/// Read-only view over a class's parent methods.
///
/// The receiver is never implicit: every call names the instance explicitly.
/// The view records only the child's name, so capturing it inside one of the
/// child's own methods does not create a reference cycle.
#[derive(Debug, Clone)]
pub struct SuperView {
    class: String,
    parent: Option<ClassRef>,
}

impl SuperView {
    pub(crate) fn new(class: String, parent: Option<ClassRef>) -> Self {
        Self { class, parent }
    }

    /// The class whose parent this view dispatches to.
    pub fn class_name(&self) -> &str {
        &self.class
    }

    /// Check if the parent defines `name`.
    pub fn has(&self, name: &str) -> bool {
        self.parent.as_ref().is_some_and(|p| p.has_method(name))
    }

    /// Get the parent's implementation of `name`.
    ///
    /// # Errors
    ///
    /// [`InstanceError::NoSuchSuperMethod`] if there is no parent or it lacks `name`.
    pub fn get(&self, name: &str) -> Result<NativeFn> {
        self.parent
            .as_ref()
            .and_then(|p| p.method(name))
            .ok_or_else(|| {
                InstanceError::NoSuchSuperMethod {
                    class: self.class.clone(),
                    method: name.to_string(),
                }
                .into()
            })
    }

    /// Call the parent's implementation of `name` on `this`.
    pub fn call(&self, name: &str, this: &ObjectRef, args: &[Value]) -> Result<Value> {
        self.get(name)?
            .invoke(Some(Value::Object(this.clone())), args)
    }

    /// Writes are rejected.
    ///
    /// # Errors
    ///
    /// Always [`InstanceError::ImmutableView`].
    pub fn set(&self, name: &str, _method: NativeFn) -> Result<()> {
        Err(InstanceError::ImmutableView {
            class: self.class.clone(),
            method: name.to_string(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entries::CONSTRUCTOR;
    use crate::error::Error;
    use crate::events::EventRegistry;
    use crate::runtime::CallContext;

    #[test]
    fn dispatches_to_parent_implementation() {
        let events = EventRegistry::new();
        let base = ClassRef::construct("Base", None, &events).unwrap();
        base.define_method(
            "describe",
            NativeFn::new(|_: &mut CallContext<'_>| Ok(Value::from("base"))),
        )
        .unwrap();

        let child = ClassRef::construct("Child", Some(&base), &events).unwrap();
        child
            .define_method(
                "describe",
                NativeFn::new(|_: &mut CallContext<'_>| Ok(Value::from("child"))),
            )
            .unwrap();

        let object = child.instantiate(&[]).unwrap();
        let view = child.super_view();
        assert_eq!(object.call_method("describe", &[]).unwrap(), Value::from("child"));
        assert_eq!(view.call("describe", &object, &[]).unwrap(), Value::from("base"));
        assert!(view.has("describe"));
        assert!(!view.has(CONSTRUCTOR));
    }

    #[test]
    fn unknown_and_parentless() {
        let events = EventRegistry::new();
        let root = ClassRef::construct("Root", None, &events).unwrap();
        let view = root.super_view();
        assert!(matches!(
            view.get("anything"),
            Err(Error::Instance(InstanceError::NoSuchSuperMethod { .. }))
        ));
    }

    #[test]
    fn writes_are_rejected() {
        let events = EventRegistry::new();
        let base = ClassRef::construct("Base", None, &events).unwrap();
        let child = ClassRef::construct("Child", Some(&base), &events).unwrap();
        let err = child
            .super_view()
            .set("x", NativeFn::new(|_: &mut CallContext<'_>| Ok(Value::Nil)))
            .unwrap_err();
        assert!(matches!(err, Error::Instance(InstanceError::ImmutableView { .. })));
    }
}

//! Live objects.
//!
//! An [`ObjectRef`] is bound to exactly one class for its whole life and owns
//! its field data. Member access goes through an explicit resolution order:
//!
//! 1. the object's own fields
//! 2. the class's flattened method table, operator hooks included
//! 3. class attributes
//! 4. the class's `__index` catch-all hook, if defined
//!
//! Operator hook names stop after step 2: an undefined hook is never answered
//! by a class attribute or by `__index`. Anything still unresolved reads as
//! [`Value::Nil`], unless the object is strict.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{InstanceError, Result};
use crate::operator::Operator;
use crate::runtime::Value;

use super::ClassRef;

/// Shared handle to a live object.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<ObjectData>>);

struct ObjectData {
    /// Exact runtime class, fixed at construction.
    class: ClassRef,
    /// Instance fields.
    fields: FxHashMap<String, Value>,
    /// Names accessible after `strict()`; `None` while not strict.
    strict: Option<FxHashSet<String>>,
}

impl ObjectRef {
    pub(crate) fn new(class: ClassRef) -> Self {
        ObjectRef(Rc::new(RefCell::new(ObjectData {
            class,
            fields: FxHashMap::default(),
            strict: None,
        })))
    }

    /// The object's exact class.
    pub fn class(&self) -> ClassRef {
        self.0.borrow().class.clone()
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// True if the object's class is `class` or a descendant of it.
    pub fn is_instance_of(&self, class: &ClassRef) -> bool {
        self.class().is_subclass_of(class)
    }

    // ==========================================================================
    // Resolution
    // ==========================================================================

    /// Read a member.
    ///
    /// # Errors
    ///
    /// - [`InstanceError::StrictnessViolation`] on a strict object for a name
    ///   that was not resolvable when `strict()` was called
    /// - any error raised by the `__index` hook
    pub fn get(&self, name: &str) -> Result<Value> {
        self.check_strict(name)?;
        Ok(self.resolve(name)?.unwrap_or_default())
    }

    /// Resolve a member, returning `None` when nothing provides it.
    ///
    /// Unlike [`get`](Self::get), this does not consult strict mode.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn resolve(&self, name: &str) -> Result<Option<Value>> {
        let (class, field) = {
            let data = self.0.borrow();
            (data.class.clone(), data.fields.get(name).cloned())
        };
        if field.is_some() {
            return Ok(field);
        }

        if let Some(method) = class.method(name) {
            return Ok(Some(Value::Function(method)));
        }
        if Operator::from_method_name(name).is_some() {
            return Ok(None);
        }

        if let Some(attribute) = class.class_attribute(name) {
            return Ok(Some(attribute));
        }

        if let Some(index) = class.method(Operator::Index.method_name()) {
            tracing::trace!(class = %class.name(), key = name, "falling back to __index");
            let value = index.invoke(Some(Value::Object(self.clone())), &[Value::from(name)])?;
            if !value.is_nil() {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Write a member.
    ///
    /// Existing fields are overwritten directly. A new name goes through the
    /// class's `__newindex` hook if it defines one, and becomes a field otherwise.
    ///
    /// # Errors
    ///
    /// - [`InstanceError::StrictnessViolation`] on a strict object for a name
    ///   that was not resolvable when `strict()` was called
    /// - any error raised by the `__newindex` hook
    pub fn set(&self, name: &str, value: Value) -> Result<()> {
        self.check_strict(name)?;

        let hook = {
            let data = self.0.borrow();
            if data.fields.contains_key(name) {
                None
            } else {
                data.class.method(Operator::NewIndex.method_name())
            }
        };

        match hook {
            Some(hook) => {
                hook.invoke(
                    Some(Value::Object(self.clone())),
                    &[Value::from(name), value],
                )?;
            }
            None => {
                self.0.borrow_mut().fields.insert(name.to_string(), value);
            }
        }
        Ok(())
    }

    /// Read a field directly, bypassing methods and hooks.
    pub fn field(&self, name: &str) -> Option<Value> {
        self.0.borrow().fields.get(name).cloned()
    }

    /// Write a field directly, bypassing hooks and strict mode.
    pub fn set_field(&self, name: &str, value: Value) {
        self.0.borrow_mut().fields.insert(name.to_string(), value);
    }

    /// Snapshot of all fields, sorted by name.
    pub fn fields(&self) -> Vec<(String, Value)> {
        let mut fields: Vec<(String, Value)> = self
            .0
            .borrow()
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));
        fields
    }

    // ==========================================================================
    // Calls
    // ==========================================================================

    /// Resolve `name` and call it with this object as the receiver.
    ///
    /// # Errors
    ///
    /// [`InstanceError::NoSuchMethod`] if the name does not resolve to a
    /// function; otherwise whatever the method raises.
    pub fn call_method(&self, name: &str, args: &[Value]) -> Result<Value> {
        match self.get(name)? {
            Value::Function(method) => method.invoke(Some(Value::Object(self.clone())), args),
            _ => Err(InstanceError::NoSuchMethod {
                class: self.class().name(),
                method: name.to_string(),
            }
            .into()),
        }
    }

    /// Apply an operator hook with this object as the receiver.
    ///
    /// # Errors
    ///
    /// [`InstanceError::NoSuchMethod`] if the class does not define the hook.
    pub fn apply_operator(&self, op: Operator, args: &[Value]) -> Result<Value> {
        let class = self.class();
        let hook = class
            .method(op.method_name())
            .ok_or_else(|| InstanceError::NoSuchMethod {
                class: class.name(),
                method: op.method_name().to_string(),
            })?;
        hook.invoke(Some(Value::Object(self.clone())), args)
    }

    // ==========================================================================
    // Strict mode
    // ==========================================================================

    /// Restrict this object to the names resolvable right now.
    ///
    /// Affects only this object. Calling it again re-snapshots.
    pub fn strict(&self) {
        let class = self.class();
        let mut allowed: FxHashSet<String> = class.resolvable_names().into_iter().collect();
        let mut data = self.0.borrow_mut();
        allowed.extend(data.fields.keys().cloned());
        data.strict = Some(allowed);
    }

    /// Check if strict mode is active.
    pub fn is_strict(&self) -> bool {
        self.0.borrow().strict.is_some()
    }

    fn check_strict(&self, key: &str) -> Result<()> {
        let data = self.0.borrow();
        match &data.strict {
            Some(allowed) if !allowed.contains(key) => Err(InstanceError::StrictnessViolation {
                class: data.class.name(),
                key: key.to_string(),
            }
            .into()),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        f.debug_struct("ObjectRef")
            .field("class", &data.class.name())
            .field("fields", &data.fields.len())
            .field("strict", &data.strict.is_some())
            .finish()
    }
}

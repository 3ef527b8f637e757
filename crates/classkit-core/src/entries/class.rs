//! Class descriptors.
//!
//! A [`ClassRef`] is a shared handle to one named class: its flattened method
//! table, required and final method sets, class attributes, static methods and
//! optional parent.
//!
//! # Inheritance model
//!
//! Construction copies the parent's methods into the child's own table and
//! unions the parent's required/final sets into the child's. Lookups never walk
//! the parent chain, and later changes to the parent never reach the child.
//! Mixin inclusion works the same way, copying at inclusion time.
//!
//! # Redefinition
//!
//! Each descriptor counts its declarations. When a registry hands an existing
//! descriptor back for a re-declaration, methods defined by an earlier
//! declaration may only be re-defined with an identical body (a no-op); a
//! different body fails with [`ClassError::DuplicateDefinition`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{ClassError, InstanceError, Result};
use crate::events::{Event, EventRegistry};
use crate::naming::is_dotted_identifier;
use crate::runtime::{NativeFn, Value};

use super::{ObjectRef, SuperView};

/// Name of the constructor method.
pub const CONSTRUCTOR: &str = "init";

/// Name reserved in both the class-attribute and static-method namespaces.
pub const RESERVED_STATIC: &str = "static";

/// Built-in class operations. No attribute or static method may use these names.
pub const BUILTIN_OPERATIONS: [&str; 5] =
    ["name", "parent", "is_class_of", "is_subclass_of", "class_is"];

/// Method names rejected as likely misspellings of [`CONSTRUCTOR`].
pub const CONSTRUCTOR_TYPOS: [&str; 6] = [
    "__init",
    "_init",
    "Init",
    "initialize",
    "constructor",
    "__construct",
];

/// Shared handle to a class descriptor.
#[derive(Clone)]
pub struct ClassRef(Rc<RefCell<ClassEntry>>);

/// Registry entry for a class.
struct ClassEntry {
    /// Dot-qualified name.
    name: String,
    /// Parent class (single inheritance).
    parent: Option<ClassRef>,

    // === Members ===
    /// Flattened method table: inherited, mixed-in and own methods.
    methods: FxHashMap<String, NativeFn>,
    /// Methods defined directly on this class, with the declaration that defined them.
    own_methods: FxHashMap<String, u32>,
    /// Shared, non-callable class attributes.
    attributes: FxHashMap<String, Value>,
    /// Static methods (no receiver).
    statics: FxHashMap<String, NativeFn>,
    /// Static methods defined by this class, with the declaration that defined them.
    own_statics: FxHashMap<String, u32>,

    // === Constraints ===
    /// Methods that must exist before instantiation, in declaration order.
    required: Vec<String>,
    /// Methods that may not be redefined here or in descendants/includers.
    finals: FxHashSet<String>,

    // === Composition ===
    /// Included mixins, in inclusion order.
    mixins: Vec<ClassRef>,
    /// Number of declarations this descriptor has been through.
    declaration: u32,

    events: EventRegistry,
}

impl ClassRef {
    /// Construct a new descriptor.
    ///
    /// Copies down the parent's methods and unions in its required/final sets,
    /// then publishes `ClassInitialized`.
    ///
    /// # Errors
    ///
    /// - [`ClassError::InvalidName`] if `name` is not a dotted identifier
    /// - any observer error
    pub fn construct(
        name: &str,
        parent: Option<&ClassRef>,
        events: &EventRegistry,
    ) -> Result<ClassRef> {
        if !is_dotted_identifier(name) {
            return Err(ClassError::InvalidName(format!("'{}'", name)).into());
        }

        let mut entry = ClassEntry {
            name: name.to_string(),
            parent: parent.cloned(),
            methods: FxHashMap::default(),
            own_methods: FxHashMap::default(),
            attributes: FxHashMap::default(),
            statics: FxHashMap::default(),
            own_statics: FxHashMap::default(),
            required: Vec::new(),
            finals: FxHashSet::default(),
            mixins: Vec::new(),
            declaration: 0,
            events: events.clone(),
        };

        if let Some(parent) = parent {
            let parent = parent.0.borrow();
            entry.methods = parent.methods.clone();
            entry.required = parent.required.clone();
            entry.finals = parent.finals.clone();
        }

        events.emit(&Event::ClassInitialized {
            name: name.to_string(),
        })?;
        tracing::debug!(class = name, parent = ?parent.map(ClassRef::name), "constructed class");

        Ok(ClassRef(Rc::new(RefCell::new(entry))))
    }

    /// Open this descriptor for another declaration.
    ///
    /// # Errors
    ///
    /// [`ClassError::DuplicateDefinition`] if `parent` is given and differs from
    /// the recorded parent.
    pub fn redeclare(&self, parent: Option<&ClassRef>) -> Result<()> {
        let mut entry = self.0.borrow_mut();
        if let Some(parent) = parent {
            let same = entry.parent.as_ref().is_some_and(|p| p.ptr_eq(parent));
            if !same {
                return Err(ClassError::DuplicateDefinition {
                    class: entry.name.clone(),
                    member: "parent".into(),
                }
                .into());
            }
        }
        entry.declaration += 1;
        tracing::debug!(class = %entry.name, declaration = entry.declaration, "re-declared class");
        Ok(())
    }

    // ==========================================================================
    // Built-in class operations
    // ==========================================================================

    /// The dot-qualified class name.
    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    /// The parent class, if any.
    pub fn parent(&self) -> Option<ClassRef> {
        self.0.borrow().parent.clone()
    }

    /// True if `self` is `other` or one of its ancestors.
    pub fn is_subclass_of(&self, other: &ClassRef) -> bool {
        let mut current = Some(self.clone());
        while let Some(class) = current {
            if class.ptr_eq(other) {
                return true;
            }
            current = class.parent();
        }
        false
    }

    /// True if `object` is an instance of this class or of a descendant.
    pub fn is_class_of(&self, object: &ObjectRef) -> bool {
        object.class().is_subclass_of(self)
    }

    /// True if this class is exactly the runtime class of `object`.
    pub fn class_is(&self, object: &ObjectRef) -> bool {
        object.class().ptr_eq(self)
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &ClassRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // ==========================================================================
    // Methods
    // ==========================================================================

    /// Define (or override) a method.
    ///
    /// # Errors
    ///
    /// - [`ClassError::ConstructorNaming`] for a misspelled constructor name
    /// - [`ClassError::DuplicateDefinition`] when re-declaring with a different body
    /// - [`ClassError::FinalityViolation`] if the method is final here, including
    ///   finals inherited when the class was created
    /// - any observer error, in which case nothing is installed
    pub fn define_method(&self, name: &str, method: NativeFn) -> Result<()> {
        let class = {
            let entry = self.0.borrow();
            if CONSTRUCTOR_TYPOS.contains(&name) {
                return Err(ClassError::ConstructorNaming {
                    class: entry.name.clone(),
                    name: name.to_string(),
                    expected: CONSTRUCTOR,
                }
                .into());
            }

            if let Some(&defined_in) = entry.own_methods.get(name) {
                if defined_in < entry.declaration {
                    let identical = entry
                        .methods
                        .get(name)
                        .is_some_and(|existing| existing.same_body(&method));
                    if identical {
                        return Ok(());
                    }
                    return Err(ClassError::DuplicateDefinition {
                        class: entry.name.clone(),
                        member: name.to_string(),
                    }
                    .into());
                }
            }

            if entry.finals.contains(name) {
                return Err(ClassError::FinalityViolation {
                    class: entry.name.clone(),
                    method: name.to_string(),
                }
                .into());
            }
            entry.name.clone()
        };

        self.events().emit(&Event::MethodDefined {
            class: class.clone(),
            name: name.to_string(),
            method: method.clone(),
        })?;

        let mut entry = self.0.borrow_mut();
        let declaration = entry.declaration;
        entry.methods.insert(name.to_string(), method);
        entry.own_methods.insert(name.to_string(), declaration);
        tracing::trace!(class = %class, method = name, "defined method");
        Ok(())
    }

    /// Look up a method in the flattened table.
    pub fn method(&self, name: &str) -> Option<NativeFn> {
        self.0.borrow().methods.get(name).cloned()
    }

    /// Check if the flattened table has a method.
    pub fn has_method(&self, name: &str) -> bool {
        self.0.borrow().methods.contains_key(name)
    }

    /// Names in the flattened method table, sorted.
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.borrow().methods.keys().cloned().collect();
        names.sort();
        names
    }

    // ==========================================================================
    // Class attributes and static methods
    // ==========================================================================

    /// Set a class attribute.
    ///
    /// Callable values are not attributes; they are defined as methods instead.
    ///
    /// # Errors
    ///
    /// [`ClassError::NamingConflict`] if the name is reserved, built in, or a
    /// static method.
    pub fn set_class_attribute(&self, name: &str, value: Value) -> Result<()> {
        if let Value::Function(method) = value {
            return self.define_method(name, method);
        }

        let class = {
            let entry = self.0.borrow();
            entry.check_member_name(name, MemberKind::Attribute)?;
            entry.name.clone()
        };

        self.events().emit(&Event::AttributeSet {
            class,
            name: name.to_string(),
            value: value.clone(),
        })?;

        self.0.borrow_mut().attributes.insert(name.to_string(), value);
        Ok(())
    }

    /// Get a class attribute.
    pub fn class_attribute(&self, name: &str) -> Option<Value> {
        self.0.borrow().attributes.get(name).cloned()
    }

    /// Define a static method.
    ///
    /// Follows the same re-declaration rule as [`define_method`](Self::define_method).
    ///
    /// # Errors
    ///
    /// [`ClassError::NamingConflict`] if the name is reserved, built in, or a
    /// class attribute; [`ClassError::DuplicateDefinition`] on an incompatible
    /// re-declaration.
    pub fn define_static_method(&self, name: &str, method: NativeFn) -> Result<()> {
        let mut entry = self.0.borrow_mut();
        entry.check_member_name(name, MemberKind::Static)?;

        if let Some(&defined_in) = entry.own_statics.get(name) {
            if defined_in < entry.declaration {
                let identical = entry
                    .statics
                    .get(name)
                    .is_some_and(|existing| existing.same_body(&method));
                if identical {
                    return Ok(());
                }
                return Err(ClassError::DuplicateDefinition {
                    class: entry.name.clone(),
                    member: name.to_string(),
                }
                .into());
            }
        }

        let declaration = entry.declaration;
        entry.statics.insert(name.to_string(), method);
        entry.own_statics.insert(name.to_string(), declaration);
        Ok(())
    }

    /// Get a static method.
    pub fn static_method(&self, name: &str) -> Option<NativeFn> {
        self.0.borrow().statics.get(name).cloned()
    }

    /// Call a static method without a receiver.
    pub fn call_static(&self, name: &str, args: &[Value]) -> Result<Value> {
        let method = self.static_method(name).ok_or_else(|| InstanceError::NoSuchMethod {
            class: self.name(),
            method: name.to_string(),
        })?;
        method.invoke(None, args)
    }

    /// Look up a class-level member: attribute first, then static method.
    pub fn class_member(&self, name: &str) -> Option<Value> {
        let entry = self.0.borrow();
        entry
            .attributes
            .get(name)
            .cloned()
            .or_else(|| entry.statics.get(name).cloned().map(Value::Function))
    }

    // ==========================================================================
    // Constraints
    // ==========================================================================

    /// Require a method to exist before the class can be instantiated.
    pub fn must_have(&self, name: &str) {
        let mut entry = self.0.borrow_mut();
        if !entry.required.iter().any(|r| r == name) {
            entry.required.push(name.to_string());
        }
    }

    /// Required methods, in declaration order.
    pub fn required_methods(&self) -> Vec<String> {
        self.0.borrow().required.clone()
    }

    /// Mark an already-defined method as final.
    ///
    /// # Errors
    ///
    /// [`ClassError::UnknownMethod`] if the method is not defined yet.
    pub fn mark_final(&self, name: &str) -> Result<()> {
        let mut entry = self.0.borrow_mut();
        if !entry.methods.contains_key(name) {
            return Err(ClassError::UnknownMethod {
                class: entry.name.clone(),
                method: name.to_string(),
            }
            .into());
        }
        entry.finals.insert(name.to_string());
        Ok(())
    }

    /// Check if a method is final in this class.
    pub fn is_final(&self, name: &str) -> bool {
        self.0.borrow().finals.contains(name)
    }

    /// Final methods, sorted.
    pub fn final_methods(&self) -> Vec<String> {
        let mut names: Vec<String> = self.0.borrow().finals.iter().cloned().collect();
        names.sort();
        names
    }

    // ==========================================================================
    // Mixins
    // ==========================================================================

    /// Copy a mixin's methods into this class and union in its constraints.
    ///
    /// Including the same mixin again is a no-op. Inclusion does not make this
    /// class a subclass of the mixin.
    ///
    /// # Errors
    ///
    /// - [`ClassError::SelfInclusion`] if `mixin` is this class
    /// - [`ClassError::MethodConflict`] if any mixin method already exists here;
    ///   nothing is copied in that case
    pub fn include(&self, mixin: &ClassRef) -> Result<()> {
        if mixin.ptr_eq(self) {
            return Err(ClassError::SelfInclusion { class: self.name() }.into());
        }
        if self.includes(mixin) {
            return Ok(());
        }

        let (mixin_name, methods, required, finals) = {
            let other = mixin.0.borrow();
            let mut methods: Vec<(String, NativeFn)> = other
                .methods
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            methods.sort_by(|a, b| a.0.cmp(&b.0));
            (
                other.name.clone(),
                methods,
                other.required.clone(),
                other.finals.clone(),
            )
        };

        let mut entry = self.0.borrow_mut();
        if let Some((conflict, _)) = methods
            .iter()
            .find(|(name, _)| entry.methods.contains_key(name))
        {
            return Err(ClassError::MethodConflict {
                class: entry.name.clone(),
                mixin: mixin_name,
                method: conflict.clone(),
            }
            .into());
        }

        entry.methods.extend(methods);
        for name in required {
            if !entry.required.contains(&name) {
                entry.required.push(name);
            }
        }
        entry.finals.extend(finals);
        entry.mixins.push(mixin.clone());
        tracing::debug!(class = %entry.name, mixin = %mixin_name, "included mixin");
        Ok(())
    }

    /// Check if a mixin was included directly into this class.
    pub fn includes(&self, mixin: &ClassRef) -> bool {
        self.0.borrow().mixins.iter().any(|m| m.ptr_eq(mixin))
    }

    /// Directly included mixins, in inclusion order.
    pub fn mixins(&self) -> Vec<ClassRef> {
        self.0.borrow().mixins.clone()
    }

    // ==========================================================================
    // Parent dispatch and instantiation
    // ==========================================================================

    /// Read-only dispatch view over the parent's methods.
    pub fn super_view(&self) -> SuperView {
        let entry = self.0.borrow();
        SuperView::new(entry.name.clone(), entry.parent.clone())
    }

    /// Create an object and run its constructor.
    ///
    /// # Errors
    ///
    /// - [`InstanceError::AbstractInstantiation`] naming the first missing required method
    /// - any error raised by the constructor
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn instantiate(&self, args: &[Value]) -> Result<ObjectRef> {
        let constructor = {
            let entry = self.0.borrow();
            if let Some(missing) = entry
                .required
                .iter()
                .find(|name| !entry.methods.contains_key(name.as_str()))
            {
                return Err(InstanceError::AbstractInstantiation {
                    class: entry.name.clone(),
                    method: missing.clone(),
                }
                .into());
            }
            entry.methods.get(CONSTRUCTOR).cloned()
        };

        let object = self.allocate();
        if let Some(constructor) = constructor {
            constructor.invoke(Some(Value::Object(object.clone())), args)?;
        }
        Ok(object)
    }

    /// Calling a class instantiates it.
    pub fn call(&self, args: &[Value]) -> Result<ObjectRef> {
        self.instantiate(args)
    }

    /// Allocate an empty object of this class without running the constructor
    /// or checking required methods.
    pub fn allocate(&self) -> ObjectRef {
        ObjectRef::new(self.clone())
    }

    /// The event registry this class publishes through.
    pub fn events(&self) -> EventRegistry {
        self.0.borrow().events.clone()
    }

    /// Names resolvable on instances without a catch-all hook.
    pub(crate) fn resolvable_names(&self) -> Vec<String> {
        let entry = self.0.borrow();
        entry
            .methods
            .keys()
            .chain(entry.attributes.keys())
            .cloned()
            .collect()
    }
}

#[derive(Clone, Copy)]
enum MemberKind {
    Attribute,
    Static,
}

impl ClassEntry {
    fn check_member_name(&self, name: &str, kind: MemberKind) -> Result<()> {
        let existing = if name == RESERVED_STATIC {
            Some("a reserved name")
        } else if BUILTIN_OPERATIONS.contains(&name) {
            Some("a built-in class operation")
        } else {
            match kind {
                MemberKind::Attribute if self.statics.contains_key(name) => Some("a static method"),
                MemberKind::Static if self.attributes.contains_key(name) => {
                    Some("a class attribute")
                }
                _ => None,
            }
        };

        match existing {
            Some(existing) => Err(ClassError::NamingConflict {
                class: self.name.clone(),
                name: name.to_string(),
                existing,
            }
            .into()),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entry = self.0.borrow();
        f.debug_struct("ClassRef")
            .field("name", &entry.name)
            .field("parent", &entry.parent.as_ref().map(ClassRef::name))
            .field("methods", &entry.methods.len())
            .finish_non_exhaustive()
    }
}

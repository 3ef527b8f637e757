//! ClassRegistry - name-keyed store of class descriptors.
//!
//! Registration is an idempotent upsert: declaring a name that is already
//! registered hands back the existing descriptor, opened for another
//! declaration, instead of building a new one. Compatibility of the new
//! declaration is then checked member by member as it defines methods.
//!
//! Names the registry has never seen are resolved through the configured
//! [`NameLoader`]. A loaded class is cached, so the loader runs at most once per
//! name until [`ClassRegistry::deregister`] or [`ClassRegistry::deregister_all`]
//! clears it.
//!
//! # Example
//!
//! ```
//! use classkit_core::EventRegistry;
//! use classkit_registry::{ClassRegistry, Parent};
//!
//! let registry = ClassRegistry::new(&EventRegistry::new());
//! let base = registry.declare("Base", Parent::None).unwrap();
//! let child = registry.declare("Child", Parent::from("Base")).unwrap();
//!
//! assert!(child.is_subclass_of(&base));
//! assert!(registry.get("Child").unwrap().ptr_eq(&child));
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use classkit_core::{
    ClassError, ClassRef, Event, EventRegistry, NameLoader, NullLoader, RegistryError, Result,
    Value, is_dotted_identifier,
};

/// The parent given to a class declaration.
#[derive(Debug, Clone, Default)]
pub enum Parent {
    /// No parent.
    #[default]
    None,
    /// A parent resolved by name through the registry.
    Named(String),
    /// A parent descriptor.
    Class(ClassRef),
}

impl From<&str> for Parent {
    fn from(name: &str) -> Self {
        Parent::Named(name.to_string())
    }
}

impl From<String> for Parent {
    fn from(name: String) -> Self {
        Parent::Named(name)
    }
}

impl From<ClassRef> for Parent {
    fn from(class: ClassRef) -> Self {
        Parent::Class(class)
    }
}

impl From<&ClassRef> for Parent {
    fn from(class: &ClassRef) -> Self {
        Parent::Class(class.clone())
    }
}

impl From<Option<ClassRef>> for Parent {
    fn from(class: Option<ClassRef>) -> Self {
        class.map_or(Parent::None, Parent::Class)
    }
}

#[derive(Default)]
struct RegistryData {
    /// Explicitly registered descriptors.
    classes: FxHashMap<String, ClassRef>,
    /// Descriptors produced by the loader, by requested name.
    loaded: FxHashMap<String, ClassRef>,
}

/// Shared handle to one class registry.
///
/// Clones refer to the same registry. Borrows are never held while the loader
/// or an observer runs, so both may call back into the registry.
#[derive(Clone)]
pub struct ClassRegistry {
    data: Rc<RefCell<RegistryData>>,
    loader: Rc<dyn NameLoader>,
    events: EventRegistry,
}

impl ClassRegistry {
    /// Create an empty registry that knows no names beyond its own.
    pub fn new(events: &EventRegistry) -> Self {
        Self::with_loader(events, Rc::new(NullLoader))
    }

    /// Create an empty registry that resolves unknown names through `loader`.
    pub fn with_loader(events: &EventRegistry, loader: Rc<dyn NameLoader>) -> Self {
        Self {
            data: Rc::new(RefCell::new(RegistryData::default())),
            loader,
            events: events.clone(),
        }
    }

    /// The event registry new descriptors publish through.
    pub fn events(&self) -> &EventRegistry {
        &self.events
    }

    // ==========================================================================
    // Declaration
    // ==========================================================================

    /// Declare a class, constructing and registering it on first declaration.
    ///
    /// Declaring an already registered or loaded name re-opens the existing
    /// descriptor: its attributes survive, identical method bodies may be
    /// defined again, and a different parent is rejected.
    ///
    /// # Errors
    ///
    /// - [`ClassError::InvalidName`] if `name` is not a dotted identifier
    /// - [`ClassError::UnknownClass`] if a named parent cannot be resolved
    /// - [`ClassError::DuplicateDefinition`] if a re-declaration names another parent
    /// - any observer or loader error
    pub fn declare(&self, name: &str, parent: impl Into<Parent>) -> Result<ClassRef> {
        if !is_dotted_identifier(name) {
            return Err(ClassError::InvalidName(format!("'{}'", name)).into());
        }

        let parent = match parent.into() {
            Parent::None => None,
            Parent::Class(class) => Some(class),
            Parent::Named(parent_name) => Some(
                self.lookup(&parent_name)?
                    .ok_or(ClassError::UnknownClass(parent_name))?,
            ),
        };

        if let Some(existing) = self.find(name) {
            existing.redeclare(parent.as_ref())?;
            // A loaded descriptor becomes a registered one.
            if existing.name() == name {
                self.register(name, &existing)?;
            }
            return Ok(existing);
        }

        let class = ClassRef::construct(name, parent.as_ref(), &self.events)?;
        self.register(name, &class)?;
        Ok(class)
    }

    /// Declare a class from untyped values.
    ///
    /// `name` must be a string; `parent` must be nil, a class name or a class.
    ///
    /// # Errors
    ///
    /// - [`ClassError::InvalidName`] if `name` is not a string
    /// - [`ClassError::ParentType`] if `parent` has any other type
    /// - everything [`ClassRegistry::declare`] reports
    pub fn construct_dynamic(&self, name: &Value, parent: &Value) -> Result<ClassRef> {
        let Value::Str(name) = name else {
            return Err(ClassError::InvalidName(format!("a {}", name.type_name())).into());
        };
        let parent = match parent {
            Value::Nil => Parent::None,
            Value::Str(parent_name) => Parent::Named(parent_name.clone()),
            Value::Class(class) => Parent::Class(class.clone()),
            other => {
                return Err(ClassError::ParentType {
                    found: other.type_name(),
                }
                .into());
            }
        };
        self.declare(name, parent)
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Register `class` under `name`.
    ///
    /// Registering the same descriptor twice is a no-op.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::BadName`] if `name` is not a dotted identifier
    /// - [`RegistryError::MismatchedName`] if the descriptor is named differently
    /// - [`RegistryError::DuplicateClass`] if another descriptor owns `name`
    pub fn register(&self, name: &str, class: &ClassRef) -> Result<()> {
        if !is_dotted_identifier(name) {
            return Err(RegistryError::BadName(format!("'{}'", name)).into());
        }

        let actual = class.name();
        if actual != name {
            return Err(RegistryError::MismatchedName {
                expected: name.to_string(),
                actual,
            }
            .into());
        }

        let mut data = self.data.borrow_mut();
        if let Some(existing) = data.classes.get(name) {
            if existing.ptr_eq(class) {
                return Ok(());
            }
            return Err(RegistryError::DuplicateClass(name.to_string()).into());
        }

        data.loaded.remove(name);
        data.classes.insert(name.to_string(), class.clone());
        tracing::debug!(class = name, "registered class");
        Ok(())
    }

    /// Remove one registered class.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotRegistered`] if nothing is registered under `name`.
    pub fn deregister(&self, name: &str) -> Result<ClassRef> {
        let mut data = self.data.borrow_mut();
        data.loaded.remove(name);
        let class = data
            .classes
            .remove(name)
            .ok_or_else(|| RegistryError::NotRegistered(name.to_string()))?;
        tracing::debug!(class = name, "deregistered class");
        Ok(class)
    }

    /// Remove every registered and loaded class.
    pub fn deregister_all(&self) {
        let mut data = self.data.borrow_mut();
        tracing::debug!(count = data.classes.len(), "deregistered all classes");
        data.classes.clear();
        data.loaded.clear();
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    /// Get a class by name, loading it if necessary.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Load`] if the loader fails, does not know the name, or
    /// produces something other than a class.
    pub fn get(&self, name: &str) -> Result<ClassRef> {
        self.lookup(name)?.ok_or_else(|| {
            RegistryError::Load {
                name: name.to_string(),
                reason: "no class by that name".into(),
            }
            .into()
        })
    }

    /// Get a registered or already loaded class without consulting the loader.
    pub fn find(&self, name: &str) -> Option<ClassRef> {
        let data = self.data.borrow();
        data.classes.get(name).or_else(|| data.loaded.get(name)).cloned()
    }

    /// Check if a class is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.data.borrow().classes.contains_key(name)
    }

    /// Registered class names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.data.borrow().classes.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.data.borrow().classes.len()
    }

    /// Check if no class is registered.
    pub fn is_empty(&self) -> bool {
        self.data.borrow().classes.is_empty()
    }

    fn lookup(&self, name: &str) -> Result<Option<ClassRef>> {
        if let Some(class) = self.find(name) {
            return Ok(Some(class));
        }

        tracing::debug!(class = name, "loading class");
        let loaded = self.loader.load(name).map_err(|err| RegistryError::Load {
            name: name.to_string(),
            reason: err.to_string(),
        })?;

        let class = match loaded {
            None => {
                // The loader may have declared the class without returning it.
                return Ok(self.find(name));
            }
            Some(Value::Class(class)) => class,
            Some(other) => {
                return Err(RegistryError::Load {
                    name: name.to_string(),
                    reason: format!("loader produced a {}", other.type_name()),
                }
                .into());
            }
        };

        let actual = class.name();
        if actual != name {
            self.events.emit(&Event::ClassLoadedUnderMismatchedName {
                actual,
                requested: name.to_string(),
            })?;
        }

        let mut data = self.data.borrow_mut();
        if !data.classes.contains_key(name) {
            data.loaded.insert(name.to_string(), class.clone());
        }
        Ok(Some(class))
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRegistry")
            .field("classes", &self.names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use classkit_core::{CallContext, Error, EventKind, NativeFn};

    fn registry() -> ClassRegistry {
        ClassRegistry::new(&EventRegistry::new())
    }

    fn returning(text: &'static str) -> NativeFn {
        NativeFn::with_body(text, move |_: &mut CallContext<'_>| Ok(Value::from(text)))
    }

    #[test]
    fn declare_registers() {
        let registry = registry();
        let foo = registry.declare("Foo", Parent::None).unwrap();
        assert!(registry.contains("Foo"));
        assert!(registry.get("Foo").unwrap().ptr_eq(&foo));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn declare_with_named_parent() {
        let registry = registry();
        let base = registry.declare("Base", Parent::None).unwrap();
        let child = registry.declare("Child", "Base").unwrap();
        assert!(child.parent().unwrap().ptr_eq(&base));

        assert!(matches!(
            registry.declare("Orphan", "Missing"),
            Err(Error::Class(ClassError::UnknownClass(name))) if name == "Missing"
        ));
        assert!(!registry.contains("Orphan"));
    }

    #[test]
    fn redeclaration_is_an_upsert() {
        let registry = registry();
        let first = registry.declare("Foo", Parent::None).unwrap();
        first.define_method("get", returning("a")).unwrap();
        first.set_class_attribute("count", Value::Int(1)).unwrap();

        let second = registry.declare("Foo", Parent::None).unwrap();
        assert!(second.ptr_eq(&first));
        second.define_method("get", returning("a")).unwrap();
        assert_eq!(second.class_attribute("count"), Some(Value::Int(1)));

        assert!(matches!(
            second.define_method("get", returning("b")),
            Err(Error::Class(ClassError::DuplicateDefinition { .. }))
        ));
    }

    #[test]
    fn declaring_a_loaded_name_reuses_the_descriptor() {
        let events = EventRegistry::new();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let loader_events = events.clone();
        let loader = move |name: &str| -> Result<Option<Value>> {
            counter.set(counter.get() + 1);
            let class = ClassRef::construct(name, None, &loader_events)?;
            class.define_method("render", returning("widget"))?;
            Ok(Some(Value::Class(class)))
        };
        let registry = ClassRegistry::with_loader(&events, Rc::new(loader));

        let loaded = registry.get("Widget").unwrap();
        assert!(!registry.contains("Widget"));

        let declared = registry.declare("Widget", Parent::None).unwrap();
        assert!(declared.ptr_eq(&loaded));
        assert!(registry.contains("Widget"));
        assert!(registry.get("Widget").unwrap().ptr_eq(&loaded));
        assert_eq!(calls.get(), 1);

        declared.define_method("render", returning("widget")).unwrap();
        assert!(matches!(
            declared.define_method("render", returning("other")),
            Err(Error::Class(ClassError::DuplicateDefinition { .. }))
        ));
    }

    #[test]
    fn redeclaration_with_another_parent_fails() {
        let registry = registry();
        registry.declare("A", Parent::None).unwrap();
        registry.declare("B", Parent::None).unwrap();
        registry.declare("C", "A").unwrap();
        assert!(matches!(
            registry.declare("C", "B"),
            Err(Error::Class(ClassError::DuplicateDefinition { member, .. })) if member == "parent"
        ));
    }

    #[test]
    fn invalid_names() {
        let registry = registry();
        assert!(matches!(
            registry.declare("", Parent::None),
            Err(Error::Class(ClassError::InvalidName(_)))
        ));
        assert!(matches!(
            registry.construct_dynamic(&Value::Int(3), &Value::Nil),
            Err(Error::Class(ClassError::InvalidName(_)))
        ));
        assert!(matches!(
            registry.construct_dynamic(&Value::from("Foo"), &Value::Int(3)),
            Err(Error::Class(ClassError::ParentType { found: "int" }))
        ));
    }

    #[test]
    fn construct_dynamic_accepts_names_and_classes() {
        let registry = registry();
        let base = registry
            .construct_dynamic(&Value::from("Base"), &Value::Nil)
            .unwrap();
        let a = registry
            .construct_dynamic(&Value::from("A"), &Value::from("Base"))
            .unwrap();
        let b = registry
            .construct_dynamic(&Value::from("B"), &Value::Class(base.clone()))
            .unwrap();
        assert!(a.is_subclass_of(&base));
        assert!(b.is_subclass_of(&base));
    }

    #[test]
    fn register_rules() {
        let registry = registry();
        let events = registry.events().clone();
        let foo = ClassRef::construct("Foo", None, &events).unwrap();

        assert!(matches!(
            registry.register("not a name", &foo),
            Err(Error::Registry(RegistryError::BadName(_)))
        ));
        assert!(matches!(
            registry.register("Bar", &foo),
            Err(Error::Registry(RegistryError::MismatchedName { .. }))
        ));

        registry.register("Foo", &foo).unwrap();
        registry.register("Foo", &foo).unwrap();

        let other = ClassRef::construct("Foo", None, &events).unwrap();
        assert!(matches!(
            registry.register("Foo", &other),
            Err(Error::Registry(RegistryError::DuplicateClass(_)))
        ));
    }

    #[test]
    fn deregistration() {
        let registry = registry();
        registry.declare("A", Parent::None).unwrap();
        registry.declare("B", Parent::None).unwrap();

        registry.deregister("A").unwrap();
        assert!(!registry.contains("A"));
        assert!(matches!(
            registry.deregister("A"),
            Err(Error::Registry(RegistryError::NotRegistered(_)))
        ));

        registry.deregister_all();
        assert!(registry.is_empty());
    }

    #[test]
    fn unknown_name_without_loader() {
        let registry = registry();
        assert!(matches!(
            registry.get("Nope"),
            Err(Error::Registry(RegistryError::Load { .. }))
        ));
    }

    #[test]
    fn loader_runs_once_per_name() {
        let events = EventRegistry::new();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let loader_events = events.clone();
        let loader = move |name: &str| -> Result<Option<Value>> {
            counter.set(counter.get() + 1);
            Ok(Some(Value::Class(ClassRef::construct(name, None, &loader_events)?)))
        };
        let registry = ClassRegistry::with_loader(&events, Rc::new(loader));

        let first = registry.get("lib.Widget").unwrap();
        let second = registry.get("lib.Widget").unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(calls.get(), 1);

        registry.deregister_all();
        registry.get("lib.Widget").unwrap();
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn loader_producing_non_class_fails() {
        let events = EventRegistry::new();
        let loader = |_: &str| -> Result<Option<Value>> { Ok(Some(Value::Int(1))) };
        let registry = ClassRegistry::with_loader(&events, Rc::new(loader));
        assert!(matches!(
            registry.get("Thing"),
            Err(Error::Registry(RegistryError::Load { reason, .. })) if reason.contains("int")
        ));
    }

    #[test]
    fn mismatched_loaded_name_is_reported() {
        let events = EventRegistry::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        events.on(EventKind::ClassLoadedUnderMismatchedName, move |event| {
            if let Event::ClassLoadedUnderMismatchedName { actual, requested } = event {
                sink.borrow_mut().push(format!("{actual}<-{requested}"));
            }
            Ok(())
        });

        let loader_events = events.clone();
        let loader = move |_: &str| -> Result<Option<Value>> {
            Ok(Some(Value::Class(ClassRef::construct("Real", None, &loader_events)?)))
        };
        let registry = ClassRegistry::with_loader(&events, Rc::new(loader));
        assert_eq!(registry.get("Alias").unwrap().name(), "Real");
        assert_eq!(*seen.borrow(), vec!["Real<-Alias".to_string()]);
    }

    #[test]
    fn loader_may_declare_through_the_registry() {
        let events = EventRegistry::new();
        let slot: Rc<RefCell<Option<ClassRegistry>>> = Rc::new(RefCell::new(None));
        let handle = Rc::clone(&slot);
        let loader = move |name: &str| -> Result<Option<Value>> {
            if let Some(registry) = handle.borrow().as_ref() {
                registry.declare(name, Parent::None)?;
            }
            Ok(None)
        };
        let registry = ClassRegistry::with_loader(&events, Rc::new(loader));
        *slot.borrow_mut() = Some(registry.clone());

        let class = registry.get("Lazy").unwrap();
        assert_eq!(class.name(), "Lazy");
        assert!(registry.contains("Lazy"));
        slot.borrow_mut().take();
    }
}

//! Runtime facade.
//!
//! A [`Runtime`] bundles one event registry, one class registry and one module
//! registry that share a loader. Module members resolve through the module
//! tree, then the class registry, then the loader. A runtime is explicit
//! state: create as many as you like, and each is isolated from the others.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use classkit_core::{
    ClassRef, Event, EventKind, EventRegistry, ModuleRef, NameLoader, NullLoader, ObjectRef,
    Observer, Result, Value,
};
use classkit_registry::{ClassRegistry, ModuleRegistry, Parent};

/// Fluent configuration for a [`Runtime`].
///
/// # Example
///
/// ```
/// use classkit::prelude::*;
///
/// let runtime = Runtime::builder()
///     .observe(EventKind::ClassInitialized, |_| Ok(()))
///     .build();
/// runtime.class("Point").unwrap();
/// ```
#[derive(Default)]
pub struct RuntimeBuilder {
    loader: Option<Rc<dyn NameLoader>>,
    observers: Vec<(EventKind, Observer)>,
}

impl RuntimeBuilder {
    /// Resolve unknown class and module member names through `loader`.
    pub fn loader(mut self, loader: impl NameLoader + 'static) -> Self {
        self.loader = Some(Rc::new(loader));
        self
    }

    /// Register an observer before anything is created.
    pub fn observe<F>(mut self, kind: EventKind, observer: F) -> Self
    where
        F: Fn(&Event) -> Result<()> + 'static,
    {
        self.observers.push((kind, Rc::new(observer)));
        self
    }

    /// Build the runtime.
    pub fn build(self) -> Runtime {
        let events = EventRegistry::new();
        for (kind, observer) in self.observers {
            events.on(kind, move |event| observer(event));
        }

        let loader = self.loader.unwrap_or_else(|| Rc::new(NullLoader));
        let classes = ClassRegistry::with_loader(&events, Rc::clone(&loader));
        let modules = ModuleRegistry::with_loader(
            &events,
            Rc::new(ClassesFirst {
                classes: classes.clone(),
                fallback: loader,
            }),
        );
        Runtime {
            classes,
            modules,
            events,
            serialization: Cell::new(false),
        }
    }
}

/// Module member loader that answers from the class registry before asking
/// the external loader.
struct ClassesFirst {
    classes: ClassRegistry,
    fallback: Rc<dyn NameLoader>,
}

impl NameLoader for ClassesFirst {
    fn load(&self, name: &str) -> Result<Option<Value>> {
        match self.classes.find(name) {
            Some(class) => Ok(Some(Value::Class(class))),
            None => self.fallback.load(name),
        }
    }
}

/// One isolated object-model runtime.
pub struct Runtime {
    events: EventRegistry,
    classes: ClassRegistry,
    modules: ModuleRegistry,
    serialization: Cell<bool>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Create a runtime with no loader and no observers.
    pub fn new() -> Self {
        RuntimeBuilder::default().build()
    }

    /// Start configuring a runtime.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// The event registry shared by everything this runtime creates.
    pub fn events(&self) -> &EventRegistry {
        &self.events
    }

    /// The class registry.
    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    /// The module registry.
    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    /// Register an observer.
    pub fn on<F>(&self, kind: EventKind, observer: F)
    where
        F: Fn(&Event) -> Result<()> + 'static,
    {
        self.events.on(kind, observer);
    }

    /// Declare a parentless class.
    pub fn class(&self, name: &str) -> Result<ClassRef> {
        self.classes.declare(name, Parent::None)
    }

    /// Declare a class with a parent given by name or descriptor.
    pub fn subclass(&self, name: &str, parent: impl Into<Parent>) -> Result<ClassRef> {
        self.classes.declare(name, parent)
    }

    /// Get a class by name, loading it if necessary.
    pub fn get_class(&self, name: &str) -> Result<ClassRef> {
        self.classes.get(name)
    }

    /// Instantiate a class by name.
    pub fn instantiate(&self, name: &str, args: &[Value]) -> Result<ObjectRef> {
        self.get_class(name)?.instantiate(args)
    }

    /// Get or create a module namespace.
    pub fn module(&self, name: &str) -> Result<ModuleRef> {
        self.modules.module(name)
    }

    /// Switch serialization support on.
    ///
    /// Publishes `SerializationEnabled` the first time only. Returns whether
    /// this call switched it on.
    pub fn enable_serialization(&self) -> Result<bool> {
        if self.serialization.get() {
            return Ok(false);
        }
        self.events.emit(&Event::SerializationEnabled)?;
        self.serialization.set(true);
        tracing::debug!("serialization enabled");
        Ok(true)
    }

    /// Check if serialization support is on.
    pub fn is_serialization_enabled(&self) -> bool {
        self.serialization.get()
    }

    /// Forget every class and module. Observers stay registered.
    pub fn reset(&self) {
        self.classes.deregister_all();
        self.modules.clear();
        self.serialization.set(false);
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("classes", &self.classes)
            .field("modules", &self.modules)
            .field("serialization", &self.serialization.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use classkit_core::{CallContext, Error, NativeError, NativeFn};

    #[test]
    fn classes_share_the_runtime_events() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let runtime = Runtime::builder()
            .observe(EventKind::ClassInitialized, move |event| {
                if let Event::ClassInitialized { name } = event {
                    sink.borrow_mut().push(name.clone());
                }
                Ok(())
            })
            .build();

        runtime.class("A").unwrap();
        runtime.subclass("B", "A").unwrap();
        assert_eq!(*seen.borrow(), vec!["A", "B"]);
    }

    #[test]
    fn observer_failure_aborts_declaration() {
        let runtime = Runtime::builder()
            .observe(EventKind::ClassInitialized, |_| {
                Err(NativeError::raised("rejected").into())
            })
            .build();
        assert!(matches!(
            runtime.class("A"),
            Err(Error::Native(NativeError::Raised(_)))
        ));
        assert!(!runtime.classes().contains("A"));
    }

    #[test]
    fn instantiate_by_name() {
        let runtime = Runtime::new();
        let point = runtime.class("Point").unwrap();
        point
            .define_method(
                "init",
                NativeFn::new(|ctx: &mut CallContext<'_>| {
                    let x = ctx.arg_value(0)?.clone();
                    ctx.this()?.set("x", x)?;
                    Ok(Value::Nil)
                }),
            )
            .unwrap();

        let p = runtime.instantiate("Point", &[Value::Int(4)]).unwrap();
        assert_eq!(p.get("x").unwrap(), Value::Int(4));
    }

    #[test]
    fn loader_is_shared() {
        let runtime = Runtime::builder()
            .loader(|name: &str| -> Result<Option<Value>> {
                Ok(Some(Value::from(name.to_string())))
            })
            .build();
        let app = runtime.module("app").unwrap();
        app.declare_function("helper").unwrap();
        assert!(matches!(
            app.get("helper"),
            Err(Error::Module(classkit_core::ModuleError::KindMismatch { .. }))
        ));
        assert!(runtime.get_class("Anything").is_err());
    }

    #[test]
    fn serialization_enables_once() {
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        let runtime = Runtime::new();
        runtime.on(EventKind::SerializationEnabled, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        assert!(runtime.enable_serialization().unwrap());
        assert!(!runtime.enable_serialization().unwrap());
        assert!(runtime.is_serialization_enabled());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn reset_forgets_classes_and_modules() {
        let runtime = Runtime::new();
        runtime.class("A").unwrap();
        runtime.module("app").unwrap();
        runtime.reset();
        assert!(runtime.classes().is_empty());
        assert!(runtime.modules().is_empty());
        runtime.class("A").unwrap();
    }
}

//! Lifecycle event publishing.
//!
//! [`EventRegistry`] is a cheap, clonable handle to one set of observers.
//! Descriptors and namespaces keep a clone of the registry they were created
//! with and publish through it. Observers run synchronously, in registration
//! order, and an observer error aborts the operation that published the event.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::runtime::{NativeFn, Value};

/// Kinds of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A class descriptor was constructed.
    ClassInitialized,
    /// A class attribute was set.
    AttributeSet,
    /// A method was defined on a class.
    MethodDefined,
    /// A module namespace was created.
    ModuleInitialized,
    /// A module declared a class.
    ModuleDeclaredClass,
    /// A module declared a submodule.
    ModuleDeclaredSubmodule,
    /// A module declared a function.
    ModuleDeclaredFunction,
    /// Serialization support was switched on.
    SerializationEnabled,
    /// A loaded class reported a different name than the one requested.
    ClassLoadedUnderMismatchedName,
}

/// A published event with its payload.
#[derive(Debug, Clone)]
pub enum Event {
    ClassInitialized {
        name: String,
    },
    AttributeSet {
        class: String,
        name: String,
        value: Value,
    },
    MethodDefined {
        class: String,
        name: String,
        method: NativeFn,
    },
    ModuleInitialized {
        name: String,
    },
    ModuleDeclaredClass {
        module: String,
        name: String,
    },
    ModuleDeclaredSubmodule {
        module: String,
        name: String,
    },
    ModuleDeclaredFunction {
        module: String,
        name: String,
    },
    SerializationEnabled,
    ClassLoadedUnderMismatchedName {
        actual: String,
        requested: String,
    },
}

impl Event {
    /// The kind observers subscribe to.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::ClassInitialized { .. } => EventKind::ClassInitialized,
            Event::AttributeSet { .. } => EventKind::AttributeSet,
            Event::MethodDefined { .. } => EventKind::MethodDefined,
            Event::ModuleInitialized { .. } => EventKind::ModuleInitialized,
            Event::ModuleDeclaredClass { .. } => EventKind::ModuleDeclaredClass,
            Event::ModuleDeclaredSubmodule { .. } => EventKind::ModuleDeclaredSubmodule,
            Event::ModuleDeclaredFunction { .. } => EventKind::ModuleDeclaredFunction,
            Event::SerializationEnabled => EventKind::SerializationEnabled,
            Event::ClassLoadedUnderMismatchedName { .. } => {
                EventKind::ClassLoadedUnderMismatchedName
            }
        }
    }
}

/// An observer callback.
pub type Observer = Rc<dyn Fn(&Event) -> Result<()>>;

/// Per-kind ordered observer lists.
///
/// Observers are only ever added, never cleared implicitly. Create a fresh
/// registry to get an isolated set.
#[derive(Clone, Default)]
pub struct EventRegistry {
    observers: Rc<RefCell<FxHashMap<EventKind, Vec<Observer>>>>,
}

impl EventRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer for one event kind.
    pub fn on<F>(&self, kind: EventKind, observer: F)
    where
        F: Fn(&Event) -> Result<()> + 'static,
    {
        self.observers
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push(Rc::new(observer));
    }

    /// Publish an event to every observer of its kind.
    ///
    /// Stops at the first failing observer and returns its error.
    pub fn emit(&self, event: &Event) -> Result<()> {
        // Snapshot the list so observers may register further observers.
        let observers = match self.observers.borrow().get(&event.kind()) {
            Some(list) => list.clone(),
            None => return Ok(()),
        };
        tracing::trace!(kind = ?event.kind(), count = observers.len(), "emitting event");
        for observer in observers {
            observer(event)?;
        }
        Ok(())
    }

    /// Number of observers registered for a kind.
    pub fn observer_count(&self, kind: EventKind) -> usize {
        self.observers.borrow().get(&kind).map_or(0, Vec::len)
    }

    /// Check if both handles point at the same registry.
    pub fn ptr_eq(&self, other: &EventRegistry) -> bool {
        Rc::ptr_eq(&self.observers, &other.observers)
    }
}

impl fmt::Debug for EventRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRegistry")
            .field("kinds", &self.observers.borrow().len())
            .finish()
    }
}

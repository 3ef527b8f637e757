//! classkit - a runtime class and module object model.
//!
//! Classes are runtime descriptors with copy-down inheritance, mixins,
//! required and final methods, and optional strict instances. Modules are
//! namespaces that declare their members up front and load each one on first
//! access. Every lifecycle step publishes an event to synchronous observers.
//!
//! # Example
//!
//! ```
//! use classkit::prelude::*;
//!
//! let runtime = Runtime::new();
//! let base = runtime.class("Base").unwrap();
//! base.define_method(
//!     "get_x",
//!     NativeFn::new(|_: &mut CallContext<'_>| Ok(Value::from("base"))),
//! )
//! .unwrap();
//!
//! let child = runtime.subclass("Child", "Base").unwrap();
//! let object = child.instantiate(&[]).unwrap();
//! assert_eq!(object.call_method("get_x", &[]).unwrap(), Value::from("base"));
//! ```

mod runtime;
pub mod serialize;

pub use classkit_core;
pub use classkit_registry;

pub use runtime::{Runtime, RuntimeBuilder};

pub mod prelude {
    pub use crate::runtime::{Runtime, RuntimeBuilder};
    pub use crate::serialize::{Payload, Snapshot, class_name_of, hooks_for};
    pub use classkit_core::{
        CONSTRUCTOR, CallContext, ClassError, ClassRef, Error, Event, EventKind, EventRegistry,
        InstanceError, ModuleError, ModuleRef, NameLoader, NativeError, NativeFn, ObjectRef,
        Operator, RegistryError, Result, SuperView, Value,
    };
    pub use classkit_registry::{ClassRegistry, ModuleRegistry, Parent};
}

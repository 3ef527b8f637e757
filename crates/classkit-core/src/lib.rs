//! Core types for the classkit object model.
//!
//! This crate holds everything below the registries:
//!
//! - [`ClassRef`] / [`ObjectRef`] - class descriptors and their instances
//! - [`ModuleRef`] - declared-then-loaded module namespaces
//! - [`EventRegistry`] - synchronous lifecycle observers
//! - [`Value`] / [`NativeFn`] - the dynamic value and callable model
//! - [`Error`] - the error hierarchy shared by every classkit crate

mod body_hash;
pub mod entries;
mod error;
pub mod events;
mod loader;
mod naming;
mod operator;
pub mod runtime;

pub use body_hash::BodyHash;
pub use entries::{
    BUILTIN_NAMESPACE_OPERATIONS, BUILTIN_OPERATIONS, CONSTRUCTOR, CONSTRUCTOR_TYPOS, ClassRef,
    MemberKinds, Members, ModuleRef, ObjectRef, RESERVED_STATIC, SuperView,
};
pub use error::{
    ClassError, Error, InstanceError, ModuleError, NativeError, RegistryError, Result,
};
pub use events::{Event, EventKind, EventRegistry, Observer};
pub use loader::{NameLoader, NullLoader};
pub use naming::{is_dotted_identifier, is_identifier, is_lower_snake_case, is_upper_camel_case};
pub use operator::Operator;
pub use runtime::{CallContext, FromValue, NativeCallable, NativeFn, Value};

//! Descriptor and instance types.
//!
//! - [`ClassRef`] - Class descriptors (methods, attributes, statics, mixins)
//! - [`ObjectRef`] - Instances of a class
//! - [`SuperView`] - Read-only parent dispatch
//! - [`ModuleRef`] - Lazily resolved module namespaces

mod class;
mod namespace;
mod object;
mod super_view;

pub use class::{BUILTIN_OPERATIONS, CONSTRUCTOR, CONSTRUCTOR_TYPOS, ClassRef, RESERVED_STATIC};
pub use namespace::{BUILTIN_NAMESPACE_OPERATIONS, MemberKinds, Members, ModuleRef};
pub use object::ObjectRef;
pub use super_view::SuperView;

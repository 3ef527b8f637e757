//! Registries for the classkit object model.
//!
//! - [`ClassRegistry`] - class descriptors by qualified name, with lazy loading
//! - [`ModuleRegistry`] - the tree of module namespaces
//!
//! Both are cheap, clonable handles around explicit state. Create a fresh one
//! for an isolated set of classes or modules.

mod module_tree;
mod registry;

pub use module_tree::{ModuleEdge, ModuleRegistry};
pub use registry::{ClassRegistry, Parent};

//! Module namespaces.
//!
//! A [`ModuleRef`] records which classes, submodules and functions it *will*
//! provide without loading any of them. The first access to a declared key
//! resolves it through the namespace's [`NameLoader`], checks the result
//! against the declared category, and caches it; later accesses hit the cache.
//! A failed resolution is cached too, so the loader sees each name at most once.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, ModuleError, Result};
use crate::events::{Event, EventRegistry};
use crate::loader::NameLoader;
use crate::naming::{is_lower_snake_case, is_upper_camel_case};
use crate::runtime::Value;

bitflags! {
    /// Categories a namespace key has been declared in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MemberKinds: u8 {
        const CLASS = 1 << 0;
        const SUBMODULE = 1 << 1;
        const FUNCTION = 1 << 2;
    }
}

impl MemberKinds {
    /// The category a loaded value belongs to, if any.
    pub fn of_value(value: &Value) -> MemberKinds {
        match value {
            Value::Class(_) => MemberKinds::CLASS,
            Value::Module(_) => MemberKinds::SUBMODULE,
            Value::Function(_) => MemberKinds::FUNCTION,
            _ => MemberKinds::empty(),
        }
    }

    fn label(self) -> &'static str {
        if self == MemberKinds::CLASS {
            "class"
        } else if self == MemberKinds::SUBMODULE {
            "submodule"
        } else {
            "function"
        }
    }

    fn describe(self) -> String {
        self.iter().map(MemberKinds::label).collect::<Vec<_>>().join(" or ")
    }
}

/// Built-in namespace operations. Assignments may not use these names.
pub const BUILTIN_NAMESPACE_OPERATIONS: [&str; 7] = [
    "name",
    "declare_class",
    "declare_submodule",
    "declare_function",
    "classes",
    "submodules",
    "functions",
];

/// Shared handle to a module namespace.
#[derive(Clone)]
pub struct ModuleRef(Rc<RefCell<ModuleData>>);

struct ModuleData {
    /// Fully qualified, dot-separated name.
    name: String,
    /// Declared-but-possibly-unloaded keys and their categories.
    declared: FxHashMap<String, MemberKinds>,
    /// Resolved declared members.
    cache: FxHashMap<String, Value>,
    /// Declared members whose resolution failed.
    failures: FxHashMap<String, Error>,
    /// Assigned values (functions and plain data).
    data: FxHashMap<String, Value>,
    /// Keys in `data` that were assigned a callable.
    assigned_functions: FxHashSet<String>,
    loader: Rc<dyn NameLoader>,
    events: EventRegistry,
}

impl ModuleRef {
    /// Create an empty namespace and publish `ModuleInitialized`.
    ///
    /// # Errors
    ///
    /// [`ModuleError::NamingConvention`] unless every segment of `name` is
    /// lower_snake_case; any observer error.
    pub fn new(name: &str, loader: Rc<dyn NameLoader>, events: &EventRegistry) -> Result<ModuleRef> {
        if name.is_empty() || !name.split('.').all(is_lower_snake_case) {
            return Err(ModuleError::NamingConvention {
                name: name.to_string(),
                convention: "module",
            }
            .into());
        }

        events.emit(&Event::ModuleInitialized {
            name: name.to_string(),
        })?;
        tracing::debug!(module = name, "created module");

        Ok(ModuleRef(Rc::new(RefCell::new(ModuleData {
            name: name.to_string(),
            declared: FxHashMap::default(),
            cache: FxHashMap::default(),
            failures: FxHashMap::default(),
            data: FxHashMap::default(),
            assigned_functions: FxHashSet::default(),
            loader,
            events: events.clone(),
        }))))
    }

    /// The fully qualified module name.
    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &ModuleRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // ==========================================================================
    // Declarations
    // ==========================================================================

    /// Declare a class member. Never loads anything.
    pub fn declare_class(&self, name: &str) -> Result<()> {
        if !is_upper_camel_case(name) {
            return Err(ModuleError::NamingConvention {
                name: name.to_string(),
                convention: "class",
            }
            .into());
        }
        self.declare(name, MemberKinds::CLASS)
    }

    /// Declare a submodule member. Never loads anything.
    pub fn declare_submodule(&self, name: &str) -> Result<()> {
        if !is_lower_snake_case(name) {
            return Err(ModuleError::NamingConvention {
                name: name.to_string(),
                convention: "submodule",
            }
            .into());
        }
        self.declare(name, MemberKinds::SUBMODULE)
    }

    /// Declare a function member. Never loads anything.
    pub fn declare_function(&self, name: &str) -> Result<()> {
        if !is_lower_snake_case(name) {
            return Err(ModuleError::NamingConvention {
                name: name.to_string(),
                convention: "function",
            }
            .into());
        }
        self.declare(name, MemberKinds::FUNCTION)
    }

    fn declare(&self, name: &str, kind: MemberKinds) -> Result<()> {
        let module = {
            let data = self.0.borrow();
            if data.data.contains_key(name) {
                return Err(ModuleError::NamingConflict {
                    module: data.name.clone(),
                    name: name.to_string(),
                    existing: "an assigned member",
                }
                .into());
            }
            let existing = data.declared.get(name).copied().unwrap_or(MemberKinds::empty());
            if existing.contains(kind) {
                return Err(ModuleError::DuplicateDeclaration {
                    module: data.name.clone(),
                    name: name.to_string(),
                    kind: kind.label(),
                }
                .into());
            }
            data.name.clone()
        };

        let event = if kind == MemberKinds::CLASS {
            Event::ModuleDeclaredClass {
                module,
                name: name.to_string(),
            }
        } else if kind == MemberKinds::SUBMODULE {
            Event::ModuleDeclaredSubmodule {
                module,
                name: name.to_string(),
            }
        } else {
            Event::ModuleDeclaredFunction {
                module,
                name: name.to_string(),
            }
        };
        self.events().emit(&event)?;

        let mut data = self.0.borrow_mut();
        *data.declared.entry(name.to_string()).or_insert(MemberKinds::empty()) |= kind;
        // A wider declaration may accept what failed before.
        data.failures.remove(name);
        Ok(())
    }

    /// Check if `name` was declared in any category.
    pub fn is_declared(&self, name: &str) -> bool {
        self.0.borrow().declared.contains_key(name)
    }

    /// Check if a declared member has been resolved.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.0.borrow().cache.contains_key(name)
    }

    /// Drop the cached resolution of a declared member, successful or not, so
    /// the next access asks the loader again.
    pub fn forget(&self, name: &str) {
        let mut data = self.0.borrow_mut();
        data.cache.remove(name);
        data.failures.remove(name);
    }

    // ==========================================================================
    // Access
    // ==========================================================================

    /// Read a member, resolving a declared one on first access.
    ///
    /// # Errors
    ///
    /// - [`ModuleError::UnknownMember`] if the key was never declared or assigned
    /// - [`ModuleError::Load`] if the loader does not know the qualified name
    /// - [`ModuleError::KindMismatch`] if the loaded value's category was not declared
    /// - any loader or observer error
    ///
    /// Loader failures are remembered and returned again without reloading.
    pub fn get(&self, key: &str) -> Result<Value> {
        let (qualified, declared, loader) = {
            let data = self.0.borrow();
            if let Some(value) = data.cache.get(key).or_else(|| data.data.get(key)) {
                return Ok(value.clone());
            }
            if let Some(error) = data.failures.get(key) {
                return Err(error.clone());
            }
            let Some(&declared) = data.declared.get(key) else {
                return Err(ModuleError::UnknownMember {
                    module: data.name.clone(),
                    name: key.to_string(),
                }
                .into());
            };
            (
                format!("{}.{}", data.name, key),
                declared,
                Rc::clone(&data.loader),
            )
        };

        let value = match self.load(key, &qualified, declared, loader.as_ref()) {
            Ok(value) => value,
            Err(error) => {
                tracing::debug!(name = %qualified, %error, "declared member failed to load");
                self.0
                    .borrow_mut()
                    .failures
                    .insert(key.to_string(), error.clone());
                return Err(error);
            }
        };

        if let Value::Class(class) = &value {
            let actual = class.name();
            if actual != qualified {
                self.events().emit(&Event::ClassLoadedUnderMismatchedName {
                    actual,
                    requested: qualified.clone(),
                })?;
            }
        }

        self.0
            .borrow_mut()
            .cache
            .insert(key.to_string(), value.clone());
        Ok(value)
    }

    fn load(
        &self,
        key: &str,
        qualified: &str,
        declared: MemberKinds,
        loader: &dyn NameLoader,
    ) -> Result<Value> {
        tracing::debug!(name = %qualified, "resolving declared member");
        let value = loader.load(qualified)?.ok_or_else(|| ModuleError::Load {
            module: self.name(),
            name: key.to_string(),
        })?;

        let found = MemberKinds::of_value(&value);
        if found.is_empty() || !declared.contains(found) {
            return Err(ModuleError::KindMismatch {
                module: self.name(),
                name: key.to_string(),
                expected: declared.describe(),
                found: value.type_name(),
            }
            .into());
        }
        Ok(value)
    }

    /// Assign a member.
    ///
    /// Callables are recorded as module functions and announced with
    /// `ModuleDeclaredFunction` the first time a key holds one; anything else
    /// is plain data.
    ///
    /// # Errors
    ///
    /// - [`ModuleError::NamingConflict`] for a built-in namespace operation name
    ///   or a declared key
    /// - [`ModuleError::NamingConvention`] for a callable under a non-lower_snake_case name
    /// - any observer error, in which case nothing is assigned
    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        let is_function = matches!(value, Value::Function(_));
        let (module, announce) = {
            let data = self.0.borrow();
            let existing = if BUILTIN_NAMESPACE_OPERATIONS.contains(&key) {
                Some("a built-in namespace operation")
            } else if data.declared.contains_key(key) {
                Some("a declared member")
            } else {
                None
            };
            if let Some(existing) = existing {
                return Err(ModuleError::NamingConflict {
                    module: data.name.clone(),
                    name: key.to_string(),
                    existing,
                }
                .into());
            }
            if is_function && !is_lower_snake_case(key) {
                return Err(ModuleError::NamingConvention {
                    name: key.to_string(),
                    convention: "function",
                }
                .into());
            }
            (
                data.name.clone(),
                is_function && !data.assigned_functions.contains(key),
            )
        };

        if announce {
            self.events().emit(&Event::ModuleDeclaredFunction {
                module,
                name: key.to_string(),
            })?;
        }

        let mut data = self.0.borrow_mut();
        if is_function {
            data.assigned_functions.insert(key.to_string());
        } else {
            data.assigned_functions.remove(key);
        }
        data.data.insert(key.to_string(), value);
        Ok(())
    }

    // ==========================================================================
    // Enumeration
    // ==========================================================================

    /// Declared classes, resolved as the sequence is consumed.
    pub fn classes(&self) -> Members {
        self.members(MemberKinds::CLASS)
    }

    /// Declared submodules, resolved as the sequence is consumed.
    pub fn submodules(&self) -> Members {
        self.members(MemberKinds::SUBMODULE)
    }

    /// Declared and assigned functions, resolved as the sequence is consumed.
    pub fn functions(&self) -> Members {
        let mut members = self.members(MemberKinds::FUNCTION);
        let data = self.0.borrow();
        for name in &data.assigned_functions {
            if !members.names.contains(name) {
                members.names.push(name.clone());
            }
        }
        members.names.sort();
        members
    }

    fn members(&self, kind: MemberKinds) -> Members {
        let data = self.0.borrow();
        let mut names: Vec<String> = data
            .declared
            .iter()
            .filter(|(_, kinds)| kinds.contains(kind))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Members {
            module: self.clone(),
            names,
            next: 0,
        }
    }

    fn events(&self) -> EventRegistry {
        self.0.borrow().events.clone()
    }
}

impl fmt::Debug for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        f.debug_struct("ModuleRef")
            .field("name", &data.name)
            .field("declared", &data.declared.len())
            .field("loaded", &data.cache.len())
            .finish_non_exhaustive()
    }
}

/// Lazy, finite sequence of `(name, value)` pairs for one member category.
///
/// Each step resolves its member through [`ModuleRef::get`]. Ask the module
/// for a new sequence to start over.
pub struct Members {
    module: ModuleRef,
    names: Vec<String>,
    next: usize,
}

impl Iterator for Members {
    type Item = Result<(String, Value)>;

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.names.get(self.next)?.clone();
        self.next += 1;
        Some(self.module.get(&name).map(|value| (name, value)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.names.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Members {}

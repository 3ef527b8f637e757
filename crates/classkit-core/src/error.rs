//! Unified error types for classkit.
//!
//! Every fallible operation in the metamodel returns one of the concern-specific
//! enums below, or the top-level [`Error`] that wraps them.
//!
//! ## Error Hierarchy
//!
//! ```text
//! Error (top-level wrapper)
//! ├── ClassError    - Descriptor construction, members, finality, mixins, redefinition
//! ├── InstanceError - Instantiation, strict mode, parent dispatch, calls
//! ├── RegistryError - Class registry misuse and loading
//! ├── ModuleError   - Namespace declaration, naming convention, lazy resolution
//! └── NativeError   - Failures raised from inside user callables
//! ```
//!
//! Callables, observers and loaders all return [`Result`], so an error raised
//! anywhere propagates through `?` to the immediate caller.

use thiserror::Error;

// ============================================================================
// Class Errors
// ============================================================================

/// Errors raised while building or mutating a class descriptor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassError {
    /// The class name is missing, empty, or not a string.
    #[error("invalid class name: {0}")]
    InvalidName(String),

    /// The parent is neither omitted, a class name, nor a class descriptor.
    #[error("invalid parent: expected a class or class name, got {found}")]
    ParentType {
        /// Type name of the offending value.
        found: &'static str,
    },

    /// A parent given by name could not be resolved.
    #[error("unknown class: {0}")]
    UnknownClass(String),

    /// A member name is already claimed by another member kind.
    #[error("naming conflict in class '{class}': '{name}' is already {existing}")]
    NamingConflict {
        /// The class being modified.
        class: String,
        /// The contested name.
        name: String,
        /// What already owns the name.
        existing: &'static str,
    },

    /// A method name that looks like a misspelled constructor.
    #[error("class '{class}': method '{name}' looks like a misspelled constructor, use '{expected}'")]
    ConstructorNaming {
        /// The class being modified.
        class: String,
        /// The offending method name.
        name: String,
        /// The constructor name that was probably intended.
        expected: &'static str,
    },

    /// A final method was redefined.
    #[error("class '{class}': method '{method}' is final and cannot be redefined")]
    FinalityViolation {
        /// The class being modified.
        class: String,
        /// The final method.
        method: String,
    },

    /// A method was marked final before it was defined.
    #[error("class '{class}' has no method '{method}'")]
    UnknownMethod {
        /// The class being modified.
        class: String,
        /// The missing method.
        method: String,
    },

    /// Including a mixin would overwrite an existing method.
    #[error("class '{class}': including '{mixin}' conflicts with existing method '{method}'")]
    MethodConflict {
        /// The including class.
        class: String,
        /// The mixin being included.
        mixin: String,
        /// The method present in both.
        method: String,
    },

    /// A class was included into itself.
    #[error("class '{class}' cannot include itself")]
    SelfInclusion {
        /// The class.
        class: String,
    },

    /// A re-declaration is incompatible with the registered class.
    #[error("class '{class}' is already defined with a different '{member}'")]
    DuplicateDefinition {
        /// The re-declared class.
        class: String,
        /// The member (or "parent") that differs.
        member: String,
    },
}

// ============================================================================
// Instance Errors
// ============================================================================

/// Errors raised by instantiation and by operations on live objects.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InstanceError {
    /// A required method has no implementation.
    #[error("cannot instantiate '{class}': required method '{method}' is not implemented")]
    AbstractInstantiation {
        /// The class being instantiated.
        class: String,
        /// The first missing required method.
        method: String,
    },

    /// A strict object was accessed through a name unknown at strict time.
    #[error("strict object of class '{class}' has no member '{key}'")]
    StrictnessViolation {
        /// Class of the strict object.
        class: String,
        /// The rejected key.
        key: String,
    },

    /// The parent-dispatch view has no such method.
    #[error("parent of '{class}' has no method '{method}'")]
    NoSuchSuperMethod {
        /// The class whose parent was searched.
        class: String,
        /// The requested method.
        method: String,
    },

    /// A write was attempted through the parent-dispatch view.
    #[error("parent view of '{class}' is read-only (attempted to set '{method}')")]
    ImmutableView {
        /// The class whose parent view was written.
        class: String,
        /// The name that was written.
        method: String,
    },

    /// A method call named something that does not resolve to a callable.
    #[error("object of class '{class}' has no callable member '{method}'")]
    NoSuchMethod {
        /// Class of the receiver.
        class: String,
        /// The requested method.
        method: String,
    },

    /// A value that is not callable was called.
    #[error("value of type {type_name} is not callable")]
    NotCallable {
        /// Type name of the value.
        type_name: &'static str,
    },
}

// ============================================================================
// Registry Errors
// ============================================================================

/// Errors raised by the class registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// The registration key is not a usable name.
    #[error("bad class name: {0}")]
    BadName(String),

    /// The descriptor's own name differs from the registration key.
    #[error("cannot register class '{actual}' under the name '{expected}'")]
    MismatchedName {
        /// The registration key.
        expected: String,
        /// The descriptor's recorded name.
        actual: String,
    },

    /// A different descriptor already owns the name.
    #[error("a different class is already registered as '{0}'")]
    DuplicateClass(String),

    /// Deregistration of a name that is not registered.
    #[error("class '{0}' is not registered")]
    NotRegistered(String),

    /// The loader failed or produced something that is not a class.
    #[error("failed to load class '{name}': {reason}")]
    Load {
        /// The requested name.
        name: String,
        /// What went wrong.
        reason: String,
    },
}

// ============================================================================
// Module Errors
// ============================================================================

/// Errors raised by module namespaces.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModuleError {
    /// The same name was declared twice in one category.
    #[error("module '{module}' already declares {kind} '{name}'")]
    DuplicateDeclaration {
        /// The declaring module.
        module: String,
        /// The declared name.
        name: String,
        /// The category ("class", "submodule", "function").
        kind: &'static str,
    },

    /// Access to a key that was never declared or assigned.
    #[error("module '{module}' has no member '{name}'")]
    UnknownMember {
        /// The accessed module.
        module: String,
        /// The requested key.
        name: String,
    },

    /// The loader produced a value of the wrong category.
    #[error("module '{module}': '{name}' was declared as {expected} but loaded as {found}")]
    KindMismatch {
        /// The accessed module.
        module: String,
        /// The requested key.
        name: String,
        /// The declared categories.
        expected: String,
        /// Type name of what was loaded.
        found: &'static str,
    },

    /// A module, submodule, function or class name breaks the naming convention.
    #[error("'{name}' is not a valid {convention} name")]
    NamingConvention {
        /// The rejected name.
        name: String,
        /// The expected convention.
        convention: &'static str,
    },

    /// A name is already claimed by a built-in operation or by another member.
    #[error("module '{module}': '{name}' is already {existing}")]
    NamingConflict {
        /// The module being modified.
        module: String,
        /// The contested name.
        name: String,
        /// What already owns the name.
        existing: &'static str,
    },

    /// The loader could not resolve a declared member.
    #[error("module '{module}': failed to load '{name}'")]
    Load {
        /// The accessed module.
        module: String,
        /// The requested key.
        name: String,
    },
}

// ============================================================================
// Native Errors
// ============================================================================

/// Errors raised from inside user callables.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NativeError {
    /// Argument index was out of bounds.
    #[error("argument index {index} out of bounds (count: {count})")]
    ArgumentIndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The number of arguments.
        count: usize,
    },

    /// A value had an unexpected type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The expected type.
        expected: &'static str,
        /// The actual type.
        actual: &'static str,
    },

    /// A method was called without a receiver.
    #[error("method called without a receiver")]
    MissingReceiver,

    /// A failure raised by user code.
    #[error("{0}")]
    Raised(String),
}

impl NativeError {
    /// Create an error carrying a user-supplied message.
    pub fn raised(message: impl Into<String>) -> Self {
        NativeError::Raised(message.into())
    }
}

// ============================================================================
// Top-level Error
// ============================================================================

/// Top-level error type for all classkit operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Descriptor error.
    #[error(transparent)]
    Class(#[from] ClassError),

    /// Instance error.
    #[error(transparent)]
    Instance(#[from] InstanceError),

    /// Class registry error.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Namespace error.
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// Error raised by a user callable.
    #[error(transparent)]
    Native(#[from] NativeError),
}

/// Result alias used throughout classkit.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_error_display() {
        let err = ClassError::FinalityViolation {
            class: "Child".into(),
            method: "compute".into(),
        };
        assert_eq!(
            err.to_string(),
            "class 'Child': method 'compute' is final and cannot be redefined"
        );
    }

    #[test]
    fn instance_error_display() {
        let err = InstanceError::AbstractInstantiation {
            class: "A".into(),
            method: "compute".into(),
        };
        assert!(err.to_string().contains("'A'"));
        assert!(err.to_string().contains("'compute'"));
    }

    #[test]
    fn wrapping_is_transparent() {
        let inner = RegistryError::NotRegistered("Foo".into());
        let err: Error = inner.clone().into();
        assert_eq!(err.to_string(), inner.to_string());
        assert!(matches!(err, Error::Registry(RegistryError::NotRegistered(_))));
    }

    #[test]
    fn raised_native_error() {
        let err: Error = NativeError::raised("boom").into();
        assert_eq!(err.to_string(), "boom");
    }
}

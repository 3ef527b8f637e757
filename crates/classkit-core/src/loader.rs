//! Name loading seam.
//!
//! The class registry and module namespaces resolve names they have not seen
//! yet through a [`NameLoader`]. Callers guarantee at most one load per name by
//! caching results; loaders themselves need not cache.

use crate::error::Result;
use crate::runtime::Value;

/// External name resolution.
pub trait NameLoader {
    /// Load the value bound to a dot-qualified name.
    ///
    /// `Ok(None)` means the name is unknown to the loader.
    fn load(&self, name: &str) -> Result<Option<Value>>;
}

impl<F> NameLoader for F
where
    F: Fn(&str) -> Result<Option<Value>>,
{
    fn load(&self, name: &str) -> Result<Option<Value>> {
        (self)(name)
    }
}

/// Loader that knows no names.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLoader;

impl NameLoader for NullLoader {
    fn load(&self, _name: &str) -> Result<Option<Value>> {
        Ok(None)
    }
}

//! Deterministic identity for callable bodies.
//!
//! [`BodyHash`] is how the redefinition-compatibility check decides whether two
//! method bodies are the same. Callables built from body text hash that text, so
//! re-declaring a class from the same source produces equal hashes. Callables
//! built without body text get a fresh identity that only their clones share.
//!
//! # Examples
//!
//! ```
//! use classkit_core::BodyHash;
//!
//! let a = BodyHash::from_body("return self.x");
//! let b = BodyHash::from_body("return self.x");
//! assert_eq!(a, b);
//!
//! assert_ne!(BodyHash::unique(), BodyHash::unique());
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use xxhash_rust::xxh64::xxh64;

/// Domain marker for hashes computed from body text.
const BODY_DOMAIN: u64 = 0x5ea77ffbcdf5f302;

/// Domain marker for generated unique identities.
const UNIQUE_DOMAIN: u64 = 0x7d3c8b4a92e15f6d;

static NEXT_UNIQUE: AtomicU64 = AtomicU64::new(1);

/// A 64-bit identity for a callable body.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct BodyHash(pub u64);

impl BodyHash {
    /// Hash a body from its text. Equal text always yields an equal hash.
    #[inline]
    pub fn from_body(body: &str) -> Self {
        BodyHash(BODY_DOMAIN ^ xxh64(body.as_bytes(), 0))
    }

    /// Allocate an identity that no other body shares.
    pub fn unique() -> Self {
        let n = NEXT_UNIQUE.fetch_add(1, Ordering::Relaxed);
        BodyHash(UNIQUE_DOMAIN ^ xxh64(&n.to_le_bytes(), UNIQUE_DOMAIN))
    }
}

impl fmt::Debug for BodyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BodyHash({:#018x})", self.0)
    }
}

impl fmt::Display for BodyHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_hash_determinism() {
        assert_eq!(
            BodyHash::from_body("return 'base'"),
            BodyHash::from_body("return 'base'")
        );
    }

    #[test]
    fn body_hash_whitespace_matters() {
        assert_ne!(
            BodyHash::from_body("return 1"),
            BodyHash::from_body("return  1")
        );
    }

    #[test]
    fn unique_hashes_differ_from_each_other() {
        let a = BodyHash::unique();
        let b = BodyHash::unique();
        assert_ne!(a, b);
    }

    #[test]
    fn hash_display() {
        let hash = BodyHash(0x1234);
        assert_eq!(format!("{}", hash), "0x0000000000001234");
        assert_eq!(format!("{:?}", hash), "BodyHash(0x0000000000001234)");
    }
}

//! Services the upgrader consumes from the surrounding runtime.
//!
//! Upgrading is only half of loading legacy metadata: selectors must be interned, the
//! `Protocol` class must be found, protocols are canonical by name and the upgraded class needs a
//! side table entry pointing back at its legacy descriptor. Those concerns belong to the host
//! runtime and are expressed here as four traits. [`Runtime`] implements all of them in memory.
//!
//! # Examples
//!
//! ```rust
//! use objcabi::runtime::{Runtime, SelectorTable};
//!
//! let runtime = Runtime::new();
//! let init = runtime.register_selector("init", Some("@16@0:8"));
//! assert_eq!(init, runtime.register_selector("init", Some("@16@0:8")));
//! assert_ne!(init, runtime.register_selector("init", None));
//! ```

mod memory;

pub use memory::Runtime;

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{file::Address, metadata::protocol::ProtocolRc};

/// An interned selector handle.
///
/// Two selectors are equal exactly when they were registered with the same name and type
/// encoding.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Selector(pub u64);

impl Selector {
    /// Create a selector from its raw handle value
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Selector(value)
    }

    /// The raw handle value, as written into emitted method records
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({})", self.0)
    }
}

/// Identity of an upgraded descriptor.
///
/// Upgraded classes and protocols are plain values, their identity is assigned once at creation
/// and used to key side tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(pub u64);

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

impl ObjectId {
    /// Allocate a fresh, process-wide unique identity
    #[must_use]
    pub fn next() -> Self {
        ObjectId(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Key of an associated value in the [`AssociationStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssociationKey(pub &'static str);

impl AssociationKey {
    /// Maps an upgraded class to the legacy descriptor it was built from
    pub const LEGACY_CLASS: AssociationKey = AssociationKey("objcabi.legacy-class");
}

/// Typed selector interning.
pub trait SelectorTable: Send + Sync {
    /// Intern `name` with the given type encoding; equal inputs yield equal selectors.
    fn register_selector(&self, name: &str, types: Option<&str>) -> Selector;
}

/// Lookup of already loaded classes.
pub trait ClassTable: Send + Sync {
    /// Address of the class called `name`, if the runtime knows it
    fn lookup_class(&self, name: &str) -> Option<Address>;
}

/// The canonical, name-keyed protocol registry.
pub trait ProtocolTable: Send + Sync {
    /// The canonical protocol called `name`
    fn lookup_protocol(&self, name: &str) -> Option<ProtocolRc>;

    /// Register `protocol` unless a protocol with the same name exists.
    ///
    /// Returns the canonical instance, which is `protocol` itself on first registration.
    fn register_protocol(&self, protocol: ProtocolRc) -> ProtocolRc;
}

/// Identity-keyed, non-owning side table.
pub trait AssociationStore: Send + Sync {
    /// Store `value` for (`object`, `key`), replacing any previous value
    fn set_association(&self, object: ObjectId, key: AssociationKey, value: Address);

    /// The value stored for (`object`, `key`)
    fn get_association(&self, object: ObjectId, key: AssociationKey) -> Option<Address>;
}

/// Everything the upgrader needs from its host.
pub trait RuntimeServices: SelectorTable + ClassTable + ProtocolTable + AssociationStore {}

impl<T> RuntimeServices for T where T: SelectorTable + ClassTable + ProtocolTable + AssociationStore {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_ids_are_unique() {
        let a = ObjectId::next();
        let b = ObjectId::next();
        assert_ne!(a, b);
    }

    #[test]
    fn selector_debug() {
        assert_eq!(format!("{:?}", Selector::new(7)), "Selector(7)");
        assert_eq!(Selector::new(7).value(), 7);
    }
}

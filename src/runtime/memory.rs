use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::{
    file::Address,
    metadata::protocol::ProtocolRc,
    runtime::{AssociationKey, AssociationStore, ClassTable, ObjectId, ProtocolTable, Selector, SelectorTable},
};

/// Thread-safe in-memory implementation of every runtime service.
///
/// Suitable for tests and for hosts that only need the upgraded descriptors. Classes have to be
/// registered up front with [`Runtime::register_class`].
pub struct Runtime {
    selectors: DashMap<(String, Option<String>), Selector>,
    next_selector: AtomicU64,
    classes: DashMap<String, Address>,
    protocols: DashMap<String, ProtocolRc>,
    associations: DashMap<(ObjectId, AssociationKey), Address>,
}

impl Runtime {
    /// Create an empty runtime
    #[must_use]
    pub fn new() -> Self {
        Runtime {
            selectors: DashMap::new(),
            next_selector: AtomicU64::new(1),
            classes: DashMap::new(),
            protocols: DashMap::new(),
            associations: DashMap::new(),
        }
    }

    /// Create a runtime that already knows the `Protocol` class at `protocol_class`
    #[must_use]
    pub fn with_protocol_class(protocol_class: Address) -> Self {
        let runtime = Runtime::new();
        runtime.register_class("Protocol", protocol_class);
        runtime
    }

    /// Make the class `name` known at `address`
    pub fn register_class(&self, name: &str, address: Address) {
        self.classes.insert(name.to_string(), address);
    }

    /// Number of distinct selectors interned so far
    #[must_use]
    pub fn selector_count(&self) -> usize {
        self.selectors.len()
    }

    /// Number of registered protocols
    #[must_use]
    pub fn protocol_count(&self) -> usize {
        self.protocols.len()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new()
    }
}

impl SelectorTable for Runtime {
    fn register_selector(&self, name: &str, types: Option<&str>) -> Selector {
        *self
            .selectors
            .entry((name.to_string(), types.map(str::to_string)))
            .or_insert_with(|| Selector::new(self.next_selector.fetch_add(1, Ordering::Relaxed)))
    }
}

impl ClassTable for Runtime {
    fn lookup_class(&self, name: &str) -> Option<Address> {
        self.classes.get(name).map(|entry| *entry.value())
    }
}

impl ProtocolTable for Runtime {
    fn lookup_protocol(&self, name: &str) -> Option<ProtocolRc> {
        self.protocols.get(name).map(|entry| entry.value().clone())
    }

    fn register_protocol(&self, protocol: ProtocolRc) -> ProtocolRc {
        self.protocols
            .entry(protocol.name.clone())
            .or_insert(protocol)
            .value()
            .clone()
    }
}

impl AssociationStore for Runtime {
    fn set_association(&self, object: ObjectId, key: AssociationKey, value: Address) {
        self.associations.insert((object, key), value);
    }

    fn get_association(&self, object: ObjectId, key: AssociationKey) -> Option<Address> {
        self.associations.get(&(object, key)).map(|entry| *entry.value())
    }
}

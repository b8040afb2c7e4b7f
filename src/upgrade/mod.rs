//! Upgrade of legacy metadata to the current layout.
//!
//! The [`Upgrader`] is the entry point: it decodes legacy records from an [`Image`], upgrades
//! them and publishes the results to the host runtime through [`RuntimeServices`]. Classes and
//! protocols can be reached several times (a metaclass through every class that points at it, a
//! protocol through every class adopting it); each is upgraded once and the same
//! [`std::sync::Arc`] is returned on every later request.
//!
//! # Architecture
//!
//! - [`config`] - [`UpgradeConfig`] with strict and lenient presets
//! - `state` - tri-state visited maps keyed by legacy address
//! - `ivar`, `method`, `property` - list upgrades shared by the record upgrades
//! - `class`, `category`, `protocol` - the public record upgrades on [`Upgrader`]
//!
//! # Examples
//!
//! ```rust
//! use objcabi::{
//!     metadata::{builder::LegacyClass, class::ClassFlags, LegacyBuilder},
//!     runtime::Runtime,
//!     upgrade::Upgrader,
//!     Address, Target,
//! };
//!
//! let mut builder = LegacyBuilder::new(Address::new(0x10000), Target::LP64_LE);
//! let meta = builder.class(&LegacyClass { name: "Object", flags: ClassFlags::META, ..Default::default() })?;
//! let class = builder.class(&LegacyClass { isa: meta, name: "Object", flags: ClassFlags::CLASS, instance_size: 8, ..Default::default() })?;
//! let image = builder.finish()?;
//!
//! let runtime = Runtime::new();
//! let upgrader = Upgrader::new(&image, &runtime);
//! let object = upgrader.upgrade_class(class)?;
//! assert_eq!(object.name, "Object");
//! assert!(object.metaclass().is_some_and(|meta| meta.is_meta()));
//! assert_eq!(upgrader.legacy_class_for(&object), Some(class));
//! # Ok::<(), objcabi::Error>(())
//! ```

mod category;
mod class;
pub mod config;
mod ivar;
mod method;
mod property;
mod protocol;
mod state;

pub use config::UpgradeConfig;
pub use property::{encode_attributes, encoded_capacity, PropertyDescription};

use dashmap::DashMap;

use crate::{
    file::{Address, Image},
    metadata::{
        class::ClassRc,
        protocol::{MethodDescriptionListRc, ProtocolListRc, ProtocolRc},
    },
    runtime::RuntimeServices,
    Error::RecursionLimit,
    Result,
};

use state::Visited;

/// Upgrades legacy records of one image.
///
/// An `Upgrader` borrows the image and the runtime; the upgraded descriptors it returns are
/// owned and outlive it.
pub struct Upgrader<'a> {
    image: &'a Image,
    runtime: &'a dyn RuntimeServices,
    config: UpgradeConfig,
    classes: Visited<ClassRc>,
    gcc_protocols: Visited<ProtocolRc>,
    gsv1_protocols: Visited<ProtocolRc>,
    protocol_lists: DashMap<Address, ProtocolListRc>,
    method_descriptions: DashMap<Address, MethodDescriptionListRc>,
}

impl<'a> Upgrader<'a> {
    /// Create an upgrader with the strict default configuration
    #[must_use]
    pub fn new(image: &'a Image, runtime: &'a dyn RuntimeServices) -> Self {
        Self::with_config(image, runtime, UpgradeConfig::default())
    }

    /// Create an upgrader with a custom configuration
    #[must_use]
    pub fn with_config(
        image: &'a Image,
        runtime: &'a dyn RuntimeServices,
        config: UpgradeConfig,
    ) -> Self {
        Upgrader {
            image,
            runtime,
            config,
            classes: Visited::new(),
            gcc_protocols: Visited::new(),
            gsv1_protocols: Visited::new(),
            protocol_lists: DashMap::new(),
            method_descriptions: DashMap::new(),
        }
    }

    /// The image records are read from
    #[must_use]
    pub fn image(&self) -> &'a Image {
        self.image
    }

    /// The active configuration
    #[must_use]
    pub fn config(&self) -> &UpgradeConfig {
        &self.config
    }

    /// The upgraded class or metaclass for the legacy record at `address`, if already upgraded
    #[must_use]
    pub fn class_for_legacy(&self, address: Address) -> Option<ClassRc> {
        self.classes.get(address)
    }

    /// Number of classes and metaclasses upgraded so far
    #[must_use]
    pub fn upgraded_classes(&self) -> usize {
        self.classes.upgraded()
    }
}

/// Read a singly linked chain of list nodes, front to back.
///
/// # Errors
/// Returns [`crate::Error::RecursionLimit`] if the chain has more than `limit` nodes, and any
/// error of `read`.
pub(crate) fn read_chain<T>(
    address: Address,
    limit: usize,
    read: impl Fn(Address) -> Result<T>,
    next: impl Fn(&T) -> Address,
) -> Result<Vec<T>> {
    let mut nodes = Vec::new();
    let mut cursor = address;
    while !cursor.is_null() {
        if nodes.len() >= limit {
            return Err(RecursionLimit(limit));
        }
        let node = read(cursor)?;
        cursor = next(&node);
        nodes.push(node);
    }
    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn chain_limit() {
        // every node links to the following address
        let nodes = read_chain(Address::new(1), 10, Ok, |node| {
            if node.value() < 5 {
                node.offset(1)
            } else {
                Address::NULL
            }
        })
        .unwrap();
        assert_eq!(nodes.len(), 5);

        assert!(matches!(
            read_chain(Address::new(1), 4, Ok, |node| node.offset(1)),
            Err(Error::RecursionLimit(4))
        ));
        assert!(read_chain(Address::NULL, 0, Ok, |node| *node)
            .unwrap()
            .is_empty());
    }
}

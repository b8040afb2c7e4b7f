//! Protocol upgrade for both legacy shapes.
//!
//! Protocol lists and method description lists keep their layout across ABIs. They are decoded
//! once per legacy address and shared by every protocol that refers to them.

use std::sync::Arc;

use log::{debug, trace};

use crate::{
    file::Address,
    metadata::protocol::{
        MethodDescription, MethodDescriptionList, MethodDescriptionListRaw,
        MethodDescriptionListRc, Protocol, ProtocolGccRaw, ProtocolGsv1Raw, ProtocolList,
        ProtocolListRaw, ProtocolListRc, ProtocolRc,
    },
    runtime::ObjectId,
    upgrade::{property, state::Claimed, Upgrader},
    Error::{MissingRuntimeClass, ProtocolNotFound},
    Result,
};

/// Name of the class every upgraded protocol is an instance of
const PROTOCOL_CLASS: &str = "Protocol";

impl Upgrader<'_> {
    /// Upgrade a protocol in the GCC shape.
    ///
    /// The new protocol takes the runtime's `Protocol` class as `isa` and has no optional
    /// methods or properties. It is registered with the runtime, which keeps protocols canonical
    /// by name: the returned protocol is the registered instance. Upgrading the same record
    /// again returns whatever the runtime now knows under its name.
    ///
    /// # Errors
    /// Returns [`crate::Error::MissingRuntimeClass`] if the runtime has no `Protocol` class,
    /// [`crate::Error::ProtocolNotFound`] if an upgraded protocol is no longer registered and
    /// decoding errors for damaged records.
    pub fn upgrade_protocol_gcc(&self, address: Address) -> Result<ProtocolRc> {
        let claim = match self.gcc_protocols.claim(address)? {
            Claimed::Done(protocol) => {
                return self
                    .runtime
                    .lookup_protocol(&protocol.name)
                    .ok_or_else(|| ProtocolNotFound(protocol.name.clone()));
            }
            Claimed::Fresh(claim) => claim,
        };

        let raw = ProtocolGccRaw::read(self.image, address)?;
        let protocol = Protocol {
            id: ObjectId::next(),
            address,
            isa: self.protocol_class()?,
            name: self.image.c_str(raw.name)?.to_string(),
            name_address: raw.name,
            protocol_list: self.protocol_list(raw.protocol_list)?,
            instance_methods: self.method_descriptions(raw.instance_methods)?,
            class_methods: self.method_descriptions(raw.class_methods)?,
            optional_instance_methods: None,
            optional_class_methods: None,
            properties: None,
            optional_properties: None,
        };

        let canonical = self.runtime.register_protocol(Arc::new(protocol));
        debug!("Upgraded protocol '{}' at {}", canonical.name, address);
        Ok(claim.complete(canonical))
    }

    /// Upgrade a protocol in the GNUstep v1 shape.
    ///
    /// Required and optional property lists are upgraded, everything else is carried over. The
    /// protocol is not registered with the runtime. Upgrading the same record again returns the
    /// same protocol; a failed upgrade leaves the record untouched.
    ///
    /// # Errors
    /// Returns [`crate::Error::MissingRuntimeClass`] if the runtime has no `Protocol` class and
    /// decoding errors for damaged records.
    pub fn upgrade_protocol_gsv1(&self, address: Address) -> Result<ProtocolRc> {
        let claim = match self.gsv1_protocols.claim(address)? {
            Claimed::Done(protocol) => return Ok(protocol),
            Claimed::Fresh(claim) => claim,
        };

        let raw = ProtocolGsv1Raw::read(self.image, address)?;
        let properties =
            property::upgrade_property_list(self.image, raw.properties, self.runtime, &self.config)?;
        let optional_properties = property::upgrade_property_list(
            self.image,
            raw.optional_properties,
            self.runtime,
            &self.config,
        )?;

        let protocol = Arc::new(Protocol {
            id: ObjectId::next(),
            address,
            isa: self.protocol_class()?,
            name: self.image.c_str(raw.name)?.to_string(),
            name_address: raw.name,
            protocol_list: self.protocol_list(raw.protocol_list)?,
            instance_methods: self.method_descriptions(raw.instance_methods)?,
            class_methods: self.method_descriptions(raw.class_methods)?,
            optional_instance_methods: self.method_descriptions(raw.optional_instance_methods)?,
            optional_class_methods: self.method_descriptions(raw.optional_class_methods)?,
            properties,
            optional_properties,
        });

        debug!("Upgraded protocol '{}' at {}", protocol.name, address);
        Ok(claim.complete(protocol))
    }

    fn protocol_class(&self) -> Result<Address> {
        self.runtime
            .lookup_class(PROTOCOL_CLASS)
            .ok_or_else(|| MissingRuntimeClass(PROTOCOL_CLASS.to_string()))
    }

    /// The shared protocol list at `address`
    fn protocol_list(&self, address: Address) -> Result<Option<ProtocolListRc>> {
        let Some(address) = address.non_null() else {
            return Ok(None);
        };
        if let Some(list) = self.protocol_lists.get(&address) {
            return Ok(Some(list.value().clone()));
        }

        let raw = ProtocolListRaw::read(self.image, address, self.config.max_list_count)?;
        trace!("Decoded protocol list at {} ({} entries)", address, raw.protocols.len());
        let list = Arc::new(ProtocolList {
            address,
            next: raw.next,
            protocols: raw.protocols,
        });
        Ok(Some(self.protocol_lists.entry(address).or_insert(list).value().clone()))
    }

    /// The shared method description list at `address`
    fn method_descriptions(&self, address: Address) -> Result<Option<MethodDescriptionListRc>> {
        let Some(address) = address.non_null() else {
            return Ok(None);
        };
        if let Some(list) = self.method_descriptions.get(&address) {
            return Ok(Some(list.value().clone()));
        }

        let raw = MethodDescriptionListRaw::read(self.image, address, self.config.max_list_count)?;
        let descriptions = raw
            .descriptions
            .iter()
            .map(|description| {
                Ok(MethodDescription {
                    name: self.image.c_str(description.name)?.to_string(),
                    types: self.image.opt_c_str(description.types)?.map(str::to_string),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let list = Arc::new(MethodDescriptionList {
            address,
            descriptions,
        });
        Ok(Some(self.method_descriptions.entry(address).or_insert(list).value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        file::Target,
        metadata::{
            builder::{LegacyProperty, LegacyProtocol},
            property::PropertyAttributes,
            LegacyBuilder,
        },
        runtime::{ProtocolTable, Runtime},
        test::{fixture, BASE},
        upgrade::Upgrader,
        Error,
    };

    #[test]
    fn gcc_protocol() {
        let fixture = fixture();
        let runtime = Runtime::with_protocol_class(fixture.protocol_class);
        let upgrader = Upgrader::new(&fixture.image, &runtime);

        let counting = upgrader.upgrade_protocol_gcc(fixture.gcc_protocol).unwrap();
        assert_eq!(counting.name, "Counting");
        assert_eq!(counting.isa, fixture.protocol_class);
        assert_eq!(counting.address, fixture.gcc_protocol);
        let required = counting.instance_methods.as_ref().unwrap();
        assert_eq!(required.descriptions[0].name, "count");
        assert_eq!(required.descriptions[0].types.as_deref(), Some("q16@0:8"));
        assert!(counting.class_methods.is_none());
        assert!(counting.optional_instance_methods.is_none());
        assert!(counting.properties.is_none());

        let registered = runtime.lookup_protocol("Counting").unwrap();
        assert!(Arc::ptr_eq(&registered, &counting));

        let again = upgrader.upgrade_protocol_gcc(fixture.gcc_protocol).unwrap();
        assert!(Arc::ptr_eq(&again, &counting));
        assert_eq!(runtime.protocol_count(), 1);
    }

    #[test]
    fn gcc_protocol_is_canonical_by_name() {
        let fixture = fixture();
        let runtime = Runtime::with_protocol_class(fixture.protocol_class);
        let existing = runtime.register_protocol(Arc::new(crate::metadata::protocol::Protocol::named(
            "Counting",
            crate::Address::new(0x1),
        )));
        let upgrader = Upgrader::new(&fixture.image, &runtime);

        let counting = upgrader.upgrade_protocol_gcc(fixture.gcc_protocol).unwrap();
        assert!(Arc::ptr_eq(&counting, &existing));
    }

    #[test]
    fn gcc_protocol_needs_protocol_class() {
        let fixture = fixture();
        let runtime = Runtime::new();
        let upgrader = Upgrader::new(&fixture.image, &runtime);
        assert!(matches!(
            upgrader.upgrade_protocol_gcc(fixture.gcc_protocol),
            Err(Error::MissingRuntimeClass(name)) if name == "Protocol"
        ));
        assert_eq!(runtime.protocol_count(), 0);

        // once the class exists the record can be upgraded
        runtime.register_class("Protocol", fixture.protocol_class);
        assert!(upgrader.upgrade_protocol_gcc(fixture.gcc_protocol).is_ok());
    }

    #[test]
    fn gsv1_protocol() {
        let fixture = fixture();
        let runtime = Runtime::with_protocol_class(fixture.protocol_class);
        let upgrader = Upgrader::new(&fixture.image, &runtime);

        let labelled = upgrader.upgrade_protocol_gsv1(fixture.gsv1_protocol).unwrap();
        assert_eq!(labelled.name, "Labelled");
        assert_eq!(labelled.isa, fixture.protocol_class);

        let label = labelled.properties.as_ref().unwrap().get("label").unwrap();
        assert_eq!(label.attributes.as_bytes(), b"\0T@,C,N,Vlabel\0");
        assert!(labelled.optional_properties.is_none());
        assert_eq!(
            labelled.optional_instance_methods.as_ref().unwrap().descriptions[0].name,
            "resetLabel"
        );

        let adopted = labelled.protocol_list.as_ref().unwrap();
        assert_eq!(adopted.protocols, vec![fixture.gcc_protocol]);

        let again = upgrader.upgrade_protocol_gsv1(fixture.gsv1_protocol).unwrap();
        assert!(Arc::ptr_eq(&again, &labelled));
        // not published by name
        assert_eq!(runtime.protocol_count(), 0);
    }

    #[test]
    fn lists_are_shared() {
        let mut builder = LegacyBuilder::new(BASE, Target::LP64_LE);
        let adopted = builder.protocol_list(&[crate::Address::new(0x99)], crate::Address::NULL).unwrap();
        let required = builder.method_descriptions(&[("run", "v16@0:8")]).unwrap();
        let first = builder
            .protocol_gcc(&LegacyProtocol {
                name: "First",
                protocol_list: adopted,
                instance_methods: required,
                ..Default::default()
            })
            .unwrap();
        let second = builder
            .protocol_gsv1(&LegacyProtocol {
                name: "Second",
                protocol_list: adopted,
                instance_methods: required,
                ..Default::default()
            })
            .unwrap();
        let protocol_class = builder.string("Protocol");
        let image = builder.finish().unwrap();

        let runtime = Runtime::with_protocol_class(protocol_class);
        let upgrader = Upgrader::new(&image, &runtime);
        let first = upgrader.upgrade_protocol_gcc(first).unwrap();
        let second = upgrader.upgrade_protocol_gsv1(second).unwrap();

        assert!(Arc::ptr_eq(
            first.protocol_list.as_ref().unwrap(),
            second.protocol_list.as_ref().unwrap()
        ));
        assert!(Arc::ptr_eq(
            first.instance_methods.as_ref().unwrap(),
            second.instance_methods.as_ref().unwrap()
        ));
        assert_eq!(first.protocol_list.as_ref().unwrap().address, adopted);
    }

    #[test]
    fn failed_gsv1_upgrade_is_retried() {
        let mut builder = LegacyBuilder::new(BASE, Target::LP64_LE);
        let properties = builder
            .property_list(
                &[LegacyProperty {
                    name: b"broken",
                    attributes: PropertyAttributes::GETTER,
                    getter_types: Some("i16@0:8"),
                    ..Default::default()
                }],
                crate::Address::NULL,
            )
            .unwrap();
        let record = builder
            .protocol_gsv1(&LegacyProtocol {
                name: "Broken",
                properties,
                ..Default::default()
            })
            .unwrap();
        let protocol_class = builder.string("Protocol");
        let image = builder.finish().unwrap();

        let runtime = Runtime::with_protocol_class(protocol_class);
        let upgrader = Upgrader::new(&image, &runtime);
        assert!(matches!(
            upgrader.upgrade_protocol_gsv1(record),
            Err(Error::Malformed { .. })
        ));
        // the failure is reported again rather than as an upgrade in progress
        assert!(matches!(
            upgrader.upgrade_protocol_gsv1(record),
            Err(Error::Malformed { .. })
        ));
    }
}

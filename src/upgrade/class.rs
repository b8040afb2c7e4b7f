//! Class and metaclass upgrade.

use std::sync::Arc;

use log::{debug, warn};

use crate::{
    file::Address,
    metadata::class::{Class, ClassIsa, ClassRaw, ClassRc},
    runtime::{AssociationKey, ObjectId},
    upgrade::{ivar, method, property, state::Claimed, Upgrader},
    Result,
};

impl Upgrader<'_> {
    /// Upgrade the legacy class at `address`, together with its metaclass.
    ///
    /// Ivars, methods and properties are upgraded, method selectors are registered with the
    /// runtime and the upgraded class is associated with its legacy record under
    /// [`AssociationKey::LEGACY_CLASS`]. The metaclass (the record `isa` points at) is upgraded
    /// the same way, its own `isa` is kept as is. Upgrading an already upgraded class returns the
    /// same descriptor.
    ///
    /// # Errors
    /// Returns [`crate::Error::UpgradeInProgress`] if the class is reached again during its own
    /// upgrade, decoding errors for damaged records and, with `validate_metaclass`,
    /// [`crate::Error::Malformed`] if `isa` does not point at a metaclass.
    pub fn upgrade_class(&self, address: Address) -> Result<ClassRc> {
        let claim = match self.classes.claim(address)? {
            Claimed::Done(class) => return Ok(class),
            Claimed::Fresh(claim) => claim,
        };

        let raw = ClassRaw::read(self.image, address)?;
        let mut class = self.build_class(&raw)?;
        if !raw.is_meta() {
            class.isa = ClassIsa::Metaclass(self.upgrade_metaclass(raw.isa)?);
        }

        let class = Arc::new(class);
        if !class.is_meta() {
            self.runtime
                .set_association(class.id, AssociationKey::LEGACY_CLASS, address);
        }
        debug!(
            "Upgraded {} '{}' at {}",
            if class.is_meta() { "metaclass" } else { "class" },
            class.name,
            address
        );
        Ok(claim.complete(class))
    }

    /// The legacy record `class` was upgraded from
    #[must_use]
    pub fn legacy_class_for(&self, class: &Class) -> Option<Address> {
        self.runtime
            .get_association(class.id, AssociationKey::LEGACY_CLASS)
    }

    /// Upgrade the metaclass at `address` without following its own `isa`.
    fn upgrade_metaclass(&self, address: Address) -> Result<ClassRc> {
        let claim = match self.classes.claim(address)? {
            Claimed::Done(meta) => return Ok(meta),
            Claimed::Fresh(claim) => claim,
        };

        let raw = ClassRaw::read(self.image, address)?;
        if !raw.is_meta() {
            if self.config.validate_metaclass {
                return Err(malformed_error!(
                    "Class record at {} is used as metaclass but is not flagged as one",
                    address
                ));
            }
            warn!("Class record at {address} is used as metaclass but is not flagged as one");
        }

        let meta = Arc::new(self.build_class(&raw)?);
        debug!("Upgraded metaclass '{}' at {}", meta.name, address);
        Ok(claim.complete(meta))
    }

    /// Upgrade the contents of a class record; `isa` keeps the legacy pointer.
    fn build_class(&self, raw: &ClassRaw) -> Result<Class> {
        let class = Class {
            id: ObjectId::next(),
            isa: ClassIsa::Legacy(raw.isa),
            name: self.image.c_str(raw.name)?.to_string(),
            name_address: raw.name,
            version: raw.version,
            info: raw.flags(),
            instance_size: raw.instance_size,
            ivars: ivar::upgrade_ivar_list(self.image, raw, &self.config)?,
            methods: method::upgrade_method_list(self.image, raw.methods, &self.config)?,
            protocols: raw.protocols,
            abi_version: raw.abi_version,
            properties: property::upgrade_property_list(
                self.image,
                raw.properties,
                self.runtime,
                &self.config,
            )?,
        };

        if let Some(methods) = &class.methods {
            methods.register_selectors(self.runtime);
        }
        Ok(class)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        file::{Address, Target},
        metadata::{builder::LegacyClass, class::ClassFlags, ivar::Ownership, LegacyBuilder},
        runtime::{Runtime, SelectorTable},
        test::{fixture, BASE},
        upgrade::{UpgradeConfig, Upgrader},
        Error,
    };

    #[test]
    fn class_with_metaclass() {
        let fixture = fixture();
        let runtime = Runtime::new();
        let upgrader = Upgrader::new(&fixture.image, &runtime);

        let counter = upgrader.upgrade_class(fixture.class).unwrap();
        assert_eq!(counter.name, "Counter");
        assert_eq!(counter.instance_size, 24);
        assert_eq!(counter.version, 3);
        assert!(!counter.is_meta());
        assert!(counter.info.contains(ClassFlags::NEW_ABI));

        let ivars = counter.ivars.as_ref().unwrap();
        let sizes: Vec<i32> = ivars.iter().map(|ivar| ivar.size).collect();
        assert_eq!(sizes, vec![8, 8, 8]);
        assert_eq!(ivars.get("label").unwrap().ownership, Ownership::Strong);
        assert_eq!(ivars.get("count").unwrap().ownership, Ownership::Unsafe);

        let names: Vec<&str> = counter.methods().map(|method| method.name.as_str()).collect();
        assert_eq!(names, vec!["init", "count", "dealloc"]);
        let init = counter.method("init").unwrap();
        assert_eq!(
            init.selector.get().copied(),
            Some(runtime.register_selector("init", Some("@16@0:8")))
        );

        let count = counter.properties.as_ref().unwrap().get("count").unwrap();
        assert_eq!(count.attributes.as_bytes(), b"\0Tq,R,N,Vcount\0");

        let meta = counter.metaclass().unwrap();
        assert!(meta.is_meta());
        assert_eq!(meta.name, "Counter");
        assert!(meta.method("new").is_some());
        assert!(meta.metaclass().is_none());
        assert!(matches!(meta.isa, crate::metadata::class::ClassIsa::Legacy(isa) if isa == fixture.root_meta));

        assert_eq!(upgrader.legacy_class_for(&counter), Some(fixture.class));
        assert_eq!(upgrader.legacy_class_for(meta), None);
        assert_eq!(upgrader.upgraded_classes(), 2);
    }

    #[test]
    fn upgraded_once() {
        let fixture = fixture();
        let runtime = Runtime::new();
        let upgrader = Upgrader::new(&fixture.image, &runtime);

        let first = upgrader.upgrade_class(fixture.class).unwrap();
        let selectors = runtime.selector_count();
        let second = upgrader.upgrade_class(fixture.class).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(runtime.selector_count(), selectors);

        let meta = upgrader.class_for_legacy(fixture.meta).unwrap();
        assert!(Arc::ptr_eq(first.metaclass().unwrap(), &meta));
        // upgrading the metaclass directly hands out the same descriptor
        assert!(Arc::ptr_eq(&upgrader.upgrade_class(fixture.meta).unwrap(), &meta));
    }

    #[test]
    fn shared_metaclass() {
        let mut builder = LegacyBuilder::new(BASE, Target::LP64_LE);
        let meta = builder
            .class(&LegacyClass { name: "Shared", flags: ClassFlags::META, ..Default::default() })
            .unwrap();
        let first = builder
            .class(&LegacyClass { isa: meta, name: "A", flags: ClassFlags::CLASS, ..Default::default() })
            .unwrap();
        let second = builder
            .class(&LegacyClass { isa: meta, name: "B", flags: ClassFlags::CLASS, ..Default::default() })
            .unwrap();
        let image = builder.finish().unwrap();
        let runtime = Runtime::new();
        let upgrader = Upgrader::new(&image, &runtime);

        let a = upgrader.upgrade_class(first).unwrap();
        let b = upgrader.upgrade_class(second).unwrap();
        assert!(Arc::ptr_eq(a.metaclass().unwrap(), b.metaclass().unwrap()));
        assert_eq!(upgrader.upgraded_classes(), 3);
    }

    #[test]
    fn metaclass_flag() {
        let mut builder = LegacyBuilder::new(BASE, Target::LP64_LE);
        let not_meta = builder
            .class(&LegacyClass { name: "Plain", flags: ClassFlags::CLASS, ..Default::default() })
            .unwrap();
        let class = builder
            .class(&LegacyClass { isa: not_meta, name: "Odd", flags: ClassFlags::CLASS, ..Default::default() })
            .unwrap();
        let image = builder.finish().unwrap();
        let runtime = Runtime::new();

        let strict = Upgrader::new(&image, &runtime);
        assert!(matches!(strict.upgrade_class(class), Err(Error::Malformed { .. })));
        // the failed upgrade left nothing behind
        assert!(strict.class_for_legacy(class).is_none());
        assert_eq!(strict.upgraded_classes(), 0);

        let lenient = Upgrader::with_config(&image, &runtime, UpgradeConfig::lenient());
        let odd = lenient.upgrade_class(class).unwrap();
        assert_eq!(odd.metaclass().unwrap().name, "Plain");
    }

    #[test]
    fn self_referencing_class() {
        let mut builder = LegacyBuilder::new(BASE, Target::LP64_LE);
        let record = builder.reserve_class(false);
        builder
            .write_class(
                record,
                &LegacyClass { isa: record, name: "Loop", flags: ClassFlags::CLASS, ..Default::default() },
            )
            .unwrap();
        let image = builder.finish().unwrap();
        let runtime = Runtime::new();
        let upgrader = Upgrader::new(&image, &runtime);

        assert!(matches!(
            upgrader.upgrade_class(record),
            Err(Error::UpgradeInProgress(address)) if address == record
        ));
        assert_eq!(upgrader.upgraded_classes(), 0);
    }

    #[test]
    fn dangling_class() {
        let fixture = fixture();
        let runtime = Runtime::new();
        let upgrader = Upgrader::new(&fixture.image, &runtime);
        assert!(upgrader.upgrade_class(Address::new(0x10)).is_err());
        assert!(upgrader.upgrade_class(Address::NULL).is_err());
    }
}

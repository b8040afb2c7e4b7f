//! Serialization of upgraded descriptors into current-layout records.
//!
//! The [`Emitter`] writes classes, categories and protocols into a fresh arena that is meant to
//! be mapped next to the legacy image. Everything the upgrade copied verbatim stays a reference
//! into the legacy image: names, method types, implementations, protocol references, ivar offset
//! variables and the shared protocol and method description lists. Only synthesized data (ivar,
//! method and property records, attribute encodings and property types) lands in the arena.
//!
//! Every descriptor is written once. Emitting the same class, metaclass, list or protocol again
//! returns the address of the first emission, so shared structure stays shared in the output.
//!
//! # Examples
//!
//! ```rust
//! use objcabi::{
//!     emitter::Emitter,
//!     metadata::{builder::LegacyClass, class::ClassFlags, LegacyBuilder},
//!     runtime::Runtime,
//!     upgrade::Upgrader,
//!     Address, Target,
//! };
//!
//! let mut builder = LegacyBuilder::new(Address::new(0x10000), Target::LP64_LE);
//! let meta = builder.class(&LegacyClass { name: "Object", flags: ClassFlags::META, ..Default::default() })?;
//! let class = builder.class(&LegacyClass { isa: meta, name: "Object", flags: ClassFlags::CLASS, ..Default::default() })?;
//! let legacy = builder.finish()?;
//!
//! let runtime = Runtime::new();
//! let object = Upgrader::new(&legacy, &runtime).upgrade_class(class)?;
//!
//! let mut emitter = Emitter::new(Address::new(0x80000), Target::LP64_LE);
//! let record = emitter.emit_class(&object)?;
//! let current = emitter.finish()?;
//!
//! let mut reader = current.record(record)?;
//! let isa = reader.pointer()?;
//! assert_eq!(reader.pointer()?, Address::NULL); // super_class is resolved later
//! assert_eq!(reader.pointer()?, object.name_address);
//! assert!(current.contains(isa, 1));
//! # Ok::<(), objcabi::Error>(())
//! ```

use std::collections::HashMap;

use log::trace;

use crate::{
    file::{Address, Image, ImageBuilder, Target},
    metadata::{
        category::Category,
        class::{Class, ClassIsa},
        ivar::{Ivar, IvarList},
        method::{Method, MethodList},
        property::{Property, PropertyList},
        protocol::Protocol,
    },
    runtime::{ObjectId, Selector},
    Result,
};

/// Writes current-layout records into a new arena.
pub struct Emitter {
    image: ImageBuilder,
    classes: HashMap<ObjectId, Address>,
    protocols: HashMap<ObjectId, Address>,
    ivar_lists: HashMap<Address, Address>,
    method_lists: HashMap<Address, Address>,
    property_lists: HashMap<Address, Address>,
}

impl Emitter {
    /// Create an emitter whose arena starts at `base`
    #[must_use]
    pub fn new(base: Address, target: Target) -> Self {
        Emitter {
            image: ImageBuilder::new(base, target),
            classes: HashMap::new(),
            protocols: HashMap::new(),
            ivar_lists: HashMap::new(),
            method_lists: HashMap::new(),
            property_lists: HashMap::new(),
        }
    }

    /// The target records are written for
    #[must_use]
    pub fn target(&self) -> Target {
        self.image.target()
    }

    /// Write `class`, and its metaclass first if it has an upgraded one.
    ///
    /// `super_class`, `dtable`, `subclass_list`, `sibling_class`, the C++ hooks and `extra_data`
    /// are left null for the loader to fill in.
    ///
    /// # Errors
    /// Only fails on internal layout errors.
    pub fn emit_class(&mut self, class: &Class) -> Result<Address> {
        if let Some(address) = self.classes.get(&class.id) {
            return Ok(*address);
        }

        let isa = match &class.isa {
            ClassIsa::Metaclass(meta) => self.emit_class(meta)?,
            ClassIsa::Legacy(isa) => *isa,
        };
        let ivars = match &class.ivars {
            Some(ivars) => self.emit_ivar_list(ivars)?,
            None => Address::NULL,
        };
        let methods = self.emit_method_chain(class.methods.as_deref())?;
        let properties = self.emit_property_chain(class.properties.as_deref())?;

        let record = self.image.alloc_record(Class::SHAPE);
        self.classes.insert(class.id, record);

        let mut writer = self.image.writer(record)?;
        writer.pointer(isa)?;
        writer.pointer(Address::NULL)?; // super_class
        writer.pointer(class.name_address)?;
        writer.long(class.version)?;
        writer.ulong(class.info.bits())?;
        writer.long(class.instance_size)?;
        writer.pointer(ivars)?;
        writer.pointer(methods)?;
        for _ in ["dtable", "subclass_list", "cxx_construct", "cxx_destruct", "sibling_class"] {
            writer.pointer(Address::NULL)?;
        }
        writer.pointer(class.protocols)?;
        writer.pointer(Address::NULL)?; // extra_data
        writer.long(class.abi_version)?;
        writer.pointer(properties)?;

        trace!("Emitted class '{}' at {}", class.name, record);
        Ok(record)
    }

    /// Write `category` and its method lists.
    ///
    /// # Errors
    /// Only fails on internal layout errors.
    pub fn emit_category(&mut self, category: &Category) -> Result<Address> {
        let instance_methods = self.emit_method_chain(category.instance_methods.as_deref())?;
        let class_methods = self.emit_method_chain(category.class_methods.as_deref())?;

        let record = self.image.alloc_record(Category::SHAPE);
        let mut writer = self.image.writer(record)?;
        writer.pointer(category.name_address)?;
        writer.pointer(category.class_name_address)?;
        writer.pointer(instance_methods)?;
        writer.pointer(class_methods)?;
        writer.pointer(category.protocols)?;
        writer.pointer(Address::NULL)?; // properties
        writer.pointer(Address::NULL)?; // class_properties

        trace!("Emitted category '{}({})' at {}", category.class_name, category.name, record);
        Ok(record)
    }

    /// Write `protocol`; protocol and method description lists stay in the legacy image.
    ///
    /// # Errors
    /// Only fails on internal layout errors.
    pub fn emit_protocol(&mut self, protocol: &Protocol) -> Result<Address> {
        if let Some(address) = self.protocols.get(&protocol.id) {
            return Ok(*address);
        }

        let properties = self.emit_property_chain(protocol.properties.as_deref())?;
        let optional_properties =
            self.emit_property_chain(protocol.optional_properties.as_deref())?;

        let record = self.image.alloc_record(Protocol::SHAPE);
        self.protocols.insert(protocol.id, record);

        let legacy = |list: Option<Address>| list.unwrap_or(Address::NULL);
        let mut writer = self.image.writer(record)?;
        writer.pointer(protocol.isa)?;
        writer.pointer(protocol.name_address)?;
        writer.pointer(legacy(protocol.protocol_list.as_ref().map(|list| list.address)))?;
        for descriptions in [
            &protocol.instance_methods,
            &protocol.class_methods,
            &protocol.optional_instance_methods,
            &protocol.optional_class_methods,
        ] {
            writer.pointer(legacy(descriptions.as_ref().map(|list| list.address)))?;
        }
        writer.pointer(properties)?;
        writer.pointer(optional_properties)?;
        writer.pointer(Address::NULL)?; // class_properties
        writer.pointer(Address::NULL)?; // optional_class_properties

        trace!("Emitted protocol '{}' at {}", protocol.name, record);
        Ok(record)
    }

    /// Write an ivar list
    ///
    /// # Errors
    /// Only fails on internal layout errors.
    pub fn emit_ivar_list(&mut self, list: &IvarList) -> Result<Address> {
        if let Some(address) = self.ivar_lists.get(&list.address) {
            return Ok(*address);
        }

        let element = self.image.target().layout(Ivar::SHAPE).size;
        let record = self
            .image
            .alloc_array(IvarList::HEADER, Ivar::SHAPE, list.len());
        self.ivar_lists.insert(list.address, record);

        let mut writer = self.image.writer(record)?;
        writer.int(count(list.len()))?;
        writer.size_t(element as u64)?;
        for ivar in list.iter() {
            writer.pointer(ivar.name_address)?;
            writer.pointer(ivar.types_address)?;
            writer.pointer(ivar.offset_address)?;
            writer.uint(ivar.size as u32)?;
            writer.uint(ivar.flags())?;
        }
        Ok(record)
    }

    /// Write a method list chain, tail first; null for `None`
    ///
    /// # Errors
    /// Only fails on internal layout errors.
    pub fn emit_method_chain(&mut self, list: Option<&MethodList>) -> Result<Address> {
        let nodes: Vec<&MethodList> = list.map(|list| list.nodes().collect()).unwrap_or_default();

        let mut next = Address::NULL;
        for node in nodes.into_iter().rev() {
            next = self.emit_method_node(node, next)?;
        }
        Ok(next)
    }

    /// Write one method list node.
    ///
    /// The selector field of each entry holds the runtime's selector handle once the method is
    /// registered, not a pointer into either image. Unregistered methods keep the legacy name
    /// pointer there.
    fn emit_method_node(&mut self, list: &MethodList, next: Address) -> Result<Address> {
        if let Some(address) = self.method_lists.get(&list.address) {
            return Ok(*address);
        }

        let element = self.image.target().layout(Method::SHAPE).size;
        let record = self
            .image
            .alloc_array(MethodList::HEADER, Method::SHAPE, list.methods.len());
        self.method_lists.insert(list.address, record);

        let mut writer = self.image.writer(record)?;
        writer.pointer(next)?;
        writer.int(count(list.methods.len()))?;
        writer.size_t(element as u64)?;
        for method in &list.methods {
            let selector = method
                .selector
                .get()
                .map_or(method.name_address, |selector| selector_field(*selector));
            writer.pointer(method.imp)?;
            writer.pointer(selector)?;
            writer.pointer(method.types_address)?;
        }
        Ok(record)
    }

    /// Write a property list chain, tail first; null for `None`
    ///
    /// # Errors
    /// Only fails on internal layout errors.
    pub fn emit_property_chain(&mut self, list: Option<&PropertyList>) -> Result<Address> {
        let nodes: Vec<&PropertyList> = list.map(|list| list.nodes().collect()).unwrap_or_default();

        let mut next = Address::NULL;
        for node in nodes.into_iter().rev() {
            next = self.emit_property_node(node, next)?;
        }
        Ok(next)
    }

    /// Write one property list node.
    ///
    /// Getter and setter fields hold runtime selector handles (null when absent), not pointers
    /// into either image.
    fn emit_property_node(&mut self, list: &PropertyList, next: Address) -> Result<Address> {
        if let Some(address) = self.property_lists.get(&list.address) {
            return Ok(*address);
        }

        let strings: Vec<[Address; 3]> = list
            .properties
            .iter()
            .map(|property| self.property_strings(property))
            .collect();
        let element = self.image.target().layout(Property::SHAPE).size;
        let record = self
            .image
            .alloc_array(PropertyList::HEADER, Property::SHAPE, list.properties.len());
        self.property_lists.insert(list.address, record);

        let mut writer = self.image.writer(record)?;
        writer.int(count(list.properties.len()))?;
        writer.int(count(element))?;
        writer.pointer(next)?;
        for (property, [name, attributes, type_encoding]) in list.properties.iter().zip(strings) {
            let selector =
                |selector: Option<Selector>| selector.map_or(Address::NULL, selector_field);
            writer.pointer(name)?;
            writer.pointer(attributes)?;
            writer.pointer(type_encoding)?;
            writer.pointer(selector(property.getter))?;
            writer.pointer(selector(property.setter))?;
        }
        Ok(record)
    }

    /// Name, attribute encoding and type of `property`, interned in the arena
    fn property_strings(&mut self, property: &Property) -> [Address; 3] {
        let encoded = property.attributes.as_bytes();
        // the trailing NUL is added back by the arena
        let attributes = match encoded.split_last() {
            Some((0, bytes)) => self.image.push_c_bytes(bytes),
            _ => self.image.push_c_bytes(encoded),
        };
        [
            self.image.push_str(&property.name),
            attributes,
            self.image.push_str(&property.type_encoding),
        ]
    }

    /// Freeze the arena into an image.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] if nothing was emitted.
    pub fn finish(self) -> Result<Image> {
        self.image.finish()
    }
}

/// A selector handle stored in a pointer-sized field; the value is opaque to both images.
fn selector_field(selector: Selector) -> Address {
    Address::new(selector.value())
}

fn count(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::ivar::IVAR_ALIGN_SHIFT,
        runtime::{Runtime, SelectorTable},
        test::fixture,
        upgrade::Upgrader,
    };

    const ARENA: Address = Address::new(0x0100_0000);

    #[test]
    fn class_records() {
        let fixture = fixture();
        let runtime = Runtime::with_protocol_class(fixture.protocol_class);
        let upgrader = Upgrader::new(&fixture.image, &runtime);
        let counter = upgrader.upgrade_class(fixture.class).unwrap();

        let mut emitter = Emitter::new(ARENA, Target::LP64_LE);
        let record = emitter.emit_class(&counter).unwrap();
        assert_eq!(emitter.emit_class(&counter).unwrap(), record);
        let meta_record = emitter.emit_class(counter.metaclass().unwrap()).unwrap();
        let image = emitter.finish().unwrap();

        let mut reader = image.record(record).unwrap();
        assert_eq!(reader.pointer().unwrap(), meta_record);
        assert_eq!(reader.pointer().unwrap(), Address::NULL);
        assert_eq!(reader.pointer().unwrap(), counter.name_address);
        assert_eq!(reader.long().unwrap(), 3);
        assert_eq!(reader.ulong().unwrap(), counter.info.bits());
        assert_eq!(reader.long().unwrap(), 24);
        let ivars = reader.pointer().unwrap();
        let methods = reader.pointer().unwrap();
        for _ in 0..5 {
            assert_eq!(reader.pointer().unwrap(), Address::NULL);
        }
        assert_eq!(reader.pointer().unwrap(), counter.protocols);
        assert_eq!(reader.pointer().unwrap(), Address::NULL);
        assert_eq!(reader.long().unwrap(), 1);
        let properties = reader.pointer().unwrap();
        assert_eq!(reader.consumed(), Target::LP64_LE.layout(Class::SHAPE).size);

        // ivar list: count, element size, then { name, type, offset, size, flags }
        let mut reader = image.record(ivars).unwrap();
        assert_eq!(reader.int().unwrap(), 3);
        assert_eq!(reader.size_t().unwrap(), 32);
        let label = &counter.ivars.as_ref().unwrap().ivars[2];
        let mut entry = image.record(ivars.offset(16 + 2 * 32)).unwrap();
        assert_eq!(entry.pointer().unwrap(), label.name_address);
        assert_eq!(entry.pointer().unwrap(), label.types_address);
        assert_eq!(entry.pointer().unwrap(), label.offset_address);
        assert_eq!(entry.uint().unwrap(), 8);
        assert_eq!(entry.uint().unwrap(), 1 | (3 << IVAR_ALIGN_SHIFT));

        // method list: next, count, element size, then { imp, selector, types }
        let mut reader = image.record(methods).unwrap();
        let next = reader.pointer().unwrap();
        assert!(image.contains(next, 1));
        assert_eq!(reader.int().unwrap(), 2);
        assert_eq!(reader.size_t().unwrap(), 24);
        let init = counter.method("init").unwrap();
        let mut entry = image.record(methods.offset(24)).unwrap();
        assert_eq!(entry.pointer().unwrap(), init.imp);
        assert_eq!(
            entry.pointer().unwrap().value(),
            runtime.register_selector("init", Some("@16@0:8")).value()
        );
        assert_eq!(entry.pointer().unwrap(), init.types_address);
        let mut tail = image.record(next).unwrap();
        assert_eq!(tail.pointer().unwrap(), Address::NULL);
        assert_eq!(tail.int().unwrap(), 1);

        // property list: count, element size, next, then { name, attributes, type, getter, setter }
        let mut reader = image.record(properties).unwrap();
        assert_eq!(reader.int().unwrap(), 1);
        assert_eq!(reader.int().unwrap(), 40);
        assert_eq!(reader.pointer().unwrap(), Address::NULL);
        let name = reader.pointer().unwrap();
        let attributes = reader.pointer().unwrap();
        let type_encoding = reader.pointer().unwrap();
        assert_eq!(image.c_str(name).unwrap(), "count");
        assert_eq!(image.c_bytes(attributes).unwrap(), b"");
        assert_eq!(image.c_str(attributes.offset(1)).unwrap(), "Tq,R,N,Vcount");
        assert_eq!(image.c_str(type_encoding).unwrap(), "q");
        let getter = counter.properties.as_ref().unwrap().properties[0].getter.unwrap();
        assert_eq!(reader.pointer().unwrap().value(), getter.value());
        assert_eq!(reader.pointer().unwrap(), Address::NULL);
    }

    #[test]
    fn selector_fields_hold_runtime_handles() {
        let fixture = fixture();
        let runtime = Runtime::new();
        let counter = Upgrader::new(&fixture.image, &runtime)
            .upgrade_class(fixture.class)
            .unwrap();

        let mut emitter = Emitter::new(ARENA, Target::LP64_LE);
        let record = emitter.emit_class(&counter).unwrap();
        let image = emitter.finish().unwrap();

        // methods follow isa, super_class, name, version, info, instance_size and ivars
        let methods = image.read_pointer(record.offset(7 * 8)).unwrap();
        let count = counter.method("count").unwrap();
        // second entry of the head node, after { imp }
        let field = image.read_pointer(methods.offset(24 + 24 + 8)).unwrap();
        let handle = runtime.register_selector("count", Some("q16@0:8"));
        assert_eq!(field, selector_field(handle));
        assert_eq!(count.selector.get(), Some(&handle));
        assert!(!image.contains(field, 1));
        assert!(!fixture.image.contains(field, 1));
    }

    #[test]
    fn metaclass_keeps_legacy_isa() {
        let fixture = fixture();
        let runtime = Runtime::new();
        let upgrader = Upgrader::new(&fixture.image, &runtime);
        let counter = upgrader.upgrade_class(fixture.class).unwrap();

        let mut emitter = Emitter::new(ARENA, Target::LP64_LE);
        let meta = emitter.emit_class(counter.metaclass().unwrap()).unwrap();
        let image = emitter.finish().unwrap();
        assert_eq!(image.read_pointer(meta).unwrap(), fixture.root_meta);
    }

    #[test]
    fn protocol_records() {
        let fixture = fixture();
        let runtime = Runtime::with_protocol_class(fixture.protocol_class);
        let upgrader = Upgrader::new(&fixture.image, &runtime);
        let labelled = upgrader.upgrade_protocol_gsv1(fixture.gsv1_protocol).unwrap();

        let mut emitter = Emitter::new(ARENA, Target::LP64_LE);
        let record = emitter.emit_protocol(&labelled).unwrap();
        assert_eq!(emitter.emit_protocol(&labelled).unwrap(), record);
        let image = emitter.finish().unwrap();

        let mut reader = image.record(record).unwrap();
        assert_eq!(reader.pointer().unwrap(), fixture.protocol_class);
        assert_eq!(reader.pointer().unwrap(), labelled.name_address);
        assert_eq!(
            reader.pointer().unwrap(),
            labelled.protocol_list.as_ref().unwrap().address
        );
        assert_eq!(reader.pointer().unwrap(), Address::NULL);
        assert_eq!(reader.pointer().unwrap(), Address::NULL);
        assert_eq!(
            reader.pointer().unwrap(),
            labelled.optional_instance_methods.as_ref().unwrap().address
        );
        assert_eq!(reader.pointer().unwrap(), Address::NULL);
        let properties = reader.pointer().unwrap();
        assert!(image.contains(properties, 1));
        assert_eq!(reader.pointer().unwrap(), Address::NULL);
    }

    #[test]
    fn category_records() {
        let fixture = fixture();
        let runtime = Runtime::new();
        let upgrader = Upgrader::new(&fixture.image, &runtime);
        let category = upgrader.upgrade_category(fixture.category).unwrap();

        let mut emitter = Emitter::new(ARENA, Target::ILP32_LE);
        let record = emitter.emit_category(&category).unwrap();
        let image = emitter.finish().unwrap();

        let mut reader = image.record(record).unwrap();
        assert_eq!(reader.pointer().unwrap(), category.name_address);
        assert_eq!(reader.pointer().unwrap(), category.class_name_address);
        let methods = reader.pointer().unwrap();
        assert_eq!(reader.pointer().unwrap(), Address::NULL);
        assert_eq!(reader.pointer().unwrap(), fixture.protocols);

        // unregistered selectors fall back to the legacy name
        let mut list = image.record(methods).unwrap();
        assert_eq!(list.pointer().unwrap(), Address::NULL);
        assert_eq!(list.int().unwrap(), 1);
        assert_eq!(list.size_t().unwrap(), 12);
        let reset = &category.instance_methods.as_ref().unwrap().methods[0];
        assert_eq!(image.read_pointer(methods.offset(12 + 4)).unwrap(), reset.name_address);
    }
}

//! Builder for legacy images.
//!
//! [`LegacyBuilder`] writes legacy runtime records into an [`ImageBuilder`] so tests, benchmarks
//! and tools can produce images without a legacy compiler. Records are described with small
//! plain structs; every method returns the address of the record it wrote.
//!
//! # Examples
//!
//! ```rust
//! use objcabi::{
//!     metadata::{
//!         builder::{LegacyClass, LegacyIvar},
//!         class::{ClassFlags, ClassRaw},
//!         LegacyBuilder,
//!     },
//!     Address, Target,
//! };
//!
//! let mut builder = LegacyBuilder::new(Address::new(0x10000), Target::LP64_LE);
//! let ivars = builder.ivar_list(&[
//!     LegacyIvar { name: "isa", types: Some("#"), offset: 0 },
//!     LegacyIvar { name: "count", types: Some("i"), offset: 8 },
//! ])?;
//! let meta = builder.class(&LegacyClass { name: "Counter", flags: ClassFlags::META, ..Default::default() })?;
//! let class = builder.class(&LegacyClass {
//!     isa: meta,
//!     name: "Counter",
//!     flags: ClassFlags::CLASS,
//!     instance_size: 16,
//!     ivars,
//!     ..Default::default()
//! })?;
//! let image = builder.finish()?;
//!
//! let raw = ClassRaw::read(&image, class)?;
//! assert_eq!(image.c_str(raw.name)?, "Counter");
//! assert_eq!(raw.isa, meta);
//! # Ok::<(), objcabi::Error>(())
//! ```

use crate::{
    file::{Address, Image, ImageBuilder, Scalar, Target},
    metadata::{
        category::CategoryRaw,
        class::{ClassFlags, ClassRaw},
        ivar::{IvarListRaw, IvarRaw},
        method::{MethodListRaw, MethodRaw},
        property::{PropertyAttributes, PropertyAttributesExt, PropertyListRaw, PropertyRaw},
        protocol::{
            MethodDescriptionListRaw, MethodDescriptionRaw, ProtocolGccRaw, ProtocolGsv1Raw,
            ProtocolListRaw,
        },
    },
    Result,
};

/// A legacy ivar to write
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyIvar<'a> {
    /// Ivar name
    pub name: &'a str,
    /// Type encoding, `None` writes a null pointer
    pub types: Option<&'a str>,
    /// Inline offset
    pub offset: i32,
}

/// A legacy method to write
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyMethod<'a> {
    /// Selector name
    pub name: &'a str,
    /// Type encoding, `None` writes a null pointer
    pub types: Option<&'a str>,
    /// Implementation
    pub imp: Address,
}

/// A legacy property to write
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyProperty<'a> {
    /// Raw name bytes; a leading NUL produces an already encoded record
    pub name: &'a [u8],
    /// The `attributes` byte
    pub attributes: PropertyAttributes,
    /// The `attributes2` byte
    pub attributes2: PropertyAttributesExt,
    /// The `is_synthesized` byte
    pub is_synthesized: bool,
    /// Getter selector name
    pub getter_name: Option<&'a str>,
    /// Getter signature
    pub getter_types: Option<&'a str>,
    /// Setter selector name
    pub setter_name: Option<&'a str>,
    /// Setter signature
    pub setter_types: Option<&'a str>,
}

/// A legacy class or metaclass to write
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyClass<'a> {
    /// Metaclass, or root metaclass for metaclasses
    pub isa: Address,
    /// Superclass (name string or class)
    pub super_class: Address,
    /// Class name
    pub name: &'a str,
    /// User defined version
    pub version: i64,
    /// Class flags; `NEW_ABI` selects the long record
    pub flags: ClassFlags,
    /// Instance size
    pub instance_size: i64,
    /// Ivar list
    pub ivars: Address,
    /// Method list
    pub methods: Address,
    /// Protocol list
    pub protocols: Address,
    /// ABI version of the trailing block
    pub abi_version: i64,
    /// Ivar offset table
    pub ivar_offsets: Address,
    /// Property list
    pub properties: Address,
    /// Strong ownership bitfield
    pub strong_pointers: u64,
    /// Weak ownership bitfield
    pub weak_pointers: u64,
}

/// A legacy protocol to write, in either shape
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyProtocol<'a> {
    /// Class pointer
    pub isa: Address,
    /// Protocol name
    pub name: &'a str,
    /// Adopted protocols
    pub protocol_list: Address,
    /// Required instance method descriptions
    pub instance_methods: Address,
    /// Required class method descriptions
    pub class_methods: Address,
    /// Optional instance method descriptions (GNUstep v1 only)
    pub optional_instance_methods: Address,
    /// Optional class method descriptions (GNUstep v1 only)
    pub optional_class_methods: Address,
    /// Required properties (GNUstep v1 only)
    pub properties: Address,
    /// Optional properties (GNUstep v1 only)
    pub optional_properties: Address,
}

/// A legacy category to write
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyCategory<'a> {
    /// Category name
    pub name: &'a str,
    /// Extended class name
    pub class_name: &'a str,
    /// Instance method list
    pub instance_methods: Address,
    /// Class method list
    pub class_methods: Address,
    /// Protocol list
    pub protocols: Address,
}

/// Writes legacy runtime records into a fresh image.
pub struct LegacyBuilder {
    image: ImageBuilder,
}

impl LegacyBuilder {
    /// Create a builder whose image starts at `base`
    #[must_use]
    pub fn new(base: Address, target: Target) -> Self {
        LegacyBuilder {
            image: ImageBuilder::new(base, target),
        }
    }

    /// The target records are written for
    #[must_use]
    pub fn target(&self) -> Target {
        self.image.target()
    }

    /// Direct access to the underlying arena
    pub fn arena(&mut self) -> &mut ImageBuilder {
        &mut self.image
    }

    /// Store a NUL-terminated string
    pub fn string(&mut self, value: &str) -> Address {
        self.image.push_str(value)
    }

    fn opt_string(&mut self, value: Option<&str>) -> Address {
        value.map_or(Address::NULL, |value| self.image.push_str(value))
    }

    /// Write an ivar list
    ///
    /// # Errors
    /// Only fails on internal layout errors.
    pub fn ivar_list(&mut self, ivars: &[LegacyIvar<'_>]) -> Result<Address> {
        let fields: Vec<(Address, Address, i32)> = ivars
            .iter()
            .map(|ivar| (self.string(ivar.name), self.opt_string(ivar.types), ivar.offset))
            .collect();

        let list = self.image.alloc_array(IvarListRaw::HEADER, IvarRaw::SHAPE, ivars.len());
        let mut writer = self.image.writer(list)?;
        writer.int(count(ivars.len()))?;
        for (name, types, offset) in fields {
            writer.pointer(name)?;
            writer.pointer(types)?;
            writer.int(offset)?;
        }
        Ok(list)
    }

    /// Write one node of a method list chain
    ///
    /// # Errors
    /// Only fails on internal layout errors.
    pub fn method_list(&mut self, methods: &[LegacyMethod<'_>], next: Address) -> Result<Address> {
        let fields: Vec<(Address, Address, Address)> = methods
            .iter()
            .map(|method| (self.string(method.name), self.opt_string(method.types), method.imp))
            .collect();

        let list = self.image.alloc_array(MethodListRaw::HEADER, MethodRaw::SHAPE, methods.len());
        let mut writer = self.image.writer(list)?;
        writer.pointer(next)?;
        writer.int(count(methods.len()))?;
        for (name, types, imp) in fields {
            writer.pointer(name)?;
            writer.pointer(types)?;
            writer.pointer(imp)?;
        }
        Ok(list)
    }

    /// Write one node of a property list chain
    ///
    /// # Errors
    /// Only fails on internal layout errors.
    pub fn property_list(&mut self, properties: &[LegacyProperty<'_>], next: Address) -> Result<Address> {
        let fields: Vec<[Address; 5]> = properties
            .iter()
            .map(|property| {
                [
                    self.image.push_c_bytes(property.name),
                    self.opt_string(property.getter_name),
                    self.opt_string(property.getter_types),
                    self.opt_string(property.setter_name),
                    self.opt_string(property.setter_types),
                ]
            })
            .collect();

        let list = self
            .image
            .alloc_array(PropertyListRaw::HEADER, PropertyRaw::SHAPE, properties.len());
        let mut writer = self.image.writer(list)?;
        writer.int(count(properties.len()))?;
        writer.pointer(next)?;
        for (property, [name, getter_name, getter_types, setter_name, setter_types]) in
            properties.iter().zip(fields)
        {
            writer.pointer(name)?;
            writer.char(property.attributes.bits())?;
            writer.char(u8::from(property.is_synthesized))?;
            writer.char(property.attributes2.bits())?;
            writer.char(0)?;
            writer.pointer(getter_name)?;
            writer.pointer(getter_types)?;
            writer.pointer(setter_name)?;
            writer.pointer(setter_types)?;
        }
        Ok(list)
    }

    /// Write a method description list of (name, types) pairs
    ///
    /// # Errors
    /// Only fails on internal layout errors.
    pub fn method_descriptions(&mut self, descriptions: &[(&str, &str)]) -> Result<Address> {
        let fields: Vec<(Address, Address)> = descriptions
            .iter()
            .map(|(name, types)| (self.string(name), self.string(types)))
            .collect();

        let list = self.image.alloc_array(
            MethodDescriptionListRaw::HEADER,
            MethodDescriptionRaw::SHAPE,
            descriptions.len(),
        );
        let mut writer = self.image.writer(list)?;
        writer.int(count(descriptions.len()))?;
        for (name, types) in fields {
            writer.pointer(name)?;
            writer.pointer(types)?;
        }
        Ok(list)
    }

    /// Write a protocol list
    ///
    /// # Errors
    /// Only fails on internal layout errors.
    pub fn protocol_list(&mut self, protocols: &[Address], next: Address) -> Result<Address> {
        let list = self
            .image
            .alloc_array(ProtocolListRaw::HEADER, ProtocolListRaw::ELEMENT, protocols.len());
        let mut writer = self.image.writer(list)?;
        writer.pointer(next)?;
        writer.size_t(protocols.len() as u64)?;
        for protocol in protocols {
            writer.pointer(*protocol)?;
        }
        Ok(list)
    }

    /// Write a protocol in the GCC shape
    ///
    /// # Errors
    /// Only fails on internal layout errors.
    pub fn protocol_gcc(&mut self, protocol: &LegacyProtocol<'_>) -> Result<Address> {
        let name = self.string(protocol.name);
        let record = self.image.alloc_record(ProtocolGccRaw::SHAPE);
        let mut writer = self.image.writer(record)?;
        writer.pointer(protocol.isa)?;
        writer.pointer(name)?;
        writer.pointer(protocol.protocol_list)?;
        writer.pointer(protocol.instance_methods)?;
        writer.pointer(protocol.class_methods)?;
        Ok(record)
    }

    /// Write a protocol in the GNUstep v1 shape
    ///
    /// # Errors
    /// Only fails on internal layout errors.
    pub fn protocol_gsv1(&mut self, protocol: &LegacyProtocol<'_>) -> Result<Address> {
        let name = self.string(protocol.name);
        let record = self.image.alloc_record(ProtocolGsv1Raw::SHAPE);
        let mut writer = self.image.writer(record)?;
        writer.pointer(protocol.isa)?;
        writer.pointer(name)?;
        writer.pointer(protocol.protocol_list)?;
        writer.pointer(protocol.instance_methods)?;
        writer.pointer(protocol.class_methods)?;
        writer.pointer(protocol.optional_instance_methods)?;
        writer.pointer(protocol.optional_class_methods)?;
        writer.pointer(protocol.properties)?;
        writer.pointer(protocol.optional_properties)?;
        Ok(record)
    }

    /// Write a category
    ///
    /// # Errors
    /// Only fails on internal layout errors.
    pub fn category(&mut self, category: &LegacyCategory<'_>) -> Result<Address> {
        let name = self.string(category.name);
        let class_name = self.string(category.class_name);
        let record = self.image.alloc_record(CategoryRaw::SHAPE);
        let mut writer = self.image.writer(record)?;
        writer.pointer(name)?;
        writer.pointer(class_name)?;
        writer.pointer(category.instance_methods)?;
        writer.pointer(category.class_methods)?;
        writer.pointer(category.protocols)?;
        Ok(record)
    }

    /// Allocate a zeroed class record to be filled later with [`LegacyBuilder::write_class`].
    ///
    /// Needed for records that point at themselves, like a root metaclass.
    pub fn reserve_class(&mut self, new_abi: bool) -> Address {
        let shape = if new_abi {
            ClassRaw::SHAPE_NEW_ABI
        } else {
            ClassRaw::SHAPE
        };
        self.image.alloc_record(shape)
    }

    /// Fill a class record reserved with [`LegacyBuilder::reserve_class`]
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the reservation is too short for `class`.
    pub fn write_class(&mut self, record: Address, class: &LegacyClass<'_>) -> Result<()> {
        let name = self.string(class.name);
        let mut writer = self.image.writer(record)?;
        writer.pointer(class.isa)?;
        writer.pointer(class.super_class)?;
        writer.pointer(name)?;
        writer.long(class.version)?;
        writer.ulong(class.flags.bits())?;
        writer.long(class.instance_size)?;
        writer.pointer(class.ivars)?;
        writer.pointer(class.methods)?;
        writer.pointer(Address::NULL)?; // dtable
        writer.pointer(Address::NULL)?; // subclass_list
        writer.pointer(Address::NULL)?; // sibling_class
        writer.pointer(class.protocols)?;
        writer.pointer(Address::NULL)?; // extra_data
        if class.flags.contains(ClassFlags::NEW_ABI) {
            writer.long(class.abi_version)?;
            writer.pointer(class.ivar_offsets)?;
            writer.pointer(class.properties)?;
            writer.uintptr(class.strong_pointers)?;
            writer.uintptr(class.weak_pointers)?;
        }
        Ok(())
    }

    /// Write a class or metaclass record
    ///
    /// # Errors
    /// Only fails on internal layout errors.
    pub fn class(&mut self, class: &LegacyClass<'_>) -> Result<Address> {
        let record = self.reserve_class(class.flags.contains(ClassFlags::NEW_ABI));
        self.write_class(record, class)?;
        Ok(record)
    }

    /// Allocate an `int` variable, e.g. the target of an ivar offset table entry
    ///
    /// # Errors
    /// Only fails on internal layout errors.
    pub fn int_variable(&mut self, value: i32) -> Result<Address> {
        let variable = self.image.alloc_record(&[Scalar::Int]);
        self.image.write_i32(variable, value)?;
        Ok(variable)
    }

    /// Write an ivar offset table: one pointer per ivar to its offset variable
    ///
    /// # Errors
    /// Only fails on internal layout errors.
    pub fn offset_table(&mut self, variables: &[Address]) -> Result<Address> {
        let table = self.image.alloc_array(&[], &[Scalar::Pointer], variables.len().max(1));
        let mut writer = self.image.writer(table)?;
        for variable in variables {
            writer.pointer(*variable)?;
        }
        Ok(table)
    }

    /// Write an out-of-line ownership bitfield `{ int32_t length; uint32_t words[]; }`
    ///
    /// # Errors
    /// Only fails on internal layout errors.
    pub fn bitfield(&mut self, words: &[u32]) -> Result<u64> {
        let bitfield = self.image.alloc_array(&[Scalar::Int], &[Scalar::UInt], words.len());
        let mut writer = self.image.writer(bitfield)?;
        writer.int(count(words.len()))?;
        for word in words {
            writer.uint(*word)?;
        }
        Ok(bitfield.value())
    }

    /// An inline ownership bitfield with the bits of `indices` set
    #[must_use]
    pub fn inline_bitfield(indices: &[usize]) -> u64 {
        indices
            .iter()
            .filter(|index| **index < 63)
            .fold(1, |bits, index| bits | (1 << (index + 1)))
    }

    /// Freeze the records into an image
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] if nothing was written.
    pub fn finish(self) -> Result<Image> {
        self.image.finish()
    }
}

fn count(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

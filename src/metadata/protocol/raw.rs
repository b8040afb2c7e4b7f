use crate::{
    file::{Address, Image, Scalar},
    metadata::{checked_count, read_array},
    Result,
};

/// A method description: `{ name; types; }`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDescriptionRaw {
    /// Selector name
    pub name: Address,
    /// Type encoding
    pub types: Address,
}

impl MethodDescriptionRaw {
    /// Field layout of a method description
    pub const SHAPE: &'static [Scalar] = &[Scalar::Pointer, Scalar::Pointer];

    /// Decode the method description at `address`
    ///
    /// # Errors
    /// Returns an error if the record does not lie inside the image.
    pub fn read(image: &Image, address: Address) -> Result<MethodDescriptionRaw> {
        let mut reader = image.record(address)?;
        Ok(MethodDescriptionRaw {
            name: reader.pointer()?,
            types: reader.pointer()?,
        })
    }
}

/// A method description list: `{ int count; struct description list[count]; }`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDescriptionListRaw {
    /// Address of the list
    pub address: Address,
    /// The descriptions
    pub descriptions: Vec<MethodDescriptionRaw>,
}

impl MethodDescriptionListRaw {
    /// Header preceding the description array
    pub const HEADER: &'static [Scalar] = &[Scalar::Int];

    /// Decode the list at `address`, accepting at most `max_count` entries
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for negative or excessive counts and a bounds error
    /// if the list does not fit into the image.
    pub fn read(image: &Image, address: Address, max_count: usize) -> Result<Self> {
        let count = checked_count(i64::from(image.record(address)?.int()?), address, max_count)?;
        Ok(MethodDescriptionListRaw {
            address,
            descriptions: read_array(
                image,
                address,
                Self::HEADER,
                MethodDescriptionRaw::SHAPE,
                count,
                MethodDescriptionRaw::read,
            )?,
        })
    }
}

/// A protocol list: `{ next; size_t count; Protocol *list[count]; }`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolListRaw {
    /// Address of the list
    pub address: Address,
    /// Next list in the chain
    pub next: Address,
    /// The referenced protocol records
    pub protocols: Vec<Address>,
}

impl ProtocolListRaw {
    /// Header preceding the protocol pointer array
    pub const HEADER: &'static [Scalar] = &[Scalar::Pointer, Scalar::SizeT];
    /// One element of the array
    pub const ELEMENT: &'static [Scalar] = &[Scalar::Pointer];

    /// Decode the list at `address`, accepting at most `max_count` entries
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for excessive counts and a bounds error if the list
    /// does not fit into the image.
    pub fn read(image: &Image, address: Address, max_count: usize) -> Result<Self> {
        let mut reader = image.record(address)?;
        let next = reader.pointer()?;
        let count = reader.size_t()?;
        let count = checked_count(i64::try_from(count).unwrap_or(i64::MAX), address, max_count)?;

        Ok(ProtocolListRaw {
            address,
            next,
            protocols: read_array(image, address, Self::HEADER, Self::ELEMENT, count, |image, at| {
                image.read_pointer(at)
            })?,
        })
    }
}

/// A legacy protocol record in the GCC shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolGccRaw {
    /// Address of the record
    pub address: Address,
    /// Class pointer
    pub isa: Address,
    /// Protocol name
    pub name: Address,
    /// Adopted protocols
    pub protocol_list: Address,
    /// Required instance method descriptions
    pub instance_methods: Address,
    /// Required class method descriptions
    pub class_methods: Address,
}

impl ProtocolGccRaw {
    /// Field layout of a GCC protocol
    pub const SHAPE: &'static [Scalar] = &[
        Scalar::Pointer, // isa
        Scalar::Pointer, // name
        Scalar::Pointer, // protocol_list
        Scalar::Pointer, // instance_methods
        Scalar::Pointer, // class_methods
    ];

    /// Decode the protocol record at `address`
    ///
    /// # Errors
    /// Returns an error if the record does not lie inside the image.
    pub fn read(image: &Image, address: Address) -> Result<ProtocolGccRaw> {
        let mut reader = image.record(address)?;
        Ok(ProtocolGccRaw {
            address,
            isa: reader.pointer()?,
            name: reader.pointer()?,
            protocol_list: reader.pointer()?,
            instance_methods: reader.pointer()?,
            class_methods: reader.pointer()?,
        })
    }
}

/// A legacy protocol record in the GNUstep v1 shape, with optional methods and properties.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProtocolGsv1Raw {
    /// Address of the record
    pub address: Address,
    /// Class pointer
    pub isa: Address,
    /// Protocol name
    pub name: Address,
    /// Adopted protocols
    pub protocol_list: Address,
    /// Required instance method descriptions
    pub instance_methods: Address,
    /// Required class method descriptions
    pub class_methods: Address,
    /// Optional instance method descriptions
    pub optional_instance_methods: Address,
    /// Optional class method descriptions
    pub optional_class_methods: Address,
    /// Required properties
    pub properties: Address,
    /// Optional properties
    pub optional_properties: Address,
}

impl ProtocolGsv1Raw {
    /// Field layout of a GNUstep v1 protocol
    pub const SHAPE: &'static [Scalar] = &[
        Scalar::Pointer, // isa
        Scalar::Pointer, // name
        Scalar::Pointer, // protocol_list
        Scalar::Pointer, // instance_methods
        Scalar::Pointer, // class_methods
        Scalar::Pointer, // optional_instance_methods
        Scalar::Pointer, // optional_class_methods
        Scalar::Pointer, // properties
        Scalar::Pointer, // optional_properties
    ];

    /// Decode the protocol record at `address`
    ///
    /// # Errors
    /// Returns an error if the record does not lie inside the image.
    pub fn read(image: &Image, address: Address) -> Result<ProtocolGsv1Raw> {
        let mut reader = image.record(address)?;
        Ok(ProtocolGsv1Raw {
            address,
            isa: reader.pointer()?,
            name: reader.pointer()?,
            protocol_list: reader.pointer()?,
            instance_methods: reader.pointer()?,
            class_methods: reader.pointer()?,
            optional_instance_methods: reader.pointer()?,
            optional_class_methods: reader.pointer()?,
            properties: reader.pointer()?,
            optional_properties: reader.pointer()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{ImageBuilder, Target};

    #[test]
    fn protocol_list() {
        let mut builder = ImageBuilder::new(Address::new(0x1000), Target::ILP32_LE);
        let list = builder.alloc_array(ProtocolListRaw::HEADER, ProtocolListRaw::ELEMENT, 2);
        {
            let mut writer = builder.writer(list).unwrap();
            writer.pointer(Address::NULL).unwrap();
            writer.size_t(2).unwrap();
            writer.pointer(Address::new(0x300)).unwrap();
            writer.pointer(Address::new(0x400)).unwrap();
        }
        let image = builder.finish().unwrap();

        let raw = ProtocolListRaw::read(&image, list, 8).unwrap();
        assert_eq!(raw.protocols, vec![Address::new(0x300), Address::new(0x400)]);
        assert!(ProtocolListRaw::read(&image, list, 1).is_err());
    }

    #[test]
    fn descriptions() {
        let mut builder = ImageBuilder::new(Address::new(0x1000), Target::LP64_LE);
        let list = builder.alloc_array(MethodDescriptionListRaw::HEADER, MethodDescriptionRaw::SHAPE, 1);
        {
            let mut writer = builder.writer(list).unwrap();
            writer.int(1).unwrap();
            writer.pointer(Address::new(0x10)).unwrap();
            writer.pointer(Address::new(0x20)).unwrap();
        }
        let image = builder.finish().unwrap();

        let raw = MethodDescriptionListRaw::read(&image, list, 8).unwrap();
        assert_eq!(
            raw.descriptions,
            vec![MethodDescriptionRaw {
                name: Address::new(0x10),
                types: Address::new(0x20),
            }]
        );
    }

    #[test]
    fn gsv1_shape() {
        let mut builder = ImageBuilder::new(Address::new(0x1000), Target::LP64_LE);
        let record = builder.alloc_record(ProtocolGsv1Raw::SHAPE);
        {
            let mut writer = builder.writer(record).unwrap();
            for value in 1..=9_u64 {
                writer.pointer(Address::new(value)).unwrap();
            }
        }
        let image = builder.finish().unwrap();

        let raw = ProtocolGsv1Raw::read(&image, record).unwrap();
        assert_eq!(raw.name, Address::new(2));
        assert_eq!(raw.optional_class_methods, Address::new(7));
        assert_eq!(raw.optional_properties, Address::new(9));

        let gcc = ProtocolGccRaw::read(&image, record).unwrap();
        assert_eq!(gcc.class_methods, Address::new(5));
    }
}

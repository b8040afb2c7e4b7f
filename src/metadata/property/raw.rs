use crate::{
    file::{Address, Image, Scalar},
    metadata::{
        checked_count,
        property::{PropertyAttributes, PropertyAttributesExt},
        read_array,
    },
    Result,
};

/// One legacy property record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyRaw {
    /// Address of the record
    pub address: Address,
    /// Property name. A name starting with NUL marks an already encoded record
    pub name: Address,
    /// The `attributes` byte
    pub attributes: u8,
    /// Non-zero if the property was synthesized
    pub is_synthesized: u8,
    /// The `attributes2` byte
    pub attributes2: u8,
    /// Padding
    pub unused: u8,
    /// Getter selector name
    pub getter_name: Address,
    /// Getter method signature, the property type is its leading part
    pub getter_types: Address,
    /// Setter selector name
    pub setter_name: Address,
    /// Setter method signature
    pub setter_types: Address,
}

impl PropertyRaw {
    /// Field layout of a legacy property
    pub const SHAPE: &'static [Scalar] = &[
        Scalar::Pointer, // name
        Scalar::Char,    // attributes
        Scalar::Char,    // is_synthesized
        Scalar::Char,    // attributes2
        Scalar::Char,    // unused
        Scalar::Pointer, // getter_name
        Scalar::Pointer, // getter_types
        Scalar::Pointer, // setter_name
        Scalar::Pointer, // setter_types
    ];

    /// Decode the property record at `address`
    ///
    /// # Errors
    /// Returns an error if the record does not lie inside the image.
    pub fn read(image: &Image, address: Address) -> Result<PropertyRaw> {
        let mut reader = image.record(address)?;
        Ok(PropertyRaw {
            address,
            name: reader.pointer()?,
            attributes: reader.char()?,
            is_synthesized: reader.char()?,
            attributes2: reader.char()?,
            unused: reader.char()?,
            getter_name: reader.pointer()?,
            getter_types: reader.pointer()?,
            setter_name: reader.pointer()?,
            setter_types: reader.pointer()?,
        })
    }

    /// The `attributes` byte as flags
    #[must_use]
    pub fn flags(&self) -> PropertyAttributes {
        PropertyAttributes::from_bits_retain(self.attributes)
    }

    /// The `attributes2` byte as flags
    #[must_use]
    pub fn flags_ext(&self) -> PropertyAttributesExt {
        PropertyAttributesExt::from_bits_retain(self.attributes2)
    }
}

/// One node of a legacy property list chain: `{ int count; next; struct property p[count]; }`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyListRaw {
    /// Address of the node
    pub address: Address,
    /// Next node in the chain
    pub next: Address,
    /// The properties of this node
    pub properties: Vec<PropertyRaw>,
}

impl PropertyListRaw {
    /// Header preceding the property array
    pub const HEADER: &'static [Scalar] = &[Scalar::Int, Scalar::Pointer];

    /// Decode one node of a property list chain, accepting at most `max_count` entries.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for negative or excessive counts and a bounds error
    /// if the node does not fit into the image.
    pub fn read(image: &Image, address: Address, max_count: usize) -> Result<PropertyListRaw> {
        let mut reader = image.record(address)?;
        let count = checked_count(i64::from(reader.int()?), address, max_count)?;
        let next = reader.pointer()?;

        Ok(PropertyListRaw {
            address,
            next,
            properties: read_array(
                image,
                address,
                Self::HEADER,
                PropertyRaw::SHAPE,
                count,
                PropertyRaw::read,
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{ImageBuilder, Target};

    #[test]
    fn crafted_ilp32() {
        let mut builder = ImageBuilder::new(Address::new(0x1000), Target::ILP32_LE);
        let list = builder.alloc_array(PropertyListRaw::HEADER, PropertyRaw::SHAPE, 1);
        {
            let mut writer = builder.writer(list).unwrap();
            writer.int(1).unwrap();
            writer.pointer(Address::NULL).unwrap();
            writer.pointer(Address::new(0x70)).unwrap();
            writer.char(0x41).unwrap();
            writer.char(1).unwrap();
            writer.char(0x12).unwrap();
            writer.char(0).unwrap();
            for value in 0x71..0x75_u64 {
                writer.pointer(Address::new(value)).unwrap();
            }
            // 8 byte header, 24 byte property
            assert_eq!(writer.address(), list.offset(32));
        }
        let image = builder.finish().unwrap();

        let raw = PropertyListRaw::read(&image, list, 4).unwrap();
        assert_eq!(raw.next, Address::NULL);
        let property = &raw.properties[0];
        assert_eq!(property.name, Address::new(0x70));
        assert_eq!(
            property.flags(),
            PropertyAttributes::READONLY | PropertyAttributes::NONATOMIC
        );
        assert_eq!(property.is_synthesized, 1);
        assert_eq!(
            property.flags_ext(),
            PropertyAttributesExt::WEAK | PropertyAttributesExt::DYNAMIC
        );
        assert_eq!(property.getter_name, Address::new(0x71));
        assert_eq!(property.setter_types, Address::new(0x74));
    }
}

use crate::{
    file::{Address, Image, Scalar},
    metadata::{checked_count, read_array},
    Result,
};

/// One legacy ivar record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IvarRaw {
    /// Address of the record
    pub address: Address,
    /// Ivar name
    pub name: Address,
    /// Type encoding, may be null
    pub types: Address,
    /// Byte offset inside the instance, negative while not final
    pub offset: i32,
    /// Where `offset` is stored
    pub offset_address: Address,
}

impl IvarRaw {
    /// Field layout of a legacy ivar
    pub const SHAPE: &'static [Scalar] = &[
        Scalar::Pointer, // name
        Scalar::Pointer, // type
        Scalar::Int,     // offset
    ];

    /// Decode the ivar record at `address`
    ///
    /// # Errors
    /// Returns an error if the record does not lie inside the image.
    pub fn read(image: &Image, address: Address) -> Result<IvarRaw> {
        let mut reader = image.record(address)?;
        let name = reader.pointer()?;
        let types = reader.pointer()?;
        let offset_address = reader.peek_address(Scalar::Int);

        Ok(IvarRaw {
            address,
            name,
            types,
            offset: reader.int()?,
            offset_address,
        })
    }
}

/// A legacy ivar list: `{ int count; struct ivar ivars[count]; }`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IvarListRaw {
    /// Address of the list
    pub address: Address,
    /// The ivars, in declaration order
    pub ivars: Vec<IvarRaw>,
}

impl IvarListRaw {
    /// Header preceding the ivar array
    pub const HEADER: &'static [Scalar] = &[Scalar::Int];

    /// Decode the ivar list at `address`, accepting at most `max_count` entries.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for negative or excessive counts and a bounds error
    /// if the list does not fit into the image.
    pub fn read(image: &Image, address: Address, max_count: usize) -> Result<IvarListRaw> {
        let count = image.record(address)?.int()?;
        let count = checked_count(i64::from(count), address, max_count)?;

        Ok(IvarListRaw {
            address,
            ivars: read_array(image, address, Self::HEADER, IvarRaw::SHAPE, count, IvarRaw::read)?,
        })
    }

    /// Number of ivars
    #[must_use]
    pub fn len(&self) -> usize {
        self.ivars.len()
    }

    /// Returns true if the list holds no ivars
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ivars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{ImageBuilder, Target};

    #[test]
    fn crafted_ilp32() {
        let mut builder = ImageBuilder::new(Address::new(0x1000), Target::ILP32_LE);
        let list = builder.alloc_array(IvarListRaw::HEADER, IvarRaw::SHAPE, 2);
        {
            let mut writer = builder.writer(list).unwrap();
            writer.int(2).unwrap();
            writer.pointer(Address::new(0xa0)).unwrap();
            writer.pointer(Address::new(0xb0)).unwrap();
            writer.int(4).unwrap();
            writer.pointer(Address::new(0xa1)).unwrap();
            writer.pointer(Address::NULL).unwrap();
            writer.int(8).unwrap();
        }
        let image = builder.finish().unwrap();

        let raw = IvarListRaw::read(&image, list, 16).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw.ivars[0].name, Address::new(0xa0));
        assert_eq!(raw.ivars[0].offset, 4);
        assert_eq!(raw.ivars[0].offset_address, list.offset(12));
        assert_eq!(raw.ivars[1].types, Address::NULL);
        assert_eq!(raw.ivars[1].offset, 8);
        assert_eq!(raw.ivars[1].offset_address, list.offset(24));
    }

    #[test]
    fn bad_counts() {
        let mut builder = ImageBuilder::new(Address::new(0x1000), Target::LP64_LE);
        let list = builder.alloc_array(IvarListRaw::HEADER, IvarRaw::SHAPE, 1);
        builder.write_i32(list, -1).unwrap();
        let image = builder.finish().unwrap();
        assert!(matches!(
            IvarListRaw::read(&image, list, 16),
            Err(crate::Error::Malformed { .. })
        ));

        let mut builder = ImageBuilder::new(Address::new(0x1000), Target::LP64_LE);
        let list = builder.alloc_array(IvarListRaw::HEADER, IvarRaw::SHAPE, 1);
        builder.write_i32(list, 5).unwrap();
        let image = builder.finish().unwrap();
        assert!(matches!(
            IvarListRaw::read(&image, list, 16),
            Err(crate::Error::OutOfBounds)
        ));
    }
}

use crate::{
    file::{Address, Image, Scalar},
    Result,
};

/// A legacy category record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryRaw {
    /// Address of the record
    pub address: Address,
    /// Category name
    pub name: Address,
    /// Name of the class the category extends
    pub class_name: Address,
    /// Legacy instance method list
    pub instance_methods: Address,
    /// Legacy class method list
    pub class_methods: Address,
    /// Adopted protocols
    pub protocols: Address,
}

impl CategoryRaw {
    /// Field layout of a legacy category
    pub const SHAPE: &'static [Scalar] = &[
        Scalar::Pointer, // name
        Scalar::Pointer, // class_name
        Scalar::Pointer, // instance_methods
        Scalar::Pointer, // class_methods
        Scalar::Pointer, // protocols
    ];

    /// Decode the category record at `address`
    ///
    /// # Errors
    /// Returns an error if the record does not lie inside the image.
    pub fn read(image: &Image, address: Address) -> Result<CategoryRaw> {
        let mut reader = image.record(address)?;
        Ok(CategoryRaw {
            address,
            name: reader.pointer()?,
            class_name: reader.pointer()?,
            instance_methods: reader.pointer()?,
            class_methods: reader.pointer()?,
            protocols: reader.pointer()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{ImageBuilder, Target};

    #[test]
    fn crafted() {
        let mut builder = ImageBuilder::new(Address::new(0x1000), Target::ILP32_LE);
        let record = builder.alloc_record(CategoryRaw::SHAPE);
        {
            let mut writer = builder.writer(record).unwrap();
            for value in 1..=5_u64 {
                writer.pointer(Address::new(value * 0x10)).unwrap();
            }
        }
        let image = builder.finish().unwrap();
        assert_eq!(image.len(), 20);

        let raw = CategoryRaw::read(&image, record).unwrap();
        assert_eq!(raw.name, Address::new(0x10));
        assert_eq!(raw.class_name, Address::new(0x20));
        assert_eq!(raw.protocols, Address::new(0x50));
    }
}

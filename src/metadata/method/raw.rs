use crate::{
    file::{Address, Image, Scalar},
    metadata::{checked_count, read_array},
    Result,
};

/// One legacy method record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodRaw {
    /// Selector name; legacy method lists name selectors by string
    pub selector_name: Address,
    /// Type encoding
    pub types: Address,
    /// Implementation
    pub imp: Address,
}

impl MethodRaw {
    /// Field layout of a legacy method
    pub const SHAPE: &'static [Scalar] = &[
        Scalar::Pointer, // selector name
        Scalar::Pointer, // types
        Scalar::Pointer, // imp
    ];

    /// Decode the method record at `address`
    ///
    /// # Errors
    /// Returns an error if the record does not lie inside the image.
    pub fn read(image: &Image, address: Address) -> Result<MethodRaw> {
        let mut reader = image.record(address)?;
        Ok(MethodRaw {
            selector_name: reader.pointer()?,
            types: reader.pointer()?,
            imp: reader.pointer()?,
        })
    }
}

/// One node of a legacy method list chain: `{ next; int count; struct method methods[count]; }`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodListRaw {
    /// Address of the node
    pub address: Address,
    /// Next node in the chain
    pub next: Address,
    /// The methods of this node
    pub methods: Vec<MethodRaw>,
}

impl MethodListRaw {
    /// Header preceding the method array
    pub const HEADER: &'static [Scalar] = &[Scalar::Pointer, Scalar::Int];

    /// Decode one node of a method list chain, accepting at most `max_count` entries.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for negative or excessive counts and a bounds error
    /// if the node does not fit into the image.
    pub fn read(image: &Image, address: Address, max_count: usize) -> Result<MethodListRaw> {
        let mut reader = image.record(address)?;
        let next = reader.pointer()?;
        let count = checked_count(i64::from(reader.int()?), address, max_count)?;

        Ok(MethodListRaw {
            address,
            next,
            methods: read_array(image, address, Self::HEADER, MethodRaw::SHAPE, count, MethodRaw::read)?,
        })
    }
}

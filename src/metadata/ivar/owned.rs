use crate::{
    file::{Address, Scalar},
    metadata::ivar::{Ownership, IVAR_ALIGN_SHIFT},
};

/// An instance variable in the current layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ivar {
    /// Ivar name
    pub name: String,
    /// Address of the name in the legacy image
    pub name_address: Address,
    /// Type encoding, `None` if the legacy record had none
    pub types: Option<String>,
    /// Address of the type encoding in the legacy image
    pub types_address: Address,
    /// Location of the offset variable; it stays owned by the legacy image
    pub offset_address: Address,
    /// Offset read through `offset_address` at upgrade time
    pub offset: i32,
    /// Size in bytes, derived from the next ivar's offset or the instance size
    pub size: i32,
    /// Alignment in bytes
    pub align: u32,
    /// Ownership qualifier
    pub ownership: Ownership,
}

impl Ivar {
    /// Field layout of the current ivar record
    pub const SHAPE: &'static [Scalar] = &[
        Scalar::Pointer, // name
        Scalar::Pointer, // type
        Scalar::Pointer, // offset
        Scalar::UInt,    // size
        Scalar::UInt,    // flags
    ];

    /// The `flags` word: ownership in bits 0-1, log2 of the alignment from bit 3.
    #[must_use]
    pub fn flags(&self) -> u32 {
        let align_log2 = self.align.max(1).ilog2();
        self.ownership.bits() | (align_log2 << IVAR_ALIGN_SHIFT)
    }
}

/// An upgraded ivar list, owned by its class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IvarList {
    /// Address of the legacy list this was upgraded from
    pub address: Address,
    /// The ivars, in declaration order
    pub ivars: Vec<Ivar>,
}

impl IvarList {
    /// Header preceding the ivar array: count and element size
    pub const HEADER: &'static [Scalar] = &[Scalar::Int, Scalar::SizeT];

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

    /// Iterate the ivars in declaration order
    pub fn iter(&self) -> std::slice::Iter<'_, Ivar> {
        self.ivars.iter()
    }

    /// Find an ivar by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Ivar> {
        self.ivars.iter().find(|ivar| ivar.name == name)
    }
}

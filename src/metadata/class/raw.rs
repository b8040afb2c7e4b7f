use crate::{
    file::{Address, Image, Scalar},
    metadata::class::ClassFlags,
    Result,
};

/// A legacy class record. Identical in shape for classes and metaclasses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassRaw {
    /// Address of the record
    pub address: Address,
    /// The metaclass of a class, the root metaclass of a metaclass
    pub isa: Address,
    /// Superclass, a name string until the loader resolves it
    pub super_class: Address,
    /// Class name
    pub name: Address,
    /// User defined class version
    pub version: i64,
    /// Raw `ClassFlags`
    pub info: u64,
    /// Instance size in bytes, negative while the ivar layout is not final
    pub instance_size: i64,
    /// Legacy ivar list
    pub ivars: Address,
    /// Legacy method list (chained)
    pub methods: Address,
    /// Dispatch table
    pub dtable: Address,
    /// First subclass
    pub subclass_list: Address,
    /// Next sibling
    pub sibling_class: Address,
    /// Protocol list
    pub protocols: Address,
    /// Runtime private data
    pub extra_data: Address,
    /// ABI version of the trailing block, `0` without `NEW_ABI`
    pub abi_version: i64,
    /// Table of pointers to the ivar offset variables
    pub ivar_offsets: Address,
    /// Legacy property list (chained)
    pub properties: Address,
    /// Ownership bitfield of strong ivars
    pub strong_pointers: u64,
    /// Ownership bitfield of weak ivars
    pub weak_pointers: u64,
}

impl ClassRaw {
    /// Fields present in every legacy class record
    pub const SHAPE: &'static [Scalar] = &[
        Scalar::Pointer, // isa
        Scalar::Pointer, // super_class
        Scalar::Pointer, // name
        Scalar::Long,    // version
        Scalar::ULong,   // info
        Scalar::Long,    // instance_size
        Scalar::Pointer, // ivars
        Scalar::Pointer, // methods
        Scalar::Pointer, // dtable
        Scalar::Pointer, // subclass_list
        Scalar::Pointer, // sibling_class
        Scalar::Pointer, // protocols
        Scalar::Pointer, // extra_data
    ];

    /// Full shape of a record with the `NEW_ABI` flag
    pub const SHAPE_NEW_ABI: &'static [Scalar] = &[
        Scalar::Pointer, // isa
        Scalar::Pointer, // super_class
        Scalar::Pointer, // name
        Scalar::Long,    // version
        Scalar::ULong,   // info
        Scalar::Long,    // instance_size
        Scalar::Pointer, // ivars
        Scalar::Pointer, // methods
        Scalar::Pointer, // dtable
        Scalar::Pointer, // subclass_list
        Scalar::Pointer, // sibling_class
        Scalar::Pointer, // protocols
        Scalar::Pointer, // extra_data
        Scalar::Long,    // abi_version
        Scalar::Pointer, // ivar_offsets
        Scalar::Pointer, // properties
        Scalar::UIntPtr, // strong_pointers
        Scalar::UIntPtr, // weak_pointers
    ];

    /// Decode the class record at `address`.
    ///
    /// The trailing block is only read when the `NEW_ABI` flag is set, records of older compilers
    /// end after `extra_data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidAddress`] or [`crate::Error::OutOfBounds`] if the record
    /// does not lie inside the image.
    pub fn read(image: &Image, address: Address) -> Result<ClassRaw> {
        let mut reader = image.record(address)?;

        let mut class = ClassRaw {
            address,
            isa: reader.pointer()?,
            super_class: reader.pointer()?,
            name: reader.pointer()?,
            version: reader.long()?,
            info: reader.ulong()?,
            instance_size: reader.long()?,
            ivars: reader.pointer()?,
            methods: reader.pointer()?,
            dtable: reader.pointer()?,
            subclass_list: reader.pointer()?,
            sibling_class: reader.pointer()?,
            protocols: reader.pointer()?,
            extra_data: reader.pointer()?,
            abi_version: 0,
            ivar_offsets: Address::NULL,
            properties: Address::NULL,
            strong_pointers: 0,
            weak_pointers: 0,
        };

        if class.flags().contains(ClassFlags::NEW_ABI) {
            class.abi_version = reader.long()?;
            class.ivar_offsets = reader.pointer()?;
            class.properties = reader.pointer()?;
            class.strong_pointers = reader.uintptr()?;
            class.weak_pointers = reader.uintptr()?;
        }

        Ok(class)
    }

    /// The class flags, unknown bits are kept
    #[must_use]
    pub fn flags(&self) -> ClassFlags {
        ClassFlags::from_bits_retain(self.info)
    }

    /// Returns true for metaclass records
    #[must_use]
    pub fn is_meta(&self) -> bool {
        self.flags().contains(ClassFlags::META)
    }

    /// Effective ABI version: `0` for old records, `abi_version + 1` for `NEW_ABI` records.
    #[must_use]
    pub fn abi_level(&self) -> i64 {
        if self.flags().contains(ClassFlags::NEW_ABI) {
            self.abi_version.wrapping_add(1)
        } else {
            0
        }
    }

    /// Returns true if bit `index` of the strong ownership bitfield is set.
    ///
    /// # Errors
    /// See [`bitfield_test`].
    pub fn is_strong(&self, image: &Image, index: usize) -> Result<bool> {
        bitfield_test(image, self.strong_pointers, index)
    }

    /// Returns true if bit `index` of the weak ownership bitfield is set.
    ///
    /// # Errors
    /// See [`bitfield_test`].
    pub fn is_weak(&self, image: &Image, index: usize) -> Result<bool> {
        bitfield_test(image, self.weak_pointers, index)
    }
}

/// Test bit `index` of a legacy ownership bitfield.
///
/// A set low bit marks an inline bitfield in which ivar `index` is bit `index + 1`. Otherwise the
/// value points to `{ int32_t length; uint32_t words[length]; }`; null means no bits are set.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if an out-of-line bitfield does not fit into the image.
pub fn bitfield_test(image: &Image, bitfield: u64, index: usize) -> Result<bool> {
    if bitfield == 0 {
        return Ok(false);
    }

    if bitfield & 1 == 1 {
        let bits = image.target().pointer_size() * 8;
        let bit = index.saturating_add(1);
        return Ok(bit < bits && (bitfield >> bit) & 1 == 1);
    }

    let address = Address::new(bitfield);
    let length = image.read_i32(address)?;
    let word = index / 32;
    if i64::try_from(word).map_or(true, |word| word >= i64::from(length)) {
        return Ok(false);
    }

    let value = image.read_u32(address.offset(4 + 4 * word as u64))?;
    Ok((value >> (index % 32)) & 1 == 1)
}

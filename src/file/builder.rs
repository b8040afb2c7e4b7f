//! Arena that lays out C records and strings into a fresh image.
//!
//! [`ImageBuilder`] is the write-side counterpart of [`crate::Image`]. It hands out addresses
//! for zeroed, aligned allocations relative to a base address, and [`RecordWriter`] fills them
//! field-for-field with the same alignment rules [`crate::RecordReader`] uses to decode. The
//! emitter serializes upgraded descriptors through it, and the legacy fixture builder uses it to
//! produce legacy images.

use std::collections::HashMap;

use crate::{
    file::{align_up, io::write_at, Address, Image, Scalar, Target},
    Error::{InvalidAddress, OutOfBounds},
    Result,
};

/// Alignment of the base address and the largest alignment an allocation may request.
const MAX_ALIGN: usize = 16;

/// An append-only arena producing an [`Image`].
pub struct ImageBuilder {
    base: Address,
    target: Target,
    data: Vec<u8>,
    strings: HashMap<Vec<u8>, Address>,
}

impl ImageBuilder {
    /// Create an empty arena whose first byte lives at `base`.
    ///
    /// `base` is rounded up to a 16-byte boundary so every allocation can be aligned.
    #[must_use]
    pub fn new(base: Address, target: Target) -> Self {
        let base = align_up(base.value().max(MAX_ALIGN as u64) as usize, MAX_ALIGN);
        ImageBuilder {
            base: Address::new(base as u64),
            target,
            data: Vec::new(),
            strings: HashMap::new(),
        }
    }

    /// The target ABI records are encoded for
    #[must_use]
    pub fn target(&self) -> Target {
        self.target
    }

    /// The address of the first byte of the arena
    #[must_use]
    pub fn base(&self) -> Address {
        self.base
    }

    /// Number of bytes allocated so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if nothing was allocated yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Allocate `size` zeroed bytes aligned to `align` (capped at 16).
    pub fn alloc(&mut self, size: usize, align: usize) -> Address {
        let start = align_up(self.data.len(), align.clamp(1, MAX_ALIGN));
        self.data.resize(start + size, 0);
        self.base.offset(start as u64)
    }

    /// Allocate one zeroed record with the given shape
    pub fn alloc_record(&mut self, shape: &[Scalar]) -> Address {
        let layout = self.target.layout(shape);
        self.alloc(layout.size, layout.align)
    }

    /// Allocate a header followed by a flexible array of `count` elements.
    pub fn alloc_array(&mut self, header: &[Scalar], element: &[Scalar], count: usize) -> Address {
        let head = self.target.layout(header);
        let item = self.target.layout(element);
        let start = self.target.array_start(header, element);
        let size = (start + item.size * count).max(head.size);
        self.alloc(size, head.align.max(item.align))
    }

    /// Store a NUL-terminated copy of `value`; identical strings share one allocation.
    pub fn push_str(&mut self, value: &str) -> Address {
        self.push_c_bytes(value.as_bytes())
    }

    /// Store a NUL-terminated copy of `bytes`; identical byte strings share one allocation.
    pub fn push_c_bytes(&mut self, bytes: &[u8]) -> Address {
        if let Some(address) = self.strings.get(bytes) {
            return *address;
        }

        let address = self.push_bytes(bytes);
        self.data.push(0);
        self.strings.insert(bytes.to_vec(), address);
        address
    }

    /// Store `bytes` verbatim (no terminator is appended, nothing is shared).
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Address {
        let address = self.alloc(0, 1);
        self.data.extend_from_slice(bytes);
        address
    }

    /// Start writing the record at `address`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidAddress`] if `address` was not allocated by this builder.
    pub fn writer(&mut self, address: Address) -> Result<RecordWriter<'_>> {
        let origin = self.offset_of(address)?;
        Ok(RecordWriter {
            builder: self,
            origin,
            position: origin,
        })
    }

    /// Overwrite a pointer-sized value at `address`
    ///
    /// # Errors
    /// See [`ImageBuilder::writer`].
    pub fn write_pointer(&mut self, address: Address, value: Address) -> Result<()> {
        self.writer(address)?.pointer(value)
    }

    /// Overwrite a 32-bit value at `address`
    ///
    /// # Errors
    /// See [`ImageBuilder::writer`].
    pub fn write_i32(&mut self, address: Address, value: i32) -> Result<()> {
        self.writer(address)?.int(value)
    }

    /// Freeze the arena into an image.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] if nothing was allocated.
    pub fn finish(self) -> Result<Image> {
        Image::from_mem(self.data, self.base, self.target)
    }

    fn offset_of(&self, address: Address) -> Result<usize> {
        if address < self.base {
            return Err(InvalidAddress(address));
        }
        let offset = (address.value() - self.base.value()) as usize;
        if offset > self.data.len() {
            return Err(InvalidAddress(address));
        }
        Ok(offset)
    }
}

/// A cursor encoding one C record into an [`ImageBuilder`].
pub struct RecordWriter<'b> {
    builder: &'b mut ImageBuilder,
    origin: usize,
    position: usize,
}

impl RecordWriter<'_> {
    /// Address of the next byte that will be written
    #[must_use]
    pub fn address(&self) -> Address {
        self.builder.base.offset(self.position as u64)
    }

    /// Pad the cursor to `align` relative to the start of the record
    pub fn align(&mut self, align: usize) {
        self.position = self.origin + align_up(self.position - self.origin, align);
    }

    /// Write one scalar field (truncated to the scalar's size).
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the field does not fit into the allocation.
    pub fn scalar(&mut self, scalar: Scalar, value: u64) -> Result<()> {
        let target = self.builder.target;
        self.align(target.align_of(scalar));
        let endian = target.endianness;
        let data = self.builder.data.as_mut_slice();
        match target.size_of(scalar) {
            1 => write_at(data, &mut self.position, value as u8, endian),
            4 => write_at(data, &mut self.position, value as u32, endian),
            8 => write_at(data, &mut self.position, value, endian),
            _ => Err(OutOfBounds),
        }
    }

    /// Write a pointer field
    ///
    /// # Errors
    /// See [`RecordWriter::scalar`].
    pub fn pointer(&mut self, value: Address) -> Result<()> {
        self.scalar(Scalar::Pointer, value.value())
    }

    /// Write a `long` field
    ///
    /// # Errors
    /// See [`RecordWriter::scalar`].
    pub fn long(&mut self, value: i64) -> Result<()> {
        self.scalar(Scalar::Long, value as u64)
    }

    /// Write an `unsigned long` field
    ///
    /// # Errors
    /// See [`RecordWriter::scalar`].
    pub fn ulong(&mut self, value: u64) -> Result<()> {
        self.scalar(Scalar::ULong, value)
    }

    /// Write an `int` field
    ///
    /// # Errors
    /// See [`RecordWriter::scalar`].
    pub fn int(&mut self, value: i32) -> Result<()> {
        self.scalar(Scalar::Int, u64::from(value as u32))
    }

    /// Write an `unsigned int` field
    ///
    /// # Errors
    /// See [`RecordWriter::scalar`].
    pub fn uint(&mut self, value: u32) -> Result<()> {
        self.scalar(Scalar::UInt, u64::from(value))
    }

    /// Write a `char` field
    ///
    /// # Errors
    /// See [`RecordWriter::scalar`].
    pub fn char(&mut self, value: u8) -> Result<()> {
        self.scalar(Scalar::Char, u64::from(value))
    }

    /// Write a `size_t` field
    ///
    /// # Errors
    /// See [`RecordWriter::scalar`].
    pub fn size_t(&mut self, value: u64) -> Result<()> {
        self.scalar(Scalar::SizeT, value)
    }

    /// Write a `uintptr_t` field
    ///
    /// # Errors
    /// See [`RecordWriter::scalar`].
    pub fn uintptr(&mut self, value: u64) -> Result<()> {
        self.scalar(Scalar::UIntPtr, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_is_aligned() {
        let builder = ImageBuilder::new(Address::new(0x1003), Target::LP64_LE);
        assert_eq!(builder.base(), Address::new(0x1010));
        let builder = ImageBuilder::new(Address::NULL, Target::LP64_LE);
        assert_eq!(builder.base(), Address::new(0x10));
    }

    #[test]
    fn allocations_are_aligned_and_zeroed() {
        let mut builder = ImageBuilder::new(Address::new(0x1000), Target::LP64_LE);
        let a = builder.alloc(3, 1);
        let b = builder.alloc(8, 8);
        assert_eq!(a, Address::new(0x1000));
        assert_eq!(b, Address::new(0x1008));
        let image = builder.finish().unwrap();
        assert_eq!(image.slice(b, 8).unwrap(), &[0u8; 8]);
    }

    #[test]
    fn strings_are_interned() {
        let mut builder = ImageBuilder::new(Address::new(0x1000), Target::LP64_LE);
        let first = builder.push_str("init");
        let other = builder.push_str("dealloc");
        let again = builder.push_str("init");
        assert_eq!(first, again);
        assert_ne!(first, other);
        let image = builder.finish().unwrap();
        assert_eq!(image.c_str(other).unwrap(), "dealloc");
    }

    #[test]
    fn array_allocation_size() {
        let mut builder = ImageBuilder::new(Address::new(0x1000), Target::LP64_LE);
        let header = [Scalar::Int];
        let element = [Scalar::Pointer, Scalar::Pointer, Scalar::Int];
        let list = builder.alloc_array(&header, &element, 2);
        // 8 bytes of header, two 24 byte elements
        assert_eq!(builder.len(), 56);
        assert_eq!(list, Address::new(0x1000));
    }

    #[test]
    fn writer_roundtrip_with_reader() {
        let mut builder = ImageBuilder::new(Address::new(0x2000), Target::ILP32_LE);
        let record = builder.alloc_record(&[Scalar::Char, Scalar::Pointer, Scalar::Long]);
        {
            let mut writer = builder.writer(record).unwrap();
            writer.char(b'x').unwrap();
            writer.pointer(Address::new(0xabcd)).unwrap();
            writer.long(-1).unwrap();
            assert_eq!(writer.address(), Address::new(0x200c));
        }
        let image = builder.finish().unwrap();
        let mut reader = image.record(record).unwrap();
        assert_eq!(reader.char().unwrap(), b'x');
        assert_eq!(reader.pointer().unwrap(), Address::new(0xabcd));
        assert_eq!(reader.long().unwrap(), -1);
    }

    #[test]
    fn writer_rejects_foreign_address() {
        let mut builder = ImageBuilder::new(Address::new(0x2000), Target::LP64_LE);
        builder.alloc(8, 8);
        assert!(builder.writer(Address::new(0x1000)).is_err());
        assert!(builder.writer(Address::new(0x3000)).is_err());
        assert!(builder.write_pointer(Address::new(0x2004), Address::NULL).is_err());
    }
}

//! Sequential decoder for C records stored in an [`crate::Image`].
//!
//! A [`RecordReader`] is a cursor that starts at the first byte of a struct. Each typed read
//! first pads the cursor to the natural alignment of the scalar (relative to the start of the
//! record, which is how a C compiler places fields) and then decodes it in the image's byte
//! order. Reading the fields of a legacy struct in declaration order therefore reproduces the
//! compiler's layout without hard-coding any offsets.
//!
//! # Examples
//!
//! ```rust
//! use objcabi::{Address, ImageBuilder, Target};
//!
//! // struct { int count; void *next; } on LP64
//! let mut builder = ImageBuilder::new(Address::new(0x1000), Target::LP64_LE);
//! let record = builder.alloc(16, 8);
//! let mut writer = builder.writer(record)?;
//! writer.int(3)?;
//! writer.pointer(Address::new(0xdead_0000))?;
//! let image = builder.finish()?;
//!
//! let mut reader = image.record(record)?;
//! assert_eq!(reader.int()?, 3);
//! assert_eq!(reader.pointer()?, Address::new(0xdead_0000));
//! assert_eq!(reader.consumed(), 16);
//! # Ok::<(), objcabi::Error>(())
//! ```

use crate::{
    file::{align_up, io::read_at, Address, Image, Scalar, Target},
    Result,
};

/// A cursor decoding one C record from an [`Image`].
pub struct RecordReader<'a> {
    /// The whole image, records may only be read from inside it
    data: &'a [u8],
    /// Address of byte 0 of `data`
    base: Address,
    /// Offset of the record start, field alignment is relative to it
    origin: usize,
    /// Current position within `data`
    position: usize,
    target: Target,
}

impl<'a> RecordReader<'a> {
    /// Create a reader positioned at the record starting at `address`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidAddress`] or [`crate::Error::OutOfBounds`] if the
    /// address does not resolve into the image.
    pub fn new(image: &'a Image, address: Address) -> Result<Self> {
        let origin = image.offset_of(address, 0)?;
        Ok(RecordReader {
            data: image.data(),
            base: image.base(),
            origin,
            position: origin,
            target: image.target(),
        })
    }

    /// The target ABI of the image being read
    #[must_use]
    pub fn target(&self) -> Target {
        self.target
    }

    /// Address of the next byte that will be read
    #[must_use]
    pub fn address(&self) -> Address {
        self.base.offset(self.position as u64)
    }

    /// Number of bytes consumed since the start of the record
    #[must_use]
    pub fn consumed(&self) -> usize {
        self.position - self.origin
    }

    /// Pad the cursor to `align` relative to the start of the record.
    pub fn align(&mut self, align: usize) {
        self.position = self.origin + align_up(self.consumed(), align);
    }

    /// Address the next `scalar` field would be read from, without consuming it.
    #[must_use]
    pub fn peek_address(&self, scalar: Scalar) -> Address {
        let consumed = align_up(self.consumed(), self.target.align_of(scalar));
        self.base.offset((self.origin + consumed) as u64)
    }

    /// Read one scalar field, zero-extended to 64 bits.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the field extends past the image.
    pub fn scalar(&mut self, scalar: Scalar) -> Result<u64> {
        let saved = self.position;
        self.align(self.target.align_of(scalar));

        let endian = self.target.endianness;
        let value = match self.target.size_of(scalar) {
            1 => read_at::<u8>(self.data, &mut self.position, endian).map(u64::from),
            4 => read_at::<u32>(self.data, &mut self.position, endian).map(u64::from),
            _ => read_at::<u64>(self.data, &mut self.position, endian),
        };

        if value.is_err() {
            self.position = saved;
        }
        value
    }

    /// Read a pointer field
    ///
    /// # Errors
    /// See [`RecordReader::scalar`].
    pub fn pointer(&mut self) -> Result<Address> {
        self.scalar(Scalar::Pointer).map(Address::new)
    }

    /// Read a `long` field, sign-extended to 64 bits
    ///
    /// # Errors
    /// See [`RecordReader::scalar`].
    pub fn long(&mut self) -> Result<i64> {
        let raw = self.scalar(Scalar::Long)?;
        Ok(match self.target.size_of(Scalar::Long) {
            4 => i64::from(raw as u32 as i32),
            _ => raw as i64,
        })
    }

    /// Read an `unsigned long` field
    ///
    /// # Errors
    /// See [`RecordReader::scalar`].
    pub fn ulong(&mut self) -> Result<u64> {
        self.scalar(Scalar::ULong)
    }

    /// Read an `int` field
    ///
    /// # Errors
    /// See [`RecordReader::scalar`].
    pub fn int(&mut self) -> Result<i32> {
        Ok(self.scalar(Scalar::Int)? as u32 as i32)
    }

    /// Read an `unsigned int` field
    ///
    /// # Errors
    /// See [`RecordReader::scalar`].
    pub fn uint(&mut self) -> Result<u32> {
        Ok(self.scalar(Scalar::UInt)? as u32)
    }

    /// Read a `char` field
    ///
    /// # Errors
    /// See [`RecordReader::scalar`].
    pub fn char(&mut self) -> Result<u8> {
        Ok(self.scalar(Scalar::Char)? as u8)
    }

    /// Read a `size_t` field
    ///
    /// # Errors
    /// See [`RecordReader::scalar`].
    pub fn size_t(&mut self) -> Result<u64> {
        self.scalar(Scalar::SizeT)
    }

    /// Read a `uintptr_t` field
    ///
    /// # Errors
    /// See [`RecordReader::scalar`].
    pub fn uintptr(&mut self) -> Result<u64> {
        self.scalar(Scalar::UIntPtr)
    }
}

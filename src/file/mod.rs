//! Legacy process image abstraction.
//!
//! The upgrader never dereferences raw memory. Everything it reads comes from an [`Image`]: a
//! contiguous byte buffer that was loaded at a known base address by a process with a known
//! [`Target`] ABI. Pointers found inside records are [`Address`] values; the image resolves them
//! to offsets, checks bounds and hands out [`RecordReader`] cursors that decode C structs
//! field-for-field.
//!
//! # Key Components
//!
//! ## Core Types
//! - [`Image`] - Bytes, base address and target of a legacy image
//! - [`Address`] - A pointer value inside the image
//! - [`Backend`] - Trait for the data source (owned buffer or memory-mapped file)
//!
//! ## Record Access
//! - [`RecordReader`] - Sequential, alignment-aware decoding of one record
//! - [`ImageBuilder`] / [`RecordWriter`] - Allocation and encoding of records into a new image
//! - [`Target`] / [`Scalar`] - C scalar sizes and struct layout per pointer width
//! - [`io`] - Endian-aware primitive reads and writes
//!
//! # Examples
//!
//! ```rust
//! use objcabi::{Address, ImageBuilder, Target};
//!
//! let mut builder = ImageBuilder::new(Address::new(0x1000), Target::LP64_LE);
//! let name = builder.push_str("NSObject");
//! let image = builder.finish()?;
//!
//! assert_eq!(image.c_str(name)?, "NSObject");
//! # Ok::<(), objcabi::Error>(())
//! ```
//!
//! # Thread Safety
//!
//! [`Image`] is immutable after construction and is `Send + Sync`.

pub mod io;
pub mod parser;

mod address;
mod builder;
mod memory;
mod physical;
mod target;

pub use address::Address;
pub use builder::{ImageBuilder, RecordWriter};
pub use parser::RecordReader;
pub use target::{align_up, Endianness, PointerWidth, RecordLayout, Scalar, Target};

use std::path::Path;

use crate::{
    Error::{Empty, InvalidAddress, OutOfBounds},
    Result,
};
use memory::Memory;
use physical::Physical;

/// Source of the bytes of an [`Image`], either an owned buffer or a mapped dump.
///
/// Upgraded descriptors are shared across threads, so backends must be `Send + Sync`.
pub trait Backend: Send + Sync {
    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize {
        self.data().len()
    }

    /// Returns `len` bytes starting at image offset `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the range does not lie within the buffer.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data().get(offset..end))
            .ok_or(OutOfBounds)
    }
}

/// A legacy process image: bytes loaded at `base`, produced for `target`.
///
/// The image must outlive every upgraded descriptor that still refers to it by address
/// (ivar offset storage and aliased protocol lists point back into it).
pub struct Image {
    data: Box<dyn Backend>,
    base: Address,
    target: Target,
}

impl Image {
    /// Creates an image from an owned buffer.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] if `data` is empty.
    pub fn from_mem(data: Vec<u8>, base: Address, target: Target) -> Result<Image> {
        if data.is_empty() {
            return Err(Empty);
        }

        Ok(Image {
            data: Box::new(Memory::new(data)),
            base,
            target,
        })
    }

    /// Creates an image by memory-mapping a dump from disk.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be mapped and
    /// [`crate::Error::Empty`] if it is empty.
    pub fn from_file(path: &Path, base: Address, target: Target) -> Result<Image> {
        Ok(Image {
            data: Box::new(Physical::new(path)?),
            base,
            target,
        })
    }

    /// Returns the size of the image in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the image holds no data
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// The address the first byte of the image was loaded at
    #[must_use]
    pub fn base(&self) -> Address {
        self.base
    }

    /// The ABI the image was produced for
    #[must_use]
    pub fn target(&self) -> Target {
        self.target
    }

    /// The raw bytes of the image
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// Returns true if `len` bytes starting at `address` lie inside the image
    #[must_use]
    pub fn contains(&self, address: Address, len: usize) -> bool {
        self.offset_of(address, len).is_ok()
    }

    /// Translate an address into an offset into [`Image::data`], checking that `len` bytes fit.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidAddress`] for null or below-base addresses and
    /// [`crate::Error::OutOfBounds`] if the range runs past the end of the image.
    pub fn offset_of(&self, address: Address, len: usize) -> Result<usize> {
        if address.is_null() || address < self.base {
            return Err(InvalidAddress(address));
        }

        let Ok(offset) = usize::try_from(address.value() - self.base.value()) else {
            return Err(OutOfBounds);
        };
        self.data.data_slice(offset, len)?;
        Ok(offset)
    }

    /// Returns `len` bytes starting at `address`
    ///
    /// # Errors
    /// See [`Image::offset_of`].
    pub fn slice(&self, address: Address, len: usize) -> Result<&[u8]> {
        let offset = self.offset_of(address, len)?;
        self.data.data_slice(offset, len)
    }

    /// Starts decoding a record located at `address`
    ///
    /// # Errors
    /// See [`Image::offset_of`].
    pub fn record(&self, address: Address) -> Result<RecordReader<'_>> {
        RecordReader::new(self, address)
    }

    /// Reads a pointer-sized value at `address`
    ///
    /// # Errors
    /// See [`Image::offset_of`].
    pub fn read_pointer(&self, address: Address) -> Result<Address> {
        self.record(address)?.pointer()
    }

    /// Reads a 32-bit signed value at `address`
    ///
    /// # Errors
    /// See [`Image::offset_of`].
    pub fn read_i32(&self, address: Address) -> Result<i32> {
        self.record(address)?.int()
    }

    /// Reads a 32-bit unsigned value at `address`
    ///
    /// # Errors
    /// See [`Image::offset_of`].
    pub fn read_u32(&self, address: Address) -> Result<u32> {
        self.record(address)?.uint()
    }

    /// Returns the bytes of the NUL-terminated string at `address`, without the terminator.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if no terminator is found inside the image.
    pub fn c_bytes(&self, address: Address) -> Result<&[u8]> {
        let offset = self.offset_of(address, 0)?;
        let tail = &self.data()[offset..];
        match tail.iter().position(|byte| *byte == 0) {
            Some(end) => Ok(&tail[..end]),
            None => Err(OutOfBounds),
        }
    }

    /// Returns the NUL-terminated UTF-8 string at `address`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the string is not valid UTF-8, otherwise see
    /// [`Image::c_bytes`].
    pub fn c_str(&self, address: Address) -> Result<&str> {
        let bytes = self.c_bytes(address)?;
        std::str::from_utf8(bytes)
            .map_err(|error| malformed_error!("String at {} is not UTF-8 - {}", address, error))
    }

    /// Like [`Image::c_str`], but a null pointer yields `None`.
    ///
    /// # Errors
    /// See [`Image::c_str`].
    pub fn opt_c_str(&self, address: Address) -> Result<Option<&str>> {
        if address.is_null() {
            return Ok(None);
        }
        self.c_str(address).map(Some)
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("base", &self.base)
            .field("len", &self.len())
            .field("target", &self.target)
            .finish()
    }
}

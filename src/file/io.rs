//! Low-level byte order and safe reading/writing utilities for legacy runtime images.
//!
//! Every scalar the upgrader touches (pointers, `long`, `int`, `char` fields of the legacy and
//! current record shapes) goes through this module. It provides endian-aware, bounds-checked
//! reads and writes of primitive integers at a byte offset, advancing the offset on success.
//!
//! # Key Components
//!
//! - [`crate::file::io::ImageIO`] - Trait implemented by the primitive integer types
//! - [`crate::file::io::read_at`] / [`crate::file::io::write_at`] - Endian-selecting accessors
//! - [`crate::file::io::read_le_at`] / [`crate::file::io::read_be_at`] - Fixed byte order reads
//! - [`crate::file::io::write_le_at`] / [`crate::file::io::write_be_at`] - Fixed byte order writes
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use objcabi::file::io::read_le_at;
//!
//! let data = [0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x00, 0x00];
//! let mut offset = 0;
//!
//! let first: u16 = read_le_at(&data, &mut offset)?;  // offset: 0 -> 2
//! let second: u16 = read_le_at(&data, &mut offset)?; // offset: 2 -> 4
//! let third: u32 = read_le_at(&data, &mut offset)?;  // offset: 4 -> 8
//!
//! assert_eq!((first, second, third), (1, 2, 3));
//! # Ok::<(), objcabi::Error>(())
//! ```
//!
//! # Error Handling
//!
//! All functions return [`crate::Error::OutOfBounds`] if there are insufficient bytes in the
//! buffer. No function in this module panics on short input.

use crate::{file::Endianness, Error::OutOfBounds, Result};

/// Trait for implementing type-specific safe binary data reading and writing.
///
/// Each implementation names the fixed-size byte array that backs the type (e.g. `[u8; 4]`
/// for `u32`) and converts between it and the value in either byte order.
pub trait ImageIO: Sized + Copy {
    /// Associated type representing the byte array type for this numeric type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Read T from a byte buffer in little-endian
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
    /// Read T from a byte buffer in big-endian
    fn from_be_bytes(bytes: Self::Bytes) -> Self;
    /// Write T to a byte buffer in little-endian
    fn to_le_bytes(self) -> Self::Bytes;
    /// Write T to a byte buffer in big-endian
    fn to_be_bytes(self) -> Self::Bytes;
}

macro_rules! impl_image_io {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ImageIO for $ty {
                type Bytes = [u8; std::mem::size_of::<$ty>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }

                fn to_be_bytes(self) -> Self::Bytes {
                    <$ty>::to_be_bytes(self)
                }
            }
        )*
    };
}

impl_image_io!(u8, i8, u16, i16, u32, i32, u64, i64);

/// Safely reads a value of type `T` in little-endian byte order at a specific offset.
///
/// The offset is advanced by the size of `T` on success and left untouched on failure.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_le_at<T: ImageIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let bytes = take::<T>(data, *offset)?;
    *offset += std::mem::size_of::<T>();
    Ok(T::from_le_bytes(bytes))
}

/// Safely reads a value of type `T` in big-endian byte order at a specific offset.
///
/// The offset is advanced by the size of `T` on success and left untouched on failure.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_be_at<T: ImageIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let bytes = take::<T>(data, *offset)?;
    *offset += std::mem::size_of::<T>();
    Ok(T::from_be_bytes(bytes))
}

/// Reads a value of type `T` in the given byte order at a specific offset.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if there are insufficient bytes.
pub fn read_at<T: ImageIO>(data: &[u8], offset: &mut usize, endian: Endianness) -> Result<T> {
    match endian {
        Endianness::Little => read_le_at(data, offset),
        Endianness::Big => read_be_at(data, offset),
    }
}

/// Safely writes a value of type `T` in little-endian byte order at a specific offset.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit into `data`.
pub fn write_le_at<T: ImageIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    put(data, offset, value.to_le_bytes().as_ref())
}

/// Safely writes a value of type `T` in big-endian byte order at a specific offset.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit into `data`.
pub fn write_be_at<T: ImageIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    put(data, offset, value.to_be_bytes().as_ref())
}

/// Writes a value of type `T` in the given byte order at a specific offset.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit into `data`.
pub fn write_at<T: ImageIO>(
    data: &mut [u8],
    offset: &mut usize,
    value: T,
    endian: Endianness,
) -> Result<()> {
    match endian {
        Endianness::Little => write_le_at(data, offset, value),
        Endianness::Big => write_be_at(data, offset, value),
    }
}

fn take<T: ImageIO>(data: &[u8], offset: usize) -> Result<T::Bytes> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    T::Bytes::try_from(&data[offset..end]).map_err(|_| OutOfBounds)
}

fn put(data: &mut [u8], offset: &mut usize, bytes: &[u8]) -> Result<()> {
    let Some(end) = offset.checked_add(bytes.len()) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    data[*offset..end].copy_from_slice(bytes);
    *offset = end;
    Ok(())
}

//! Runtime metadata records in their legacy and current layouts.
//!
//! Every record kind lives in its own module with two representations:
//!
//! - a **raw** variant (`ClassRaw`, `IvarListRaw`, `PropertyRaw`, ...) that mirrors the legacy C
//!   struct field-for-field and still refers to other records by [`crate::Address`], and
//! - an **owned** variant (`Class`, `IvarList`, `Property`, ...) that describes the record in the
//!   current layout, with derived fields (ivar sizes, alignments, ownership, synthesized property
//!   attributes) computed and nested lists resolved.
//!
//! The raw variants are produced by decoding an [`crate::Image`]; the owned variants are produced
//! by the [`crate::upgrade::Upgrader`] and serialized by the [`crate::emitter::Emitter`].
//!
//! # Key Components
//!
//! - [`class`] - Class descriptors, class flags and ownership bitfields
//! - [`ivar`] - Instance variable lists and ownership qualifiers
//! - [`method`] - Chained method lists
//! - [`property`] - Property lists and attribute flags
//! - [`protocol`] - Protocol records of both legacy shapes, protocol lists, method descriptions
//! - [`category`] - Category records
//! - [`encoding`] - Objective-C type encoding decoder
//! - [`builder`] - [`LegacyBuilder`] for producing legacy images

pub mod builder;
pub mod category;
pub mod class;
pub mod encoding;
pub mod ivar;
pub mod method;
pub mod property;
pub mod protocol;

pub use builder::LegacyBuilder;

use crate::{
    file::{Address, Image, Scalar},
    Error::OutOfBounds,
    Result,
};

/// Validate a list count read from a legacy header.
///
/// # Errors
/// Returns [`crate::Error::Malformed`] for negative counts and counts above `max`.
pub(crate) fn checked_count(count: i64, address: Address, max: usize) -> Result<usize> {
    match usize::try_from(count) {
        Ok(count) if count <= max => Ok(count),
        _ => Err(malformed_error!(
            "List at {} has an invalid count {} (limit {})",
            address,
            count,
            max
        )),
    }
}

/// Decode the flexible array of `count` records that follows `header` at `address`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the array does not fit into the image, otherwise
/// whatever `read` returns for an element.
pub(crate) fn read_array<T>(
    image: &Image,
    address: Address,
    header: &[Scalar],
    element: &[Scalar],
    count: usize,
    read: impl Fn(&Image, Address) -> Result<T>,
) -> Result<Vec<T>> {
    let target = image.target();
    let start = target.array_start(header, element);
    let stride = target.layout(element).size;

    let Some(total) = stride.checked_mul(count).and_then(|body| body.checked_add(start)) else {
        return Err(OutOfBounds);
    };
    if !image.contains(address, total) {
        return Err(OutOfBounds);
    }

    (0..count)
        .map(|index| read(image, address.offset((start + index * stride) as u64)))
        .collect()
}

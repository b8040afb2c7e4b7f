//! Ivar list upgrade.
//!
//! Legacy ivar records do not store a size. It is recovered from the layout: an ivar extends up
//! to the next ivar's offset, the last one up to the instance size. Negative offsets mark values
//! that are stored externally and are normalized to their absolute value.

use log::{trace, warn};

use crate::{
    file::{Address, Image, Target},
    metadata::{
        class::{ClassFlags, ClassRaw},
        encoding,
        ivar::{Ivar, IvarList, IvarListRaw, IvarRaw, Ownership},
    },
    upgrade::UpgradeConfig,
    Result,
};

/// Upgrade the ivar list of `class`; `None` if the class declares no ivars.
///
/// # Errors
/// Returns bounds errors for records outside the image and, with `validate_layout` or
/// `validate_encodings`, [`crate::Error::Malformed`] for inconsistent layouts or types.
pub(crate) fn upgrade_ivar_list(
    image: &Image,
    class: &ClassRaw,
    config: &UpgradeConfig,
) -> Result<Option<IvarList>> {
    let Some(address) = class.ivars.non_null() else {
        return Ok(None);
    };

    let raw = IvarListRaw::read(image, address, config.max_list_count)?;
    trace!("Upgrading {} ivars of list {}", raw.len(), address);

    let offset_table = if class.flags().contains(ClassFlags::NEW_ABI) {
        class.ivar_offsets.non_null()
    } else {
        None
    };
    let abi_level = class.abi_level();
    let target = image.target();

    let mut ivars = Vec::with_capacity(raw.len());
    for (index, ivar) in raw.ivars.iter().enumerate() {
        let next = raw
            .ivars
            .get(index + 1)
            .map_or(class.instance_size, |next| i64::from(next.offset));
        let size = ivar_size(ivar, next, config)?;

        let offset_address = match offset_table {
            Some(table) => {
                let entry = (index * target.pointer_size()) as u64;
                image.read_pointer(table.offset(entry))?
            }
            None => ivar.offset_address,
        };

        let types = image.opt_c_str(ivar.types)?;
        let align = ivar_align(types, size, &target, ivar.address, config)?;

        let ownership = if abi_level < 2 {
            Ownership::Unsafe
        } else {
            Ownership::classify(
                abi_level,
                class.is_strong(image, index)?,
                class.is_weak(image, index)?,
            )
        };

        ivars.push(Ivar {
            name: image.c_str(ivar.name)?.to_string(),
            name_address: ivar.name,
            types: types.map(str::to_string),
            types_address: ivar.types,
            offset_address,
            offset: image.read_i32(offset_address)?,
            size,
            align,
            ownership,
        });
    }

    Ok(Some(IvarList { address, ivars }))
}

/// Size of `ivar` given the offset of whatever follows it.
fn ivar_size(ivar: &IvarRaw, next: i64, config: &UpgradeConfig) -> Result<i32> {
    let size = next.wrapping_abs().wrapping_sub(i64::from(ivar.offset));

    if config.validate_layout {
        if ivar.offset < 0 {
            return Err(malformed_error!(
                "Ivar at {} has a negative offset {}",
                ivar.address,
                ivar.offset
            ));
        }
        return match i32::try_from(size) {
            Ok(size) if size >= 0 => Ok(size),
            _ => Err(malformed_error!(
                "Ivar at {} has an invalid size {} (offset {}, next {})",
                ivar.address,
                size,
                ivar.offset,
                next
            )),
        };
    }

    let size = size as i32;
    if size < 0 {
        warn!(
            "Ivar at {} has a negative size {} (offset {}, next {})",
            ivar.address, size, ivar.offset, next
        );
    }
    Ok(size)
}

/// Alignment of an ivar of the given type and size.
fn ivar_align(
    types: Option<&str>,
    size: i32,
    target: &Target,
    address: Address,
    config: &UpgradeConfig,
) -> Result<u32> {
    let pointer = target.pointer_size() as u32;
    match types {
        None => Ok(pointer),
        // untyped storage (unions, bitfields) is aligned to its own size
        Some("") => Ok(u32::try_from(size).unwrap_or(0)),
        Some(types) => match encoding::align_of(types, target) {
            Ok(align) => Ok(u32::try_from(align).unwrap_or(pointer)),
            Err(error) if config.validate_encodings => Err(error),
            Err(error) => {
                warn!("Ivar at {address} has an undecodable type '{types}' - {error}");
                Ok(pointer)
            }
        },
    }
}

//! Instance variable lists
//!
//! Legacy ivars only store name, type and an inline offset. The current layout adds the size,
//! the alignment and the ownership qualifier, and stores a pointer to the offset variable
//! instead of the offset itself.
//!
//! - `IvarListRaw`: the legacy list as stored in the image
//! - `IvarList`: the upgraded list with derived fields
use strum::{Display, EnumIter};

mod owned;
mod raw;

pub use owned::*;
pub use raw::*;

/// Memory management discipline of an ivar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Ownership {
    /// Owns a reference
    Strong,
    /// Non-owning, cleared when the referent is deallocated
    Weak,
    /// Not tracked by the runtime
    Unsafe,
}

impl Ownership {
    /// Classify an ivar from the class ABI version and its ownership bits.
    ///
    /// Classes below ABI version 2 predate ownership bitfields, all their ivars are unsafe.
    #[must_use]
    pub fn classify(abi_level: i64, strong: bool, weak: bool) -> Self {
        if abi_level < 2 {
            Ownership::Unsafe
        } else if strong {
            Ownership::Strong
        } else if weak {
            Ownership::Weak
        } else {
            Ownership::Unsafe
        }
    }

    /// Encoding in the low two bits of the current ivar `flags` field
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Ownership::Strong => 1,
            Ownership::Weak => 2,
            Ownership::Unsafe => 3,
        }
    }
}

/// Mask of the ownership bits in the current ivar `flags` field
pub const IVAR_OWNERSHIP_MASK: u32 = 0b11;
/// Shift of the log2 alignment in the current ivar `flags` field
pub const IVAR_ALIGN_SHIFT: u32 = 3;
/// Mask of the log2 alignment, after shifting
pub const IVAR_ALIGN_MASK: u32 = 0x3f;

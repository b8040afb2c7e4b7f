//! Class descriptors
//!
//! A legacy class record carries its metaclass in `isa`, its instance variables, method list and
//! protocol references, and, for classes compiled with the newer GNUstep ABI, a trailing block
//! with the ABI version, an ivar offset table, a property list and the strong/weak ownership
//! bitfields.
//!
//! - `ClassRaw`: the legacy record as stored in the image
//! - `Class`: the upgraded descriptor, with its metaclass upgraded as well
use bitflags::bitflags;

mod owned;
mod raw;

pub use owned::*;
pub use raw::*;

bitflags! {
    /// Flags stored in the `info` field of a class record
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ClassFlags: u64 {
        /// This is a class, not a metaclass
        const CLASS = 1 << 0;
        /// This is a metaclass
        const META = 1 << 1;
        /// `+initialize` has been sent
        const INITIALIZED = 1 << 2;
        /// Created at run time rather than loaded
        const USER_CREATED = 1 << 3;
        /// Compiled with the newer GNUstep ABI, the record has the trailing block
        const NEW_ABI = 1 << 4;
        /// Reference counting may skip message sends
        const FAST_ARC = 1 << 5;
        /// Hidden class (e.g. associated object storage)
        const HIDDEN = 1 << 6;
        /// Instances may carry associated objects
        const ASSOCIATED = 1 << 7;
        /// Superclass pointers have been resolved
        const RESOLVED = 1 << 8;
    }
}

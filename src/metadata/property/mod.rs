//! Property lists
//!
//! Legacy properties describe their attributes with two bytes of flags plus explicit getter and
//! setter names and types. The current layout replaces them with a single attribute encoding
//! string (`T<type>,R,N,G<getter>,V<name>`) and a separate, truncated type encoding.
//!
//! - `PropertyListRaw`: one node of a legacy chain
//! - `PropertyList`: one node of an upgraded chain
use std::sync::Arc;

use bitflags::bitflags;

mod owned;
mod raw;

pub use owned::*;
pub use raw::*;

/// A reference to an upgraded `PropertyList` node
pub type PropertyListRc = Arc<PropertyList>;

bitflags! {
    /// The legacy `attributes` byte
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PropertyAttributes: u8 {
        /// `readonly`
        const READONLY = 1 << 0;
        /// A custom getter name is declared
        const GETTER = 1 << 1;
        /// `assign`
        const ASSIGN = 1 << 2;
        /// `readwrite`
        const READWRITE = 1 << 3;
        /// `retain`
        const RETAIN = 1 << 4;
        /// `copy`
        const COPY = 1 << 5;
        /// `nonatomic`
        const NONATOMIC = 1 << 6;
        /// A custom setter name is declared
        const SETTER = 1 << 7;
    }
}

bitflags! {
    /// The legacy `attributes2` byte
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PropertyAttributesExt: u8 {
        /// `atomic`, explicitly
        const ATOMIC = 1 << 0;
        /// `weak`
        const WEAK = 1 << 1;
        /// `strong`
        const STRONG = 1 << 2;
        /// `unsafe_unretained`
        const UNSAFE_UNRETAINED = 1 << 3;
        /// `@dynamic`
        const DYNAMIC = 1 << 4;
        /// `@synthesize`
        const SYNTHESIZE = 1 << 5;
    }
}

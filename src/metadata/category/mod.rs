//! Category records
//!
//! A category adds methods to an existing class. The current record extends the legacy one with
//! two property list pointers, so the upgrade copies the five legacy fields and replaces both
//! method lists with upgraded ones.
mod owned;
mod raw;

pub use owned::*;
pub use raw::*;

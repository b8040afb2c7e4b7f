//! Method lists
//!
//! Methods are stored in singly chained lists. The legacy and current layouts hold the same
//! information, only the field order and the list header differ: the current header also records
//! the element size so the runtime can iterate lists with a larger stride.
//!
//! - `MethodListRaw`: one node of a legacy chain
//! - `MethodList`: one node of an upgraded chain
use std::sync::Arc;

mod owned;
mod raw;

pub use owned::*;
pub use raw::*;

/// A reference to an upgraded `MethodList` node
pub type MethodListRc = Arc<MethodList>;

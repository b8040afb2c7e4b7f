//! Protocol records
//!
//! Two legacy protocol shapes exist. The GCC shape only names the protocol and points at its
//! adopted protocols and required method descriptions. The later GNUstep shape adds optional
//! method descriptions and required/optional property lists. Both upgrade to the same current
//! `Protocol`.
//!
//! Protocol lists and method description lists have the same layout in both ABIs, upgraded
//! protocols share them with the legacy records instead of copying them.
use std::sync::Arc;

mod owned;
mod raw;

pub use owned::*;
pub use raw::*;

/// A reference to an upgraded `Protocol`
pub type ProtocolRc = Arc<Protocol>;
/// A reference to a shared `ProtocolList`
pub type ProtocolListRc = Arc<ProtocolList>;
/// A reference to a shared `MethodDescriptionList`
pub type MethodDescriptionListRc = Arc<MethodDescriptionList>;

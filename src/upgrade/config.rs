//! Upgrade configuration
//!
//! Legacy metadata was never validated by the runtime that consumed it: an ivar list whose
//! offsets run backwards simply produced negative sizes. [`UpgradeConfig`] decides whether such
//! inconsistencies are rejected or tolerated. Bounds checks and the list limits always apply.

/// Configuration of the consistency checks applied while upgrading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct UpgradeConfig {
    /// Reject negative ivar offsets and sizes (offsets must be monotonic and the instance size
    /// must cover the last ivar). When disabled, sizes are computed with wrapping arithmetic.
    pub validate_layout: bool,

    /// Reject type encodings that cannot be decoded. When disabled, pointer alignment is assumed
    /// for ivars and the whole getter signature is used as property type.
    pub validate_encodings: bool,

    /// Require the `META` flag on the record a class points to as its metaclass
    pub validate_metaclass: bool,

    /// Maximum number of entries accepted in a single list
    pub max_list_count: usize,

    /// Maximum number of nodes followed in a chained list
    pub max_chain_length: usize,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self::strict()
    }
}

impl UpgradeConfig {
    /// Every consistency check enabled
    #[must_use]
    pub fn strict() -> Self {
        Self {
            validate_layout: true,
            validate_encodings: true,
            validate_metaclass: true,
            max_list_count: 1 << 16,
            max_chain_length: 1024,
        }
    }

    /// Best-effort upgrade of damaged metadata.
    ///
    /// Inconsistent layouts, undecodable encodings and metaclasses without the `META` flag are
    /// logged and upgraded anyway.
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            validate_layout: false,
            validate_encodings: false,
            validate_metaclass: false,
            max_list_count: 1 << 16,
            max_chain_length: 1024,
        }
    }
}

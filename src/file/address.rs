use std::fmt;

/// An address inside the legacy process image.
///
/// Legacy runtime records refer to each other through raw pointers. Inside this crate such a
/// pointer is an `Address`: a plain 64-bit value that only becomes meaningful relative to the
/// [`crate::Image`] it was read from. The value `0` is the null pointer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(pub u64);

impl Address {
    /// The null pointer
    pub const NULL: Address = Address(0);

    /// Creates a new address from a raw 64-bit value
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Address(value)
    }

    /// Returns the raw address value
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Returns true if this is the null pointer
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Returns `None` for the null pointer, `Some(self)` otherwise
    #[must_use]
    pub const fn non_null(self) -> Option<Address> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }

    /// Returns the address `by` bytes further on, wrapping like pointer arithmetic
    #[must_use]
    pub const fn offset(&self, by: u64) -> Address {
        Address(self.0.wrapping_add(by))
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Address(value)
    }
}

impl From<Address> for u64 {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{:x})", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

use thiserror::Error;

use crate::file::Address;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Legacy metadata is decoded from an untrusted [`crate::Image`], so every structural problem
/// (a dangling pointer, a count that runs past the end of the image, an ivar layout that goes
/// backwards) surfaces as one of these variants instead of propagating garbage into the
/// upgraded descriptors.
///
/// # Error Categories
///
/// ## Image Decoding Errors
/// - [`Error::OutOfBounds`] - A record or string extends beyond the image
/// - [`Error::InvalidAddress`] - A pointer does not resolve into the image
/// - [`Error::Malformed`] - Structurally inconsistent legacy data
/// - [`Error::Empty`] - An empty image was provided
/// - [`Error::FileError`] - Filesystem I/O errors while mapping an image
///
/// ## Upgrade Errors
/// - [`Error::RecursionLimit`] - A chained list exceeded the configured length
/// - [`Error::UpgradeInProgress`] - A record was re-entered while it was being upgraded
/// - [`Error::MissingRuntimeClass`] - The runtime does not provide a required class
/// - [`Error::ProtocolNotFound`] - An already upgraded protocol is unknown to the runtime
///
/// # Examples
///
/// ```rust,no_run
/// use objcabi::{Address, Error, Image, Target};
///
/// let path = std::path::Path::new("legacy.bin");
/// match Image::from_file(path, Address::new(0x1000), Target::LP64_LE) {
///     Ok(image) => println!("Mapped {} bytes", image.len()),
///     Err(Error::Empty) => eprintln!("Image is empty"),
///     Err(Error::FileError(io_err)) => eprintln!("I/O error: {}", io_err),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// An out of bound access was attempted while decoding the image.
    ///
    /// This error occurs when a record, list or string would extend past the end of
    /// the image. It is the safety net that replaces reading arbitrary process memory.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// A pointer field does not resolve into the image.
    ///
    /// Raised for null pointers where a record is mandatory and for addresses below
    /// the image base.
    #[error("Address {0} does not resolve into the image")]
    InvalidAddress(Address),

    /// The legacy data is damaged and could not be upgraded.
    ///
    /// The error includes the source location where the malformation was detected
    /// for debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur while opening or mapping an image file.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Recursion limit reached.
    ///
    /// Method, property and protocol lists are singly chained. A chain longer than the
    /// configured limit is treated as a cycle. The associated value is the limit.
    #[error("Reach the maximum recursion level allowed - {0}")]
    RecursionLimit(usize),

    /// A record was reached again while its own upgrade was still running.
    ///
    /// The single-threaded load-time contract forbids this; seeing it means either a
    /// cyclic metadata graph or concurrent upgrade passes over the same record.
    #[error("Record at {0} is already being upgraded")]
    UpgradeInProgress(Address),

    /// The runtime could not provide a class the upgrade depends on.
    ///
    /// Upgraded protocols take the `Protocol` class as their isa; an upgraded protocol
    /// without one would be unusable.
    #[error("The runtime does not provide the class '{0}'")]
    MissingRuntimeClass(String),

    /// A protocol that has already been upgraded could not be found by name.
    #[error("Upgraded protocol '{0}' is not registered with the runtime")]
    ProtocolNotFound(String),
}

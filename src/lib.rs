// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # objcabi
//!
//! Upgrades Objective-C runtime metadata emitted for the legacy GNUstep ABIs (the GCC ABI and
//! GNUstep v1) into the layout the current runtime expects.
//!
//! Old binaries describe their classes with records that lack information the current runtime
//! relies on: ivar sizes, alignments and ownership, property attribute strings, optional protocol
//! members. `objcabi` decodes those records from a legacy [`Image`], derives what is missing and
//! produces owned descriptors in the current layout. An [`emitter::Emitter`] can serialize the
//! descriptors back into records.
//!
//! ## Features
//!
//! - **Bounds-checked decoding** - Legacy records are read through an [`Image`], never through raw
//!   pointers; 32 and 64-bit targets are supported
//! - **Ivar layout recovery** - Sizes from neighbouring offsets, alignments from type encodings,
//!   ownership from the strong/weak bitfields
//! - **Property encoding** - Attribute strings synthesized from the legacy flag bytes
//! - **Upgrade once** - Shared metaclasses and protocols are upgraded a single time and handed out
//!   as shared [`std::sync::Arc`] descriptors
//! - **Strict or lenient** - [`upgrade::UpgradeConfig`] decides whether inconsistent metadata is
//!   rejected or upgraded with a warning
//!
//! ## Quick Start
//!
//! ```rust
//! use objcabi::prelude::*;
//!
//! // A legacy image with one class and its metaclass
//! let mut builder = LegacyBuilder::new(Address::new(0x10000), Target::LP64_LE);
//! let ivars = builder.ivar_list(&[
//!     LegacyIvar { name: "isa", types: Some("#"), offset: 0 },
//!     LegacyIvar { name: "count", types: Some("i"), offset: 8 },
//! ])?;
//! let meta = builder.class(&LegacyClass { name: "Counter", flags: ClassFlags::META, ..Default::default() })?;
//! let class = builder.class(&LegacyClass {
//!     isa: meta,
//!     name: "Counter",
//!     flags: ClassFlags::CLASS,
//!     instance_size: 12,
//!     ivars,
//!     ..Default::default()
//! })?;
//! let image = builder.finish()?;
//!
//! let runtime = Runtime::new();
//! let upgrader = Upgrader::new(&image, &runtime);
//! let counter = upgrader.upgrade_class(class)?;
//!
//! let count = counter.ivars.as_ref().and_then(|ivars| ivars.get("count")).unwrap();
//! assert_eq!(count.size, 4);
//! assert_eq!(count.align, 4);
//! # Ok::<(), objcabi::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`file`] - The legacy [`Image`], addresses, target ABIs and record readers and writers
//! - [`metadata`] - Legacy (`*Raw`) and current record types, the type encoding decoder and
//!   [`metadata::LegacyBuilder`]
//! - [`runtime`] - Services consumed from the host runtime and the in-memory [`runtime::Runtime`]
//! - [`upgrade`] - The [`upgrade::Upgrader`] and its configuration
//! - [`emitter`] - Serialization of upgraded descriptors
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! ```rust
//! use objcabi::{Address, Error, Image, Target};
//!
//! match Image::from_mem(Vec::new(), Address::new(0x1000), Target::LP64_LE) {
//!     Err(Error::Empty) => println!("Nothing to upgrade"),
//!     Err(e) => println!("Error: {}", e),
//!     Ok(image) => println!("{} bytes", image.len()),
//! }
//! ```
//!
//! ## Development and Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! cargo +nightly fuzz run legacy_class --release
//! ```

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use objcabi::prelude::*;
///
/// let runtime = Runtime::new();
/// let config = UpgradeConfig::lenient();
/// assert!(!config.validate_layout);
/// assert_eq!(runtime.selector_count(), 0);
/// ```
pub mod prelude;

/// Legacy image access: addresses, targets, record readers and writers
pub mod file;

/// Legacy and current runtime records
pub mod metadata;

/// Services consumed from the host runtime
pub mod runtime;

/// The upgrade engine
pub mod upgrade;

/// Serialization of upgraded descriptors
pub mod emitter;

/// `objcabi` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `objcabi` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;

/// Legacy image and record access
pub use file::{
    Address, Endianness, Image, ImageBuilder, PointerWidth, RecordReader, RecordWriter, Scalar,
    Target,
};

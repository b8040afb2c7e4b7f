//! # objcabi Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the objcabi library. Import this module to get quick access to everything needed to
//! build, upgrade and emit legacy metadata.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all objcabi operations
pub use crate::Error;

/// The result type used throughout objcabi
pub use crate::Result;

// ================================================================================================
// Image Access
// ================================================================================================

/// Legacy image, addresses and target ABIs
pub use crate::file::{Address, Image, ImageBuilder, RecordReader, RecordWriter, Target};

// ================================================================================================
// Metadata
// ================================================================================================

/// Class descriptors
pub use crate::metadata::class::{Class, ClassFlags, ClassIsa, ClassRaw, ClassRc};

/// Ivars
pub use crate::metadata::ivar::{Ivar, IvarList, Ownership};

/// Methods
pub use crate::metadata::method::{Method, MethodList, MethodListRc};

/// Properties
pub use crate::metadata::property::{
    AttributeEncoding, Property, PropertyAttributes, PropertyAttributesExt, PropertyList,
};

/// Protocols and categories
pub use crate::metadata::{
    category::Category,
    protocol::{MethodDescriptionList, Protocol, ProtocolList, ProtocolRc},
};

/// Legacy image construction
pub use crate::metadata::builder::{
    LegacyBuilder, LegacyCategory, LegacyClass, LegacyIvar, LegacyMethod, LegacyProperty,
    LegacyProtocol,
};

// ================================================================================================
// Runtime and Upgrade
// ================================================================================================

/// Runtime services
pub use crate::runtime::{
    AssociationKey, AssociationStore, ClassTable, ProtocolTable, Runtime, RuntimeServices,
    Selector, SelectorTable,
};

/// Upgrade engine
pub use crate::upgrade::{encode_attributes, PropertyDescription, UpgradeConfig, Upgrader};

/// Record emission
pub use crate::emitter::Emitter;

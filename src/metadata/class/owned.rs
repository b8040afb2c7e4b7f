use std::sync::Arc;

use crate::{
    file::{Address, Scalar},
    metadata::{
        class::ClassFlags,
        ivar::IvarList,
        method::{Method, MethodListRc},
        property::PropertyListRc,
    },
    runtime::ObjectId,
};

/// A reference to an upgraded `Class`
pub type ClassRc = Arc<Class>;

/// The `isa` of an upgraded class descriptor.
#[derive(Debug, Clone)]
pub enum ClassIsa {
    /// A class points at its upgraded metaclass
    Metaclass(ClassRc),
    /// A metaclass keeps the legacy pointer to the root metaclass
    Legacy(Address),
}

/// A class descriptor in the current layout.
///
/// Identity, name, version, flags, instance size, protocol references and ABI version are carried
/// over verbatim from the legacy record. The superclass is left unset, it is resolved by the
/// loader once every class is known.
#[derive(Debug)]
pub struct Class {
    /// Identity of this descriptor
    pub id: ObjectId,
    /// Metaclass, or the legacy isa for metaclasses
    pub isa: ClassIsa,
    /// Class name
    pub name: String,
    /// Address of the name string in the legacy image
    pub name_address: Address,
    /// User defined class version
    pub version: i64,
    /// Class flags
    pub info: ClassFlags,
    /// Instance size in bytes
    pub instance_size: i64,
    /// Upgraded instance variables
    pub ivars: Option<IvarList>,
    /// Upgraded method list chain
    pub methods: Option<MethodListRc>,
    /// Protocol references, untouched
    pub protocols: Address,
    /// ABI version field of the legacy record
    pub abi_version: i64,
    /// Upgraded property list chain
    pub properties: Option<PropertyListRc>,
}

impl Class {
    /// Field layout of the current class record
    pub const SHAPE: &'static [Scalar] = &[
        Scalar::Pointer, // isa
        Scalar::Pointer, // super_class
        Scalar::Pointer, // name
        Scalar::Long,    // version
        Scalar::ULong,   // info
        Scalar::Long,    // instance_size
        Scalar::Pointer, // ivars
        Scalar::Pointer, // methods
        Scalar::Pointer, // dtable
        Scalar::Pointer, // subclass_list
        Scalar::Pointer, // cxx_construct
        Scalar::Pointer, // cxx_destruct
        Scalar::Pointer, // sibling_class
        Scalar::Pointer, // protocols
        Scalar::Pointer, // extra_data
        Scalar::Long,    // abi_version
        Scalar::Pointer, // properties
    ];

    /// Returns true for metaclasses
    #[must_use]
    pub fn is_meta(&self) -> bool {
        self.info.contains(ClassFlags::META)
    }

    /// The upgraded metaclass, `None` for metaclasses themselves
    #[must_use]
    pub fn metaclass(&self) -> Option<&ClassRc> {
        match &self.isa {
            ClassIsa::Metaclass(meta) => Some(meta),
            ClassIsa::Legacy(_) => None,
        }
    }

    /// Iterate every method of every list in the method chain, in order
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter().flat_map(|list| list.iter())
    }

    /// Find an instance method by selector name
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods().find(|method| method.name == name)
    }
}

use crate::{
    file::{Address, Scalar},
    metadata::method::MethodListRc,
};

/// A category in the current layout.
#[derive(Debug)]
pub struct Category {
    /// Category name
    pub name: String,
    /// Address of the category name in the legacy image
    pub name_address: Address,
    /// Name of the extended class
    pub class_name: String,
    /// Address of the class name in the legacy image
    pub class_name_address: Address,
    /// Upgraded instance methods
    pub instance_methods: Option<MethodListRc>,
    /// Upgraded class methods
    pub class_methods: Option<MethodListRc>,
    /// Adopted protocols, untouched
    pub protocols: Address,
}

impl Category {
    /// Field layout of the current category record
    pub const SHAPE: &'static [Scalar] = &[
        Scalar::Pointer, // name
        Scalar::Pointer, // class_name
        Scalar::Pointer, // instance_methods
        Scalar::Pointer, // class_methods
        Scalar::Pointer, // protocols
        Scalar::Pointer, // properties
        Scalar::Pointer, // class_properties
    ];
}

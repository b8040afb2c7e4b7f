use crate::{
    file::{Address, Scalar},
    metadata::{
        property::PropertyListRc,
        protocol::{MethodDescriptionListRc, ProtocolListRc},
    },
    runtime::ObjectId,
};

/// A method requirement of a protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescription {
    /// Selector name
    pub name: String,
    /// Type encoding
    pub types: Option<String>,
}

/// A method description list, shared between a legacy record and its upgraded protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptionList {
    /// Address of the list in the legacy image; the upgraded protocol refers to it there
    pub address: Address,
    /// The descriptions
    pub descriptions: Vec<MethodDescription>,
}

impl MethodDescriptionList {
    /// Number of descriptions
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    /// Returns true if the list holds no descriptions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }
}

/// A list of adopted protocols, referenced by identity and shared, never copied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolList {
    /// Address of the list in the legacy image
    pub address: Address,
    /// Next list in the chain
    pub next: Address,
    /// The adopted protocol records
    pub protocols: Vec<Address>,
}

/// A protocol in the current layout.
#[derive(Debug)]
pub struct Protocol {
    /// Identity of this descriptor
    pub id: ObjectId,
    /// Legacy record this protocol was upgraded from
    pub address: Address,
    /// The `Protocol` class
    pub isa: Address,
    /// Protocol name
    pub name: String,
    /// Address of the name in the legacy image
    pub name_address: Address,
    /// Adopted protocols
    pub protocol_list: Option<ProtocolListRc>,
    /// Required instance methods
    pub instance_methods: Option<MethodDescriptionListRc>,
    /// Required class methods
    pub class_methods: Option<MethodDescriptionListRc>,
    /// Optional instance methods
    pub optional_instance_methods: Option<MethodDescriptionListRc>,
    /// Optional class methods
    pub optional_class_methods: Option<MethodDescriptionListRc>,
    /// Required properties
    pub properties: Option<PropertyListRc>,
    /// Optional properties
    pub optional_properties: Option<PropertyListRc>,
}

impl Protocol {
    /// Field layout of the current protocol record
    pub const SHAPE: &'static [Scalar] = &[
        Scalar::Pointer, // isa
        Scalar::Pointer, // name
        Scalar::Pointer, // protocol_list
        Scalar::Pointer, // instance_methods
        Scalar::Pointer, // class_methods
        Scalar::Pointer, // optional_instance_methods
        Scalar::Pointer, // optional_class_methods
        Scalar::Pointer, // properties
        Scalar::Pointer, // optional_properties
        Scalar::Pointer, // class_properties
        Scalar::Pointer, // optional_class_properties
    ];

    /// An empty protocol called `name`, upgraded from the record at `address`
    #[must_use]
    pub fn named(name: &str, address: Address) -> Self {
        Protocol {
            id: ObjectId::next(),
            address,
            isa: Address::NULL,
            name: name.to_string(),
            name_address: Address::NULL,
            protocol_list: None,
            instance_methods: None,
            class_methods: None,
            optional_instance_methods: None,
            optional_class_methods: None,
            properties: None,
            optional_properties: None,
        }
    }
}

//! Property upgrade and attribute encoding.
//!
//! A legacy property spreads its declaration over two flag bytes, explicit accessor names and the
//! accessor signatures. The current layout wants a single attribute string:
//!
//! ```text
//! \0 [T<type>] [,R] [,&] [,C] [,W] [,D] [,N] [,G<getter>] [,S<setter>] [,]V<name> \0
//! ```
//!
//! The leading NUL tells the runtime the string is in the current format. Records whose name
//! already starts with NUL were emitted by a newer compiler and carry the encoding themselves.

use std::sync::Arc;

use log::{trace, warn};

use crate::{
    file::{Address, Image},
    metadata::{
        encoding,
        property::{
            AttributeEncoding, Property, PropertyAttributes, PropertyAttributesExt, PropertyList,
            PropertyListRaw, PropertyListRc, PropertyRaw,
        },
    },
    runtime::SelectorTable,
    upgrade::{read_chain, UpgradeConfig},
    Result,
};

/// Everything the attribute encoding is built from.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyDescription<'p> {
    /// Property name
    pub name: &'p str,
    /// Property type, omitted from the encoding when empty
    pub type_encoding: &'p str,
    /// The legacy `attributes` byte
    pub attributes: PropertyAttributes,
    /// The legacy `attributes2` byte
    pub attributes2: PropertyAttributesExt,
    /// Custom getter name
    pub getter: Option<&'p str>,
    /// Custom setter name
    pub setter: Option<&'p str>,
}

impl PropertyDescription<'_> {
    /// The single letter flags in encoding order
    fn flags(&self) -> [(bool, u8); 6] {
        [
            (self.attributes.contains(PropertyAttributes::READONLY), b'R'),
            (self.attributes.contains(PropertyAttributes::RETAIN), b'&'),
            (self.attributes.contains(PropertyAttributes::COPY), b'C'),
            (self.attributes2.contains(PropertyAttributesExt::WEAK), b'W'),
            (self.attributes2.contains(PropertyAttributesExt::DYNAMIC), b'D'),
            (self.attributes.contains(PropertyAttributes::NONATOMIC), b'N'),
        ]
    }
}

/// Upper bound of the encoded length of `property`, both NULs included.
#[must_use]
pub fn encoded_capacity(property: &PropertyDescription<'_>) -> usize {
    let flags = property.flags().iter().filter(|(set, _)| *set).count();
    property.type_encoding.len()
        + property.name.len()
        + 6
        + 2 * flags
        + property.getter.map_or(0, |getter| getter.len() + 2)
        + property.setter.map_or(0, |setter| setter.len() + 2)
}

/// Synthesize the attribute encoding of `property`.
///
/// # Examples
///
/// ```rust
/// use objcabi::{
///     metadata::property::PropertyAttributes,
///     upgrade::{encode_attributes, PropertyDescription},
/// };
///
/// let encoding = encode_attributes(&PropertyDescription {
///     name: "count",
///     type_encoding: "i",
///     attributes: PropertyAttributes::READONLY | PropertyAttributes::NONATOMIC,
///     ..Default::default()
/// });
/// assert_eq!(encoding.as_bytes(), b"\0Ti,R,N,Vcount\0");
/// ```
#[must_use]
pub fn encode_attributes(property: &PropertyDescription<'_>) -> AttributeEncoding {
    let capacity = encoded_capacity(property);
    let mut bytes = Vec::with_capacity(capacity);
    bytes.push(0);

    let mut needs_comma = false;
    if !property.type_encoding.is_empty() {
        bytes.push(b'T');
        bytes.extend_from_slice(property.type_encoding.as_bytes());
        needs_comma = true;
    }

    for (set, code) in property.flags() {
        if set {
            bytes.push(b',');
            bytes.push(code);
            needs_comma = true;
        }
    }

    for (code, accessor) in [(b'G', property.getter), (b'S', property.setter)] {
        if let Some(accessor) = accessor {
            if needs_comma {
                bytes.push(b',');
            }
            bytes.push(code);
            bytes.extend_from_slice(accessor.as_bytes());
            needs_comma = true;
        }
    }

    if needs_comma {
        bytes.push(b',');
    }
    bytes.push(b'V');
    bytes.extend_from_slice(property.name.as_bytes());
    bytes.push(0);

    debug_assert!(bytes.len() <= capacity);
    AttributeEncoding::from_bytes(bytes)
}

/// Upgrade the property list chain starting at `address`; `None` for a null list.
///
/// Getter and setter selectors are registered with `selectors` as each property is upgraded.
///
/// # Errors
/// Returns bounds errors, [`crate::Error::Malformed`] for invalid counts or (with
/// `validate_encodings`) undecodable types and [`crate::Error::RecursionLimit`] for chains
/// longer than `max_chain_length`.
pub(crate) fn upgrade_property_list<S: SelectorTable + ?Sized>(
    image: &Image,
    address: Address,
    selectors: &S,
    config: &UpgradeConfig,
) -> Result<Option<PropertyListRc>> {
    let nodes = read_chain(
        address,
        config.max_chain_length,
        |node| PropertyListRaw::read(image, node, config.max_list_count),
        |node| node.next,
    )?;

    let mut next = None;
    for raw in nodes.into_iter().rev() {
        let properties = raw
            .properties
            .iter()
            .map(|property| upgrade_property(image, property, selectors, config))
            .collect::<Result<Vec<_>>>()?;
        trace!("Upgraded {} properties of list {}", properties.len(), raw.address);

        next = Some(Arc::new(PropertyList {
            address: raw.address,
            next,
            properties,
        }));
    }
    Ok(next)
}

/// Upgrade a single legacy property.
///
/// # Errors
/// See [`upgrade_property_list`].
pub(crate) fn upgrade_property<S: SelectorTable + ?Sized>(
    image: &Image,
    raw: &PropertyRaw,
    selectors: &S,
    config: &UpgradeConfig,
) -> Result<Property> {
    let getter_name = image.opt_c_str(raw.getter_name)?;
    let getter_types = image.opt_c_str(raw.getter_types)?;
    let setter_name = image.opt_c_str(raw.setter_name)?;
    let setter_types = image.opt_c_str(raw.setter_types)?;

    let type_encoding = property_type(getter_types.unwrap_or(""), raw.address, config)?;
    let getter = getter_name.map(|name| selectors.register_selector(name, getter_types));
    let setter = setter_name.map(|name| selectors.register_selector(name, setter_types));

    if image.c_bytes(raw.name)?.is_empty() {
        // name[1] is the offset of the real name, the encoding follows at name + 2
        let name_offset = image.slice(raw.name.offset(1), 1)?[0];
        let name = image.c_str(raw.name.offset(u64::from(name_offset)))?;
        let attributes = AttributeEncoding::from_body(image.c_bytes(raw.name.offset(2))?);
        trace!("Property '{}' at {} carries its encoding {}", name, raw.address, attributes);

        return Ok(Property {
            name: name.to_string(),
            attributes,
            type_encoding,
            getter,
            setter,
        });
    }

    let name = image.c_str(raw.name)?;
    let flags = raw.flags();
    let description = PropertyDescription {
        name,
        type_encoding: &type_encoding,
        attributes: flags,
        attributes2: raw.flags_ext(),
        getter: custom_accessor(
            flags.contains(PropertyAttributes::GETTER),
            getter_name,
            "getter",
            raw.address,
            config,
        )?,
        setter: custom_accessor(
            flags.contains(PropertyAttributes::SETTER),
            setter_name,
            "setter",
            raw.address,
            config,
        )?,
    };
    let attributes = encode_attributes(&description);
    trace!("Property '{}' at {} encoded as {}", name, raw.address, attributes);

    Ok(Property {
        name: name.to_string(),
        attributes,
        type_encoding,
        getter,
        setter,
    })
}

/// The property type: the leading type of the getter signature.
fn property_type(getter_types: &str, address: Address, config: &UpgradeConfig) -> Result<String> {
    match encoding::type_length(getter_types) {
        Ok(length) => Ok(getter_types.get(..length).unwrap_or(getter_types).to_string()),
        Err(error) if config.validate_encodings => Err(error),
        Err(error) => {
            warn!("Property at {address} has an undecodable getter type '{getter_types}' - {error}");
            Ok(getter_types.to_string())
        }
    }
}

/// The accessor name to encode, if the flags declare a custom one.
fn custom_accessor<'i>(
    declared: bool,
    name: Option<&'i str>,
    kind: &str,
    address: Address,
    config: &UpgradeConfig,
) -> Result<Option<&'i str>> {
    match (declared, name) {
        (false, _) => Ok(None),
        (true, Some(name)) => Ok(Some(name)),
        (true, None) if config.validate_encodings => Err(malformed_error!(
            "Property at {} declares a custom {} without a name",
            address,
            kind
        )),
        (true, None) => {
            warn!("Property at {address} declares a custom {kind} without a name");
            Ok(None)
        }
    }
}

use std::fmt;

use crate::{
    file::{Address, Scalar},
    metadata::property::PropertyListRc,
    runtime::Selector,
};

/// A property attribute encoding string.
///
/// The bytes start with a NUL that distinguishes the current format from old-style attribute
/// strings and end with the terminating NUL, e.g. `\0Ti,R,N,Vcount\0`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct AttributeEncoding(Vec<u8>);

impl AttributeEncoding {
    /// Wrap already encoded bytes (leading and trailing NUL included)
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        AttributeEncoding(bytes)
    }

    /// Wrap an existing encoded body: a leading and a terminating NUL are added
    #[must_use]
    pub fn from_body(body: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(body.len() + 2);
        bytes.push(0);
        bytes.extend_from_slice(body);
        bytes.push(0);
        AttributeEncoding(bytes)
    }

    /// All bytes, including both NULs
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The text between the leading NUL and the terminator
    #[must_use]
    pub fn body(&self) -> &[u8] {
        let start = usize::from(self.0.first() == Some(&0));
        let end = self.0.len() - usize::from(self.0.len() > start && self.0.last() == Some(&0));
        &self.0[start..end]
    }

    /// Number of bytes, both NULs included
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no bytes at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The comma separated attribute items of the body
    pub fn items(&self) -> impl Iterator<Item = &[u8]> {
        self.body().split(|byte| *byte == b',').filter(|item| !item.is_empty())
    }
}

impl fmt::Debug for AttributeEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttributeEncoding({:?})", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Display for AttributeEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.body()))
    }
}

/// A property in the current layout.
#[derive(Debug, Clone)]
pub struct Property {
    /// Property name
    pub name: String,
    /// Synthesized or carried over attribute encoding
    pub attributes: AttributeEncoding,
    /// Type encoding, the leading type of the getter signature (may be empty)
    pub type_encoding: String,
    /// Interned getter selector, if the legacy record names a getter
    pub getter: Option<Selector>,
    /// Interned setter selector, if the legacy record names a setter
    pub setter: Option<Selector>,
}

impl Property {
    /// Field layout of the current property record
    pub const SHAPE: &'static [Scalar] = &[
        Scalar::Pointer, // name
        Scalar::Pointer, // attributes
        Scalar::Pointer, // type
        Scalar::Pointer, // getter
        Scalar::Pointer, // setter
    ];
}

/// One node of an upgraded property list chain.
#[derive(Debug, Clone)]
pub struct PropertyList {
    /// Address of the legacy node this was upgraded from
    pub address: Address,
    /// The following node
    pub next: Option<PropertyListRc>,
    /// Properties of this node, in legacy order
    pub properties: Vec<Property>,
}

impl PropertyList {
    /// Header preceding the property array: count, element size and next
    pub const HEADER: &'static [Scalar] = &[Scalar::Int, Scalar::Int, Scalar::Pointer];

    /// Iterate this node and every following node
    pub fn nodes(&self) -> impl Iterator<Item = &PropertyList> {
        std::iter::successors(Some(self), |node| node.next.as_deref())
    }

    /// Iterate the properties of the whole chain, in order
    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.nodes().flat_map(|node| node.properties.iter())
    }

    /// Find a property by name anywhere in the chain
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.iter().find(|property| property.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_views() {
        let encoding = AttributeEncoding::from_bytes(b"\0Ti,R,N,Vcount\0".to_vec());
        assert_eq!(encoding.len(), 15);
        assert_eq!(encoding.body(), b"Ti,R,N,Vcount");
        assert_eq!(encoding.to_string(), "Ti,R,N,Vcount");
        let items: Vec<&[u8]> = encoding.items().collect();
        assert_eq!(items, vec![&b"Ti"[..], b"R", b"N", b"Vcount"]);
    }

    #[test]
    fn from_body() {
        let encoding = AttributeEncoding::from_body(b"T@,&,Vname");
        assert_eq!(encoding.as_bytes(), b"\0T@,&,Vname\0");
        assert_eq!(AttributeEncoding::from_body(b"").as_bytes(), b"\0\0");
        assert_eq!(AttributeEncoding::from_body(b"").body(), b"");
    }
}

use std::sync::OnceLock;

use crate::{
    file::{Address, Scalar},
    metadata::method::MethodListRc,
    runtime::{Selector, SelectorTable},
};

/// A method in the current layout. Selector name, types and implementation are copied verbatim.
#[derive(Debug)]
pub struct Method {
    /// Selector name
    pub name: String,
    /// Address of the selector name in the legacy image
    pub name_address: Address,
    /// Type encoding
    pub types: Option<String>,
    /// Address of the type encoding in the legacy image
    pub types_address: Address,
    /// Implementation
    pub imp: Address,
    /// The interned selector, set once the method is registered with a `SelectorTable`
    pub selector: OnceLock<Selector>,
}

impl Method {
    /// Field layout of the current method record
    pub const SHAPE: &'static [Scalar] = &[
        Scalar::Pointer, // imp
        Scalar::Pointer, // selector
        Scalar::Pointer, // types
    ];

    /// Intern this method's selector, keeping the first registration.
    pub fn register<S: SelectorTable + ?Sized>(&self, table: &S) -> Selector {
        *self
            .selector
            .get_or_init(|| table.register_selector(&self.name, self.types.as_deref()))
    }
}

/// One node of an upgraded method list chain.
#[derive(Debug)]
pub struct MethodList {
    /// Address of the legacy node this was upgraded from
    pub address: Address,
    /// The following node
    pub next: Option<MethodListRc>,
    /// Methods of this node, in legacy order
    pub methods: Vec<Method>,
}

impl MethodList {
    /// Header preceding the method array: next, count and element size
    pub const HEADER: &'static [Scalar] = &[Scalar::Pointer, Scalar::Int, Scalar::SizeT];

    /// Iterate this node and every following node
    pub fn nodes(&self) -> impl Iterator<Item = &MethodList> {
        std::iter::successors(Some(self), |node| node.next.as_deref())
    }

    /// Iterate the methods of the whole chain, in order
    pub fn iter(&self) -> impl Iterator<Item = &Method> {
        self.nodes().flat_map(|node| node.methods.iter())
    }

    /// Number of methods in the whole chain
    #[must_use]
    pub fn total(&self) -> usize {
        self.nodes().map(|node| node.methods.len()).sum()
    }

    /// Register the selector of every method in the chain.
    pub fn register_selectors<S: SelectorTable + ?Sized>(&self, table: &S) {
        for method in self.iter() {
            method.register(table);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::runtime::Runtime;

    fn method(name: &str) -> Method {
        Method {
            name: name.to_string(),
            name_address: Address::NULL,
            types: Some("v16@0:8".to_string()),
            types_address: Address::NULL,
            imp: Address::new(0x4000),
            selector: OnceLock::new(),
        }
    }

    #[test]
    fn chain_iteration() {
        let tail = Arc::new(MethodList {
            address: Address::new(0x200),
            next: None,
            methods: vec![method("c")],
        });
        let head = MethodList {
            address: Address::new(0x100),
            next: Some(tail),
            methods: vec![method("a"), method("b")],
        };

        assert_eq!(head.total(), 3);
        assert_eq!(head.nodes().count(), 2);
        let names: Vec<&str> = head.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn registration_is_sticky() {
        let runtime = Runtime::new();
        let list = MethodList {
            address: Address::new(0x100),
            next: None,
            methods: vec![method("a"), method("a")],
        };
        list.register_selectors(&runtime);

        let first = list.methods[0].selector.get().copied().unwrap();
        assert_eq!(list.methods[1].selector.get().copied(), Some(first));
        assert_eq!(list.methods[0].register(&runtime), first);
        assert_eq!(runtime.selector_count(), 1);
    }
}

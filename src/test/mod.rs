//! Shared fixtures for unit tests.
//!
//! [`fixture`] builds a small legacy image with one class hierarchy, a category and a protocol of
//! each shape:
//!
//! - `Object`: root metaclass, its `isa` points at itself
//! - `Counter`: `NEW_ABI` class (ABI version 1) with ivars `isa`, `count`, `label` (strong), a
//!   two-node method chain `init, count -> dealloc`, and a readonly `count` property
//! - `Counter` metaclass with a `new` class method
//! - `Counter(Reset)`: category with a `reset` instance method
//! - `Counting`: GCC protocol requiring `count`
//! - `Labelled`: GNUstep v1 protocol adopting `Counting`, with a `label` property and an
//!   optional `resetLabel` method
//! - `Protocol`: a plain class record standing in for the runtime's protocol class

use crate::{
    file::{Address, Image, Target},
    metadata::{
        builder::{
            LegacyCategory, LegacyClass, LegacyIvar, LegacyMethod, LegacyProperty, LegacyProtocol,
        },
        class::ClassFlags,
        property::PropertyAttributes,
        LegacyBuilder,
    },
};

/// Base address of the fixture image
pub(crate) const BASE: Address = Address::new(0x10000);

/// The fixture image and the records in it
pub(crate) struct Fixture {
    pub image: Image,
    pub class: Address,
    pub meta: Address,
    pub root_meta: Address,
    pub category: Address,
    pub protocols: Address,
    pub gcc_protocol: Address,
    pub gsv1_protocol: Address,
    pub protocol_class: Address,
}

pub(crate) fn fixture() -> Fixture {
    let mut builder = LegacyBuilder::new(BASE, Target::LP64_LE);

    let protocol_class = builder
        .class(&LegacyClass {
            name: "Protocol",
            flags: ClassFlags::CLASS,
            instance_size: 8,
            ..Default::default()
        })
        .unwrap();

    let root_meta = builder.reserve_class(false);
    builder
        .write_class(
            root_meta,
            &LegacyClass {
                isa: root_meta,
                name: "Object",
                flags: ClassFlags::META,
                ..Default::default()
            },
        )
        .unwrap();

    let class_methods = builder
        .method_list(
            &[LegacyMethod {
                name: "new",
                types: Some("@16@0:8"),
                imp: Address::new(0x0040_0000),
            }],
            Address::NULL,
        )
        .unwrap();
    let meta = builder
        .class(&LegacyClass {
            isa: root_meta,
            name: "Counter",
            flags: ClassFlags::META,
            instance_size: 96,
            methods: class_methods,
            ..Default::default()
        })
        .unwrap();

    let ivars = builder
        .ivar_list(&[
            LegacyIvar { name: "isa", types: Some("#"), offset: 0 },
            LegacyIvar { name: "count", types: Some("q"), offset: 8 },
            LegacyIvar { name: "label", types: Some("@\"NSString\""), offset: 16 },
        ])
        .unwrap();
    let dealloc = builder
        .method_list(
            &[LegacyMethod {
                name: "dealloc",
                types: Some("v16@0:8"),
                imp: Address::new(0x0040_0030),
            }],
            Address::NULL,
        )
        .unwrap();
    let methods = builder
        .method_list(
            &[
                LegacyMethod {
                    name: "init",
                    types: Some("@16@0:8"),
                    imp: Address::new(0x0040_0010),
                },
                LegacyMethod {
                    name: "count",
                    types: Some("q16@0:8"),
                    imp: Address::new(0x0040_0020),
                },
            ],
            dealloc,
        )
        .unwrap();
    let properties = builder
        .property_list(
            &[LegacyProperty {
                name: b"count",
                attributes: PropertyAttributes::READONLY | PropertyAttributes::NONATOMIC,
                getter_name: Some("count"),
                getter_types: Some("q16@0:8"),
                ..Default::default()
            }],
            Address::NULL,
        )
        .unwrap();

    let required = builder.method_descriptions(&[("count", "q16@0:8")]).unwrap();
    let gcc_protocol = builder
        .protocol_gcc(&LegacyProtocol {
            name: "Counting",
            instance_methods: required,
            ..Default::default()
        })
        .unwrap();

    let adopted = builder.protocol_list(&[gcc_protocol], Address::NULL).unwrap();
    let optional = builder.method_descriptions(&[("resetLabel", "v16@0:8")]).unwrap();
    let label = builder
        .property_list(
            &[LegacyProperty {
                name: b"label",
                attributes: PropertyAttributes::COPY | PropertyAttributes::NONATOMIC,
                getter_name: Some("label"),
                getter_types: Some("@16@0:8"),
                setter_name: Some("setLabel:"),
                setter_types: Some("v24@0:8@16"),
                ..Default::default()
            }],
            Address::NULL,
        )
        .unwrap();
    let gsv1_protocol = builder
        .protocol_gsv1(&LegacyProtocol {
            name: "Labelled",
            protocol_list: adopted,
            optional_instance_methods: optional,
            properties: label,
            ..Default::default()
        })
        .unwrap();

    let super_class = builder.string("Object");
    let class = builder
        .class(&LegacyClass {
            isa: meta,
            super_class,
            name: "Counter",
            version: 3,
            flags: ClassFlags::CLASS | ClassFlags::NEW_ABI,
            instance_size: 24,
            ivars,
            methods,
            protocols: adopted,
            abi_version: 1,
            properties,
            strong_pointers: LegacyBuilder::inline_bitfield(&[2]),
            ..Default::default()
        })
        .unwrap();

    let reset = builder
        .method_list(
            &[LegacyMethod {
                name: "reset",
                types: Some("v16@0:8"),
                imp: Address::new(0x0040_0040),
            }],
            Address::NULL,
        )
        .unwrap();
    let category = builder
        .category(&LegacyCategory {
            name: "Reset",
            class_name: "Counter",
            instance_methods: reset,
            protocols: adopted,
            ..Default::default()
        })
        .unwrap();

    Fixture {
        image: builder.finish().unwrap(),
        class,
        meta,
        root_meta,
        category,
        protocols: adopted,
        gcc_protocol,
        gsv1_protocol,
        protocol_class,
    }
}

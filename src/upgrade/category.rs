//! Category upgrade.

use log::debug;

use crate::{
    file::Address,
    metadata::category::{Category, CategoryRaw},
    upgrade::{method, Upgrader},
    Result,
};

impl Upgrader<'_> {
    /// Upgrade the legacy category at `address`.
    ///
    /// Both method lists are upgraded. Categories are attached to their class by the loader,
    /// which registers the selectors at that point; they are not cached, every call produces a
    /// fresh descriptor.
    ///
    /// # Errors
    /// Returns decoding errors for damaged records and [`crate::Error::RecursionLimit`] for
    /// method chains longer than `max_chain_length`.
    pub fn upgrade_category(&self, address: Address) -> Result<Category> {
        let raw = CategoryRaw::read(self.image, address)?;

        let category = Category {
            name: self.image.c_str(raw.name)?.to_string(),
            name_address: raw.name,
            class_name: self.image.c_str(raw.class_name)?.to_string(),
            class_name_address: raw.class_name,
            instance_methods: method::upgrade_method_list(
                self.image,
                raw.instance_methods,
                &self.config,
            )?,
            class_methods: method::upgrade_method_list(self.image, raw.class_methods, &self.config)?,
            protocols: raw.protocols,
        };

        debug!(
            "Upgraded category '{}({})' at {}",
            category.class_name, category.name, address
        );
        Ok(category)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        runtime::Runtime,
        test::fixture,
        upgrade::Upgrader,
    };

    #[test]
    fn category() {
        let fixture = fixture();
        let runtime = Runtime::new();
        let upgrader = Upgrader::new(&fixture.image, &runtime);

        let category = upgrader.upgrade_category(fixture.category).unwrap();
        assert_eq!(category.name, "Reset");
        assert_eq!(category.class_name, "Counter");
        assert_eq!(fixture.image.c_str(category.class_name_address).unwrap(), "Counter");
        assert_eq!(category.protocols, fixture.protocols);

        let instance = category.instance_methods.as_ref().unwrap();
        assert_eq!(instance.methods[0].name, "reset");
        assert!(instance.methods[0].selector.get().is_none());
        assert!(category.class_methods.is_none());
        assert_eq!(runtime.selector_count(), 0);

        // no caching
        let again = upgrader.upgrade_category(fixture.category).unwrap();
        assert!(!Arc::ptr_eq(
            again.instance_methods.as_ref().unwrap(),
            category.instance_methods.as_ref().unwrap()
        ));
    }
}

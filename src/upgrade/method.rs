//! Method list upgrade.

use std::sync::{Arc, OnceLock};

use log::trace;

use crate::{
    file::{Address, Image},
    metadata::method::{Method, MethodList, MethodListRaw, MethodListRc, MethodRaw},
    upgrade::{read_chain, UpgradeConfig},
    Result,
};

/// Upgrade the method list chain starting at `address`; `None` for a null list.
///
/// The chain is read front to back and rebuilt back to front, so every node is created after
/// the node it links to. Selectors are not registered here.
///
/// # Errors
/// Returns bounds errors, [`crate::Error::Malformed`] for invalid counts and
/// [`crate::Error::RecursionLimit`] for chains longer than `max_chain_length`.
pub(crate) fn upgrade_method_list(
    image: &Image,
    address: Address,
    config: &UpgradeConfig,
) -> Result<Option<MethodListRc>> {
    let nodes = read_chain(
        address,
        config.max_chain_length,
        |node| MethodListRaw::read(image, node, config.max_list_count),
        |node| node.next,
    )?;

    let mut next = None;
    for raw in nodes.into_iter().rev() {
        let methods = raw
            .methods
            .iter()
            .map(|method| upgrade_method(image, method))
            .collect::<Result<Vec<_>>>()?;
        trace!("Upgraded {} methods of list {}", methods.len(), raw.address);

        next = Some(Arc::new(MethodList {
            address: raw.address,
            next,
            methods,
        }));
    }
    Ok(next)
}

fn upgrade_method(image: &Image, raw: &MethodRaw) -> Result<Method> {
    Ok(Method {
        name: image.c_str(raw.selector_name)?.to_string(),
        name_address: raw.selector_name,
        types: image.opt_c_str(raw.types)?.map(str::to_string),
        types_address: raw.types,
        imp: raw.imp,
        selector: OnceLock::new(),
    })
}

//! Visited sets keyed by legacy address.
//!
//! Every record that may be reached through several paths (a class through its subclasses'
//! metaclass hops, a protocol through several adopting classes) is tracked in a [`Visited`] map.
//! A record is absent until its upgrade starts, `Upgrading` while it runs and `Upgraded` once it
//! finished. The transition out of "absent" happens through the map's entry API, so two passes
//! can never both claim the same record.

use dashmap::{mapref::entry::Entry, DashMap};

use crate::{file::Address, Error::UpgradeInProgress, Result};

enum Slot<T> {
    Upgrading,
    Upgraded(T),
}

/// Outcome of [`Visited::claim`]
pub(crate) enum Claimed<'v, T: Clone> {
    /// The record was upgraded before
    Done(T),
    /// The caller now owns the upgrade of the record
    Fresh(Claim<'v, T>),
}

/// Ownership of one in-progress upgrade.
///
/// Dropping the claim without calling [`Claim::complete`] clears the slot again, so a failed
/// upgrade can be retried.
pub(crate) struct Claim<'v, T: Clone> {
    visited: &'v Visited<T>,
    address: Address,
    completed: bool,
}

impl<T: Clone> Claim<'_, T> {
    /// Publish the upgraded record
    pub(crate) fn complete(mut self, value: T) -> T {
        self.visited.map.insert(self.address, Slot::Upgraded(value.clone()));
        self.completed = true;
        value
    }
}

impl<T: Clone> Drop for Claim<'_, T> {
    fn drop(&mut self) {
        if !self.completed {
            self.visited.map.remove(&self.address);
        }
    }
}

/// Tri-state upgrade tags for one record kind
pub(crate) struct Visited<T> {
    map: DashMap<Address, Slot<T>>,
}

impl<T: Clone> Visited<T> {
    pub(crate) fn new() -> Self {
        Visited { map: DashMap::new() }
    }

    /// Claim the upgrade of the record at `address`.
    ///
    /// # Errors
    /// Returns [`crate::Error::UpgradeInProgress`] if the record is currently being upgraded.
    pub(crate) fn claim(&self, address: Address) -> Result<Claimed<'_, T>> {
        match self.map.entry(address) {
            Entry::Occupied(entry) => match entry.get() {
                Slot::Upgrading => Err(UpgradeInProgress(address)),
                Slot::Upgraded(value) => Ok(Claimed::Done(value.clone())),
            },
            Entry::Vacant(entry) => {
                entry.insert(Slot::Upgrading);
                Ok(Claimed::Fresh(Claim {
                    visited: self,
                    address,
                    completed: false,
                }))
            }
        }
    }

    /// The upgraded record at `address`, if its upgrade finished
    pub(crate) fn get(&self, address: Address) -> Option<T> {
        self.map.get(&address).and_then(|slot| match slot.value() {
            Slot::Upgrading => None,
            Slot::Upgraded(value) => Some(value.clone()),
        })
    }

    /// Number of records that finished upgrading
    pub(crate) fn upgraded(&self) -> usize {
        self.map
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Upgraded(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(visited: &Visited<u32>, address: u64) -> Claimed<'_, u32> {
        visited.claim(Address::new(address)).unwrap()
    }

    #[test]
    fn lifecycle() {
        let visited = Visited::new();
        let Claimed::Fresh(pending) = claim(&visited, 0x10) else {
            panic!("first claim must be fresh");
        };
        assert!(matches!(
            visited.claim(Address::new(0x10)),
            Err(UpgradeInProgress(_))
        ));
        assert_eq!(visited.get(Address::new(0x10)), None);

        assert_eq!(pending.complete(7), 7);
        assert!(matches!(claim(&visited, 0x10), Claimed::Done(7)));
        assert_eq!(visited.get(Address::new(0x10)), Some(7));
        assert_eq!(visited.upgraded(), 1);
    }

    #[test]
    fn abandoned_claims_are_cleared() {
        let visited = Visited::<u32>::new();
        {
            let _pending = claim(&visited, 0x20);
        }
        assert!(matches!(claim(&visited, 0x20), Claimed::Fresh(_)));
    }
}

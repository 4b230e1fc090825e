//! Tracks node changes with before/after values for atomic commits and rollbacks.
use crate::{
    constant::zero_value,
    field::{AsFieldBytes, FieldElement},
    types::{NodeKey, StateError},
};
use derive_more::Deref;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Seq};
use std::{
    collections::{btree_map::Entry, BTreeMap},
    fmt,
};
use tracing::warn;

/// Records updates to accumulator nodes as (old, new) value pairs.
///
/// Automatically drops no-op changes where old equals new.
#[serde_as]
#[derive(Clone, Debug, Deref, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeUpdates {
    /// Maps node keys to (old_value, new_value) pairs. Nodes that were never
    /// written carry their level's zero value as the old value.
    #[deref]
    #[serde_as(as = "Seq<(_, (AsFieldBytes, AsFieldBytes))>")]
    pub data: BTreeMap<NodeKey, (FieldElement, FieldElement)>,
}

impl NodeUpdates {
    /// Records a node change, chaining it onto any earlier change of the same node.
    ///
    /// For new keys, creates an entry tracking the change from `old_value` to
    /// `new_value`. For existing keys, preserves the original old value while
    /// updating to the new value. Entries that end up unchanged are removed.
    ///
    /// # Panics
    /// Panics if `old_value` does not match the new value already recorded for
    /// `key`.
    pub fn add(&mut self, key: NodeKey, old_value: FieldElement, new_value: FieldElement) {
        match self.data.entry(key) {
            Entry::Occupied(mut change) => {
                assert_eq!(old_value, change.get().1, "Invalid node transition");
                if change.get().0 == new_value {
                    change.remove();
                } else {
                    change.get_mut().1 = new_value;
                }
            }
            Entry::Vacant(change) => {
                if old_value != new_value {
                    change.insert((old_value, new_value));
                }
            }
        };
    }

    /// Merges a later set of updates into this one.
    ///
    /// Logically equivalent to applying `add()` for each entry in `other`.
    pub fn merge(&mut self, other: Self) {
        for (key, (old_value, new_value)) in other.data {
            self.add(key, old_value, new_value);
        }
    }

    /// Checks that every recorded old value is what the store holds now.
    ///
    /// `current` reads a node from the store the batch is about to be applied
    /// to; unwritten nodes stand for their level's zero value.
    pub fn ensure_base<E, F>(&self, mut current: F) -> Result<(), E>
    where
        E: From<StateError>,
        F: FnMut(&NodeKey) -> Result<Option<FieldElement>, E>,
    {
        for (key, (old_value, _)) in &self.data {
            let actual = current(key)?.unwrap_or_else(|| zero_value(key.level));
            if actual != *old_value {
                warn!(%key, "rejecting stale node update");
                return Err(StateError::StaleNode {
                    key: *key,
                    expected: *old_value,
                    actual,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Creates the updates that undo `self` by swapping old and new values.
    pub fn inverse(mut self) -> Self {
        self.data
            .values_mut()
            .for_each(|(old, new)| std::mem::swap(old, new));
        self
    }
}

impl fmt::Display for NodeUpdates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "NodeUpdates {{")?;
        for (key, (old_value, new_value)) in &self.data {
            writeln!(f, "  {key}: {old_value} -> {new_value}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    fn fe(n: u64) -> FieldElement {
        FieldElement::from(n)
    }

    /// Tests all add() method operations.
    ///
    /// Scenarios tested:
    /// - Chaining updates preserves the original old value
    /// - Reverting to the original value removes the entry
    /// - No-op changes are filtered out
    #[test]
    fn test_add_operations() {
        let mut updates = NodeUpdates::default();
        let key = NodeKey::leaf(U256::from(3u8));

        updates.add(key, fe(0), fe(1));
        updates.add(key, fe(1), fe(2));
        assert_eq!(updates.data[&key], (fe(0), fe(2)));

        updates.add(key, fe(2), fe(0));
        assert!(updates.is_empty());

        updates.add(key, fe(5), fe(5));
        assert!(updates.is_empty());
    }

    #[test]
    #[should_panic(expected = "Invalid node transition")]
    fn test_add_panics_on_non_chaining() {
        let mut updates = NodeUpdates::default();
        let key = NodeKey::leaf(U256::ZERO);
        updates.add(key, fe(1), fe(2));
        updates.add(key, fe(3), fe(4));
    }

    /// Tests merge and inverse.
    ///
    /// Scenarios tested:
    /// - Merging chains transitions per key
    /// - Inverse swaps old and new
    /// - Double inverse is the identity
    #[test]
    fn test_merge_and_inverse() {
        let a = NodeKey::leaf(U256::from(1u8));
        let b = NodeKey::new(1, U256::ZERO);

        let mut updates = NodeUpdates::default();
        updates.add(a, fe(0), fe(1));
        let mut later = NodeUpdates::default();
        later.add(a, fe(1), fe(2));
        later.add(b, fe(7), fe(8));
        updates.merge(later);

        assert_eq!(updates.data[&a], (fe(0), fe(2)));
        assert_eq!(updates.data[&b], (fe(7), fe(8)));

        let inverse = updates.clone().inverse();
        assert_eq!(inverse.data[&a], (fe(2), fe(0)));
        assert_eq!(updates, inverse.inverse());
    }

    /// Tests the base check.
    ///
    /// Scenarios tested:
    /// - Unwritten nodes match their level's zero value
    /// - A node holding another value is reported with both values
    #[test]
    fn test_ensure_base() {
        let a = NodeKey::leaf(U256::from(1u8));
        let b = NodeKey::new(4, U256::ZERO);
        let mut updates = NodeUpdates::default();
        updates.add(a, fe(0), fe(1));
        updates.add(b, zero_value(4), fe(2));

        let empty = |_: &NodeKey| Ok::<_, StateError>(None);
        assert_eq!(updates.ensure_base(empty), Ok(()));

        let moved = |key: &NodeKey| Ok::<_, StateError>((*key == b).then_some(fe(9)));
        assert_eq!(
            updates.ensure_base(moved),
            Err(StateError::StaleNode {
                key: b,
                expected: zero_value(4),
                actual: fe(9),
            })
        );
    }
}

//! This module implements [`MerkleTree`], the off-circuit view of the accumulator.
use crate::{
    constant::{zero_value, ROOT_LEVEL, WITNESS_LENGTH},
    field::{hash_fields, FieldElement},
    merkle::{
        updates::NodeUpdates,
        witness::{MerkleWitness, WitnessQueue},
    },
    traits::{NodeReader, NodeWriter},
    transition::TransitionBatch,
    types::{leaf_index, NodeKey},
};
use std::collections::HashMap;

/// A sparse binary Merkle tree of height [`TREE_HEIGHT`](crate::constant::TREE_HEIGHT)
/// over a pluggable node store.
///
/// Nodes that were never written read as their level's zero value, so an empty
/// tree has a well-known root without materializing any node.
#[derive(Debug)]
pub struct MerkleTree<Store> {
    store: Store,
}

impl<Store: NodeReader> MerkleTree<Store> {
    /// Creates a tree over the given store.
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Releases the underlying store.
    pub fn into_store(self) -> Store {
        self.store
    }

    /// Value of the node at `key`, or the level's zero value.
    pub fn node(&self, key: &NodeKey) -> Result<FieldElement, Store::Error> {
        Ok(self
            .store
            .node(key)?
            .unwrap_or_else(|| zero_value(key.level)))
    }

    /// Current root.
    pub fn root(&self) -> Result<FieldElement, Store::Error> {
        self.node(&NodeKey::root())
    }

    /// Current tree value stored at `path`.
    pub fn leaf(&self, path: &FieldElement) -> Result<FieldElement, Store::Error> {
        self.node(&NodeKey::leaf(leaf_index(path)))
    }

    /// Builds the witness of the leaf at `path` against the current root.
    pub fn witness(&self, path: &FieldElement) -> Result<MerkleWitness, Store::Error> {
        let mut key = NodeKey::leaf(leaf_index(path));
        let mut sibling_keys = Vec::with_capacity(WITNESS_LENGTH);
        let mut is_left = Vec::with_capacity(WITNESS_LENGTH);
        for _ in 0..WITNESS_LENGTH {
            sibling_keys.push(key.sibling());
            is_left.push(key.is_left());
            key = key.parent();
        }

        let siblings = self
            .store
            .nodes(&sibling_keys)?
            .into_iter()
            .zip(&sibling_keys)
            .map(|(value, key)| value.unwrap_or_else(|| zero_value(key.level)))
            .collect();

        Ok(MerkleWitness { siblings, is_left })
    }

    /// Computes the node changes produced by writing `leaves`, without
    /// applying them.
    ///
    /// Later entries for the same path overwrite earlier ones.
    pub fn compute_updates(
        &self,
        leaves: &[(FieldElement, FieldElement)],
    ) -> Result<NodeUpdates, Store::Error> {
        // Latest value of every node touched so far.
        let mut cache: HashMap<NodeKey, FieldElement> = HashMap::new();
        let mut updates = NodeUpdates::default();

        let read = |cache: &HashMap<NodeKey, FieldElement>,
                    key: &NodeKey|
         -> Result<FieldElement, Store::Error> {
            match cache.get(key) {
                Some(value) => Ok(*value),
                None => self.node(key),
            }
        };

        for (path, value) in leaves {
            let mut key = NodeKey::leaf(leaf_index(path));
            let mut current = *value;
            loop {
                let old = read(&cache, &key)?;
                updates.add(key, old, current);
                cache.insert(key, current);
                if key.level == ROOT_LEVEL {
                    break;
                }
                let sibling = read(&cache, &key.sibling())?;
                current = if key.is_left() {
                    hash_fields(&[current, sibling])
                } else {
                    hash_fields(&[sibling, current])
                };
                key = key.parent();
            }
        }

        Ok(updates)
    }
}

impl<Store: NodeWriter> MerkleTree<Store> {
    /// Writes `value` at `path` and updates every node up to the root.
    pub fn set_leaf(
        &mut self,
        path: &FieldElement,
        value: FieldElement,
    ) -> Result<(), Store::Error> {
        self.fill(&[(*path, value)])
    }

    /// Writes a list of `(path, value)` leaves in one store batch.
    pub fn fill(&mut self, leaves: &[(FieldElement, FieldElement)]) -> Result<(), Store::Error> {
        let updates = self.compute_updates(leaves)?;
        self.store.write_nodes(updates)
    }

    /// Records the witnesses a state-transition prover needs for `batch` and
    /// applies the batch's writes to the tree.
    ///
    /// One witness is recorded per entry, padding included, each taken after
    /// all earlier writes of the batch. Padding entries and pure reads leave the
    /// tree untouched.
    pub fn trace_batch(&mut self, batch: &TransitionBatch) -> Result<WitnessQueue, Store::Error> {
        let mut queue = WitnessQueue::new();
        for transition in batch.transitions() {
            queue.push(self.witness(&transition.path)?);
            if transition.to.is_some && !transition.is_dummy() {
                self.set_leaf(&transition.path, transition.to.value)?;
            }
        }
        Ok(queue)
    }
}

//! Define traits for storing accumulator nodes and supplying witnesses.
use crate::{
    field::FieldElement,
    merkle::{updates::NodeUpdates, witness::MerkleWitness},
    types::{NodeKey, StateError},
};
use std::fmt::Debug;

/// This trait provides read access to the nodes of the accumulator.
pub trait NodeReader: Debug + Send + Sync {
    /// Custom trait's error type. Data-layer failures such as stale writes
    /// are reported through the `From<StateError>` conversion.
    type Error: Debug + Send + From<StateError>;

    /// Retrieves a node value by key.
    ///
    /// Returns `Ok(None)` for nodes that were never written; it is the
    /// responsibility of the tree to interpret them as the level's zero value.
    fn node(&self, key: &NodeKey) -> Result<Option<FieldElement>, Self::Error>;

    /// Retrieves several nodes at once, in the order of `keys`.
    fn nodes(&self, keys: &[NodeKey]) -> Result<Vec<Option<FieldElement>>, Self::Error> {
        keys.iter().map(|key| self.node(key)).collect()
    }
}

/// This trait provides write access to the nodes of the accumulator.
///
/// All nodes in `updates` become visible together; implementations must not
/// expose a partially applied batch.
pub trait NodeWriter: NodeReader {
    /// Applies a batch of node updates.
    ///
    /// Every recorded old value must equal the value the store holds for that
    /// node, otherwise the whole batch is rejected with
    /// [`StateError::StaleNode`] and nothing is written.
    fn write_nodes(&mut self, updates: NodeUpdates) -> Result<(), Self::Error>;
}

impl<T: NodeReader + ?Sized> NodeReader for &T {
    type Error = T::Error;

    fn node(&self, key: &NodeKey) -> Result<Option<FieldElement>, Self::Error> {
        (**self).node(key)
    }

    fn nodes(&self, keys: &[NodeKey]) -> Result<Vec<Option<FieldElement>>, Self::Error> {
        (**self).nodes(keys)
    }
}

impl<T: NodeReader + ?Sized> NodeReader for &mut T {
    type Error = T::Error;

    fn node(&self, key: &NodeKey) -> Result<Option<FieldElement>, Self::Error> {
        (**self).node(key)
    }

    fn nodes(&self, keys: &[NodeKey]) -> Result<Vec<Option<FieldElement>>, Self::Error> {
        (**self).nodes(keys)
    }
}

impl<T: NodeWriter + ?Sized> NodeWriter for &mut T {
    fn write_nodes(&mut self, updates: NodeUpdates) -> Result<(), Self::Error> {
        (**self).write_nodes(updates)
    }
}

/// Supplies the Merkle witness for each transition a prover processes.
///
/// Witnesses are requested in the order the prover consumes transitions and
/// must be consistent with the accumulator state reached after all earlier
/// transitions.
pub trait WitnessProvider {
    /// Custom trait's error type.
    type Error: Debug;

    /// Returns the witness for the leaf at `path`.
    fn witness(&mut self, path: &FieldElement) -> Result<MerkleWitness, Self::Error>;
}

impl<T: WitnessProvider + ?Sized> WitnessProvider for &mut T {
    type Error = T::Error;

    fn witness(&mut self, path: &FieldElement) -> Result<MerkleWitness, Self::Error> {
        (**self).witness(path)
    }
}

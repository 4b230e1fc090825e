//! In-memory storage backend for the Merkle accumulator.
//!
//! This module provides [`MemStore`], a simple in-memory node store that
//! implements the [`NodeReader`] and [`NodeWriter`] traits. Node values are kept
//! in a [`BTreeMap`] keyed by [`NodeKey`].
//!
//! # Note
//!
//! `MemStore` is **not** an implementation of the accumulator itself. It only
//! holds the nodes; hashing and path maintenance live in
//! [`MerkleTree`](crate::merkle::MerkleTree).
//!
//! # Usage
//!
//! `MemStore` is primarily intended for:
//! - Unit testing and integration testing
//! - Serving as the shared base store under per-worker
//!   [`CachedStore`](crate::merkle::CachedStore) overlays
//! - Serving as a reference implementation of the storage traits
//!
//! # Thread Safety
//!
//! All operations are thread-safe through the use of [`RwLock`] for interior
//! mutability, so a single `MemStore` can be shared by reference across worker
//! threads and still receive atomic batch commits.
use crate::{
    field::FieldElement,
    merkle::updates::NodeUpdates,
    traits::{NodeReader, NodeWriter},
    types::NodeKey,
};
use std::{collections::BTreeMap, sync::RwLock};

/// In-memory node store.
///
/// Only written nodes are stored; absent nodes read as `None` and are
/// interpreted by the tree as the zero value of their level.
#[derive(Debug, Default)]
pub struct MemStore {
    /// Node values by key.
    nodes: RwLock<BTreeMap<NodeKey, FieldElement>>,
}

impl Clone for MemStore {
    fn clone(&self) -> Self {
        Self {
            nodes: RwLock::new(self.nodes.read().expect("nodes lock poisoned").clone()),
        }
    }
}

impl MemStore {
    /// Creates a new empty `MemStore` instance.
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(BTreeMap::new()),
        }
    }

    /// Applies a batch of node updates.
    ///
    /// Every entry's new value replaces the stored one. The write lock is held
    /// for the whole batch, so readers observe either none or all of it.
    ///
    /// # Arguments
    ///
    /// * `updates` - Batch of node changes to apply
    ///
    /// # Errors
    ///
    /// Rejects the whole batch if any recorded old value differs from the
    /// stored one, which happens when another overlay over this store
    /// committed after the batch was computed.
    pub fn update_nodes(&self, updates: NodeUpdates) -> Result<(), &'static str> {
        let mut nodes = self.nodes.write().map_err(|_| "nodes lock poisoned")?;
        updates.ensure_base(|key| Ok::<_, &'static str>(nodes.get(key).copied()))?;
        for (key, (_, new_value)) in updates.data {
            nodes.insert(key, new_value);
        }
        Ok(())
    }

    /// Number of materialized nodes.
    pub fn len(&self) -> usize {
        self.nodes.read().expect("nodes lock poisoned").len()
    }

    /// Whether no node has been written yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NodeReader for MemStore {
    /// Error type for node read operations.
    ///
    /// Uses static string references for simplicity in this in-memory implementation.
    type Error = &'static str;

    fn node(&self, key: &NodeKey) -> Result<Option<FieldElement>, Self::Error> {
        Ok(self
            .nodes
            .read()
            .map_err(|_| "nodes lock poisoned")?
            .get(key)
            .copied())
    }

    fn nodes(&self, keys: &[NodeKey]) -> Result<Vec<Option<FieldElement>>, Self::Error> {
        let nodes = self.nodes.read().map_err(|_| "nodes lock poisoned")?;
        Ok(keys.iter().map(|key| nodes.get(key).copied()).collect())
    }
}

impl NodeWriter for MemStore {
    fn write_nodes(&mut self, updates: NodeUpdates) -> Result<(), Self::Error> {
        self.update_nodes(updates)
    }
}

/// Shared references can commit too: the store synchronizes internally.
impl NodeWriter for &MemStore {
    fn write_nodes(&mut self, updates: NodeUpdates) -> Result<(), Self::Error> {
        self.update_nodes(updates)
    }
}

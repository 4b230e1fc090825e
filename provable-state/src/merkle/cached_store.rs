//! A private write overlay on top of a parent node store.
//!
//! Each prover works against its own [`CachedStore`]: reads fall through to the
//! shared parent, writes stay in the overlay, and [`CachedStore::commit`] hands
//! the accumulated changes to the parent in a single batch once the work they
//! belong to has been accepted. Dropping an overlay discards its writes
//! without touching the parent.
use crate::{
    constant::WITNESS_LENGTH,
    field::FieldElement,
    merkle::updates::NodeUpdates,
    traits::{NodeReader, NodeWriter},
    types::{leaf_index, NodeKey},
};
use rustc_hash::FxHashMap;
use std::mem;

/// Node store overlay buffering writes over a parent store.
#[derive(Debug)]
pub struct CachedStore<Parent> {
    /// Store reads fall through to.
    parent: Parent,
    /// Latest known value of every node read or written through this overlay.
    /// `None` records that the parent holds no value for the node.
    cache: FxHashMap<NodeKey, Option<FieldElement>>,
    /// Writes relative to the parent, pending commit.
    updates: NodeUpdates,
}

impl<Parent: NodeReader> CachedStore<Parent> {
    /// Opens an empty overlay over `parent`.
    pub fn new(parent: Parent) -> Self {
        Self {
            parent,
            cache: FxHashMap::default(),
            updates: NodeUpdates::default(),
        }
    }

    /// The parent store.
    pub fn parent(&self) -> &Parent {
        &self.parent
    }

    /// Writes buffered since the overlay was opened or last committed.
    pub fn updates(&self) -> &NodeUpdates {
        &self.updates
    }

    /// Pulls every node needed to read, witness and rewrite the leaf at `path`
    /// into the overlay: the leaf-to-root path and all siblings along it.
    ///
    /// Nodes already known to the overlay are not fetched again.
    pub fn preload(&mut self, path: &FieldElement) -> Result<(), Parent::Error> {
        let mut key = NodeKey::leaf(leaf_index(path));
        let mut keys = Vec::with_capacity(2 * WITNESS_LENGTH + 1);
        for _ in 0..WITNESS_LENGTH {
            keys.push(key);
            keys.push(key.sibling());
            key = key.parent();
        }
        keys.push(key);
        keys.retain(|key| !self.cache.contains_key(key));

        let values = self.parent.nodes(&keys)?;
        self.cache.extend(keys.into_iter().zip(values));
        Ok(())
    }

    /// Preloads several paths.
    pub fn preload_all<'a, I>(&mut self, paths: I) -> Result<(), Parent::Error>
    where
        I: IntoIterator<Item = &'a FieldElement>,
    {
        for path in paths {
            self.preload(path)?;
        }
        Ok(())
    }

    /// Closes the overlay without committing, returning the parent.
    pub fn discard(self) -> Parent {
        self.parent
    }

    /// Closes the overlay and returns its pending writes instead of applying them.
    pub fn into_updates(self) -> NodeUpdates {
        self.updates
    }
}

impl<Parent: NodeWriter> CachedStore<Parent> {
    /// Writes all pending changes into the parent in one batch.
    ///
    /// Returns the committed changes, which can later be inverted with
    /// [`NodeUpdates::inverse`] to roll the parent back. If the parent rejects
    /// the batch, the overlay keeps its pending writes. In particular, once a
    /// sibling overlay over the same parent has committed, this overlay's
    /// changes are stale and the parent rejects them with
    /// [`StateError::StaleNode`](crate::types::StateError::StaleNode).
    pub fn commit(&mut self) -> Result<NodeUpdates, Parent::Error> {
        self.parent.write_nodes(self.updates.clone())?;
        self.cache.clear();
        Ok(mem::take(&mut self.updates))
    }
}

impl<Parent: NodeReader> NodeReader for CachedStore<Parent> {
    type Error = Parent::Error;

    fn node(&self, key: &NodeKey) -> Result<Option<FieldElement>, Self::Error> {
        match self.cache.get(key) {
            Some(value) => Ok(*value),
            None => self.parent.node(key),
        }
    }
}

impl<Parent: NodeReader> NodeWriter for CachedStore<Parent> {
    fn write_nodes(&mut self, updates: NodeUpdates) -> Result<(), Self::Error> {
        updates.ensure_base(|key| self.node(key))?;
        for (key, (old_value, new_value)) in updates.data {
            self.updates.add(key, old_value, new_value);
            self.cache.insert(key, Some(new_value));
        }
        Ok(())
    }
}

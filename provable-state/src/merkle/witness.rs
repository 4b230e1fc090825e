//! Merkle witnesses and a queue that replays them to a prover.
use crate::{
    constant::WITNESS_LENGTH,
    field::{hash_fields, AsFieldBytes, FieldElement},
    traits::WitnessProvider,
    types::{leaf_index, LeafIndex, StateError},
};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::collections::VecDeque;

/// The sibling hashes needed to recompute the root from one leaf.
///
/// Entry `i` describes level `i` of the path: `siblings[i]` is the node next to
/// the path and `is_left[i]` tells whether the path node is the left child.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleWitness {
    /// Sibling of the path node at each level, from the leaves upward.
    #[serde_as(as = "Vec<AsFieldBytes>")]
    pub siblings: Vec<FieldElement>,
    /// Whether the path node at each level is a left child.
    pub is_left: Vec<bool>,
}

impl MerkleWitness {
    /// Creates a witness, checking that it spans the full tree height.
    pub fn new(siblings: Vec<FieldElement>, is_left: Vec<bool>) -> Result<Self, StateError> {
        let witness = Self { siblings, is_left };
        if !witness.is_well_formed() {
            return Err(StateError::MalformedWitness {
                expected: WITNESS_LENGTH,
                siblings: witness.siblings.len(),
                directions: witness.is_left.len(),
            });
        }
        Ok(witness)
    }

    fn is_well_formed(&self) -> bool {
        self.siblings.len() == WITNESS_LENGTH && self.is_left.len() == WITNESS_LENGTH
    }

    /// Recovers the leaf index encoded by the direction bits.
    pub fn calculate_index(&self) -> LeafIndex {
        let mut index = LeafIndex::ZERO;
        for (bit, is_left) in self.is_left.iter().enumerate() {
            index.set_bit(bit, !is_left);
        }
        index
    }

    /// Recomputes the root for `leaf` placed at the witnessed position.
    pub fn calculate_root(&self, leaf: FieldElement) -> FieldElement {
        self.siblings
            .iter()
            .zip(&self.is_left)
            .fold(leaf, |node, (sibling, is_left)| {
                if *is_left {
                    hash_fields(&[node, *sibling])
                } else {
                    hash_fields(&[*sibling, node])
                }
            })
    }

    /// Checks that `leaf` sits at `path` in the tree with the given `root`.
    ///
    /// The index implied by the witness must equal the path; otherwise a
    /// witness for a different key could vouch for the claimed value.
    pub fn check_membership(
        &self,
        root: &FieldElement,
        path: &FieldElement,
        leaf: FieldElement,
    ) -> bool {
        self.is_well_formed()
            && self.calculate_index() == leaf_index(path)
            && self.calculate_root(leaf) == *root
    }

    /// Root of the tree after replacing the witnessed leaf with `new_leaf`.
    pub fn compute_root(&self, new_leaf: FieldElement) -> FieldElement {
        self.calculate_root(new_leaf)
    }

    /// Checks membership of `leaf` and computes the root after writing
    /// `new_leaf`, walking the path only once.
    ///
    /// Returns `(is_member, old_root, new_root)`.
    pub fn check_membership_get_roots(
        &self,
        root: &FieldElement,
        path: &FieldElement,
        leaf: FieldElement,
        new_leaf: FieldElement,
    ) -> (bool, FieldElement, FieldElement) {
        let (old_root, new_root) = self.siblings.iter().zip(&self.is_left).fold(
            (leaf, new_leaf),
            |(old, new), (sibling, is_left)| {
                if *is_left {
                    (hash_fields(&[old, *sibling]), hash_fields(&[new, *sibling]))
                } else {
                    (hash_fields(&[*sibling, old]), hash_fields(&[*sibling, new]))
                }
            },
        );
        let is_member = self.is_well_formed()
            && self.calculate_index() == leaf_index(path)
            && old_root == *root;
        (is_member, old_root, new_root)
    }
}

/// Replays a recorded sequence of witnesses in order.
///
/// Filled by [`MerkleTree::trace_batch`](crate::merkle::tree::MerkleTree::trace_batch),
/// which applies every write of a batch while recording the witness each
/// transition needs, so the prover sees the tree exactly as it evolves.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessQueue {
    witnesses: VecDeque<MerkleWitness>,
}

impl WitnessQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a witness.
    pub fn push(&mut self, witness: MerkleWitness) {
        self.witnesses.push_back(witness);
    }

    /// Number of witnesses still queued.
    pub fn len(&self) -> usize {
        self.witnesses.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.witnesses.is_empty()
    }
}

impl From<Vec<MerkleWitness>> for WitnessQueue {
    fn from(witnesses: Vec<MerkleWitness>) -> Self {
        Self {
            witnesses: witnesses.into(),
        }
    }
}

impl WitnessProvider for WitnessQueue {
    type Error = StateError;

    fn witness(&mut self, _path: &FieldElement) -> Result<MerkleWitness, Self::Error> {
        self.witnesses
            .pop_front()
            .ok_or(StateError::WitnessExhausted)
    }
}

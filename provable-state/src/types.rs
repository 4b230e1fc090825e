//! Core data types for addressing the accumulator.
//!
//! - [`NodeKey`]: `(level, index)` address of a tree node
//! - [`LeafIndex`]: position of a leaf, derived from a transition path
//! - [`StateError`]: errors raised by the data layer
use crate::{
    constant::TREE_HEIGHT,
    field::{field_to_u256, FieldElement},
};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Index of a leaf in the accumulator. Only the low `TREE_HEIGHT - 1` bits are
/// ever set.
pub type LeafIndex = U256;

/// Maps a transition path to the leaf it addresses.
#[inline]
pub fn leaf_index(path: &FieldElement) -> LeafIndex {
    field_to_u256(path)
}

/// Address of a node in the accumulator.
///
/// Level 0 holds the leaves and level `TREE_HEIGHT - 1` holds the root. At
/// level `l` the index ranges over `[0, 2^(TREE_HEIGHT - 1 - l))`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeKey {
    /// Distance from the leaf level.
    pub level: usize,
    /// Position within the level.
    pub index: U256,
}

impl NodeKey {
    /// Creates a node key.
    pub const fn new(level: usize, index: U256) -> Self {
        Self { level, index }
    }

    /// Key of the leaf with the given index.
    pub const fn leaf(index: LeafIndex) -> Self {
        Self { level: 0, index }
    }

    /// Key of the root node.
    pub const fn root() -> Self {
        Self {
            level: TREE_HEIGHT - 1,
            index: U256::ZERO,
        }
    }

    /// Key of this node's parent.
    pub fn parent(&self) -> Self {
        Self {
            level: self.level + 1,
            index: self.index >> 1usize,
        }
    }

    /// Key of the node sharing this node's parent.
    pub fn sibling(&self) -> Self {
        Self {
            level: self.level,
            index: self.index ^ U256::from(1u8),
        }
    }

    /// Whether this node is the left child of its parent.
    pub fn is_left(&self) -> bool {
        !self.index.bit(0)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node(level: {}, index: {:#x})", self.level, self.index)
    }
}

/// Errors raised while building batches and witnesses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("a batch holds at most {max} transitions, got {len}")]
    BatchOverflow { len: usize, max: usize },

    #[error(
        "malformed witness: expected {expected} levels, \
         got {siblings} siblings and {directions} directions"
    )]
    MalformedWitness {
        expected: usize,
        siblings: usize,
        directions: usize,
    },

    #[error("witness queue exhausted")]
    WitnessExhausted,

    /// A batch of node updates was computed against a value the store no
    /// longer holds, e.g. a sibling overlay committed first.
    #[error("stale update of {key}: expected {expected}, store holds {actual}")]
    StaleNode {
        key: NodeKey,
        expected: FieldElement,
        actual: FieldElement,
    },
}

/// Stores reporting plain string errors surface data-layer failures by message.
impl From<StateError> for &'static str {
    fn from(err: StateError) -> Self {
        match err {
            StateError::BatchOverflow { .. } => "transition batch overflow",
            StateError::MalformedWitness { .. } => "malformed witness",
            StateError::WitnessExhausted => "witness queue exhausted",
            StateError::StaleNode { .. } => "stale node update",
        }
    }
}

//! This module defines the constants that fix the shape of the accumulator,
//! the transition batches and the commitment lists.
use crate::field::{hash_fields, FieldElement};
use ark_ff::Zero;
use once_cell::sync::Lazy;

/// Number of levels in the Merkle accumulator, counting the leaf level and the
/// root level. A tree of height `h` has `2^(h-1)` leaves.
pub const TREE_HEIGHT: usize = 256;

/// Number of sibling hashes in a Merkle witness.
pub const WITNESS_LENGTH: usize = TREE_HEIGHT - 1;

/// Level of the root node.
pub const ROOT_LEVEL: usize = TREE_HEIGHT - 1;

/// Number of transitions proven by a single state-transition batch. Shorter
/// transition lists are right-padded with the sentinel transition.
#[cfg(not(feature = "large-batches"))]
pub const TRANSITION_BATCH_SIZE: usize = 8;

/// Number of transitions proven by a single state-transition batch. Shorter
/// transition lists are right-padded with the sentinel transition.
#[cfg(feature = "large-batches")]
pub const TRANSITION_BATCH_SIZE: usize = 16;

/// Domain-separation prefix of the state-transition commitment list.
pub const TRANSITIONS_HASH_PREFIX: &str = "provable-state 2024 transitions hash-list";

/// Domain-separation prefix of the per-block transactions commitment list.
pub const TRANSACTIONS_HASH_PREFIX: &str = "provable-state 2024 transactions hash-list";

/// Minimum number of leaf tasks handed to a single rayon job.
pub const DEFAULT_MIN_PAR_BATCH_SIZE: usize = 4;

/// Default value of every node that has never been written, per level.
///
/// `Z_0 = 0` and `Z_l = H(Z_{l-1}, Z_{l-1})`.
static ZERO_VALUES: Lazy<Vec<FieldElement>> = Lazy::new(|| {
    let mut zeros = Vec::with_capacity(TREE_HEIGHT);
    zeros.push(FieldElement::zero());
    for level in 1..TREE_HEIGHT {
        let below = zeros[level - 1];
        zeros.push(hash_fields(&[below, below]));
    }
    zeros
});

/// Returns the value of an unwritten node at `level`.
///
/// # Panics
///
/// Panics if `level >= TREE_HEIGHT`.
#[inline]
pub fn zero_value(level: usize) -> FieldElement {
    ZERO_VALUES[level]
}

/// Root of the accumulator before any leaf has been written.
pub fn empty_root() -> FieldElement {
    zero_value(ROOT_LEVEL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values_chain() {
        assert_eq!(zero_value(0), FieldElement::zero());
        for level in 1..TREE_HEIGHT {
            let below = zero_value(level - 1);
            assert_eq!(zero_value(level), hash_fields(&[below, below]));
        }
        assert_ne!(empty_root(), FieldElement::zero());
    }
}

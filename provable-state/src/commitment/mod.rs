//! Append-only fold-hash commitments over ordered sequences.
//!
//! A list's commitment is the left fold `c_i = H_p(c_{i-1}, v_i)` of its values,
//! where `H_p` is the hash with the list's domain-separation prefix. The
//! values themselves are kept only as an off-circuit audit trail.
pub mod hash_list;
pub mod reduction;

pub use hash_list::HashList;
pub use reduction::ReductionHashList;

use thiserror::Error;

/// Constraint failures raised while extending a commitment list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitmentError {
    /// Replacing the last entry requires the stored preimage and previous value
    /// to reproduce the current commitment.
    #[error("preimage and previous value do not reproduce the current commitment")]
    PreimageMismatch,
}

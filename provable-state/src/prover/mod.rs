//! The state-transition and block provers.
//!
//! Provers evaluate their constraints off-circuit and hand the resulting
//! public values to a [`ProofBackend`](backend::ProofBackend) for attestation.
//! A violated constraint means the proof does not exist: it surfaces as
//! [`ProverError::ConstraintViolation`] and is never retried.
use crate::{commitment::CommitmentError, reducer::ReductionError, types::StateError};
use thiserror::Error;

pub mod backend;
pub mod block;
pub mod state_transition;

pub use backend::{MockBackend, Proof, ProofBackend};
pub use block::{BlockProver, BlockProverState, RuntimeProofOutput};
pub use state_transition::{StateTransitionProver, StateTransitionPublicValues};

/// Error type for proving.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProverError {
    /// A constraint of the proven statement does not hold.
    #[error("constraint violated: {0}")]
    ConstraintViolation(String),

    /// A supplied proof does not verify against the expected circuit.
    #[error("invalid proof for circuit {circuit}")]
    InvalidProof { circuit: String },

    /// The witness provider or the node store failed.
    #[error("witness unavailable: {0}")]
    WitnessUnavailable(String),

    /// The backend refused to attest.
    #[error("backend {backend} failed: {reason}")]
    Backend {
        backend: &'static str,
        reason: String,
    },

    /// An orchestration step was handed no work.
    #[error("nothing to prove")]
    NothingToProve,

    #[error(transparent)]
    State(#[from] StateError),
}

impl From<CommitmentError> for ProverError {
    fn from(err: CommitmentError) -> Self {
        Self::ConstraintViolation(err.to_string())
    }
}

impl From<ReductionError> for ProverError {
    fn from(err: ReductionError) -> Self {
        Self::ConstraintViolation(err.to_string())
    }
}

/// Fails with a constraint violation unless `condition` holds.
#[inline]
pub(crate) fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), ProverError> {
    if condition {
        Ok(())
    } else {
        Err(ProverError::ConstraintViolation(message()))
    }
}

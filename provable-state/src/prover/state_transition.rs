//! The state-transition prover.
//!
//! A batch proof attests that applying a [`TransitionBatch`] to the accumulator
//! with root `state_root` yields the output root, and that the batch's real
//! transitions extend the transitions commitment from the input to the output
//! value. Batch proofs over contiguous ranges merge into one proof.
use super::{
    backend::{Proof, ProofBackend, STATE_TRANSITION_CIRCUIT},
    ensure, ProverError,
};
use crate::{
    commitment::HashList,
    constant::TRANSITIONS_HASH_PREFIX,
    field::{select, FieldElement, ToFields},
    traits::WitnessProvider,
    transition::{ProvableTransition, TransitionBatch},
};
use ark_ff::Zero;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Public values of the state-transition circuit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransitionPublicValues {
    /// Commitment over all applied transitions.
    #[serde(with = "crate::field::serde_field")]
    pub transitions_hash: FieldElement,
    /// Accumulator root.
    #[serde(with = "crate::field::serde_field")]
    pub state_root: FieldElement,
}

impl StateTransitionPublicValues {
    /// Values at the start of a transaction: empty transition log over `state_root`.
    pub fn fresh(state_root: FieldElement) -> Self {
        Self {
            transitions_hash: FieldElement::zero(),
            state_root,
        }
    }
}

impl ToFields for StateTransitionPublicValues {
    fn to_fields(&self) -> Vec<FieldElement> {
        vec![self.transitions_hash, self.state_root]
    }
}

/// Public input of the state-transition circuit.
pub type StateTransitionPublicInput = StateTransitionPublicValues;

/// Public output of the state-transition circuit.
pub type StateTransitionPublicOutput = StateTransitionPublicValues;

/// A state-transition proof.
pub type StateTransitionProof = Proof<StateTransitionPublicInput, StateTransitionPublicOutput>;

/// Applies one transition to the running root and transitions list.
///
/// Membership is checked for every entry. Padding entries read the reserved
/// path zero, whose leaf stays empty; they never move the root and are never
/// logged.
fn apply_transition<W: WitnessProvider>(
    root: &mut FieldElement,
    transitions: &mut HashList<ProvableTransition>,
    transition: &ProvableTransition,
    witnesses: &mut W,
) -> Result<(), ProverError> {
    let witness = witnesses
        .witness(&transition.path)
        .map_err(|e| ProverError::WitnessUnavailable(format!("{e:?}")))?;
    let is_dummy = transition.is_dummy();

    // Reading "none" asserts that the leaf is empty.
    let from = transition.from.force_some();
    let (is_member, _, candidate_root) =
        witness.check_membership_get_roots(root, &transition.path, from.value, transition.to.value);
    ensure(is_member, || {
        format!("{transition} does not match the accumulator at root {root}")
    })?;

    *root = select(transition.to.is_some && !is_dummy, candidate_root, *root);
    transitions.push_if(*transition, !is_dummy);
    Ok(())
}

/// Proves transition batches and merges batch proofs.
#[derive(Debug)]
pub struct StateTransitionProver<'a, B> {
    backend: &'a B,
}

impl<B> Clone for StateTransitionProver<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for StateTransitionProver<'_, B> {}

impl<'a, B: ProofBackend> StateTransitionProver<'a, B> {
    /// Creates a prover attesting through `backend`.
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// The backend attesting this prover's proofs.
    pub fn backend(&self) -> &'a B {
        self.backend
    }

    /// Evaluates the batch constraints and returns the public output.
    ///
    /// Witnesses are requested once per entry, padding included, in batch order.
    pub fn run_batch<W: WitnessProvider>(
        input: StateTransitionPublicInput,
        batch: &TransitionBatch,
        mut witnesses: W,
    ) -> Result<StateTransitionPublicOutput, ProverError> {
        let mut root = input.state_root;
        let mut transitions =
            HashList::with_commitment(TRANSITIONS_HASH_PREFIX, input.transitions_hash);
        for transition in batch.transitions() {
            apply_transition(&mut root, &mut transitions, transition, &mut witnesses)?;
        }
        Ok(StateTransitionPublicValues {
            transitions_hash: transitions.commitment(),
            state_root: root,
        })
    }

    /// Proves one batch.
    pub fn prove_batch<W: WitnessProvider>(
        &self,
        input: StateTransitionPublicInput,
        batch: &TransitionBatch,
        witnesses: W,
    ) -> Result<StateTransitionProof, ProverError> {
        let output = Self::run_batch(input, batch, witnesses)?;
        debug!(
            transitions = batch.real_transitions().count(),
            "proved state-transition batch"
        );
        self.backend.prove(STATE_TRANSITION_CIRCUIT, input, output)
    }

    /// Merges two proofs over adjacent ranges into one proof starting at `input`.
    ///
    /// `first` must start at `input` and `second` must start where `first`
    /// ends. Either failing means the proofs were not produced over one
    /// contiguous execution.
    pub fn merge(
        &self,
        input: StateTransitionPublicInput,
        first: &StateTransitionProof,
        second: &StateTransitionProof,
    ) -> Result<StateTransitionProof, ProverError> {
        self.backend.ensure_valid(first, STATE_TRANSITION_CIRCUIT)?;
        self.backend.ensure_valid(second, STATE_TRANSITION_CIRCUIT)?;

        ensure(first.public_input == input, || {
            "first proof does not start at the merge input".to_string()
        })?;
        ensure(
            first.public_output.state_root == second.public_input.state_root,
            || "state roots of merged proofs are not contiguous".to_string(),
        )?;
        ensure(
            first.public_output.transitions_hash == second.public_input.transitions_hash,
            || "transition commitments of merged proofs are not contiguous".to_string(),
        )?;

        self.backend
            .prove(STATE_TRANSITION_CIRCUIT, input, second.public_output)
    }
}

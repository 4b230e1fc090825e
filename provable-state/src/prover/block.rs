//! The block prover.
//!
//! Every transaction contributes two proofs: a runtime proof from the
//! application logic and a state-transition proof covering exactly that
//! transaction's transitions. The block prover checks that the two agree,
//! advances the block's state root when the transaction succeeded, and logs
//! the transaction hash either way.
use super::{
    backend::{Proof, ProofBackend, BLOCK_CIRCUIT, RUNTIME_CIRCUIT, STATE_TRANSITION_CIRCUIT},
    ensure,
    state_transition::StateTransitionProof,
    ProverError,
};
use crate::{
    commitment::HashList,
    constant::TRANSACTIONS_HASH_PREFIX,
    field::{bool_to_field, select, FieldElement, ToFields},
};
use ark_ff::Zero;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Public values of the block circuit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPublicValues {
    /// Commitment over the hashes of all included transactions.
    #[serde(with = "crate::field::serde_field")]
    pub transactions_hash: FieldElement,
    /// Accumulator root.
    #[serde(with = "crate::field::serde_field")]
    pub state_root: FieldElement,
}

impl BlockPublicValues {
    /// Values at the start of a block over `state_root`.
    pub fn fresh(state_root: FieldElement) -> Self {
        Self {
            transactions_hash: FieldElement::zero(),
            state_root,
        }
    }
}

impl ToFields for BlockPublicValues {
    fn to_fields(&self) -> Vec<FieldElement> {
        vec![self.transactions_hash, self.state_root]
    }
}

/// Public input of the block circuit.
pub type BlockPublicInput = BlockPublicValues;

/// Public output of the block circuit.
pub type BlockPublicOutput = BlockPublicValues;

/// A block proof.
pub type BlockProof = Proof<BlockPublicInput, BlockPublicOutput>;

/// Public output of the application proof of one transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeProofOutput {
    /// Commitment over the transitions the application claims to have made.
    #[serde(with = "crate::field::serde_field")]
    pub transitions_hash: FieldElement,
    /// Whether the transaction succeeded.
    pub status: bool,
    /// Hash identifying the transaction.
    #[serde(with = "crate::field::serde_field")]
    pub transaction_hash: FieldElement,
}

impl ToFields for RuntimeProofOutput {
    fn to_fields(&self) -> Vec<FieldElement> {
        vec![
            self.transitions_hash,
            bool_to_field(self.status),
            self.transaction_hash,
        ]
    }
}

/// An application proof. The runtime circuit has no public input.
pub type RuntimeProof = Proof<(), RuntimeProofOutput>;

/// Running state of a block while transactions are applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockProverState {
    /// Current accumulator root.
    pub state_root: FieldElement,
    /// Transactions commitment, with the hashes appended through this state.
    pub transactions: HashList<FieldElement>,
}

impl BlockProverState {
    /// Starts from the given public values.
    pub fn new(input: BlockPublicInput) -> Self {
        Self {
            state_root: input.state_root,
            transactions: HashList::with_commitment(
                TRANSACTIONS_HASH_PREFIX,
                input.transactions_hash,
            ),
        }
    }

    /// Current public values.
    pub fn public_values(&self) -> BlockPublicValues {
        BlockPublicValues {
            transactions_hash: self.transactions.commitment(),
            state_root: self.state_root,
        }
    }
}

/// Proves transactions and merges block proofs.
#[derive(Debug)]
pub struct BlockProver<'a, B> {
    backend: &'a B,
}

impl<B> Clone for BlockProver<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for BlockProver<'_, B> {}

impl<'a, B: ProofBackend> BlockProver<'a, B> {
    /// Creates a prover attesting through `backend`.
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Applies one transaction to `state`.
    ///
    /// On any violated constraint `state` is left untouched. A failed runtime
    /// status is not an error: the proposed transitions are discarded and the
    /// transaction is still logged.
    pub fn apply_transaction(
        &self,
        state: &mut BlockProverState,
        st_proof: &StateTransitionProof,
        runtime_proof: &RuntimeProof,
    ) -> Result<(), ProverError> {
        self.backend.ensure_valid(st_proof, STATE_TRANSITION_CIRCUIT)?;
        self.backend.ensure_valid(runtime_proof, RUNTIME_CIRCUIT)?;

        let st_input = &st_proof.public_input;
        let st_output = &st_proof.public_output;
        let runtime = &runtime_proof.public_output;

        ensure(st_input.transitions_hash.is_zero(), || {
            "state-transition proof does not start from an empty transition log".to_string()
        })?;
        ensure(runtime.transitions_hash == st_output.transitions_hash, || {
            format!(
                "runtime and state-transition proofs disagree on transitions of {}",
                runtime.transaction_hash
            )
        })?;
        ensure(state.state_root == st_input.state_root, || {
            format!(
                "state-transition proof of {} does not start at the block root",
                runtime.transaction_hash
            )
        })?;

        if !runtime.status {
            warn!(
                transaction = %runtime.transaction_hash,
                "transaction failed, discarding its state transitions"
            );
        }
        state.state_root = select(runtime.status, st_output.state_root, st_input.state_root);
        state.transactions.push(runtime.transaction_hash);
        Ok(())
    }

    /// Proves a block consisting of the single given transaction, starting at
    /// `input`.
    pub fn prove_transaction(
        &self,
        input: BlockPublicInput,
        st_proof: &StateTransitionProof,
        runtime_proof: &RuntimeProof,
    ) -> Result<BlockProof, ProverError> {
        let mut state = BlockProverState::new(input);
        self.apply_transaction(&mut state, st_proof, runtime_proof)?;
        debug!(
            transaction = %runtime_proof.public_output.transaction_hash,
            status = runtime_proof.public_output.status,
            "proved transaction"
        );
        self.backend.prove(BLOCK_CIRCUIT, input, state.public_values())
    }

    /// Merges two block proofs over adjacent transaction ranges.
    pub fn merge(
        &self,
        input: BlockPublicInput,
        first: &BlockProof,
        second: &BlockProof,
    ) -> Result<BlockProof, ProverError> {
        self.backend.ensure_valid(first, BLOCK_CIRCUIT)?;
        self.backend.ensure_valid(second, BLOCK_CIRCUIT)?;

        ensure(first.public_input == input, || {
            "first proof does not start at the merge input".to_string()
        })?;
        ensure(
            first.public_output.state_root == second.public_input.state_root,
            || "state roots of merged block proofs are not contiguous".to_string(),
        )?;
        ensure(
            first.public_output.transactions_hash == second.public_input.transactions_hash,
            || "transaction commitments of merged block proofs are not contiguous".to_string(),
        )?;

        self.backend.prove(BLOCK_CIRCUIT, input, second.public_output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        constant::TRANSITIONS_HASH_PREFIX,
        mem_store::MemStore,
        merkle::tree::MerkleTree,
        prover::{
            backend::MockBackend,
            state_transition::{StateTransitionProver, StateTransitionPublicValues},
        },
        transition::{ProvableTransition, StateTransition, TransitionBatch},
    };

    fn fe(n: u64) -> FieldElement {
        FieldElement::from(n)
    }

    /// Proves `transitions` as one transaction on `tree` and builds the
    /// matching runtime proof.
    fn transaction(
        backend: &MockBackend,
        tree: &mut MerkleTree<MemStore>,
        transitions: &[ProvableTransition],
        status: bool,
        tx: u64,
    ) -> (StateTransitionProof, RuntimeProof) {
        let input = StateTransitionPublicValues::fresh(tree.root().unwrap());
        let batch = TransitionBatch::new(transitions).unwrap();
        let witnesses = tree.trace_batch(&batch).unwrap();
        let st_proof = StateTransitionProver::new(backend)
            .prove_batch(input, &batch, witnesses)
            .unwrap();

        let mut log = HashList::new(TRANSITIONS_HASH_PREFIX);
        transitions.iter().for_each(|t| log.push(*t));
        let runtime = RuntimeProofOutput {
            transitions_hash: log.commitment(),
            status,
            transaction_hash: fe(tx),
        };
        let runtime_proof = backend.prove(RUNTIME_CIRCUIT, (), runtime).unwrap();
        (st_proof, runtime_proof)
    }

    fn write(p: u64, from: Option<u64>, to: u64) -> ProvableTransition {
        StateTransition::write(fe(p), from, to).to_provable()
    }

    #[test]
    fn successful_transaction_advances_root() {
        let backend = MockBackend::new();
        let prover = BlockProver::new(&backend);
        let mut tree = MerkleTree::new(MemStore::new());
        let input = BlockPublicValues::fresh(tree.root().unwrap());

        let (st, rt) = transaction(&backend, &mut tree, &[write(1, None, 5)], true, 100);
        let proof = prover.prove_transaction(input, &st, &rt).unwrap();

        assert!(backend.verify(&proof, BLOCK_CIRCUIT));
        assert_eq!(proof.public_output.state_root, tree.root().unwrap());
        let mut expected = HashList::new(TRANSACTIONS_HASH_PREFIX);
        expected.push(fe(100));
        assert_eq!(proof.public_output.transactions_hash, expected.commitment());
    }

    /// Tests the failure path.
    ///
    /// A failed transaction leaves the root unchanged and advances the
    /// transactions commitment by exactly its own hash.
    #[test]
    fn failed_transaction_keeps_root() {
        let backend = MockBackend::new();
        let prover = BlockProver::new(&backend);
        let mut tree = MerkleTree::new(MemStore::new());
        let root = tree.root().unwrap();
        let mut state = BlockProverState::new(BlockPublicValues::fresh(root));
        let before = state.transactions.commitment();

        let (st, rt) = transaction(&backend, &mut tree, &[write(1, None, 5)], false, 7);
        assert_ne!(st.public_output.state_root, root);
        prover.apply_transaction(&mut state, &st, &rt).unwrap();

        assert_eq!(state.state_root, root);
        assert_eq!(state.transactions.values(), &[fe(7)]);
        let mut expected = HashList::with_commitment(TRANSACTIONS_HASH_PREFIX, before);
        expected.push(fe(7));
        assert_eq!(state.transactions.commitment(), expected.commitment());
    }

    /// Tests the consistency checks between the two proofs of a transaction.
    ///
    /// Scenarios tested:
    /// - Disagreeing transition commitments are rejected
    /// - A state-transition proof not starting at the block root is rejected
    /// - A state-transition proof with a non-empty starting log is rejected
    /// - A runtime proof attested for the wrong circuit is rejected
    /// - Rejections leave the block state untouched
    #[test]
    fn rejects_inconsistent_transaction() {
        let backend = MockBackend::new();
        let prover = BlockProver::new(&backend);
        let mut tree = MerkleTree::new(MemStore::new());
        let root = tree.root().unwrap();
        let mut state = BlockProverState::new(BlockPublicValues::fresh(root));
        let pristine = state.clone();

        let (st, rt) = transaction(&backend, &mut tree, &[write(1, None, 5)], true, 1);

        let mut wrong_log = rt.public_output;
        wrong_log.transitions_hash = fe(123);
        let wrong_log = backend.prove(RUNTIME_CIRCUIT, (), wrong_log).unwrap();
        assert!(matches!(
            prover.apply_transaction(&mut state, &st, &wrong_log),
            Err(ProverError::ConstraintViolation(_))
        ));

        let (st2, rt2) = transaction(&backend, &mut tree, &[write(2, None, 6)], true, 2);
        assert!(prover.apply_transaction(&mut state, &st2, &rt2).is_err());

        let mut resumed_input = st.public_input;
        resumed_input.transitions_hash = fe(1);
        let resumed = backend
            .prove(STATE_TRANSITION_CIRCUIT, resumed_input, st.public_output)
            .unwrap();
        assert!(prover.apply_transaction(&mut state, &resumed, &rt).is_err());

        let mislabeled = backend.prove(BLOCK_CIRCUIT, (), rt.public_output).unwrap();
        assert!(matches!(
            prover.apply_transaction(&mut state, &st, &mislabeled),
            Err(ProverError::InvalidProof { .. })
        ));

        assert_eq!(state, pristine);
        prover.apply_transaction(&mut state, &st, &rt).unwrap();
    }

    #[test]
    fn merge_block_proofs() {
        let backend = MockBackend::new();
        let prover = BlockProver::new(&backend);
        let mut tree = MerkleTree::new(MemStore::new());
        let input = BlockPublicValues::fresh(tree.root().unwrap());

        let (st1, rt1) = transaction(&backend, &mut tree, &[write(1, None, 5)], true, 1);
        let first = prover.prove_transaction(input, &st1, &rt1).unwrap();
        let (st2, rt2) = transaction(&backend, &mut tree, &[write(1, Some(5), 6)], true, 2);
        let second = prover
            .prove_transaction(first.public_output, &st2, &rt2)
            .unwrap();

        let merged = prover.merge(input, &first, &second).unwrap();
        assert_eq!(merged.public_output, second.public_output);
        assert_eq!(merged.public_output.state_root, tree.root().unwrap());
        assert!(prover.merge(input, &second, &first).is_err());
    }
}

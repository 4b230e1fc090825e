//! Orchestration of leaf proofs and balanced merges.
//!
//! Proving a range of transitions happens in three phases:
//! 1. **Trace**: batches are applied in order to a private accumulator overlay,
//!    recording each batch's public input and the witnesses it consumes.
//! 2. **Leaf proofs**: every batch is proven independently, in parallel.
//! 3. **Merge**: adjacent proofs are merged pairwise in a balanced tree whose
//!    depth is logarithmic in the number of leaves.
//!
//! Block proving follows the same shape with one leaf per transaction. A task
//! that fails is reported with its position and never retried.
//!
//! The overlay traced on should only be committed into the shared store once
//! the merged proof has been accepted.
use crate::{
    commitment::HashList,
    constant::{DEFAULT_MIN_PAR_BATCH_SIZE, TRANSITIONS_HASH_PREFIX},
    merkle::{tree::MerkleTree, witness::WitnessQueue},
    prover::{
        backend::ProofBackend,
        block::{BlockProof, BlockProver, BlockProverState, BlockPublicInput, RuntimeProof},
        state_transition::{
            StateTransitionProof, StateTransitionProver, StateTransitionPublicInput,
        },
        ProverError,
    },
    traits::NodeWriter,
    transition::{ProvableTransition, TransitionBatch},
};
use rayon::prelude::*;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error};

/// Stage of the pipeline a task belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskKind {
    /// Sequential tracing or dry-run of a leaf.
    Trace,
    /// Leaf proof.
    Leaf,
    /// Merge of two adjacent proofs.
    Merge,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Leaf => write!(f, "leaf"),
            Self::Merge => write!(f, "merge"),
        }
    }
}

/// A failed pipeline task.
///
/// `index` is the position of the leaf (batch or transaction) the task covers;
/// for merges, the first leaf of the merged range.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind} task at index {index} failed: {source}")]
pub struct TaskError {
    pub kind: TaskKind,
    pub index: usize,
    #[source]
    pub source: ProverError,
}

impl TaskError {
    fn new(kind: TaskKind, index: usize, source: ProverError) -> Self {
        error!(%kind, index, %source, "proving task failed");
        Self {
            kind,
            index,
            source,
        }
    }
}

/// Everything needed to prove one batch without touching the accumulator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchTrace {
    /// Public input of the batch proof.
    pub input: StateTransitionPublicInput,
    /// The batch.
    pub batch: TransitionBatch,
    /// Witnesses in the order the prover requests them.
    pub witnesses: WitnessQueue,
}

/// Applies `batches` to `tree` in order, recording what each batch proof needs.
///
/// The tree is usually backed by a [`CachedStore`](crate::merkle::CachedStore)
/// overlay so the writes can be dropped if proving fails.
pub fn trace_batches<S: NodeWriter>(
    tree: &mut MerkleTree<S>,
    input: StateTransitionPublicInput,
    batches: Vec<TransitionBatch>,
) -> Result<Vec<BatchTrace>, TaskError> {
    let mut transitions =
        HashList::with_commitment(TRANSITIONS_HASH_PREFIX, input.transitions_hash);
    let mut traces = Vec::with_capacity(batches.len());
    for (index, batch) in batches.into_iter().enumerate() {
        let store_error = |e: S::Error| {
            let source = ProverError::WitnessUnavailable(format!("{e:?}"));
            TaskError::new(TaskKind::Trace, index, source)
        };

        let input = StateTransitionPublicInput {
            transitions_hash: transitions.commitment(),
            state_root: tree.root().map_err(store_error)?,
        };
        let witnesses = tree.trace_batch(&batch).map_err(store_error)?;
        for transition in batch.transitions() {
            transitions.push_if(*transition, !transition.is_dummy());
        }
        traces.push(BatchTrace {
            input,
            batch,
            witnesses,
        });
    }
    debug!(batches = traces.len(), "traced transition batches");
    Ok(traces)
}

/// Merges `proofs` pairwise in a balanced binary tree.
///
/// `offset` is the leaf index of `proofs[0]`, used to report failures.
fn merge_balanced<P, F>(mut proofs: Vec<P>, offset: usize, merge: &F) -> Result<P, TaskError>
where
    P: Send,
    F: Fn(&P, &P) -> Result<P, ProverError> + Sync,
{
    match proofs.len() {
        0 => Err(TaskError::new(TaskKind::Merge, offset, ProverError::NothingToProve)),
        1 => Ok(proofs.remove(0)),
        len => {
            let right = proofs.split_off(len / 2);
            let (left, right) = rayon::join(
                || merge_balanced(proofs, offset, merge),
                || merge_balanced(right, offset + len / 2, merge),
            );
            let (left, right) = (left?, right?);
            merge(&left, &right).map_err(|e| TaskError::new(TaskKind::Merge, offset, e))
        }
    }
}

/// Proves traced batches in parallel and merges them into one proof.
#[derive(Debug)]
pub struct StateTransitionPipeline<'a, B> {
    prover: StateTransitionProver<'a, B>,
    /// Minimum number of leaf tasks per rayon job.
    min_par_batch_size: usize,
}

impl<'a, B: ProofBackend> StateTransitionPipeline<'a, B> {
    /// Creates a pipeline attesting through `backend`.
    pub fn new(backend: &'a B) -> Self {
        Self {
            prover: StateTransitionProver::new(backend),
            min_par_batch_size: DEFAULT_MIN_PAR_BATCH_SIZE,
        }
    }

    /// Configure the minimum task batch size for parallel processing.
    pub fn with_min_par_batch_size(mut self, min_task_size: usize) -> Self {
        self.min_par_batch_size = min_task_size.max(1);
        self
    }

    /// Proves every trace and merges the results.
    pub fn prove(&self, traces: Vec<BatchTrace>) -> Result<StateTransitionProof, TaskError> {
        let prover = self.prover;
        let leaves = traces
            .into_par_iter()
            .enumerate()
            .with_min_len(self.min_par_batch_size)
            .map(|(index, trace)| {
                prover
                    .prove_batch(trace.input, &trace.batch, trace.witnesses)
                    .map_err(|e| TaskError::new(TaskKind::Leaf, index, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let merge = |first: &StateTransitionProof, second: &StateTransitionProof| {
            prover.merge(first.public_input, first, second)
        };
        let proof = merge_balanced(leaves, 0, &merge)?;
        debug!(
            root = %proof.public_output.state_root,
            "proved state transitions"
        );
        Ok(proof)
    }

    /// Splits `transitions` into batches, traces them on `tree` and proves
    /// the result. At least one (possibly padding-only) batch is proven.
    pub fn trace_and_prove<S: NodeWriter>(
        &self,
        tree: &mut MerkleTree<S>,
        input: StateTransitionPublicInput,
        transitions: &[ProvableTransition],
    ) -> Result<StateTransitionProof, TaskError> {
        let traces = trace_batches(tree, input, TransitionBatch::split(transitions))?;
        self.prove(traces)
    }
}

/// Proves the transactions of a block in parallel and merges them into one
/// block proof.
#[derive(Debug)]
pub struct BlockPipeline<'a, B> {
    prover: BlockProver<'a, B>,
    /// Minimum number of leaf tasks per rayon job.
    min_par_batch_size: usize,
}

impl<'a, B: ProofBackend> BlockPipeline<'a, B> {
    /// Creates a pipeline attesting through `backend`.
    pub fn new(backend: &'a B) -> Self {
        Self {
            prover: BlockProver::new(backend),
            min_par_batch_size: DEFAULT_MIN_PAR_BATCH_SIZE,
        }
    }

    /// Configure the minimum task batch size for parallel processing.
    pub fn with_min_par_batch_size(mut self, min_task_size: usize) -> Self {
        self.min_par_batch_size = min_task_size.max(1);
        self
    }

    /// Proves the block made of `transactions`, starting at `input`.
    ///
    /// A sequential dry-run first fixes the block input of every transaction;
    /// the leaf proofs then run in parallel.
    pub fn prove(
        &self,
        input: BlockPublicInput,
        transactions: &[(StateTransitionProof, RuntimeProof)],
    ) -> Result<BlockProof, TaskError> {
        let prover = self.prover;
        let mut state = BlockProverState::new(input);
        let mut inputs = Vec::with_capacity(transactions.len());
        for (index, (st_proof, runtime_proof)) in transactions.iter().enumerate() {
            inputs.push(state.public_values());
            prover
                .apply_transaction(&mut state, st_proof, runtime_proof)
                .map_err(|e| TaskError::new(TaskKind::Trace, index, e))?;
        }

        let leaves = transactions
            .par_iter()
            .zip(inputs)
            .enumerate()
            .with_min_len(self.min_par_batch_size)
            .map(|(index, ((st_proof, runtime_proof), input))| {
                prover
                    .prove_transaction(input, st_proof, runtime_proof)
                    .map_err(|e| TaskError::new(TaskKind::Leaf, index, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let merge = |first: &BlockProof, second: &BlockProof| {
            prover.merge(first.public_input, first, second)
        };
        let proof = merge_balanced(leaves, 0, &merge)?;
        debug!(
            transactions = transactions.len(),
            root = %proof.public_output.state_root,
            "proved block"
        );
        Ok(proof)
    }
}

//! End-to-end fuzz testing of the proving pipeline.
//!
//! Simulates block production from the sequencer's point of view:
//!
//! **Application:**
//! - Executes each transaction against its view of the state, emitting typed
//!   state transitions and a success flag
//! - Commits to its transitions with a reducing transitions list and attests
//!   the result in a runtime proof
//!
//! **Prover:**
//! - Reduces the transitions, traces them on a per-transaction overlay and
//!   proves them through the state-transition pipeline
//! - Proves the block from the per-transaction proof pairs
//! - Commits a transaction's overlay only if it succeeded, and the block's
//!   overlay only once the block proof is accepted
//!
//! The test validates correctness by checking:
//! - **State consistency**: every value a transaction claims to read comes from
//!   a reference `BTreeMap` oracle and must be provable against the accumulator,
//!   and the final accumulator holds exactly the oracle's values
//! - **Root consistency**: the block proof's root matches the committed
//!   accumulator, and reduced and unreduced transitions reach the same root
//! - **Reversibility**: inverting all committed node updates restores the
//!   empty accumulator
use crate::{
    commitment::HashList,
    constant::{empty_root, TRANSACTIONS_HASH_PREFIX, TRANSITIONS_HASH_PREFIX},
    field::{hash_fields, FieldElement},
    mem_store::MemStore,
    merkle::{cached_store::CachedStore, tree::MerkleTree, updates::NodeUpdates},
    option::StateOption,
    pipeline::{BlockPipeline, StateTransitionPipeline},
    prover::{
        backend::{MockBackend, ProofBackend, BLOCK_CIRCUIT, RUNTIME_CIRCUIT},
        block::{BlockPublicValues, RuntimeProofOutput},
        state_transition::StateTransitionPublicValues,
    },
    reducer::{reduce_transitions, TransitionReductionList},
    transition::{state_path, ProvableTransition, StateTransition},
};
use std::collections::BTreeMap;

/// Namespace of every fuzzed key.
const NAMESPACE: &str = "provable-state fuzz";

/// A state access performed by a transaction.
///
/// Operations reference keys via indices into a small key space so that
/// transactions frequently touch the same keys.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Writes a value to the key at the given index.
    Write(u16, u64),
    /// Reads the key at the given index.
    Read(u16),
}

/// A transaction: a sequence of state accesses and the application's verdict.
#[derive(Debug, Clone)]
pub struct Transaction {
    /// Accesses in execution order.
    pub operations: Vec<Operation>,
    /// Whether the application reports success. Failed transactions are still
    /// included in the block but their writes are discarded.
    pub status: bool,
}

/// A block of transactions.
#[derive(Debug, Clone)]
pub struct Block {
    pub transactions: Vec<Transaction>,
}

/// Number of distinct keys.
const KEY_SPACE: u16 = 64;

fn key_path(index: u16) -> FieldElement {
    state_path(NAMESPACE, &u64::from(index % KEY_SPACE))
}

/// Executes a transaction against `state`, returning the transitions it emits.
///
/// Reads and writes see the transaction's own earlier writes.
fn execute(
    state: &BTreeMap<FieldElement, u64>,
    operations: &[Operation],
) -> (Vec<StateTransition<u64>>, BTreeMap<FieldElement, u64>) {
    let mut pending = BTreeMap::new();
    let transitions = operations
        .iter()
        .map(|op| {
            let (path, written) = match op {
                Operation::Write(index, value) => (key_path(*index), Some(*value)),
                Operation::Read(index) => (key_path(*index), None),
            };
            let current = pending.get(&path).or_else(|| state.get(&path)).copied();
            if let Some(value) = written {
                pending.insert(path, value);
            }
            StateTransition {
                path,
                from: current.into(),
                to: written.into(),
            }
        })
        .collect();
    (transitions, pending)
}

/// Main end-to-end fuzz test function.
pub fn e2e_fuzz_test(blocks: &[Block]) {
    let backend = MockBackend::new();
    let st_pipeline = StateTransitionPipeline::new(&backend).with_min_par_batch_size(1);
    let block_pipeline = BlockPipeline::new(&backend).with_min_par_batch_size(1);

    let base = MemStore::new();
    let mut ref_state: BTreeMap<FieldElement, u64> = BTreeMap::new();
    let mut committed = NodeUpdates::default();

    for (block_number, block) in blocks.iter().enumerate() {
        let mut block_overlay = CachedStore::new(&base);
        let block_input =
            BlockPublicValues::fresh(MerkleTree::new(&block_overlay).root().expect("root"));
        let mut transactions = Vec::with_capacity(block.transactions.len());
        let mut tx_hashes = HashList::new(TRANSACTIONS_HASH_PREFIX);

        for (tx_number, tx) in block.transactions.iter().enumerate() {
            let (transitions, writes) = execute(&ref_state, &tx.operations);
            let provable: Vec<ProvableTransition> =
                transitions.iter().map(StateTransition::to_provable).collect();

            // Application side: reduce while committing.
            let mut app_log = TransitionReductionList::new();
            for transition in &provable {
                app_log.push(*transition).expect("application log rejected transition");
            }

            // Sequencer side: the reduced list commits to the same value.
            let reduced = reduce_transitions(&provable).expect("reduction failed");
            let mut plain = HashList::new(TRANSITIONS_HASH_PREFIX);
            reduced.iter().for_each(|t| plain.push(*t));
            assert_eq!(plain.commitment(), app_log.commitment(), "Reduced commitment mismatch");

            let mut tree = MerkleTree::new(CachedStore::new(&mut block_overlay));
            let st_input = StateTransitionPublicValues::fresh(tree.root().expect("root"));

            // Unreduced transitions reach the same root on a throwaway overlay.
            let unreduced_root = {
                let mut scratch = MerkleTree::new(CachedStore::new(tree.store()));
                st_pipeline
                    .trace_and_prove(&mut scratch, st_input, &provable)
                    .expect("Failed to prove unreduced transitions")
                    .public_output
                    .state_root
            };

            let st_proof = st_pipeline
                .trace_and_prove(&mut tree, st_input, &reduced)
                .expect("Failed to prove transitions");
            assert_eq!(
                st_proof.public_output.state_root, unreduced_root,
                "Reduction changed the resulting root"
            );

            let transaction_hash = hash_fields(&[
                FieldElement::from(block_number as u64),
                FieldElement::from(tx_number as u64),
            ]);
            let runtime_proof = backend
                .prove(
                    RUNTIME_CIRCUIT,
                    (),
                    RuntimeProofOutput {
                        transitions_hash: app_log.commitment(),
                        status: tx.status,
                        transaction_hash,
                    },
                )
                .expect("Failed to attest runtime output");
            tx_hashes.push(transaction_hash);

            let mut overlay = tree.into_store();
            if tx.status {
                overlay.commit().expect("Failed to commit transaction");
                ref_state.extend(writes);
            } else {
                overlay.discard();
            }
            transactions.push((st_proof, runtime_proof));
        }

        if transactions.is_empty() {
            continue;
        }

        let block_proof = block_pipeline
            .prove(block_input, &transactions)
            .expect("Failed to prove block");
        assert!(backend.verify(&block_proof, BLOCK_CIRCUIT));
        assert_eq!(block_proof.public_input, block_input);
        assert_eq!(
            block_proof.public_output.state_root,
            MerkleTree::new(&block_overlay).root().expect("root"),
            "Block root mismatch"
        );
        assert_eq!(
            block_proof.public_output.transactions_hash,
            tx_hashes.commitment(),
            "Transactions commitment mismatch"
        );

        committed.merge(block_overlay.commit().expect("Failed to commit block"));
    }

    // Verify all keys in the reference oracle against the accumulator
    let tree = MerkleTree::new(&base);
    let root = tree.root().expect("root");
    for index in 0..KEY_SPACE {
        let path = key_path(index);
        let expected = StateOption::from(ref_state.get(&path).copied()).tree_value();
        assert_eq!(tree.leaf(&path).expect("leaf"), expected, "Leaf mismatch");
        let witness = tree.witness(&path).expect("witness");
        assert!(witness.check_membership(&root, &path, expected));
    }

    // Revert every committed block at once
    base.update_nodes(committed.inverse()).expect("Failed to revert");
    assert_eq!(MerkleTree::new(&base).root().expect("root"), empty_root());
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_blocks(seed: u64, num_blocks: usize) -> Vec<Block> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..num_blocks)
            .map(|_| Block {
                transactions: (0..rng.gen_range(0..5))
                    .map(|_| Transaction {
                        operations: (0..rng.gen_range(0..24))
                            .map(|_| {
                                let key = rng.gen_range(0..KEY_SPACE);
                                if rng.gen_bool(0.6) {
                                    Operation::Write(key, rng.gen_range(0..4))
                                } else {
                                    Operation::Read(key)
                                }
                            })
                            .collect(),
                        status: rng.gen_bool(0.8),
                    })
                    .collect(),
            })
            .collect()
    }

    #[test]
    fn e2e_random_blocks() {
        for seed in 0..4 {
            e2e_fuzz_test(&random_blocks(seed, 3));
        }
    }

    #[test]
    fn e2e_failed_transactions_only() {
        let blocks = vec![Block {
            transactions: vec![
                Transaction {
                    operations: vec![Operation::Write(1, 10), Operation::Read(1)],
                    status: false,
                },
                Transaction {
                    operations: vec![Operation::Read(1), Operation::Write(2, 0)],
                    status: false,
                },
            ],
        }];
        e2e_fuzz_test(&blocks);
    }
}

#![no_main]

use libfuzzer_sys::fuzz_target;
use provable_state::{
    constant::{TRANSACTIONS_HASH_PREFIX, TRANSITIONS_HASH_PREFIX},
    field::{hash_fields, FieldElement},
    pipeline::{BlockPipeline, StateTransitionPipeline},
    prover::{
        backend::{MockBackend, ProofBackend, BLOCK_CIRCUIT, RUNTIME_CIRCUIT},
        block::{BlockPublicValues, RuntimeProofOutput},
        state_transition::StateTransitionPublicValues,
    },
    reduce_transitions,
    transition::state_path,
    CachedStore, HashList, MemStore, MerkleTree, NodeUpdates, ProvableTransition, StateOption,
    StateTransition, TransitionReductionList,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

/// A state access performed by a transaction.
///
/// Operations reference keys via indices into a small key space, so the
/// fuzzer exercises repeated accesses to the same keys inside a transaction.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Writes a value to the key at the given index.
    ///
    /// Values are drawn from a tiny range so that writes frequently restore a
    /// key's previous value.
    Write(u16, u64),

    /// Reads the key at the given index.
    Read(u16),
}

/// A transaction and the verdict the application reports for it.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub operations: Vec<Operation>,
    /// Failed transactions are included in the block but their writes are
    /// discarded.
    pub status: bool,
}

/// Simulates a block of transactions proven by the sequencer.
#[derive(Debug, Clone)]
pub struct Block {
    pub transactions: Vec<Transaction>,
}

const NAMESPACE: &str = "provable-state fuzz";

fuzz_target!(|data: &[u8]| {
    if data.len() < 64 {
        return;
    }

    let seed: u64 = u64::from_le_bytes(data[0..8].try_into().unwrap());
    let blocks = generate_blocks(seed, &data[8..]);
    e2e_test(&blocks);
});

/// Reads an environment variable and parses it, falling back to default if missing or invalid.
fn env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Generates a sequence of test blocks from fuzzer input data.
///
/// Each byte becomes one operation: values below 150 are writes, the rest are
/// reads. The input is divided into blocks, and each block into transactions.
/// Key indices, written values and transaction verdicts come from `seed`.
fn generate_blocks(seed: u64, data: &[u8]) -> Vec<Block> {
    let bytes_per_block = data.len().div_ceil(env("RANDOM_BLOCKS", 3usize).max(1));
    let bytes_per_tx = bytes_per_block.div_ceil(env("RANDOM_TRANSACTIONS", 4usize).max(1));
    let failure_rate = env("RANDOM_FAILURE_RATE", 0.2);
    let key_space: u16 = env("RANDOM_KEY_SPACE", 64).max(1);
    let mut rng = StdRng::seed_from_u64(seed);

    data.chunks(bytes_per_block)
        .map(|chunk| Block {
            transactions: chunk
                .chunks(bytes_per_tx)
                .map(|tx_bytes| Transaction {
                    operations: tx_bytes
                        .iter()
                        .map(|op| {
                            let key = rng.gen_range(0..key_space);
                            if *op < 150 {
                                Operation::Write(key, rng.gen_range(0..4))
                            } else {
                                Operation::Read(key)
                            }
                        })
                        .collect(),
                    status: !rng.gen_bool(failure_rate),
                })
                .collect(),
        })
        .collect()
}

fn key_path(index: u16) -> FieldElement {
    state_path(NAMESPACE, &u64::from(index))
}

/// Executes `operations` against `state`, returning the emitted transitions
/// and the writes to apply if the transaction succeeds.
fn execute(
    state: &BTreeMap<FieldElement, u64>,
    operations: &[Operation],
) -> (Vec<ProvableTransition>, BTreeMap<FieldElement, u64>) {
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
            StateTransition::from_to(path, current, written).to_provable()
        })
        .collect();
    (transitions, pending)
}

/// End-to-end test of the proving pipeline.
///
/// **Application:**
/// - Executes each transaction against the reference oracle
/// - Commits to its transitions with a reducing list and attests the commitment,
///   the verdict and a transaction hash in a runtime proof
///
/// **Sequencer:**
/// - Reduces the transitions and proves them on a per-transaction overlay
/// - Keeps the overlay only for successful transactions
/// - Proves the block and checks its public values against the overlay and the
///   transaction commitment before persisting
///
/// **Correctness Validation:**
/// - **State consistency**: every leaf matches the oracle and has a valid
///   membership witness against the final root
/// - **Reversibility**: inverting all persisted node updates restores the
///   initial root
///
/// # Panics
/// Panics if any consistency check fails.
fn e2e_test(blocks: &[Block]) {
    let backend = MockBackend::new();
    let st_pipeline = StateTransitionPipeline::new(&backend)
        .with_min_par_batch_size(env("RANDOM_MIN_PAR_BATCH_SIZE", 1));
    let block_pipeline = BlockPipeline::new(&backend)
        .with_min_par_batch_size(env("RANDOM_MIN_PAR_BATCH_SIZE", 1));

    let db = MemStore::new();
    let initial_root = MerkleTree::new(&db).root().expect("Failed to get initial root");
    let mut ref_state: BTreeMap<FieldElement, u64> = BTreeMap::new();
    let mut persisted = NodeUpdates::default();

    for (block_number, block) in blocks.iter().enumerate() {
        let mut block_overlay = CachedStore::new(&db);
        let block_input = BlockPublicValues::fresh(
            MerkleTree::new(&block_overlay)
                .root()
                .expect("Failed to get block root"),
        );
        let mut proofs = Vec::with_capacity(block.transactions.len());
        let mut transaction_hashes = HashList::new(TRANSACTIONS_HASH_PREFIX);

        for (tx_number, tx) in block.transactions.iter().enumerate() {
            let (transitions, writes) = execute(&ref_state, &tx.operations);

            // Application: commit while reducing
            let mut app_log = TransitionReductionList::new();
            for transition in &transitions {
                app_log
                    .push(*transition)
                    .expect("Application rejected its own transitions");
            }

            // Sequencer: reduce, then prove against a private overlay
            let reduced = reduce_transitions(&transitions).expect("Failed to reduce transitions");
            let mut expected_hash = HashList::new(TRANSITIONS_HASH_PREFIX);
            reduced.iter().for_each(|t| expected_hash.push(*t));
            assert_eq!(
                expected_hash.commitment(),
                app_log.commitment(),
                "Reduced commitment mismatch"
            );

            let mut tree = MerkleTree::new(CachedStore::new(&mut block_overlay));
            let st_input =
                StateTransitionPublicValues::fresh(tree.root().expect("Failed to get tx root"));
            let st_proof = st_pipeline
                .trace_and_prove(&mut tree, st_input, &reduced)
                .expect("Failed to prove transitions");
            assert_eq!(st_proof.public_output.transitions_hash, app_log.commitment());

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
            transaction_hashes.push(transaction_hash);

            let mut tx_overlay = tree.into_store();
            if tx.status {
                tx_overlay.commit().expect("Failed to commit transaction");
                ref_state.extend(writes);
            } else {
                tx_overlay.discard();
            }
            proofs.push((st_proof, runtime_proof));
        }

        if proofs.is_empty() {
            continue;
        }

        let block_proof = block_pipeline
            .prove(block_input, &proofs)
            .expect("Failed to prove block");
        assert!(backend.verify(&block_proof, BLOCK_CIRCUIT), "Block proof rejected");
        assert_eq!(
            block_proof.public_output.state_root,
            MerkleTree::new(&block_overlay)
                .root()
                .expect("Failed to get block root"),
            "Block root mismatch"
        );
        assert_eq!(
            block_proof.public_output.transactions_hash,
            transaction_hashes.commitment(),
            "Transactions commitment mismatch"
        );

        // Persist only after the block proof is accepted
        persisted.merge(block_overlay.commit().expect("Failed to persist block"));
    }

    // Verify every key the oracle knows against the accumulator
    let tree = MerkleTree::new(&db);
    let root = tree.root().expect("Failed to get final root");
    for (path, value) in &ref_state {
        let expected = StateOption::some(*value).tree_value();
        assert_eq!(
            tree.leaf(path).expect("Failed to read leaf"),
            expected,
            "Leaf mismatch at {path}"
        );
        let witness = tree.witness(path).expect("Failed to build witness");
        assert!(
            witness.check_membership(&root, path, expected),
            "Membership witness rejected at {path}"
        );
    }

    // Revert everything persisted and compare against the initial root
    db.update_nodes(persisted.inverse())
        .expect("Failed to revert persisted updates");
    assert_eq!(
        MerkleTree::new(&db).root().expect("Failed to get reverted root"),
        initial_root,
        "State root mismatch after reversion"
    );
}

#![doc = include_str!("../README.md")]

pub mod commitment;
pub use commitment::{HashList, ReductionHashList};
pub mod constant;
pub mod empty_store;
pub mod field;
pub use field::{FieldElement, ToFields};
pub mod merkle;
pub use merkle::{CachedStore, MerkleTree, MerkleWitness, NodeUpdates, WitnessQueue};
pub mod option;
pub use option::{ProvableOption, StateOption};
pub mod pipeline;
pub mod prover;
pub use prover::{ProverError, StateTransitionProver};
pub mod reducer;
pub use reducer::{reduce_transitions, TransitionReductionList};
pub mod transition;
pub use transition::{ProvableTransition, StateTransition, TransitionBatch};

pub mod traits;
pub mod types;
pub use types::*;
pub mod mem_store;
pub use mem_store::MemStore;

#[cfg(test)]
mod fuzz;

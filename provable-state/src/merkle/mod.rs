//! The sparse Merkle accumulator: witnesses, the tree itself, node update
//! tracking and the private write overlay used by concurrent provers.
pub mod cached_store;
pub mod tree;
pub mod updates;
pub mod witness;

pub use cached_store::CachedStore;
pub use tree::MerkleTree;
pub use updates::NodeUpdates;
pub use witness::{MerkleWitness, WitnessQueue};

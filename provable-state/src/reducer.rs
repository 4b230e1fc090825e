//! Telescoping of adjacent same-path transitions.
//!
//! Two neighbouring transitions on the same path collapse into one that reads
//! the earliest `from` and writes the latest `to`. The collapse happens inside a
//! [`ReductionHashList`], so the resulting commitment is exactly the
//! commitment of the shortened list while the intermediate value never enters
//! it.
use crate::{
    commitment::{CommitmentError, ReductionHashList},
    constant::TRANSITIONS_HASH_PREFIX,
    field::{select, FieldElement},
    transition::ProvableTransition,
};
use thiserror::Error;
use tracing::debug;

/// Errors raised while reducing a transition list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReductionError {
    /// A transition reads something other than what its same-path predecessor
    /// left behind.
    #[error("broken transition chain at path {path}")]
    BrokenChain { path: FieldElement },

    #[error(transparent)]
    Commitment(#[from] CommitmentError),
}

/// Merge predicate for two adjacent transitions.
///
/// Returns the transition to log and whether it replaces `previous`. When the
/// paths match, `next` must have read what `previous` wrote, or what
/// `previous` itself read if it was a pure read.
pub fn merge_transitions(
    previous: Option<&ProvableTransition>,
    next: &ProvableTransition,
) -> Result<(ProvableTransition, bool), ReductionError> {
    let Some(previous) = previous else {
        return Ok((*next, false));
    };

    let same_path = previous.path == next.path;
    let consistent = previous.to.value == next.from.value
        || (!previous.to.is_some && previous.from.value == next.from.value);
    if same_path && !consistent {
        return Err(ReductionError::BrokenChain { path: next.path });
    }

    let merged = ProvableTransition {
        path: next.path,
        from: previous.from,
        to: select(next.to.is_some, next.to, previous.to),
    };
    Ok((select(same_path, merged, *next), same_path))
}

/// Transition commitment list that reduces while appending.
///
/// Padding transitions are fed through the conditional variant and never
/// change the list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionReductionList {
    list: ReductionHashList<ProvableTransition>,
}

impl Default for TransitionReductionList {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionReductionList {
    /// An empty list.
    pub fn new() -> Self {
        Self {
            list: ReductionHashList::new(TRANSITIONS_HASH_PREFIX),
        }
    }

    /// Resumes from an existing transitions commitment.
    pub fn with_commitment(commitment: FieldElement) -> Self {
        Self {
            list: ReductionHashList::with_commitment(TRANSITIONS_HASH_PREFIX, commitment),
        }
    }

    /// Appends `transition`, merging it into its predecessor when both touch
    /// the same path.
    pub fn push(&mut self, transition: ProvableTransition) -> Result<(), ReductionError> {
        let real = !transition.is_dummy();
        self.list
            .push_and_reduce_if(transition, real, merge_transitions)
    }

    /// Current commitment.
    pub fn commitment(&self) -> FieldElement {
        self.list.commitment()
    }

    /// The reduced transitions.
    pub fn transitions(&self) -> &[ProvableTransition] {
        self.list.values()
    }

    /// Consumes the list, returning the reduced transitions.
    pub fn into_transitions(self) -> Vec<ProvableTransition> {
        self.list.into_values()
    }
}

/// Reduces a transition list, dropping padding.
///
/// The result commits to the same value under the plain transitions list as
/// the reduction list does, and leaves the accumulator in the same state when
/// applied.
pub fn reduce_transitions(
    transitions: &[ProvableTransition],
) -> Result<Vec<ProvableTransition>, ReductionError> {
    let mut list = TransitionReductionList::new();
    for transition in transitions {
        list.push(*transition)?;
    }
    debug!(
        before = transitions.len(),
        after = list.transitions().len(),
        "reduced transition list"
    );
    Ok(list.into_transitions())
}

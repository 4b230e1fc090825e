//! A commitment list that can amend its last entry.
//!
//! Besides the running commitment, [`ReductionHashList`] keeps the commitment
//! as it was before the latest append (the *preimage*). Every append computes
//! two candidates: extending the list with the new value, and replacing the
//! last value with a merged one by re-hashing from the preimage. A flag
//! returned by the caller's merge function selects between them. The list
//! therefore only ever moves forward, yet two adjacent entries can collapse
//! into one.
use super::{
    hash_list::{extend, HashList},
    CommitmentError,
};
use crate::field::{select, FieldElement, ToFields};
use ark_ff::Zero;

/// Commitment list supporting retroactive merge of the last entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReductionHashList<T> {
    list: HashList<T>,
    /// Commitment before the most recent effective append.
    preimage: FieldElement,
}

impl<T: ToFields + Clone> ReductionHashList<T> {
    /// An empty list, starting from commitment zero.
    pub fn new(prefix: &'static str) -> Self {
        Self::with_commitment(prefix, FieldElement::zero())
    }

    /// Resumes a list from a commitment produced elsewhere.
    ///
    /// The entry behind `commitment` is unknown, so the first append of the
    /// resumed list can never replace it.
    pub fn with_commitment(prefix: &'static str, commitment: FieldElement) -> Self {
        Self {
            list: HashList::with_commitment(prefix, commitment),
            preimage: FieldElement::zero(),
        }
    }

    /// Appends `value`, possibly merging it into the previous entry.
    ///
    /// `merge` receives the previous entry (if this handle knows it) and the
    /// new value, and returns the merged value together with whether the
    /// previous entry should be replaced by it. Errors raised by `merge` abort
    /// the append and leave the list unchanged.
    pub fn push_and_reduce<F, E>(&mut self, value: T, merge: F) -> Result<(), E>
    where
        F: FnOnce(Option<&T>, &T) -> Result<(T, bool), E>,
        E: From<CommitmentError>,
    {
        self.push_and_reduce_if(value, true, merge)
    }

    /// Like [`push_and_reduce`](Self::push_and_reduce), but the list only
    /// changes when `condition` holds.
    ///
    /// `merge` runs regardless of the condition, so its constraints are
    /// enforced for every value.
    pub fn push_and_reduce_if<F, E>(&mut self, value: T, condition: bool, merge: F) -> Result<(), E>
    where
        F: FnOnce(Option<&T>, &T) -> Result<(T, bool), E>,
        E: From<CommitmentError>,
    {
        let previous = self.list.values().last();
        let (merged, should_pop) = merge(previous, &value)?;
        let should_pop = should_pop && previous.is_some();

        if condition && should_pop {
            if let Some(previous) = previous {
                if extend(self.list.prefix(), self.preimage, previous) != self.list.commitment() {
                    return Err(CommitmentError::PreimageMismatch.into());
                }
            }
        }

        let commitment = self.list.commitment();
        let appended = extend(self.list.prefix(), commitment, &value);
        let replaced = extend(self.list.prefix(), self.preimage, &merged);

        let next = select(should_pop, replaced, appended);
        self.list.set_commitment(select(condition, next, commitment));
        self.preimage = select(condition && !should_pop, commitment, self.preimage);

        if condition {
            let values = self.list.values_mut();
            if should_pop {
                values.pop();
                values.push(merged);
            } else {
                values.push(value);
            }
        }
        Ok(())
    }

    /// Current commitment.
    pub fn commitment(&self) -> FieldElement {
        self.list.commitment()
    }

    /// Commitment before the most recent effective append.
    pub fn preimage(&self) -> FieldElement {
        self.preimage
    }

    /// The reduced values appended through this handle, in order.
    pub fn values(&self) -> &[T] {
        self.list.values()
    }

    /// Consumes the list, returning its reduced audit values.
    pub fn into_values(self) -> Vec<T> {
        self.list.into_values()
    }
}

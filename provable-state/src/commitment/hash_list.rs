//! The plain fold-hash commitment list.
use crate::field::{hash_with_prefix, select, FieldElement, ToFields};
use ark_ff::Zero;

/// Running commitment over an ordered sequence of values.
///
/// Values appended through [`push_if`](HashList::push_if) with a false
/// condition leave both the commitment and the audit list untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashList<T> {
    /// Domain-separation prefix of every hash in the fold.
    prefix: &'static str,
    commitment: FieldElement,
    /// Values appended through this handle. Not part of any proof.
    values: Vec<T>,
}

impl<T: ToFields> HashList<T> {
    /// An empty list, starting from commitment zero.
    pub fn new(prefix: &'static str) -> Self {
        Self::with_commitment(prefix, FieldElement::zero())
    }

    /// Resumes a list from a commitment produced elsewhere.
    ///
    /// The values behind `commitment` are unknown to the new handle, so the
    /// audit list only covers appends made from here on.
    pub fn with_commitment(prefix: &'static str, commitment: FieldElement) -> Self {
        Self {
            prefix,
            commitment,
            values: Vec::new(),
        }
    }

    /// Commitment of the list extended by `value`.
    pub fn next_commitment(&self, value: &T) -> FieldElement {
        extend(self.prefix, self.commitment, value)
    }

    /// Appends `value`.
    pub fn push(&mut self, value: T) {
        self.commitment = self.next_commitment(&value);
        self.values.push(value);
    }

    /// Appends `value` only when `condition` holds.
    ///
    /// The extended commitment is computed either way and then selected.
    pub fn push_if(&mut self, value: T, condition: bool) {
        let next = self.next_commitment(&value);
        self.commitment = select(condition, next, self.commitment);
        if condition {
            self.values.push(value);
        }
    }

    /// Current commitment.
    pub fn commitment(&self) -> FieldElement {
        self.commitment
    }

    /// Domain-separation prefix of the list.
    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    /// Values appended through this handle, in order.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Consumes the list, returning its audit values.
    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut Vec<T> {
        &mut self.values
    }

    pub(crate) fn set_commitment(&mut self, commitment: FieldElement) {
        self.commitment = commitment;
    }
}

/// One fold step: `H_p(commitment, value)`.
pub(crate) fn extend<T: ToFields>(
    prefix: &str,
    commitment: FieldElement,
    value: &T,
) -> FieldElement {
    let mut fields = vec![commitment];
    fields.extend(value.to_fields());
    hash_with_prefix(prefix, &fields)
}

/// Commitment of `values` folded from `start`.
pub fn fold_commitment<'a, T, I>(prefix: &str, start: FieldElement, values: I) -> FieldElement
where
    T: ToFields + 'a,
    I: IntoIterator<Item = &'a T>,
{
    values
        .into_iter()
        .fold(start, |commitment, value| extend(prefix, commitment, value))
}

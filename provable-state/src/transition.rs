//! State transitions and fixed-size transition batches.
//!
//! A transition claims that the value at `path` was `from` and, if `to.is_some`,
//! becomes `to`. The path `0` is reserved for padding: batches are always full,
//! and the unused tail is filled with [`ProvableTransition::dummy`].
use crate::{
    constant::TRANSITION_BATCH_SIZE,
    field::{bool_to_field, hash_with_prefix, FieldElement, ToFields},
    option::{ProvableOption, StateOption},
    types::StateError,
};
use ark_ff::Zero;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Derives the accumulator path of a logical address.
///
/// `namespace` separates independent pieces of state (for example one per
/// runtime module and field), `key` selects the entry within it.
pub fn state_path<K: ToFields>(namespace: &str, key: &K) -> FieldElement {
    hash_with_prefix(namespace, &key.to_fields())
}

/// A typed state transition as emitted by the application layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition<V> {
    /// Accumulator key.
    #[serde(with = "crate::field::serde_field")]
    pub path: FieldElement,
    /// Value read before the transition.
    pub from: StateOption<V>,
    /// Value written by the transition, or none for a pure read.
    pub to: StateOption<V>,
}

impl<V: ToFields + Default> StateTransition<V> {
    /// Creates a transition from plain options.
    pub fn from_to(path: FieldElement, from: Option<V>, to: Option<V>) -> Self {
        Self {
            path,
            from: from.into(),
            to: to.into(),
        }
    }

    /// A transition that only reads `path`.
    pub fn read(path: FieldElement, value: Option<V>) -> Self {
        Self::from_to(path, value, None)
    }

    /// A transition that overwrites `path` with `value`.
    pub fn write(path: FieldElement, from: Option<V>, value: V) -> Self {
        Self::from_to(path, from, Some(value))
    }

    /// Returns the provable form of this transition.
    pub fn to_provable(&self) -> ProvableTransition {
        ProvableTransition {
            path: self.path,
            from: self.from.to_provable(),
            to: self.to.to_provable(),
        }
    }
}

/// The in-proof form of a transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvableTransition {
    /// Accumulator key. Zero marks a padding entry; the leaf at path zero is
    /// reserved and stays empty.
    #[serde(with = "crate::field::serde_field")]
    pub path: FieldElement,
    /// Tree value read before the transition.
    pub from: ProvableOption,
    /// Tree value written by the transition.
    pub to: ProvableOption,
}

impl ProvableTransition {
    /// Creates a provable transition.
    pub fn new(path: FieldElement, from: ProvableOption, to: ProvableOption) -> Self {
        Self { path, from, to }
    }

    /// The padding transition.
    pub fn dummy() -> Self {
        Self {
            path: FieldElement::zero(),
            from: ProvableOption::none(),
            to: ProvableOption::none(),
        }
    }

    /// Whether this is a padding entry.
    pub fn is_dummy(&self) -> bool {
        self.path.is_zero()
    }
}

impl ToFields for ProvableTransition {
    fn to_fields(&self) -> Vec<FieldElement> {
        vec![
            self.path,
            bool_to_field(self.from.is_some),
            self.from.value,
            bool_to_field(self.to.is_some),
            self.to.value,
        ]
    }
}

impl fmt::Display for ProvableTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fmt_opt = |opt: &ProvableOption| {
            if opt.is_some {
                opt.value.to_string()
            } else {
                "None".to_string()
            }
        };
        write!(
            f,
            "Transition(path: {}, from: {}, to: {})",
            self.path,
            fmt_opt(&self.from),
            fmt_opt(&self.to)
        )
    }
}

/// A fixed-size, padded sequence of transitions proven together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionBatch {
    transitions: [ProvableTransition; TRANSITION_BATCH_SIZE],
}

impl Default for TransitionBatch {
    fn default() -> Self {
        Self {
            transitions: [ProvableTransition::dummy(); TRANSITION_BATCH_SIZE],
        }
    }
}

impl TransitionBatch {
    /// Builds a batch from at most [`TRANSITION_BATCH_SIZE`] transitions,
    /// padding the remainder with the sentinel.
    pub fn new(transitions: &[ProvableTransition]) -> Result<Self, StateError> {
        if transitions.len() > TRANSITION_BATCH_SIZE {
            return Err(StateError::BatchOverflow {
                len: transitions.len(),
                max: TRANSITION_BATCH_SIZE,
            });
        }
        let mut batch = Self::default();
        batch.transitions[..transitions.len()].copy_from_slice(transitions);
        Ok(batch)
    }

    /// Splits an arbitrary list of transitions into consecutive padded batches.
    ///
    /// Always returns at least one batch, so an empty list still produces a
    /// (padding-only) proof.
    pub fn split(transitions: &[ProvableTransition]) -> Vec<Self> {
        if transitions.is_empty() {
            return vec![Self::default()];
        }
        transitions
            .chunks(TRANSITION_BATCH_SIZE)
            .map(|chunk| {
                let mut batch = Self::default();
                batch.transitions[..chunk.len()].copy_from_slice(chunk);
                batch
            })
            .collect()
    }

    /// All entries of the batch, padding included.
    pub fn transitions(&self) -> &[ProvableTransition] {
        &self.transitions
    }

    /// The entries that are not padding.
    pub fn real_transitions(&self) -> impl Iterator<Item = &ProvableTransition> {
        self.transitions.iter().filter(|t| !t.is_dummy())
    }
}

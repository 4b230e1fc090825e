//! Optional values that can be carried into a proof.
//!
//! A [`StateOption`] records whether the store holds a value at some path.
//! Its [`tree_value`](StateOption::tree_value) is what the accumulator stores at
//! the corresponding leaf: the hash of the value when present and zero when the
//! leaf is empty.
//!
//! Proofs only ever see the flattened [`ProvableOption`], which keeps the
//! `is_some` flag next to the tree value.
use crate::field::{bool_to_field, hash_fields, select, FieldElement, ToFields};
use ark_ff::Zero;
use serde::{Deserialize, Serialize};

/// An optional value together with the flags needed to prove facts about it.
///
/// When `is_some` is false, `value` is `V::default()` and never user data.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateOption<V> {
    /// Whether a value is present.
    pub is_some: bool,
    /// The value, or the canonical dummy when absent.
    pub value: V,
    /// Set when a "none" option was coerced into "some" by [`StateOption::force_some`].
    pub is_forced_some: bool,
}

impl<V: ToFields + Default> StateOption<V> {
    /// An option holding `value`.
    pub fn some(value: V) -> Self {
        Self {
            is_some: true,
            value,
            is_forced_some: false,
        }
    }

    /// An empty option.
    pub fn none() -> Self {
        Self {
            is_some: false,
            value: V::default(),
            is_forced_some: false,
        }
    }

    /// The value stored in the accumulator leaf for this option.
    pub fn tree_value(&self) -> FieldElement {
        let hashed = hash_fields(&self.value.to_fields());
        select(
            self.is_some && !self.is_forced_some,
            hashed,
            FieldElement::zero(),
        )
    }

    /// Coerces an empty option into "some" while pinning its tree value to zero.
    ///
    /// The result claims that the accumulator leaf is empty, so a membership
    /// check against it can no longer be skipped. Options that already hold a
    /// value, including already forced ones, are left unchanged.
    pub fn force_some(&mut self) {
        self.is_forced_some = self.is_forced_some || !self.is_some;
        self.is_some = true;
    }

    /// Returns the provable form of this option.
    pub fn to_provable(&self) -> ProvableOption {
        ProvableOption {
            is_some: self.is_some,
            value: self.tree_value(),
        }
    }

    /// Converts back into a plain [`Option`]. Forced options read as `None`.
    pub fn into_option(self) -> Option<V> {
        (self.is_some && !self.is_forced_some).then_some(self.value)
    }
}

impl<V: ToFields + Default> From<Option<V>> for StateOption<V> {
    fn from(value: Option<V>) -> Self {
        match value {
            Some(value) => Self::some(value),
            None => Self::none(),
        }
    }
}

/// The in-proof form of an option: the presence flag and the tree value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvableOption {
    /// Whether a value is present.
    pub is_some: bool,
    /// Tree value of the option (hash of the value, or zero).
    #[serde(with = "crate::field::serde_field")]
    pub value: FieldElement,
}

impl ProvableOption {
    /// A present option with the given tree value.
    pub fn some(value: FieldElement) -> Self {
        Self {
            is_some: true,
            value,
        }
    }

    /// An absent option.
    pub fn none() -> Self {
        Self {
            is_some: false,
            value: FieldElement::zero(),
        }
    }

    /// Coerces into "some". An absent option carries tree value zero, so the
    /// result asserts that the leaf is empty.
    pub fn force_some(self) -> Self {
        Self {
            is_some: true,
            value: select(self.is_some, self.value, FieldElement::zero()),
        }
    }
}

impl ToFields for ProvableOption {
    fn to_fields(&self) -> Vec<FieldElement> {
        vec![bool_to_field(self.is_some), self.value]
    }
}

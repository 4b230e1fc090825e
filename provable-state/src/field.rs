//! Field elements and the collision-resistant hash `H` used across the crate.
//!
//! Every value that enters a proof is flattened into elements of the scalar
//! field of the Bandersnatch curve. Hashing follows the same recipe as the rest
//! of the crate's commitments: blake3 over the canonical little-endian encoding
//! of each element, reduced back into the field.
//!
//! Two hashing entry points exist:
//! - [`hash_fields`]: plain hash, used for Merkle nodes and option tree values.
//! - [`hash_with_prefix`]: the blake3 state is derived from a context string
//!   before any input is absorbed, so lists built for different purposes can
//!   never produce colliding commitments.
use alloy_primitives::U256;
use ark_ff::{BigInteger, One, PrimeField, Zero};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::{DeserializeAs, SerializeAs};

pub use ark_ed_on_bls12_381_bandersnatch::Fr;

/// The field every provable value lives in.
pub type FieldElement = Fr;

/// 32-byte little-endian encoding of a field element.
pub type FieldBytes = [u8; 32];

/// Returns the canonical 32-byte little-endian encoding of `element`.
#[inline]
pub fn field_to_bytes(element: &FieldElement) -> FieldBytes {
    let mut bytes = [0u8; 32];
    let le = element.into_bigint().to_bytes_le();
    bytes[..le.len()].copy_from_slice(&le);
    bytes
}

/// Hashes a sequence of field elements into a single field element.
#[inline]
pub fn hash_fields(fields: &[FieldElement]) -> FieldElement {
    let mut hasher = blake3::Hasher::new();
    absorb(&mut hasher, fields);
    squeeze(&hasher)
}

/// Hashes a sequence of field elements with a domain-separation prefix folded
/// into the initial hash state.
#[inline]
pub fn hash_with_prefix(prefix: &str, fields: &[FieldElement]) -> FieldElement {
    let mut hasher = blake3::Hasher::new_derive_key(prefix);
    absorb(&mut hasher, fields);
    squeeze(&hasher)
}

fn absorb(hasher: &mut blake3::Hasher, fields: &[FieldElement]) {
    for element in fields {
        hasher.update(&field_to_bytes(element));
    }
}

fn squeeze(hasher: &blake3::Hasher) -> FieldElement {
    Fr::from_le_bytes_mod_order(hasher.finalize().as_bytes())
}

/// Boolean select: `if_true` when `condition` holds, `if_false` otherwise.
///
/// Callers compute both operands up front so the amount of work does not
/// depend on the condition.
#[inline]
pub fn select<T>(condition: bool, if_true: T, if_false: T) -> T {
    if condition {
        if_true
    } else {
        if_false
    }
}

/// Maps a boolean to `0` or `1`.
#[inline]
pub fn bool_to_field(value: bool) -> FieldElement {
    if value {
        FieldElement::one()
    } else {
        FieldElement::zero()
    }
}

/// Interprets the bits of `element` as an unsigned 256-bit integer.
#[inline]
pub fn field_to_u256(element: &FieldElement) -> U256 {
    U256::from_le_bytes(field_to_bytes(element))
}

/// Maps a 256-bit integer into the field, reducing modulo the field order.
#[inline]
pub fn u256_to_field(value: U256) -> FieldElement {
    Fr::from_le_bytes_mod_order(&value.to_le_bytes::<32>())
}

/// Flattens a value into the field elements it is committed as.
pub trait ToFields {
    /// Returns the field encoding of `self`.
    fn to_fields(&self) -> Vec<FieldElement>;
}

impl ToFields for FieldElement {
    fn to_fields(&self) -> Vec<FieldElement> {
        vec![*self]
    }
}

impl ToFields for bool {
    fn to_fields(&self) -> Vec<FieldElement> {
        vec![bool_to_field(*self)]
    }
}

impl ToFields for () {
    fn to_fields(&self) -> Vec<FieldElement> {
        Vec::new()
    }
}

macro_rules! impl_to_fields_for_uint {
    ($($ty:ty),*) => {
        $(
            impl ToFields for $ty {
                fn to_fields(&self) -> Vec<FieldElement> {
                    vec![FieldElement::from(*self)]
                }
            }
        )*
    };
}

impl_to_fields_for_uint!(u8, u16, u32, u64, u128);

impl<T: ToFields, const N: usize> ToFields for [T; N] {
    fn to_fields(&self) -> Vec<FieldElement> {
        self.iter().flat_map(ToFields::to_fields).collect()
    }
}

impl<T: ToFields> ToFields for Vec<T> {
    fn to_fields(&self) -> Vec<FieldElement> {
        self.iter().flat_map(ToFields::to_fields).collect()
    }
}

impl<A: ToFields, B: ToFields> ToFields for (A, B) {
    fn to_fields(&self) -> Vec<FieldElement> {
        let mut fields = self.0.to_fields();
        fields.extend(self.1.to_fields());
        fields
    }
}

impl<T: ToFields> ToFields for &T {
    fn to_fields(&self) -> Vec<FieldElement> {
        (*self).to_fields()
    }
}

/// Serde helpers for a single field element, encoded as its canonical
/// compressed bytes. Use with `#[serde(with = "crate::field::serde_field")]`.
pub mod serde_field {
    use super::*;

    pub fn serialize<S>(element: &FieldElement, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut bytes = [0u8; 32];
        element
            .serialize_compressed(&mut bytes[..])
            .map_err(|e| serde::ser::Error::custom(e.to_string()))?;
        bytes.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<FieldElement, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bytes = <[u8; 32]>::deserialize(deserializer)?;
        FieldElement::deserialize_compressed(&bytes[..])
            .map_err(|e| serde::de::Error::custom(e.to_string()))
    }
}

/// `serde_with` adapter encoding a field element as its canonical compressed
/// bytes, for use inside `#[serde_as(as = "...")]` annotations.
pub struct AsFieldBytes;

impl SerializeAs<FieldElement> for AsFieldBytes {
    fn serialize_as<S>(source: &FieldElement, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serde_field::serialize(source, serializer)
    }
}

impl<'de> DeserializeAs<'de, FieldElement> for AsFieldBytes {
    fn deserialize_as<D>(deserializer: D) -> Result<FieldElement, D::Error>
    where
        D: Deserializer<'de>,
    {
        serde_field::deserialize(deserializer)
    }
}

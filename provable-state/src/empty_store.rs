//! This module provides a node store that holds nothing, for computing
//! genesis roots and witnesses of a fresh accumulator with minimal dependency.
use crate::{field::FieldElement, traits::NodeReader, types::NodeKey};

/// An accumulator store without any node. Every node reads as its level's
/// zero value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct EmptyStore;

impl NodeReader for EmptyStore {
    type Error = &'static str;

    fn node(&self, _key: &NodeKey) -> Result<Option<FieldElement>, Self::Error> {
        Ok(None)
    }

    fn nodes(&self, keys: &[NodeKey]) -> Result<Vec<Option<FieldElement>>, Self::Error> {
        Ok(vec![None; keys.len()])
    }
}

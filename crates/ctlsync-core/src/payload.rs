#![forbid(unsafe_code)]

//! Positional event payloads.
//!
//! Controller events carry between zero and [`MAX_ARITY`] positional values.
//! The arity is fixed per event but not encoded in the type, so construction
//! from a `Vec` is checked; construction from tuples is not.

use crate::error::{BridgeError, Result};

/// Largest number of positional values an event may carry.
pub const MAX_ARITY: usize = 3;

/// The arguments of one event occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Payload<V> {
    values: Vec<V>,
}

impl<V> Payload<V> {
    /// A payload with no values.
    #[must_use]
    pub const fn empty() -> Self {
        Self { values: Vec::new() }
    }

    /// Build a payload from positional values.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::PayloadArity`] if `values` has more than
    /// [`MAX_ARITY`] elements.
    pub fn new(values: Vec<V>) -> Result<Self> {
        if values.len() > MAX_ARITY {
            return Err(BridgeError::PayloadArity {
                arity: values.len(),
            });
        }
        Ok(Self { values })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The value at `index`, if present.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&V> {
        self.values.get(index)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[V] {
        &self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, V> {
        self.values.iter()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<V> {
        self.values
    }
}

impl<V> Default for Payload<V> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<V> From<()> for Payload<V> {
    fn from((): ()) -> Self {
        Self::empty()
    }
}

impl<V> From<(V,)> for Payload<V> {
    fn from((a,): (V,)) -> Self {
        Self { values: vec![a] }
    }
}

impl<V> From<(V, V)> for Payload<V> {
    fn from((a, b): (V, V)) -> Self {
        Self { values: vec![a, b] }
    }
}

impl<V> From<(V, V, V)> for Payload<V> {
    fn from((a, b, c): (V, V, V)) -> Self {
        Self {
            values: vec![a, b, c],
        }
    }
}

impl<V> TryFrom<Vec<V>> for Payload<V> {
    type Error = BridgeError;

    fn try_from(values: Vec<V>) -> Result<Self> {
        Self::new(values)
    }
}

impl<'a, V> IntoIterator for &'a Payload<V> {
    type Item = &'a V;
    type IntoIter = std::slice::Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

//! Exact-match metadata filters for checkpoint listing
//!
//! A [`MetadataFilter`] is a partial mapping. A checkpoint matches iff, for every
//! key in the filter, its metadata holds a deep-equal value under that key.
//! Keys not named by the filter are unconstrained, and a key missing from the
//! metadata never matches, not even a filter value of `null`.
//!
//! Deep equality compares objects key by key, arrays element-wise, and numbers
//! by numeric value, so `1` matches `1.0`. Only equality is supported; there are
//! no range or ordering predicates.

use crate::checkpoint::CheckpointMetadata;
use crate::error::{CheckpointError, Result};
use serde::Serialize;
use serde_json::{Map, Number, Value};

/// Exact-match predicate over [`CheckpointMetadata`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataFilter {
    conditions: Map<String, Value>,
}

impl MetadataFilter {
    /// An empty filter matches every checkpoint
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `metadata[key]` to deep-equal `value`
    pub fn eq(mut self, key: impl Into<String>, value: Value) -> Self {
        self.conditions.insert(key.into(), value);
        self
    }

    /// Build a filter from a JSON object.
    ///
    /// # Errors
    ///
    /// [`CheckpointError::InvalidFilter`] if `value` is not an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(conditions) => Ok(Self { conditions }),
            other => Err(CheckpointError::InvalidFilter(format!(
                "expected an object of metadata keys, got {}",
                other
            ))),
        }
    }

    /// Build a filter from any serializable mapping.
    ///
    /// # Errors
    ///
    /// [`CheckpointError::InvalidFilter`] if the value has no JSON
    /// representation (e.g. a map with non-string keys) or is not an object.
    pub fn from_serializable<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let value = serde_json::to_value(value)
            .map_err(|e| CheckpointError::InvalidFilter(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    /// Returns true if every condition holds for `metadata`
    pub fn matches(&self, metadata: &CheckpointMetadata) -> bool {
        self.conditions.iter().all(|(key, expected)| {
            metadata
                .get(key)
                .is_some_and(|actual| values_match(actual, expected))
        })
    }
}

impl From<Map<String, Value>> for MetadataFilter {
    fn from(conditions: Map<String, Value>) -> Self {
        Self { conditions }
    }
}

impl TryFrom<Value> for MetadataFilter {
    type Error = CheckpointError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

/// Deep equality between two JSON values with numeric comparison of numbers
pub fn values_match(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => numbers_match(a, b),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_match(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, x)| b.get(k).is_some_and(|y| values_match(x, y)))
        }
        _ => actual == expected,
    }
}

fn numbers_match(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

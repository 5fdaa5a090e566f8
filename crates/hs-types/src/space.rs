//! Search-space model: named, ordered lists of admissible discrete values.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::{ConfigError, EncodingError};

/// A caller-meaningful value for one dimension. Values need not be
/// comparable, only indexable, so opaque JSON covers ints, floats,
/// strings, bools and structured choices alike.
pub type DimValue = serde_json::Value;

/// Mapping of dimension-name to concrete value, as handed to the
/// objective function.
pub type ValuesMap = HashMap<String, DimValue>;

/// A single named dimension in the search space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    /// Human-readable dimension name (e.g. "max_depth").
    pub name: String,
    /// Ordered list of admissible values. Invariant: non-empty.
    pub values: Vec<DimValue>,
}

impl Dimension {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Index of `value` within this dimension's value list.
    pub fn index_of(&self, value: &DimValue) -> Result<usize, EncodingError> {
        self.values.iter().position(|v| v == value).ok_or_else(|| {
            EncodingError::ValueNotFound {
                dimension: self.name.clone(),
                value: value.clone(),
            }
        })
    }
}

/// The full search space: an ordered mapping of dimension-name to
/// dimension. The insertion order is fixed for the lifetime of a task and
/// defines the canonical coordinate order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSpace {
    dimensions: Vec<Dimension>,
}

impl SearchSpace {
    pub fn new() -> Self {
        Self {
            dimensions: Vec::new(),
        }
    }

    /// Append a dimension. Order of calls fixes the coordinate order.
    pub fn add_dimension(
        mut self,
        name: impl Into<String>,
        values: Vec<DimValue>,
    ) -> Self {
        self.dimensions.push(Dimension {
            name: name.into(),
            values,
        });
        self
    }

    /// Convenience for integer-valued dimensions.
    pub fn add_ints(self, name: impl Into<String>, values: impl IntoIterator<Item = i64>) -> Self {
        self.add_dimension(
            name,
            values.into_iter().map(serde_json::Value::from).collect(),
        )
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Number of dimensions.
    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Per-dimension value counts in canonical order. Strategies operate
    /// on these sizes alone.
    pub fn dim_sizes(&self) -> Vec<usize> {
        self.dimensions.iter().map(|d| d.len()).collect()
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    /// Canonical index of a dimension by name.
    pub fn dimension_index(&self, name: &str) -> Option<usize> {
        self.dimensions.iter().position(|d| d.name == name)
    }

    /// Check the invariants enforced at task-submission time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dimensions.is_empty() {
            return Err(ConfigError::EmptySpace);
        }
        let mut seen: Vec<&str> = Vec::with_capacity(self.dimensions.len());
        for dim in &self.dimensions {
            if dim.is_empty() {
                return Err(ConfigError::EmptyDimension {
                    name: dim.name.clone(),
                });
            }
            if seen.contains(&dim.name.as_str()) {
                return Err(ConfigError::DuplicateDimension {
                    name: dim.name.clone(),
                });
            }
            seen.push(&dim.name);
        }
        Ok(())
    }

    /// Total number of distinct positions (None on overflow).
    pub fn cardinality(&self) -> Option<usize> {
        let mut total: usize = 1;
        for dim in &self.dimensions {
            total = total.checked_mul(dim.len())?;
        }
        Some(total)
    }

    /// Stable hash of the space shape (sorted names and value counts).
    /// Used to key persisted cache stores so unrelated tasks never share
    /// entries. Must not change across runs, so this is a fixed FNV-1a
    /// over a canonical rendering rather than `DefaultHasher`.
    pub fn shape_hash(&self) -> u64 {
        let mut parts: Vec<String> = self
            .dimensions
            .iter()
            .map(|d| format!("{}:{}", d.name, d.len()))
            .collect();
        parts.sort();

        const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
        let mut hash = FNV_OFFSET;
        for byte in parts.join("|").bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
        hash
    }
}

impl Default for SearchSpace {
    fn default() -> Self {
        Self::new()
    }
}

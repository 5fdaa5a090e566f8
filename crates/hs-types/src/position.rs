//! Positions in index space and their scored, timestamped counterparts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical, order-independent key derived from a position, used for
/// memoization. Rendered as the sorted-by-name `name=index` pairs so the
/// same choice of values always maps to the same key regardless of the
/// space's declaration order.
pub type Fingerprint = String;

/// One choice of value per dimension, as indices into each dimension's
/// value list, in the search space's canonical coordinate order.
///
/// Index space keeps caching and strategy mechanics cheap and hashable;
/// the codec translates back to caller-meaningful values when the
/// objective function is invoked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    indices: Vec<usize>,
}

impl Position {
    pub fn new(indices: Vec<usize>) -> Self {
        Self { indices }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Number of dimensions this position spans.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn into_vec(self) -> Vec<usize> {
        self.indices
    }
}

impl From<Vec<usize>> for Position {
    fn from(indices: Vec<usize>) -> Self {
        Self::new(indices)
    }
}

/// A position plus the scalar score of its evaluation, with the
/// wall-clock timestamp and elapsed time of the evaluation that produced
/// it. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPosition {
    pub position: Position,
    pub score: f64,
    pub evaluated_at: DateTime<Utc>,
    /// Wall-clock seconds the evaluation took. Cache hits report the
    /// (near-zero) lookup time, not the original compute time.
    pub eval_secs: f64,
}

impl ScoredPosition {
    pub fn new(position: Position, score: f64, eval_secs: f64) -> Self {
        Self {
            position,
            score,
            evaluated_at: Utc::now(),
            eval_secs,
        }
    }
}

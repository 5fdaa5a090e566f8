//! Task submission surface: configuration, objective contract, policies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::space::{SearchSpace, ValuesMap};

/// Unique search-task identifier.
pub type TaskId = Uuid;

/// Error channel for caller-supplied objective functions. Callers keep
/// their own error types; the engine only needs something displayable.
pub type ObjectiveError = Box<dyn std::error::Error + Send + Sync>;

/// The objective function contract: a values-mapping in, a single
/// real-valued score out. Fixed auxiliary parameters (datasets, handles)
/// are captured in the closure at task-registration time.
pub type ObjectiveFn = Arc<dyn Fn(&ValuesMap) -> Result<f64, ObjectiveError> + Send + Sync>;

/// Whether we are maximizing or minimizing the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveDirection {
    Maximize,
    Minimize,
}

impl Default for ObjectiveDirection {
    fn default() -> Self {
        Self::Maximize
    }
}

impl ObjectiveDirection {
    /// True if `candidate` strictly improves on `incumbent`. Ties never
    /// improve, which keeps first-seen/lower-index winners stable.
    pub fn improves(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Self::Maximize => candidate > incumbent,
            Self::Minimize => candidate < incumbent,
        }
    }
}

/// Evaluation-memoization policy, fixed at task submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MemoryPolicy {
    /// Every evaluation calls the objective, nothing is recorded.
    None,
    /// In-memory store scoped to the current run, private to each worker.
    Ephemeral,
    /// Best-effort store surviving across runs, shared by all workers of
    /// a task, keyed by the task signature under `dir`.
    Persisted { dir: std::path::PathBuf },
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        Self::Ephemeral
    }
}

/// How many parallel workers to expand a task into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parallelism {
    /// Use every execution slot the coordinator was given.
    Auto,
    /// Use exactly `n` workers (clamped to the available slots).
    Fixed(usize),
}

impl Default for Parallelism {
    fn default() -> Self {
        Self::Fixed(1)
    }
}

/// Top-level configuration for one search task. The objective function
/// travels separately (it is an opaque closure, not serializable state).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub id: TaskId,
    pub name: String,

    /// The discrete search space.
    pub search_space: SearchSpace,

    /// Strategy identifier, resolved against the static registry at
    /// submission time.
    pub strategy: String,

    /// Total evaluation budget per worker, initialization included.
    pub n_iter: usize,

    /// Worker fan-out for this task.
    pub parallelism: Parallelism,

    /// Memoization policy.
    pub memory: MemoryPolicy,

    /// Direction of optimization.
    pub direction: ObjectiveDirection,

    /// Optional start position per worker index. Workers without an
    /// entry start from a random position.
    pub start_positions: HashMap<usize, ValuesMap>,

    /// Task-level random seed. Per-worker seeds derive from this and the
    /// worker index; `None` means a fresh entropy-based seed per run.
    pub seed: Option<u64>,

    pub created_at: DateTime<Utc>,
}

impl TaskConfig {
    pub fn new(name: impl Into<String>, search_space: SearchSpace, strategy: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            search_space,
            strategy: strategy.to_string(),
            n_iter: 10,
            parallelism: Parallelism::default(),
            memory: MemoryPolicy::default(),
            direction: ObjectiveDirection::default(),
            start_positions: HashMap::new(),
            seed: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_n_iter(mut self, n: usize) -> Self {
        self.n_iter = n;
        self
    }

    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn with_memory(mut self, memory: MemoryPolicy) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_direction(mut self, direction: ObjectiveDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_start_position(mut self, worker_index: usize, values: ValuesMap) -> Self {
        self.start_positions.insert(worker_index, values);
        self
    }

    /// Stable signature identifying (objective identity, space shape).
    /// Persisted cache stores are keyed by this so distinct tasks never
    /// collide. The task name stands in for objective identity.
    pub fn signature(&self) -> String {
        let safe_name: String = self
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("{}-{:016x}", safe_name, self.search_space.shape_hash())
    }
}

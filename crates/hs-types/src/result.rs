//! Worker- and task-level results handed back to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::position::ScoredPosition;
use crate::space::ValuesMap;
use crate::task::{ObjectiveDirection, TaskId};

/// Everything one worker observed, produced once at loop termination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerReport {
    pub worker_index: usize,

    /// Every (position, score) pair evaluated, initialization included.
    pub history: Vec<ScoredPosition>,

    /// Best-scoring pair by the task's direction. `None` iff the worker
    /// failed before scoring anything.
    pub best: Option<ScoredPosition>,

    /// Wall-clock seconds per evaluation (objective call or cache hit).
    pub eval_times: Vec<f64>,

    /// Wall-clock seconds per full iteration (evaluation plus strategy
    /// bookkeeping).
    pub iter_times: Vec<f64>,

    /// Failure message if the worker aborted. A failed worker is
    /// excluded from reduction but still reported for diagnostics.
    pub error: Option<String>,
}

impl WorkerReport {
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Number of evaluations this worker performed.
    pub fn evaluations(&self) -> usize {
        self.history.len()
    }
}

/// The reduction of all worker reports for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub task_name: String,
    pub direction: ObjectiveDirection,

    /// Best values-mapping across all non-failed workers.
    pub best_values: ValuesMap,
    pub best_score: f64,
    /// Index of the worker that found the best score (lowest index on
    /// ties).
    pub best_worker: usize,

    /// Per-worker reports, in worker-index order, failed ones included.
    pub workers: Vec<WorkerReport>,

    /// Timing diagnostics concatenated across workers in index order.
    pub eval_times: Vec<f64>,
    pub iter_times: Vec<f64>,

    /// How many workers failed. Non-zero does not fail the task as long
    /// as at least one worker succeeded.
    pub failed_workers: usize,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TaskResult {
    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as f64
            / 1000.0
    }

    /// Total evaluations across all workers.
    pub fn total_evaluations(&self) -> usize {
        self.workers.iter().map(WorkerReport::evaluations).sum()
    }
}

//! Fan-out/fan-in: expands one task into N seeded workers, runs them in
//! parallel, and reduces their reports into a task-level result.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use hs_strategies::{StrategyContext, StrategyKind};
use hs_types::{
    internal_error, ConfigError, HsResult, MemoryPolicy, ObjectiveFn, Parallelism, TaskConfig,
    TaskError, TaskId, TaskResult, WorkerReport,
};

use crate::cache::{EvaluationCache, PersistedStore};
use crate::codec::PositionCodec;
use crate::worker::{RunClock, SearchWorker};

/// Cooperative cancellation for one task. Takes effect at each worker's
/// next iteration boundary; an in-flight objective call is never
/// aborted. Cancellation is sticky for the task's lifetime.
#[derive(Debug, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Opaque reference to a submitted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskHandle {
    pub id: TaskId,
    index: usize,
}

struct SubmittedTask {
    config: TaskConfig,
    objective: ObjectiveFn,
    kind: StrategyKind,
    cancel: Arc<AtomicBool>,
}

enum PreparedWorker {
    Ready(SearchWorker),
    /// Start-position resolution failed; the worker never runs but its
    /// failure is still reported.
    Failed(WorkerReport),
}

/// Orchestrates search tasks over a fixed number of execution slots.
///
/// The slot count is injected by the hosting environment rather than
/// detected from host hardware, keeping the coordinator testable.
pub struct Coordinator {
    available_slots: usize,
    tasks: Vec<SubmittedTask>,
}

impl Coordinator {
    pub fn new(available_slots: usize) -> Self {
        Self {
            available_slots: available_slots.max(1),
            tasks: Vec::new(),
        }
    }

    pub fn available_slots(&self) -> usize {
        self.available_slots
    }

    /// Validate and register a task. Configuration errors surface here,
    /// before any work starts.
    pub fn submit(&mut self, config: TaskConfig, objective: ObjectiveFn) -> HsResult<TaskHandle> {
        config.search_space.validate()?;
        let kind = StrategyKind::parse(&config.strategy)?;

        if config.n_iter == 0 {
            return Err(ConfigError::ZeroIterations.into());
        }
        let required = kind.init_positions_required();
        if config.n_iter < required {
            return Err(ConfigError::IterationBudgetTooSmall {
                n_iter: config.n_iter,
                required,
                strategy: config.strategy.clone(),
            }
            .into());
        }
        if config.parallelism == Parallelism::Fixed(0) {
            return Err(ConfigError::ZeroParallelism.into());
        }

        info!(
            task = %config.name,
            id = %config.id,
            strategy = kind.identifier(),
            n_iter = config.n_iter,
            "task submitted"
        );

        let handle = TaskHandle {
            id: config.id,
            index: self.tasks.len(),
        };
        self.tasks.push(SubmittedTask {
            config,
            objective,
            kind,
            cancel: Arc::new(AtomicBool::new(false)),
        });
        Ok(handle)
    }

    pub fn cancel_token(&self, handle: &TaskHandle) -> HsResult<CancelToken> {
        Ok(CancelToken(Arc::clone(&self.task(handle)?.cancel)))
    }

    /// Run one task. `max_time` is a wall-clock budget in minutes for
    /// the whole run.
    pub fn run(&self, handle: &TaskHandle, max_time: Option<f64>) -> HsResult<TaskResult> {
        let task = self.task(handle)?;
        let clock = RunClock::new(Instant::now(), budget_from_minutes(max_time));
        self.run_task(task, clock)
    }

    /// Run every submitted task in submission order under one shared
    /// wall-clock budget. Each task gets its own outcome; one task's
    /// failure never skips the rest.
    pub fn run_all(&self, max_time: Option<f64>) -> Vec<HsResult<TaskResult>> {
        let clock = RunClock::new(Instant::now(), budget_from_minutes(max_time));
        self.tasks
            .iter()
            .map(|task| self.run_task(task, clock.clone()))
            .collect()
    }

    /// Number of workers a parallelism request expands to: "all
    /// available" uses every slot, and explicit requests clamp to the
    /// slots that exist.
    pub fn effective_workers(&self, parallelism: Parallelism) -> usize {
        match parallelism {
            Parallelism::Auto => self.available_slots,
            Parallelism::Fixed(n) => n.min(self.available_slots),
        }
    }

    fn task(&self, handle: &TaskHandle) -> HsResult<&SubmittedTask> {
        self.tasks
            .get(handle.index)
            .filter(|t| t.config.id == handle.id)
            .ok_or_else(|| TaskError::UnknownHandle.into())
    }

    fn run_task(&self, task: &SubmittedTask, clock: RunClock) -> HsResult<TaskResult> {
        let config = &task.config;
        let started_at = chrono::Utc::now();
        let codec = PositionCodec::new(Arc::new(config.search_space.clone()));
        let n_workers = self.effective_workers(config.parallelism);

        let persisted = match &config.memory {
            MemoryPolicy::Persisted { dir } => {
                Some(Arc::new(PersistedStore::open(dir, &config.signature())?))
            }
            _ => None,
        };

        let task_seed = config.seed.unwrap_or_else(rand::random);
        info!(
            task = %config.name,
            workers = n_workers,
            seed = task_seed,
            "task starting"
        );

        let prepared: Vec<PreparedWorker> = (0..n_workers)
            .map(|index| {
                self.prepare_worker(task, index, task_seed, &codec, persisted.as_ref(), &clock)
            })
            .collect();

        // Fan-out; the collect is the barrier, every worker reaches
        // TERMINATE before reduction starts.
        let reports: Vec<WorkerReport> = prepared
            .into_par_iter()
            .map(|prepared| match prepared {
                PreparedWorker::Ready(worker) => worker.run(),
                PreparedWorker::Failed(report) => report,
            })
            .collect();

        if let Some(store) = &persisted {
            if let Err(e) = store.flush() {
                warn!(error = %e, "persisted cache flush failed");
            }
        }

        self.reduce(task, &codec, reports, started_at)
    }

    fn prepare_worker(
        &self,
        task: &SubmittedTask,
        index: usize,
        task_seed: u64,
        codec: &PositionCodec,
        persisted: Option<&Arc<PersistedStore>>,
        clock: &RunClock,
    ) -> PreparedWorker {
        let config = &task.config;
        let worker_seed = derive_worker_seed(task_seed, index);
        let mut rng = ChaCha8Rng::seed_from_u64(worker_seed);

        let required = task.kind.init_positions_required();
        let mut init_positions = Vec::with_capacity(required);
        for nth in 0..required {
            // Only the first initial position honours the caller's
            // per-worker anchor; extras are random.
            let requested = if nth == 0 {
                config.start_positions.get(&index)
            } else {
                None
            };
            match codec.resolve_start_position(requested, &mut rng) {
                Ok(position) => init_positions.push(position),
                Err(e) => {
                    warn!(worker = index, error = %e, "start position unresolvable");
                    return PreparedWorker::Failed(WorkerReport {
                        worker_index: index,
                        history: Vec::new(),
                        best: None,
                        eval_times: Vec::new(),
                        iter_times: Vec::new(),
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let strategy = task.kind.build(StrategyContext {
            dim_sizes: codec.space().dim_sizes(),
            init_positions,
            // Re-mixed so the strategy does not replay the codec's
            // init-position draws.
            seed: derive_worker_seed(worker_seed, 1),
            direction: config.direction,
        });

        let cache = match &config.memory {
            MemoryPolicy::None => EvaluationCache::None,
            MemoryPolicy::Ephemeral => EvaluationCache::ephemeral(),
            MemoryPolicy::Persisted { .. } => match persisted {
                Some(store) => EvaluationCache::Persisted(Arc::clone(store)),
                None => EvaluationCache::ephemeral(),
            },
        };

        PreparedWorker::Ready(SearchWorker {
            index,
            n_iter: config.n_iter,
            direction: config.direction,
            codec: codec.clone(),
            cache,
            strategy,
            objective: Arc::clone(&task.objective),
            clock: clock.clone(),
            cancel: Arc::clone(&task.cancel),
        })
    }

    fn reduce(
        &self,
        task: &SubmittedTask,
        codec: &PositionCodec,
        reports: Vec<WorkerReport>,
        started_at: chrono::DateTime<chrono::Utc>,
    ) -> HsResult<TaskResult> {
        let config = &task.config;
        let failed_workers = reports.iter().filter(|r| r.is_failed()).count();

        // Strict improvement while scanning in worker-index order: the
        // lower index wins ties.
        let mut best: Option<(usize, f64, &hs_types::Position)> = None;
        for report in &reports {
            if report.is_failed() {
                continue;
            }
            if let Some(scored) = &report.best {
                let improved = match &best {
                    None => true,
                    Some((_, incumbent, _)) => config.direction.improves(scored.score, *incumbent),
                };
                if improved {
                    best = Some((report.worker_index, scored.score, &scored.position));
                }
            }
        }

        let (best_worker, best_score, best_position) = best.ok_or({
            TaskError::AllWorkersFailed {
                failed: failed_workers,
            }
        })?;
        let best_values = codec
            .decode(best_position)
            .map_err(|e| internal_error!("best position undecodable: {e}"))?;

        let eval_times: Vec<f64> = reports.iter().flat_map(|r| r.eval_times.clone()).collect();
        let iter_times: Vec<f64> = reports.iter().flat_map(|r| r.iter_times.clone()).collect();

        info!(
            task = %config.name,
            best_score,
            best_worker,
            failed_workers,
            "task completed"
        );

        Ok(TaskResult {
            task_id: config.id,
            task_name: config.name.clone(),
            direction: config.direction,
            best_values,
            best_score,
            best_worker,
            workers: reports,
            eval_times,
            iter_times,
            failed_workers,
            started_at,
            finished_at: chrono::Utc::now(),
        })
    }
}

/// Minutes at the caller surface, seconds internally.
fn budget_from_minutes(minutes: Option<f64>) -> Option<Duration> {
    minutes.map(|m| Duration::from_secs_f64(m * 60.0))
}

/// splitmix64 over (task seed, worker index): deterministic per-worker
/// seeds so re-running with the same task seed reproduces identical
/// trajectories.
fn derive_worker_seed(task_seed: u64, worker_index: usize) -> u64 {
    let mut z = task_seed.wrapping_add(
        (worker_index as u64)
            .wrapping_add(1)
            .wrapping_mul(0x9E37_79B9_7F4A_7C15),
    );
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

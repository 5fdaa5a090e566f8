//! One parallel worker: drives a strategy through the
//! initialize/iterate/evaluate loop under the shared wall-clock budget.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use hs_strategies::Strategy;
use hs_types::{ObjectiveDirection, ObjectiveFn, Position, ScoredPosition, WorkerReport};

use crate::cache::EvaluationCache;
use crate::codec::PositionCodec;

/// Shared run clock: one start instant for every worker of a run, so the
/// budget is a wall-clock ceiling on the whole run, not per worker.
///
/// The budget is cooperative. It is checked at iteration boundaries
/// only, so a slow objective call can overrun it by up to one
/// evaluation's duration.
#[derive(Debug, Clone)]
pub struct RunClock {
    start: Instant,
    budget: Option<Duration>,
}

impl RunClock {
    pub fn new(start: Instant, budget: Option<Duration>) -> Self {
        Self { start, budget }
    }

    pub fn unbounded(start: Instant) -> Self {
        Self {
            start,
            budget: None,
        }
    }

    pub fn exceeded(&self) -> bool {
        match self.budget {
            Some(budget) => self.start.elapsed() > budget,
            None => false,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Append-only log of one worker's run, finalized into an immutable
/// [`WorkerReport`] exactly once at termination.
struct RunLog {
    direction: ObjectiveDirection,
    history: Vec<ScoredPosition>,
    best: Option<ScoredPosition>,
    eval_times: Vec<f64>,
    iter_times: Vec<f64>,
}

impl RunLog {
    fn new(direction: ObjectiveDirection) -> Self {
        Self {
            direction,
            history: Vec::new(),
            best: None,
            eval_times: Vec::new(),
            iter_times: Vec::new(),
        }
    }

    fn record(&mut self, scored: ScoredPosition, iter_secs: f64) {
        // Strict improvement only: on equal scores the first-seen
        // position stays the best.
        let improved = match &self.best {
            None => true,
            Some(best) => self.direction.improves(scored.score, best.score),
        };
        if improved {
            self.best = Some(scored.clone());
        }
        self.eval_times.push(scored.eval_secs);
        self.iter_times.push(iter_secs);
        self.history.push(scored);
    }

    fn finish(self, worker_index: usize, error: Option<String>) -> WorkerReport {
        WorkerReport {
            worker_index,
            history: self.history,
            best: if error.is_some() { None } else { self.best },
            eval_times: self.eval_times,
            iter_times: self.iter_times,
            error,
        }
    }
}

/// One isolated unit of parallel work. A worker failure never crashes
/// sibling workers; it surfaces as a failed report.
pub struct SearchWorker {
    pub(crate) index: usize,
    pub(crate) n_iter: usize,
    pub(crate) direction: ObjectiveDirection,
    pub(crate) codec: PositionCodec,
    pub(crate) cache: EvaluationCache,
    pub(crate) strategy: Box<dyn Strategy>,
    pub(crate) objective: ObjectiveFn,
    pub(crate) clock: RunClock,
    pub(crate) cancel: Arc<AtomicBool>,
}

impl SearchWorker {
    /// Assemble a worker around an already-built strategy. The
    /// coordinator goes through the registry; this is the seam for
    /// driving a custom strategy object directly.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: usize,
        n_iter: usize,
        direction: ObjectiveDirection,
        codec: PositionCodec,
        cache: EvaluationCache,
        strategy: Box<dyn Strategy>,
        objective: ObjectiveFn,
        clock: RunClock,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            index,
            n_iter,
            direction,
            codec,
            cache,
            strategy,
            objective,
            clock,
            cancel,
        }
    }

    /// Run INIT then ITERATE to completion, budget or cancellation.
    pub fn run(mut self) -> WorkerReport {
        let mut log = RunLog::new(self.direction);
        debug!(worker = self.index, n_iter = self.n_iter, "worker starting");

        // INIT: consume the strategy's initial positions.
        let init_count = self.strategy.init_count().min(self.n_iter);
        for nth in 0..init_count {
            let iter_start = Instant::now();
            let position = self.strategy.init_pos(nth);
            let scored = match self.score(&position) {
                Ok(s) => s,
                Err(msg) => {
                    warn!(worker = self.index, error = %msg, "worker failed in INIT");
                    return log.finish(self.index, Some(msg));
                }
            };
            self.strategy.evaluate(scored.score);
            log.record(scored, iter_start.elapsed().as_secs_f64());

            if self.should_stop() {
                return log.finish(self.index, None);
            }
        }

        // ITERATE: one candidate per remaining iteration.
        for step in init_count..self.n_iter {
            let iter_start = Instant::now();
            let position = self.strategy.iterate(step);
            let scored = match self.score(&position) {
                Ok(s) => s,
                Err(msg) => {
                    warn!(worker = self.index, error = %msg, "worker failed in ITERATE");
                    return log.finish(self.index, Some(msg));
                }
            };
            self.strategy.evaluate(scored.score);
            log.record(scored, iter_start.elapsed().as_secs_f64());

            if self.should_stop() {
                debug!(
                    worker = self.index,
                    step,
                    elapsed_secs = self.clock.elapsed().as_secs_f64(),
                    "worker stopping early"
                );
                break;
            }
        }

        debug!(worker = self.index, evals = log.history.len(), "worker terminated");
        log.finish(self.index, None)
    }

    /// Score one position: decode to values, consult the cache, call the
    /// objective on a miss. Panics in the objective are contained here.
    fn score(&mut self, position: &Position) -> Result<ScoredPosition, String> {
        let fingerprint = self
            .codec
            .fingerprint(position)
            .map_err(|e| e.to_string())?;
        let values = self.codec.decode(position).map_err(|e| e.to_string())?;

        let objective = &self.objective;
        let eval_start = Instant::now();
        let (score, _hit) = self
            .cache
            .get_or_compute(&fingerprint, || {
                match catch_unwind(AssertUnwindSafe(|| objective(&values))) {
                    Ok(result) => result,
                    Err(_) => Err("objective function panicked".into()),
                }
            })
            .map_err(|e| e.to_string())?;

        Ok(ScoredPosition::new(
            position.clone(),
            score,
            eval_start.elapsed().as_secs_f64(),
        ))
    }

    /// Cooperative stop check, evaluated only at iteration boundaries.
    fn should_stop(&self) -> bool {
        self.cancel.load(Ordering::Relaxed) || self.clock.exceeded()
    }
}

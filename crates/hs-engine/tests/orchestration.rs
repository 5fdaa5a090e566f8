//! End-to-end orchestration scenarios across codec, cache, worker and
//! coordinator.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use hs_engine::{Coordinator, EvaluationCache, PositionCodec, RunClock, SearchWorker};
use hs_strategies::Strategy;
use hs_types::{
    HsError, MemoryPolicy, ObjectiveDirection, ObjectiveFn, Parallelism, Position, SearchSpace,
    TaskConfig, TaskError,
};

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn depth_split_space() -> SearchSpace {
    SearchSpace::new()
        .add_ints("depth", 1..=4)
        .add_ints("split", [2, 4, 6])
}

/// score = depth_value - split_value
fn depth_minus_split() -> ObjectiveFn {
    Arc::new(|values| {
        let depth = values["depth"].as_i64().unwrap() as f64;
        let split = values["split"].as_i64().unwrap() as f64;
        Ok(depth - split)
    })
}

/// Replays a fixed sequence of positions, first one as the initial
/// position.
struct Scripted {
    sequence: Vec<Position>,
    cursor: usize,
}

impl Scripted {
    fn new(sequence: Vec<Vec<usize>>) -> Self {
        Self {
            sequence: sequence.into_iter().map(Position::new).collect(),
            cursor: 0,
        }
    }
}

impl Strategy for Scripted {
    fn init_count(&self) -> usize {
        1
    }

    fn init_pos(&mut self, nth: usize) -> Position {
        self.cursor = nth + 1;
        self.sequence[nth].clone()
    }

    fn iterate(&mut self, _step: usize) -> Position {
        let pos = self.sequence[self.cursor].clone();
        self.cursor += 1;
        pos
    }

    fn evaluate(&mut self, _score: f64) {}
}

#[test]
fn scripted_sequence_finds_known_best() {
    init_tracing();
    let codec = PositionCodec::new(Arc::new(depth_split_space()));
    let strategy = Scripted::new(vec![
        vec![0, 0],
        vec![3, 0],
        vec![1, 1],
        vec![2, 0],
        vec![0, 2],
    ]);

    let report = SearchWorker::new(
        0,
        5,
        ObjectiveDirection::Maximize,
        codec.clone(),
        EvaluationCache::ephemeral(),
        Box::new(strategy),
        depth_minus_split(),
        RunClock::unbounded(Instant::now()),
        Arc::new(AtomicBool::new(false)),
    )
    .run();

    assert!(!report.is_failed());
    assert_eq!(report.history.len(), 5);

    let best = report.best.unwrap();
    assert_eq!(best.score, 2.0);
    // Found at the second evaluated position.
    assert_eq!(report.history[1].score, 2.0);

    let values = codec.decode(&best.position).unwrap();
    assert_eq!(values["depth"], serde_json::json!(4));
    assert_eq!(values["split"], serde_json::json!(2));
}

#[test]
fn one_failing_worker_does_not_fail_the_task() {
    init_tracing();
    // Exactly one evaluation fails: whichever worker gets there first
    // aborts, the other keeps going.
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_in_objective = Arc::clone(&calls);
    let objective: ObjectiveFn = Arc::new(move |values| {
        if calls_in_objective.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err("training crashed".into());
        }
        Ok(values["depth"].as_i64().unwrap() as f64)
    });

    let mut coordinator = Coordinator::new(2);
    let config = TaskConfig::new("partial-failure", depth_split_space(), "random-search")
        .with_n_iter(10)
        .with_parallelism(Parallelism::Fixed(2))
        .with_memory(MemoryPolicy::None)
        .with_seed(3);
    let handle = coordinator.submit(config, objective).unwrap();
    let result = coordinator.run(&handle, None).unwrap();

    assert_eq!(result.failed_workers, 1);
    assert_eq!(result.workers.len(), 2);
    assert!(result.best_score >= 1.0);
}

#[test]
fn all_workers_failing_fails_the_task() {
    init_tracing();
    let objective: ObjectiveFn = Arc::new(|_| Err("always broken".into()));

    let mut coordinator = Coordinator::new(2);
    let config = TaskConfig::new("doomed", depth_split_space(), "hill-climbing")
        .with_n_iter(5)
        .with_parallelism(Parallelism::Fixed(2))
        .with_seed(3);
    let handle = coordinator.submit(config, objective).unwrap();

    match coordinator.run(&handle, None) {
        Err(HsError::Task(TaskError::AllWorkersFailed { failed })) => assert_eq!(failed, 2),
        other => panic!("expected all-workers-failed, got {other:?}"),
    }
}

#[test]
fn reduction_picks_the_global_maximum() {
    init_tracing();
    // Strictly increasing scores across calls: the best must equal the
    // maximum over every worker's full history.
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_in_objective = Arc::clone(&counter);
    let objective: ObjectiveFn = Arc::new(move |_| {
        Ok(counter_in_objective.fetch_add(1, Ordering::SeqCst) as f64)
    });

    let mut coordinator = Coordinator::new(3);
    let config = TaskConfig::new("reduction", depth_split_space(), "random-search")
        .with_n_iter(7)
        .with_parallelism(Parallelism::Fixed(3))
        .with_memory(MemoryPolicy::None)
        .with_seed(11);
    let handle = coordinator.submit(config, objective).unwrap();
    let result = coordinator.run(&handle, None).unwrap();

    let observed_max = result
        .workers
        .iter()
        .flat_map(|w| w.history.iter())
        .map(|s| s.score)
        .fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(result.best_score, observed_max);
    assert_eq!(result.total_evaluations(), 21);
}

#[test]
fn time_budget_terminates_long_tasks() {
    init_tracing();
    let objective: ObjectiveFn = Arc::new(|_| {
        std::thread::sleep(std::time::Duration::from_millis(5));
        Ok(1.0)
    });

    let mut coordinator = Coordinator::new(2);
    let config = TaskConfig::new("budgeted", depth_split_space(), "random-search")
        .with_n_iter(100_000)
        .with_parallelism(Parallelism::Fixed(2))
        .with_memory(MemoryPolicy::None)
        .with_seed(1);
    let handle = coordinator.submit(config, objective).unwrap();

    let started = Instant::now();
    // 0.002 minutes = 120ms wall-clock ceiling.
    let result = coordinator.run(&handle, Some(0.002)).unwrap();
    let elapsed = started.elapsed();

    assert!(result.total_evaluations() < 100_000);
    // Ceiling plus at most one evaluation's overrun, with scheduling
    // slack.
    assert!(elapsed < std::time::Duration::from_secs(5));
}

#[test]
fn ephemeral_caches_are_private_per_worker() {
    init_tracing();
    // A single-cell space: every evaluation hits the same position.
    let space = SearchSpace::new().add_ints("only", [1]);
    let calls = Arc::new(AtomicUsize::new(0));

    let run = |memory: MemoryPolicy, calls: Arc<AtomicUsize>| {
        let objective: ObjectiveFn = Arc::new(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(0.0)
        });
        let mut coordinator = Coordinator::new(2);
        let config = TaskConfig::new("single-cell", space.clone(), "random-search")
            .with_n_iter(4)
            .with_parallelism(Parallelism::Fixed(2))
            .with_memory(memory)
            .with_seed(2);
        let handle = coordinator.submit(config, objective).unwrap();
        coordinator.run(&handle, None).unwrap();
    };

    run(MemoryPolicy::Ephemeral, Arc::clone(&calls));
    // Two workers, each computing the lone position once.
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    calls.store(0, Ordering::SeqCst);
    run(MemoryPolicy::None, Arc::clone(&calls));
    // No memoization: 2 workers x 4 iterations.
    assert_eq!(calls.load(Ordering::SeqCst), 8);
}

#[test]
fn persisted_cache_is_shared_and_survives_runs() {
    init_tracing();
    let space = SearchSpace::new().add_ints("only", [1]);
    let dir = tempfile::tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let run = |calls: Arc<AtomicUsize>| {
        let objective: ObjectiveFn = Arc::new(move |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(0.5)
        });
        let mut coordinator = Coordinator::new(2);
        let config = TaskConfig::new("persist-me", space.clone(), "random-search")
            .with_n_iter(4)
            .with_parallelism(Parallelism::Fixed(2))
            .with_memory(MemoryPolicy::Persisted {
                dir: dir.path().to_path_buf(),
            })
            .with_seed(2);
        let handle = coordinator.submit(config, objective).unwrap();
        coordinator.run(&handle, None).unwrap()
    };

    let first = run(Arc::clone(&calls));
    // Shared store: the lone position is computed once across both
    // workers.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.best_score, 0.5);

    let second = run(Arc::clone(&calls));
    // Second run hydrates from disk and never recomputes.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(second.best_score, 0.5);
}

#[test]
fn auto_parallelism_uses_every_slot_and_no_more() {
    init_tracing();
    let mut coordinator = Coordinator::new(2);
    let config = TaskConfig::new("auto", depth_split_space(), "random-search")
        .with_n_iter(3)
        .with_parallelism(Parallelism::Auto)
        .with_seed(4);
    let handle = coordinator.submit(config, depth_minus_split()).unwrap();
    let result = coordinator.run(&handle, None).unwrap();
    assert_eq!(result.workers.len(), 2);

    let mut coordinator = Coordinator::new(2);
    let config = TaskConfig::new("greedy", depth_split_space(), "random-search")
        .with_n_iter(3)
        .with_parallelism(Parallelism::Fixed(64))
        .with_seed(4);
    let handle = coordinator.submit(config, depth_minus_split()).unwrap();
    let result = coordinator.run(&handle, None).unwrap();
    assert_eq!(result.workers.len(), 2);
}

#[test]
fn cancellation_stops_workers_at_the_next_boundary() {
    init_tracing();
    let mut coordinator = Coordinator::new(2);
    let config = TaskConfig::new("cancelled", depth_split_space(), "random-search")
        .with_n_iter(100_000)
        .with_parallelism(Parallelism::Fixed(2))
        .with_memory(MemoryPolicy::None)
        .with_seed(6);
    let handle = coordinator.submit(config, depth_minus_split()).unwrap();

    // Cancel before running: every worker stops after its first
    // iteration.
    coordinator.cancel_token(&handle).unwrap().cancel();
    let result = coordinator.run(&handle, None).unwrap();

    assert_eq!(result.failed_workers, 0);
    assert_eq!(result.total_evaluations(), 2);
}

#[test]
fn run_all_reports_every_task() {
    init_tracing();
    let mut coordinator = Coordinator::new(2);

    let good = TaskConfig::new("good", depth_split_space(), "hill-climbing")
        .with_n_iter(10)
        .with_seed(8);
    coordinator.submit(good, depth_minus_split()).unwrap();

    let doomed = TaskConfig::new("doomed", depth_split_space(), "hill-climbing")
        .with_n_iter(10)
        .with_seed(8);
    let broken: ObjectiveFn = Arc::new(|_| Err("broken".into()));
    coordinator.submit(doomed, broken).unwrap();

    let outcomes = coordinator.run_all(None);
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].is_ok());
    assert!(outcomes[1].is_err());
}

#[test]
fn timing_diagnostics_cover_every_evaluation() {
    init_tracing();
    let mut coordinator = Coordinator::new(2);
    let config = TaskConfig::new("timing", depth_split_space(), "simulated-annealing")
        .with_n_iter(6)
        .with_parallelism(Parallelism::Fixed(2))
        .with_seed(10);
    let handle = coordinator.submit(config, depth_minus_split()).unwrap();
    let result = coordinator.run(&handle, None).unwrap();

    assert_eq!(result.eval_times.len(), 12);
    assert_eq!(result.iter_times.len(), 12);
    for (eval, iter) in result.eval_times.iter().zip(&result.iter_times) {
        assert!(iter >= eval);
    }
}

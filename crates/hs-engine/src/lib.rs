//! HyperSift orchestration engine.
//!
//! Callers register search tasks (objective closure, discrete search
//! space, iteration budget, strategy, parallelism, memoization policy)
//! against a [`Coordinator`] and run them under a wall-clock budget:
//!
//! ```
//! use std::sync::Arc;
//! use hs_engine::Coordinator;
//! use hs_types::{ObjectiveFn, Parallelism, SearchSpace, TaskConfig};
//!
//! let space = SearchSpace::new()
//!     .add_ints("depth", 1..=4)
//!     .add_ints("split", [2, 4, 6]);
//!
//! let objective: ObjectiveFn = Arc::new(|values| {
//!     let depth = values["depth"].as_i64().unwrap() as f64;
//!     let split = values["split"].as_i64().unwrap() as f64;
//!     Ok(depth - split)
//! });
//!
//! let mut coordinator = Coordinator::new(2);
//! let config = TaskConfig::new("demo", space, "hill-climbing")
//!     .with_n_iter(25)
//!     .with_parallelism(Parallelism::Auto)
//!     .with_seed(7);
//! let handle = coordinator.submit(config, objective).unwrap();
//! let result = coordinator.run(&handle, None).unwrap();
//! assert_eq!(result.failed_workers, 0);
//! assert!(result.best_score <= 2.0); // depth=4, split=2 is the optimum
//! ```

pub mod cache;
pub mod codec;
pub mod coordinator;
pub mod worker;

pub use cache::{CacheStats, EvaluationCache, PersistedStore};
pub use codec::PositionCodec;
pub use coordinator::{CancelToken, Coordinator, TaskHandle};
pub use worker::{RunClock, SearchWorker};

//! Minimal end-to-end run: tune two tree hyperparameters against a toy
//! objective on every available slot.
//!
//! Run with: cargo run --example quickstart

use std::sync::Arc;

use hs_engine::Coordinator;
use hs_types::{MemoryPolicy, ObjectiveFn, Parallelism, SearchSpace, TaskConfig};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let space = SearchSpace::new()
        .add_ints("max_depth", 1..=10)
        .add_ints("min_samples_split", [2, 4, 6, 8])
        .add_dimension(
            "criterion",
            vec![serde_json::json!("gini"), serde_json::json!("entropy")],
        );

    // Stand-in for an expensive model-training call.
    let objective: ObjectiveFn = Arc::new(|values| {
        let depth = values["max_depth"].as_i64().unwrap() as f64;
        let split = values["min_samples_split"].as_i64().unwrap() as f64;
        let bonus = if values["criterion"] == "entropy" { 0.5 } else { 0.0 };
        Ok(depth - 0.3 * split + bonus)
    });

    let mut coordinator = Coordinator::new(4);
    let config = TaskConfig::new("tree-tuning", space, "simulated-annealing")
        .with_n_iter(50)
        .with_parallelism(Parallelism::Auto)
        .with_memory(MemoryPolicy::Ephemeral)
        .with_seed(42);

    let handle = coordinator.submit(config, objective)?;
    let result = coordinator.run(&handle, Some(1.0))?;

    println!("best score: {:.3}", result.best_score);
    println!("best values: {:#?}", result.best_values);
    println!(
        "evaluations: {} across {} workers ({} failed), {:.3}s",
        result.total_evaluations(),
        result.workers.len(),
        result.failed_workers,
        result.duration_secs()
    );
    Ok(())
}

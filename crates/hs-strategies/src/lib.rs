//! Local-search strategy contract and the static strategy registry.
//!
//! The engine drives a strategy through a fixed protocol: it asks for the
//! strategy's initial positions one by one, then for one candidate per
//! iteration, reporting each score back via [`Strategy::evaluate`]. The
//! engine never inspects strategy internals beyond this contract, so any
//! local-search family can be substituted without touching the core.

pub mod annealing;
pub mod hill_climbing;
pub mod random_search;
pub mod restart;

use serde::{Deserialize, Serialize};

use hs_types::{ConfigError, ObjectiveDirection, Position};

pub use annealing::SimulatedAnnealing;
pub use hill_climbing::HillClimbing;
pub use random_search::RandomSearch;
pub use restart::RandomRestartHillClimbing;

/// One local-search algorithm driven by a single worker.
///
/// Call order per worker: `init_pos(0..init_count)` interleaved with
/// `evaluate`, then `iterate(step)` interleaved with `evaluate` until the
/// iteration budget runs out. `evaluate` always refers to the most
/// recently returned position.
pub trait Strategy: Send {
    /// Number of initial positions this strategy consumes before
    /// iterating. Strategy-defined, at least 1.
    fn init_count(&self) -> usize;

    /// The nth initial position.
    fn init_pos(&mut self, nth: usize) -> Position;

    /// The next candidate position given the running iteration count.
    fn iterate(&mut self, step: usize) -> Position;

    /// Report the score of the most recently returned position back into
    /// the strategy's internal state.
    fn evaluate(&mut self, score: f64);
}

/// Everything a strategy constructor gets to see: the per-dimension value
/// counts (never the values themselves), the resolved initial positions,
/// a deterministic seed, and the optimization direction.
#[derive(Debug, Clone)]
pub struct StrategyContext {
    pub dim_sizes: Vec<usize>,
    pub init_positions: Vec<Position>,
    pub seed: u64,
    pub direction: ObjectiveDirection,
}

/// Statically enumerated strategy registry. Identifiers are resolved at
/// task-submission time; unknown names are a configuration error before
/// any work starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    HillClimbing,
    RandomSearch,
    SimulatedAnnealing,
    RandomRestartHillClimbing,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::HillClimbing,
        StrategyKind::RandomSearch,
        StrategyKind::SimulatedAnnealing,
        StrategyKind::RandomRestartHillClimbing,
    ];

    pub fn identifier(&self) -> &'static str {
        match self {
            Self::HillClimbing => "hill-climbing",
            Self::RandomSearch => "random-search",
            Self::SimulatedAnnealing => "simulated-annealing",
            Self::RandomRestartHillClimbing => "random-restart-hill-climbing",
        }
    }

    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.identifier() == name)
            .ok_or_else(|| ConfigError::UnknownStrategy {
                name: name.to_string(),
            })
    }

    /// How many initial positions the strategy consumes. The iteration
    /// budget must cover at least this many evaluations.
    pub fn init_positions_required(&self) -> usize {
        match self {
            Self::HillClimbing
            | Self::RandomSearch
            | Self::SimulatedAnnealing
            | Self::RandomRestartHillClimbing => 1,
        }
    }

    pub fn build(&self, ctx: StrategyContext) -> Box<dyn Strategy> {
        match self {
            Self::HillClimbing => Box::new(HillClimbing::new(ctx)),
            Self::RandomSearch => Box::new(RandomSearch::new(ctx)),
            Self::SimulatedAnnealing => Box::new(SimulatedAnnealing::new(ctx)),
            Self::RandomRestartHillClimbing => Box::new(RandomRestartHillClimbing::new(ctx)),
        }
    }
}

//! Hill climbing with periodic random restarts.

use hs_types::Position;

use crate::hill_climbing::HillClimbing;
use crate::random_search::RandomSearch;
use crate::{Strategy, StrategyContext};

const DEFAULT_RESTART_EVERY: usize = 10;

/// Greedy hill climbing that jumps to a fresh uniform-random position
/// every `restart_every` iterations, escaping local optima at the cost
/// of some exploitation.
pub struct RandomRestartHillClimbing {
    inner: HillClimbing,
    restart_every: usize,
    restarted: bool,
}

impl RandomRestartHillClimbing {
    pub fn new(ctx: StrategyContext) -> Self {
        Self {
            inner: HillClimbing::new(ctx),
            restart_every: DEFAULT_RESTART_EVERY,
            restarted: false,
        }
    }
}

impl Strategy for RandomRestartHillClimbing {
    fn init_count(&self) -> usize {
        self.inner.init_count()
    }

    fn init_pos(&mut self, nth: usize) -> Position {
        self.inner.init_pos(nth)
    }

    fn iterate(&mut self, step: usize) -> Position {
        if step % self.restart_every == 0 {
            let dim_sizes = self.inner.dim_sizes().to_vec();
            let pos = RandomSearch::sample(&dim_sizes, self.inner.rng_mut());
            self.inner.force_restart(pos.clone());
            self.restarted = true;
            pos
        } else {
            self.restarted = false;
            self.inner.propose_neighbor()
        }
    }

    fn evaluate(&mut self, score: f64) {
        // A restart position becomes the new incumbent unconditionally;
        // force_restart cleared the old one so the greedy rule does that.
        self.inner.accept_if_better(score);
    }
}

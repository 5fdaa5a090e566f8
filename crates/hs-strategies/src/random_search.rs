//! Independent uniform sampling, one fresh position per iteration.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use hs_types::Position;

use crate::{Strategy, StrategyContext};

pub struct RandomSearch {
    dim_sizes: Vec<usize>,
    init_positions: Vec<Position>,
    rng: ChaCha8Rng,
}

impl RandomSearch {
    pub fn new(ctx: StrategyContext) -> Self {
        Self {
            dim_sizes: ctx.dim_sizes,
            init_positions: ctx.init_positions,
            rng: ChaCha8Rng::seed_from_u64(ctx.seed),
        }
    }

    pub(crate) fn sample(dim_sizes: &[usize], rng: &mut ChaCha8Rng) -> Position {
        Position::new(dim_sizes.iter().map(|&size| rng.gen_range(0..size)).collect())
    }
}

impl Strategy for RandomSearch {
    fn init_count(&self) -> usize {
        self.init_positions.len()
    }

    fn init_pos(&mut self, nth: usize) -> Position {
        self.init_positions[nth].clone()
    }

    fn iterate(&mut self, _step: usize) -> Position {
        Self::sample(&self.dim_sizes, &mut self.rng)
    }

    // Random search has no state to feed back into.
    fn evaluate(&mut self, _score: f64) {}
}

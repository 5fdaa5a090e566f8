//! Simulated annealing on the hill-climbing neighborhood.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use hs_types::{ObjectiveDirection, Position};

use crate::hill_climbing::neighbor;
use crate::{Strategy, StrategyContext};

const DEFAULT_START_TEMP: f64 = 1.0;
const DEFAULT_COOLING: f64 = 0.97;

/// Hill climbing that sometimes accepts a worse move, with the
/// acceptance probability decaying under a geometric cooling schedule.
pub struct SimulatedAnnealing {
    dim_sizes: Vec<usize>,
    init_positions: Vec<Position>,
    direction: ObjectiveDirection,
    rng: ChaCha8Rng,
    incumbent: Option<(Position, f64)>,
    last_proposed: Option<Position>,
    temp: f64,
    cooling: f64,
}

impl SimulatedAnnealing {
    pub fn new(ctx: StrategyContext) -> Self {
        Self {
            dim_sizes: ctx.dim_sizes,
            init_positions: ctx.init_positions,
            direction: ctx.direction,
            rng: ChaCha8Rng::seed_from_u64(ctx.seed),
            incumbent: None,
            last_proposed: None,
            temp: DEFAULT_START_TEMP,
            cooling: DEFAULT_COOLING,
        }
    }

    /// How much worse `score` is than the incumbent, normalized so that
    /// positive always means worse regardless of direction.
    fn deterioration(&self, score: f64, incumbent: f64) -> f64 {
        match self.direction {
            ObjectiveDirection::Maximize => incumbent - score,
            ObjectiveDirection::Minimize => score - incumbent,
        }
    }
}

impl Strategy for SimulatedAnnealing {
    fn init_count(&self) -> usize {
        self.init_positions.len()
    }

    fn init_pos(&mut self, nth: usize) -> Position {
        let pos = self.init_positions[nth].clone();
        self.last_proposed = Some(pos.clone());
        pos
    }

    fn iterate(&mut self, _step: usize) -> Position {
        let base = match &self.incumbent {
            Some((pos, _)) => pos.clone(),
            None => self.init_positions[0].clone(),
        };
        let proposed = neighbor(&base, &self.dim_sizes, &mut self.rng);
        self.last_proposed = Some(proposed.clone());
        proposed
    }

    fn evaluate(&mut self, score: f64) {
        let proposed = match self.last_proposed.take() {
            Some(p) => p,
            None => return,
        };

        let accept = match &self.incumbent {
            None => true,
            Some((_, best)) => {
                let worse_by = self.deterioration(score, *best);
                worse_by <= 0.0 || self.rng.gen::<f64>() < (-worse_by / self.temp).exp()
            }
        };
        if accept {
            self.incumbent = Some((proposed, score));
        }
        self.temp *= self.cooling;
    }
}

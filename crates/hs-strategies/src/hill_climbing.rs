//! Greedy hill climbing in index space.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use hs_types::{ObjectiveDirection, Position};

use crate::{Strategy, StrategyContext};

/// Draw a neighbor of `pos`: one randomly chosen dimension moved by a
/// small random step, clamped to the dimension's bounds. Shared by every
/// neighborhood-based strategy in this crate.
pub(crate) fn neighbor(pos: &Position, dim_sizes: &[usize], rng: &mut ChaCha8Rng) -> Position {
    let mut indices = pos.indices().to_vec();
    let dim = rng.gen_range(0..indices.len());
    let size = dim_sizes[dim];
    if size > 1 {
        let max_step = 3usize.min(size - 1);
        let step = rng.gen_range(1..=max_step) as i64;
        let cur = indices[dim] as i64;
        let next = if rng.gen_bool(0.5) { cur + step } else { cur - step };
        indices[dim] = next.clamp(0, size as i64 - 1) as usize;
    }
    Position::new(indices)
}

/// Classic hill climbing: perturb the incumbent, move only on strict
/// improvement.
pub struct HillClimbing {
    dim_sizes: Vec<usize>,
    init_positions: Vec<Position>,
    direction: ObjectiveDirection,
    rng: ChaCha8Rng,
    incumbent: Option<(Position, f64)>,
    last_proposed: Option<Position>,
}

impl HillClimbing {
    pub fn new(ctx: StrategyContext) -> Self {
        Self {
            dim_sizes: ctx.dim_sizes,
            init_positions: ctx.init_positions,
            direction: ctx.direction,
            rng: ChaCha8Rng::seed_from_u64(ctx.seed),
            incumbent: None,
            last_proposed: None,
        }
    }

    pub(crate) fn accept_if_better(&mut self, score: f64) {
        let proposed = match self.last_proposed.take() {
            Some(p) => p,
            None => return,
        };
        let improved = match &self.incumbent {
            None => true,
            Some((_, best)) => self.direction.improves(score, *best),
        };
        if improved {
            self.incumbent = Some((proposed, score));
        }
    }

    pub(crate) fn propose_neighbor(&mut self) -> Position {
        let base = match &self.incumbent {
            Some((pos, _)) => pos.clone(),
            // No score reported yet; fall back to the start position.
            None => self.init_positions[0].clone(),
        };
        let proposed = neighbor(&base, &self.dim_sizes, &mut self.rng);
        self.last_proposed = Some(proposed.clone());
        proposed
    }

    pub(crate) fn force_restart(&mut self, position: Position) {
        self.incumbent = None;
        self.last_proposed = Some(position);
    }

    pub(crate) fn dim_sizes(&self) -> &[usize] {
        &self.dim_sizes
    }

    pub(crate) fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }
}

impl Strategy for HillClimbing {
    fn init_count(&self) -> usize {
        self.init_positions.len()
    }

    fn init_pos(&mut self, nth: usize) -> Position {
        let pos = self.init_positions[nth].clone();
        self.last_proposed = Some(pos.clone());
        pos
    }

    fn iterate(&mut self, _step: usize) -> Position {
        self.propose_neighbor()
    }

    fn evaluate(&mut self, score: f64) {
        self.accept_if_better(score);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn strategy(direction: ObjectiveDirection) -> HillClimbing {
        HillClimbing::new(StrategyContext {
            dim_sizes: vec![10, 10],
            init_positions: vec![Position::new(vec![5, 5])],
            seed: 3,
            direction,
        })
    }

    #[test]
    fn keeps_incumbent_unless_score_improves() {
        let mut hc = strategy(ObjectiveDirection::Maximize);
        hc.init_pos(0);
        hc.evaluate(10.0);
        let incumbent = hc.incumbent.clone().unwrap();
        assert_eq!(incumbent.1, 10.0);

        hc.iterate(1);
        hc.evaluate(5.0); // worse, rejected
        assert_eq!(hc.incumbent.as_ref().unwrap().1, 10.0);

        hc.iterate(2);
        hc.evaluate(12.0); // better, accepted
        assert_eq!(hc.incumbent.as_ref().unwrap().1, 12.0);
    }

    #[test]
    fn minimize_direction_flips_acceptance() {
        let mut hc = strategy(ObjectiveDirection::Minimize);
        hc.init_pos(0);
        hc.evaluate(10.0);

        hc.iterate(1);
        hc.evaluate(3.0);
        assert_eq!(hc.incumbent.as_ref().unwrap().1, 3.0);

        hc.iterate(2);
        hc.evaluate(8.0);
        assert_eq!(hc.incumbent.as_ref().unwrap().1, 3.0);
    }

    #[test]
    fn neighbor_moves_exactly_one_dimension() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let base = Position::new(vec![5, 5, 5]);
        for _ in 0..100 {
            let n = neighbor(&base, &[10, 10, 10], &mut rng);
            let moved = n
                .indices()
                .iter()
                .zip(base.indices())
                .filter(|(a, b)| a != b)
                .count();
            assert!(moved <= 1);
            for (idx, size) in n.indices().iter().zip(&[10usize, 10, 10]) {
                assert!(idx < size);
            }
        }
    }

    #[test]
    fn neighbor_handles_single_value_dimensions() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let base = Position::new(vec![0, 0]);
        for _ in 0..20 {
            let n = neighbor(&base, &[1, 1], &mut rng);
            assert_eq!(n.indices(), &[0, 0]);
        }
    }
}

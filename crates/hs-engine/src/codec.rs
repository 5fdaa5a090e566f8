//! Translation between caller-meaningful values and compact coordinates.
//!
//! Index space (cheap, hashable) feeds the cache and the strategy
//! mechanics; value space feeds the objective function. The codec is the
//! only component that crosses between the two.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

use hs_types::{EncodingError, Fingerprint, Position, SearchSpace, ValuesMap};

/// Pure, stateless conversion layer over one immutable search space.
#[derive(Debug, Clone)]
pub struct PositionCodec {
    space: Arc<SearchSpace>,
}

impl PositionCodec {
    pub fn new(space: Arc<SearchSpace>) -> Self {
        Self { space }
    }

    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    /// Uniformly random index per dimension, reproducible given a seeded
    /// random source.
    pub fn random_position(&self, rng: &mut ChaCha8Rng) -> Position {
        Position::new(
            self.space
                .dimensions()
                .iter()
                .map(|dim| rng.gen_range(0..dim.len()))
                .collect(),
        )
    }

    /// Resolve a worker's starting position: the requested values if the
    /// caller supplied any for this worker, a random position otherwise.
    pub fn resolve_start_position(
        &self,
        requested: Option<&ValuesMap>,
        rng: &mut ChaCha8Rng,
    ) -> Result<Position, EncodingError> {
        match requested {
            Some(values) => self.encode(values),
            None => Ok(self.random_position(rng)),
        }
    }

    /// Look up each value's index in its dimension's value list.
    pub fn encode(&self, values: &ValuesMap) -> Result<Position, EncodingError> {
        for name in values.keys() {
            if self.space.dimension(name).is_none() {
                return Err(EncodingError::UnknownDimension { name: name.clone() });
            }
        }
        let mut indices = Vec::with_capacity(self.space.len());
        for dim in self.space.dimensions() {
            let value = values
                .get(&dim.name)
                .ok_or_else(|| EncodingError::MissingDimension {
                    name: dim.name.clone(),
                })?;
            indices.push(dim.index_of(value)?);
        }
        Ok(Position::new(indices))
    }

    /// Inverse of [`encode`](Self::encode).
    pub fn decode(&self, position: &Position) -> Result<ValuesMap, EncodingError> {
        self.check_arity(position.len())?;
        let mut values = ValuesMap::with_capacity(self.space.len());
        for (dim, &index) in self.space.dimensions().iter().zip(position.indices()) {
            let value =
                dim.values
                    .get(index)
                    .ok_or_else(|| EncodingError::IndexOutOfBounds {
                        dimension: dim.name.clone(),
                        index,
                        len: dim.len(),
                    })?;
            values.insert(dim.name.clone(), value.clone());
        }
        Ok(values)
    }

    /// A position's coordinate vector in canonical dimension order.
    pub fn to_vector(&self, position: &Position) -> Result<Vec<usize>, EncodingError> {
        self.check_arity(position.len())?;
        Ok(position.indices().to_vec())
    }

    /// Rebuild a position from a coordinate vector.
    pub fn from_vector(&self, vector: Vec<usize>) -> Result<Position, EncodingError> {
        self.check_arity(vector.len())?;
        for (dim, &index) in self.space.dimensions().iter().zip(&vector) {
            if index >= dim.len() {
                return Err(EncodingError::IndexOutOfBounds {
                    dimension: dim.name.clone(),
                    index,
                    len: dim.len(),
                });
            }
        }
        Ok(Position::new(vector))
    }

    /// Canonical, order-independent cache key: sorted-by-name
    /// `name=index` pairs.
    pub fn fingerprint(&self, position: &Position) -> Result<Fingerprint, EncodingError> {
        self.check_arity(position.len())?;
        let mut pairs: Vec<(&str, usize)> = self
            .space
            .dimensions()
            .iter()
            .zip(position.indices())
            .map(|(dim, &index)| (dim.name.as_str(), index))
            .collect();
        pairs.sort_by_key(|(name, _)| *name);
        Ok(pairs
            .iter()
            .map(|(name, index)| format!("{name}={index}"))
            .collect::<Vec<_>>()
            .join(";"))
    }

    fn check_arity(&self, got: usize) -> Result<(), EncodingError> {
        if got != self.space.len() {
            return Err(EncodingError::DimensionMismatch {
                expected: self.space.len(),
                got,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use serde_json::json;

    fn codec() -> PositionCodec {
        let space = SearchSpace::new()
            .add_ints("depth", 1..=4)
            .add_ints("split", [2, 4, 6])
            .add_dimension("criterion", vec![json!("gini"), json!("entropy")]);
        PositionCodec::new(Arc::new(space))
    }

    #[test]
    fn encode_decode_round_trip() {
        let codec = codec();
        let mut values = ValuesMap::new();
        values.insert("depth".into(), json!(3));
        values.insert("split".into(), json!(6));
        values.insert("criterion".into(), json!("entropy"));

        let pos = codec.encode(&values).unwrap();
        assert_eq!(pos.indices(), &[2, 2, 1]);
        assert_eq!(codec.decode(&pos).unwrap(), values);
    }

    #[test]
    fn vector_round_trip() {
        let codec = codec();
        let pos = codec.from_vector(vec![1, 0, 1]).unwrap();
        assert_eq!(codec.to_vector(&pos).unwrap(), vec![1, 0, 1]);
    }

    #[test]
    fn from_vector_rejects_wrong_arity() {
        let codec = codec();
        let err = codec.from_vector(vec![0, 0]).unwrap_err();
        assert!(matches!(
            err,
            EncodingError::DimensionMismatch {
                expected: 3,
                got: 2
            }
        ));
    }

    #[test]
    fn from_vector_rejects_out_of_bounds_index() {
        let codec = codec();
        let err = codec.from_vector(vec![0, 3, 0]).unwrap_err();
        assert!(matches!(err, EncodingError::IndexOutOfBounds { .. }));
    }

    #[test]
    fn encode_rejects_absent_value() {
        let codec = codec();
        let mut values = ValuesMap::new();
        values.insert("depth".into(), json!(99));
        values.insert("split".into(), json!(2));
        values.insert("criterion".into(), json!("gini"));
        let err = codec.encode(&values).unwrap_err();
        assert!(matches!(err, EncodingError::ValueNotFound { .. }));
    }

    #[test]
    fn encode_rejects_unknown_dimension() {
        let codec = codec();
        let mut values = ValuesMap::new();
        values.insert("depth".into(), json!(1));
        values.insert("split".into(), json!(2));
        values.insert("criterion".into(), json!("gini"));
        values.insert("learning_rate".into(), json!(0.1));
        let err = codec.encode(&values).unwrap_err();
        assert!(matches!(err, EncodingError::UnknownDimension { .. }));
    }

    #[test]
    fn random_positions_stay_in_bounds() {
        let codec = codec();
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        for _ in 0..500 {
            let pos = codec.random_position(&mut rng);
            assert!(pos.indices()[0] < 4);
            assert!(pos.indices()[1] < 3);
            assert!(pos.indices()[2] < 2);
        }
    }

    #[test]
    fn random_positions_are_reproducible() {
        let codec = codec();
        let mut a = ChaCha8Rng::seed_from_u64(5);
        let mut b = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..20 {
            assert_eq!(codec.random_position(&mut a), codec.random_position(&mut b));
        }
    }

    #[test]
    fn fingerprint_is_declaration_order_independent() {
        let a = PositionCodec::new(Arc::new(
            SearchSpace::new()
                .add_ints("depth", [1, 2, 3])
                .add_ints("split", [2, 4]),
        ));
        let b = PositionCodec::new(Arc::new(
            SearchSpace::new()
                .add_ints("split", [2, 4])
                .add_ints("depth", [1, 2, 3]),
        ));

        // depth=2, split=4 in both declaration orders.
        let fp_a = a.fingerprint(&Position::new(vec![1, 1])).unwrap();
        let fp_b = b.fingerprint(&Position::new(vec![1, 1])).unwrap();
        assert_eq!(fp_a, fp_b);
        assert_eq!(fp_a, "depth=1;split=1");
    }

    #[test]
    fn start_position_falls_back_to_random() {
        let codec = codec();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let pos = codec.resolve_start_position(None, &mut rng).unwrap();
        assert_eq!(pos.len(), 3);

        let mut values = ValuesMap::new();
        values.insert("depth".into(), json!(4));
        values.insert("split".into(), json!(2));
        values.insert("criterion".into(), json!("gini"));
        let anchored = codec
            .resolve_start_position(Some(&values), &mut rng)
            .unwrap();
        assert_eq!(anchored.indices(), &[3, 0, 0]);
    }
}

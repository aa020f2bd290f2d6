//! Space types: how an index scores a stored vector against a query

use crate::error::EngineError;
use crate::vector::StoredVector;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// The similarity/distance function used to rank vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpaceType {
    /// Cosine similarity, higher is more similar
    #[default]
    Cosine,
    /// Euclidean (L2) distance, lower is more similar
    Euclidean,
    /// Raw dot product, higher is more similar
    DotProduct,
}

impl SpaceType {
    /// Score `stored` against `query`. `query_norm` is the L2 norm of
    /// `query`, computed once per search by the caller.
    pub fn score(&self, query: &[f32], query_norm: f32, stored: &StoredVector) -> f32 {
        match self {
            SpaceType::Euclidean => stored.squared_l2(query).sqrt(),
            SpaceType::DotProduct => stored.dot(query),
            SpaceType::Cosine => {
                let denom = query_norm * stored.norm();
                if denom == 0.0 {
                    0.0
                } else {
                    stored.dot(query) / denom
                }
            }
        }
    }

    pub fn higher_is_better(&self) -> bool {
        !matches!(self, SpaceType::Euclidean)
    }

    /// Map a score onto a key where lower always ranks first. Negation is
    /// exact, so `score_from_key(rank_key(s)) == s`.
    pub fn rank_key(&self, score: f32) -> f32 {
        if self.higher_is_better() {
            -score
        } else {
            score
        }
    }

    pub fn score_from_key(&self, key: f32) -> f32 {
        self.rank_key(key)
    }

    /// Order two scores best first.
    pub fn compare(&self, a: f32, b: f32) -> Ordering {
        self.rank_key(a).total_cmp(&self.rank_key(b))
    }
}

impl FromStr for SpaceType {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(SpaceType::Cosine),
            "euclidean" | "l2" => Ok(SpaceType::Euclidean),
            "dot_product" | "dot" | "ip" => Ok(SpaceType::DotProduct),
            other => Err(EngineError::invalid(format!(
                "unrecognized space type '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for SpaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpaceType::Cosine => f.write_str("cosine"),
            SpaceType::Euclidean => f.write_str("euclidean"),
            SpaceType::DotProduct => f.write_str("dot_product"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{Precision, Vector};
    use approx::assert_relative_eq;

    fn stored(data: Vec<f32>) -> StoredVector {
        StoredVector::encode(&Vector::new(data), Precision::Float32)
    }

    fn score(space: SpaceType, q: Vec<f32>, s: Vec<f32>) -> f32 {
        let q = Vector::new(q);
        space.score(q.as_slice(), q.norm(), &stored(s))
    }

    #[test]
    fn test_euclidean() {
        let d = score(SpaceType::Euclidean, vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]);
        assert_relative_eq!(d, 5.196152, epsilon = 1e-5);
    }

    #[test]
    fn test_euclidean_same_vector() {
        let d = score(SpaceType::Euclidean, vec![1.0, 2.0, 3.0], vec![1.0, 2.0, 3.0]);
        assert_relative_eq!(d, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_dot_product() {
        let d = score(SpaceType::DotProduct, vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]);
        assert_relative_eq!(d, 32.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cosine() {
        assert_relative_eq!(
            score(SpaceType::Cosine, vec![1.0, 0.0], vec![2.0, 0.0]),
            1.0,
            epsilon = 1e-6
        );
        assert_relative_eq!(
            score(SpaceType::Cosine, vec![1.0, 0.0], vec![0.0, 1.0]),
            0.0,
            epsilon = 1e-6
        );
        assert_relative_eq!(
            score(SpaceType::Cosine, vec![1.0, 0.0], vec![-1.0, 0.0]),
            -1.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_cosine_zero_norm_is_zero() {
        assert_eq!(score(SpaceType::Cosine, vec![0.0, 0.0], vec![1.0, 0.0]), 0.0);
        assert_eq!(score(SpaceType::Cosine, vec![1.0, 0.0], vec![0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_ordering() {
        assert_eq!(SpaceType::Cosine.compare(0.9, 0.1), Ordering::Less);
        assert_eq!(SpaceType::Euclidean.compare(0.9, 0.1), Ordering::Greater);
        assert_eq!(SpaceType::DotProduct.score_from_key(SpaceType::DotProduct.rank_key(3.5)), 3.5);
    }

    #[test]
    fn test_parse() {
        assert_eq!("COSINE".parse::<SpaceType>().unwrap(), SpaceType::Cosine);
        assert_eq!("l2".parse::<SpaceType>().unwrap(), SpaceType::Euclidean);
        assert_eq!("ip".parse::<SpaceType>().unwrap(), SpaceType::DotProduct);
        assert!("manhattan".parse::<SpaceType>().is_err());
    }
}

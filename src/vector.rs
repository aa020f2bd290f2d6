//! Vector types: the `f32` query vector and the precision-encoded stored form

use crate::error::{EngineError, Result};
use half::f16;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A vector in n-dimensional space, always held at full `f32` precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    data: Vec<f32>,
}

impl Vector {
    /// Create a new vector from a Vec<f32>
    pub fn new(data: Vec<f32>) -> Self {
        Self { data }
    }

    /// Get the dimension of the vector
    pub fn dimension(&self) -> usize {
        self.data.len()
    }

    /// Get the underlying data as a slice
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.data
    }

    /// Compute the L2 norm (magnitude) of the vector
    pub fn norm(&self) -> f32 {
        self.data.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Whether every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /// Parse a vector from a comma-separated string
    pub fn parse_csv(s: &str) -> Result<Self> {
        let data: Result<Vec<f32>> = s
            .split(',')
            .map(|x| {
                x.trim()
                    .parse::<f32>()
                    .map_err(|_| EngineError::invalid(format!("Invalid float: {}", x)))
            })
            .collect();
        Ok(Vector::new(data?))
    }
}

impl From<Vec<f32>> for Vector {
    fn from(data: Vec<f32>) -> Self {
        Vector::new(data)
    }
}

/// Numeric width used to store vector components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Float32,
    Float16,
}

impl FromStr for Precision {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "float32" | "f32" => Ok(Precision::Float32),
            "float16" | "f16" => Ok(Precision::Float16),
            other => Err(EngineError::invalid(format!(
                "unrecognized precision '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::Float32 => f.write_str("float32"),
            Precision::Float16 => f.write_str("float16"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Components {
    F32(Box<[f32]>),
    F16(Box<[f16]>),
}

/// A vector as held by an index: components at the index precision plus
/// the cached norm of the stored (already rounded) values.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredVector {
    components: Components,
    norm: f32,
}

impl StoredVector {
    /// Encode a vector at the given precision.
    pub fn encode(vector: &Vector, precision: Precision) -> Self {
        let components = match precision {
            Precision::Float32 => Components::F32(vector.as_slice().into()),
            Precision::Float16 => Components::F16(
                vector
                    .as_slice()
                    .iter()
                    .map(|&x| f16::from_f32(x))
                    .collect(),
            ),
        };
        let mut stored = Self {
            components,
            norm: 0.0,
        };
        stored.norm = stored.dot(&stored.to_vec()).sqrt();
        stored
    }

    pub fn precision(&self) -> Precision {
        match self.components {
            Components::F32(_) => Precision::Float32,
            Components::F16(_) => Precision::Float16,
        }
    }

    pub fn dimension(&self) -> usize {
        match &self.components {
            Components::F32(c) => c.len(),
            Components::F16(c) => c.len(),
        }
    }

    pub fn norm(&self) -> f32 {
        self.norm
    }

    /// Decode back to `f32` components.
    pub fn to_vec(&self) -> Vec<f32> {
        match &self.components {
            Components::F32(c) => c.to_vec(),
            Components::F16(c) => c.iter().map(|x| x.to_f32()).collect(),
        }
    }

    pub fn to_vector(&self) -> Vector {
        Vector::new(self.to_vec())
    }

    /// Dot product with a full-precision query.
    pub fn dot(&self, query: &[f32]) -> f32 {
        match &self.components {
            Components::F32(c) => c.iter().zip(query).map(|(a, b)| a * b).sum(),
            Components::F16(c) => c.iter().zip(query).map(|(a, b)| a.to_f32() * b).sum(),
        }
    }

    /// Squared L2 distance to a full-precision query.
    pub fn squared_l2(&self, query: &[f32]) -> f32 {
        match &self.components {
            Components::F32(c) => c.iter().zip(query).map(|(a, b)| (a - b).powi(2)).sum(),
            Components::F16(c) => c
                .iter()
                .zip(query)
                .map(|(a, b)| (a.to_f32() - b).powi(2))
                .sum(),
        }
    }
}

//! Index schema: dimension, space type, precision and search backend,
//! fixed when an index is created.

use crate::distance::SpaceType;
use crate::error::{EngineError, Result};
use crate::flat_index::FlatIndex;
use crate::hnsw::{HnswIndex, HnswParams};
use crate::index::Index;
use crate::vector::Precision;
use serde::{Deserialize, Serialize};

/// Which similarity index backs a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    /// Exact brute-force scan.
    #[default]
    Flat,
    /// Approximate graph search.
    Hnsw(HnswParams),
}

impl IndexBackend {
    pub fn build(&self, space: SpaceType) -> Box<dyn Index> {
        match self {
            IndexBackend::Flat => Box::new(FlatIndex::new(space)),
            IndexBackend::Hnsw(params) => Box::new(HnswIndex::with_params(space, params.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub dimension: usize,
    pub space_type: SpaceType,
    pub precision: Precision,
    #[serde(default)]
    pub backend: IndexBackend,
}

impl IndexConfig {
    pub fn new(dimension: usize, space_type: SpaceType, precision: Precision) -> Self {
        Self {
            dimension,
            space_type,
            precision,
            backend: IndexBackend::Flat,
        }
    }

    /// Build a config from loosely typed request fields.
    pub fn parse(dimension: i64, space_type: &str, precision: &str) -> Result<Self> {
        let dimension = usize::try_from(dimension)
            .map_err(|_| EngineError::invalid(format!("dimension must be positive, got {}", dimension)))?;
        let config = Self::new(dimension, space_type.parse()?, precision.parse()?);
        config.validate()?;
        Ok(config)
    }

    pub fn with_backend(mut self, backend: IndexBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(EngineError::invalid("dimension must be positive, got 0"));
        }
        if let IndexBackend::Hnsw(params) = &self.backend {
            params.validate()?;
        }
        Ok(())
    }
}

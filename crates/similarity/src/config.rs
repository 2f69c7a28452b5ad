//! Tunable parameters of the similarity model.

use crate::error::{Result, SimilarityError};
use serde::{Deserialize, Serialize};

/// Number of neighbors that vote in a prediction unless configured otherwise
pub const DEFAULT_K_NEIGHBORS: usize = 40;

/// Additive shrinkage term in the similarity denominator
pub const SHRINKAGE_ALPHA: f64 = 4.0;

/// Pairs with fewer common raters than this get similarity 0
pub const MIN_SUPPORT: usize = 2;

/// Model configuration.
///
/// Deserializes from JSON with every field optional, e.g.
/// `{"k_neighbors": 20}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// How many of the most similar rated movies vote in a prediction
    pub k_neighbors: usize,

    /// Compute pair similarities on the rayon thread pool
    pub parallel: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            k_neighbors: DEFAULT_K_NEIGHBORS,
            parallel: true,
        }
    }
}

impl ModelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the neighbor count (default: 40)
    pub fn with_k_neighbors(mut self, k_neighbors: usize) -> Self {
        self.k_neighbors = k_neighbors;
        self
    }

    /// Configure parallel pair computation (default: true)
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_k_neighbors(self.k_neighbors)
    }
}

pub(crate) fn validate_k_neighbors(k_neighbors: usize) -> Result<()> {
    if k_neighbors == 0 {
        return Err(SimilarityError::InvalidParameter {
            param: "k_neighbors".to_string(),
            value: k_neighbors.to_string(),
            constraint: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

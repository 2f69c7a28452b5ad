//! Top-K neighbor rating prediction.
//!
//! ## Algorithm
//! For a request (user, movie):
//! 1. Take every movie the user rated, except the target itself
//! 2. Keep those whose similarity to the target is known and > 0
//! 3. Order by similarity (descending), then movie id (ascending), keep K
//! 4. Residual estimate = similarity-weighted mean of their residuals,
//!    or 0 if nothing survived step 2
//! 5. Prediction = baseline(user, movie) + residual estimate
//!
//! A request that ends up with no neighbors is not an error. It is counted
//! in the batch's `PredictionDiagnostics` and gets the plain baseline.

use crate::error::Result;
use crate::engine::SimilarityTable;
use crate::rating_index::RatingIndex;
use crate::traits::BaselineModel;
use crate::types::Neighbor;
use data_loader::{MovieId, PredictionRequest, UserId};
use std::cmp::Ordering;
use tracing::{info, instrument};

/// Estimate for one (user, movie) request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// `baseline + residual`
    pub rating: f64,
    pub baseline: f64,
    /// Weighted neighbor residual, 0 on fallback
    pub residual: f64,
    pub neighbors_used: usize,
}

impl Prediction {
    /// True if no neighbor voted and the rating is the baseline alone
    pub fn fell_back(&self) -> bool {
        self.neighbors_used == 0
    }
}

/// Per-batch statistics. Observational only, never feeds back into estimates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PredictionDiagnostics {
    pub total: usize,
    pub fallback_count: usize,
}

impl PredictionDiagnostics {
    pub fn record(&mut self, prediction: &Prediction) {
        self.total += 1;
        if prediction.fell_back() {
            self.fallback_count += 1;
        }
    }

    /// Share of baseline-only predictions in [0, 1]; 0 for an empty batch
    pub fn fallback_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.fallback_count as f64 / self.total as f64
        }
    }
}

/// Estimates for a batch, in request order, plus its diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionBatch {
    pub estimates: Vec<f64>,
    pub diagnostics: PredictionDiagnostics,
}

/// Read-only view over a fitted model's state.
pub struct Predictor<'a, B: BaselineModel + ?Sized> {
    index: &'a RatingIndex,
    table: &'a SimilarityTable,
    baseline: &'a B,
    k_neighbors: usize,
}

impl<'a, B: BaselineModel + ?Sized> Predictor<'a, B> {
    pub fn new(
        index: &'a RatingIndex,
        table: &'a SimilarityTable,
        baseline: &'a B,
        k_neighbors: usize,
    ) -> Self {
        Self {
            index,
            table,
            baseline,
            k_neighbors,
        }
    }

    pub fn k_neighbors(&self) -> usize {
        self.k_neighbors
    }

    /// The top-K rated movies that vote for `movie_id`, best first.
    ///
    /// Empty for an unknown user or when nothing the user rated has a
    /// positive similarity to the target.
    pub fn neighbors(&self, user_id: UserId, movie_id: MovieId) -> Vec<Neighbor> {
        let Some(ratings) = self.index.user_ratings(user_id) else {
            return Vec::new();
        };

        let mut candidates: Vec<Neighbor> = ratings
            .iter()
            .filter(|&(&other, _)| other != movie_id)
            .filter_map(|(&other, &residual)| {
                self.table
                    .get(movie_id, other)
                    .positive()
                    .map(|similarity| Neighbor {
                        movie_id: other,
                        similarity,
                        residual,
                    })
            })
            .collect();

        let k = self.k_neighbors;
        if candidates.len() > k {
            if k == 0 {
                return Vec::new();
            }
            candidates.select_nth_unstable_by(k - 1, by_rank);
            candidates.truncate(k);
        }
        candidates.sort_unstable_by(by_rank);
        candidates
    }

    /// Predict the rating `user_id` would give `movie_id`.
    pub fn predict_rating(&self, user_id: UserId, movie_id: MovieId) -> Result<Prediction> {
        let baseline = self.baseline.predict_baseline_rating(user_id, movie_id)?;
        let neighbors = self.neighbors(user_id, movie_id);

        let residual = if neighbors.is_empty() {
            0.0
        } else {
            let mut product_sum = 0.0;
            let mut similarity_sum = 0.0;
            for neighbor in &neighbors {
                product_sum += neighbor.similarity * neighbor.residual;
                similarity_sum += neighbor.similarity;
            }
            product_sum / similarity_sum
        };

        Ok(Prediction {
            user_id,
            movie_id,
            rating: baseline + residual,
            baseline,
            residual,
            neighbors_used: neighbors.len(),
        })
    }

    /// Predict every request in order with a fresh diagnostics counter.
    #[instrument(skip_all, fields(requests = requests.len(), k = self.k_neighbors))]
    pub fn predict(&self, requests: &[PredictionRequest]) -> Result<PredictionBatch> {
        let mut batch = PredictionBatch {
            estimates: Vec::with_capacity(requests.len()),
            diagnostics: PredictionDiagnostics::default(),
        };

        for request in requests {
            let prediction = self.predict_rating(request.user_id, request.movie_id)?;
            batch.diagnostics.record(&prediction);
            batch.estimates.push(prediction.rating);
        }

        info!(
            "used baseline predictions: {:.1}% ({} of {})",
            100.0 * batch.diagnostics.fallback_rate(),
            batch.diagnostics.fallback_count,
            batch.diagnostics.total
        );
        Ok(batch)
    }
}

/// Higher similarity first, then lower movie id
fn by_rank(a: &Neighbor, b: &Neighbor) -> Ordering {
    b.similarity
        .total_cmp(&a.similarity)
        .then(a.movie_id.cmp(&b.movie_id))
}

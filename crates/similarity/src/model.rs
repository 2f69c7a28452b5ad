//! # Movie Similarity Model
//!
//! Item-based collaborative filtering on top of a baseline estimator:
//!
//! `fit`:
//! 1. Fit the baseline on the raw ratings
//! 2. Turn every rating into a residual against the baseline
//! 3. Build the `RatingIndex` from the residuals
//! 4. Compute the `SimilarityTable` over all movie pairs
//!
//! `predict`:
//! - `Predictor` over the frozen index and table, plus the baseline
//!
//! Fitting is all-or-nothing: if any step fails the model is left unfitted.

use crate::baseline::BaselineEffectsModel;
use crate::config::{ModelConfig, validate_k_neighbors};
use crate::engine::{SimilarityEngine, SimilarityTable};
use crate::error::{Result, SimilarityError};
use crate::predictor::{Prediction, PredictionBatch, Predictor};
use crate::rating_index::RatingIndex;
use crate::traits::BaselineModel;
use crate::types::Similarity;
use data_loader::{MovieId, PredictionRequest, Rating, UserId};
use std::time::Instant;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
struct FittedState {
    index: RatingIndex,
    table: SimilarityTable,
}

/// Rating predictor: baseline estimate plus a top-K similar-movie vote.
#[derive(Debug, Clone)]
pub struct MovieSimilarityModel<B: BaselineModel = BaselineEffectsModel> {
    config: ModelConfig,
    baseline: B,
    state: Option<FittedState>,
}

impl MovieSimilarityModel<BaselineEffectsModel> {
    /// Default configuration with a `BaselineEffectsModel`
    pub fn new() -> Self {
        Self {
            config: ModelConfig::default(),
            baseline: BaselineEffectsModel::new(),
            state: None,
        }
    }

    pub fn with_config(config: ModelConfig) -> Result<Self> {
        Self::with_baseline(config, BaselineEffectsModel::new())
    }
}

impl Default for MovieSimilarityModel<BaselineEffectsModel> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: BaselineModel> MovieSimilarityModel<B> {
    /// Use a custom baseline collaborator
    pub fn with_baseline(config: ModelConfig, baseline: B) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            baseline,
            state: None,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn baseline(&self) -> &B {
        &self.baseline
    }

    pub fn k_neighbors(&self) -> usize {
        self.config.k_neighbors
    }

    /// Change the neighbor count for later predictions.
    ///
    /// Similarities are not recomputed; the new K applies from the next
    /// prediction on.
    pub fn set_k_neighbors(&mut self, k_neighbors: usize) -> Result<()> {
        validate_k_neighbors(k_neighbors)?;
        self.config.k_neighbors = k_neighbors;
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// Train on (user, movie, rating) rows. Timestamps are ignored.
    #[instrument(skip_all, fields(ratings = ratings.len(), baseline = self.baseline.name()))]
    pub fn fit(&mut self, ratings: &[Rating]) -> Result<&mut Self> {
        self.state = None;
        let start = Instant::now();

        if ratings.is_empty() {
            return Err(SimilarityError::EmptyTrainingSet);
        }
        if let Some(bad) = ratings.iter().find(|r| !r.rating.is_finite()) {
            return Err(SimilarityError::InvalidRating {
                user_id: bad.user_id,
                movie_id: bad.movie_id,
                value: bad.rating as f64,
            });
        }

        let phase = Instant::now();
        self.baseline.fit(ratings)?;
        let residuals = self.baseline.create_modified_ratings(ratings)?;
        info!("Fitted {} in {:.2?}", self.baseline.name(), phase.elapsed());

        let phase = Instant::now();
        let index = RatingIndex::build(&residuals)?;
        info!(
            "Indexed {} ratings ({} users, {} movies) in {:.2?}",
            index.rating_count(),
            index.user_count(),
            index.movie_count(),
            phase.elapsed()
        );

        let table = SimilarityEngine::new()
            .with_parallel(self.config.parallel)
            .compute_all(&index);

        info!("fit finished in {:.2?}", start.elapsed());
        self.state = Some(FittedState { index, table });
        Ok(self)
    }

    fn state(&self) -> Result<&FittedState> {
        self.state.as_ref().ok_or(SimilarityError::NotFitted)
    }

    /// Predictor over the fitted state with the current K
    pub fn predictor(&self) -> Result<Predictor<'_, B>> {
        let state = self.state()?;
        Ok(Predictor::new(
            &state.index,
            &state.table,
            &self.baseline,
            self.config.k_neighbors,
        ))
    }

    /// One estimate per request, same order, with batch diagnostics.
    pub fn predict(&self, requests: &[PredictionRequest]) -> Result<PredictionBatch> {
        self.predictor()?.predict(requests)
    }

    pub fn predict_rating(&self, user_id: UserId, movie_id: MovieId) -> Result<Prediction> {
        self.predictor()?.predict_rating(user_id, movie_id)
    }

    /// Similarity of two movies as stored by `fit`
    pub fn similarity(&self, movie_a: MovieId, movie_b: MovieId) -> Result<Similarity> {
        Ok(self.state()?.table.get(movie_a, movie_b))
    }

    /// Movies most similar to `movie_id`, best first
    pub fn most_similar(&self, movie_id: MovieId, limit: usize) -> Result<Vec<(MovieId, f64)>> {
        Ok(self.state()?.table.most_similar(movie_id, limit))
    }

    pub fn rating_index(&self) -> Result<&RatingIndex> {
        Ok(&self.state()?.index)
    }

    pub fn similarity_table(&self) -> Result<&SimilarityTable> {
        Ok(&self.state()?.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_ratings() -> Vec<Rating> {
        let mut ratings = Vec::new();
        for user_id in 1..=6 {
            let offset = (user_id % 3) as f32 * 0.5;
            ratings.push(Rating::new(user_id, 1, 3.0 + offset));
            ratings.push(Rating::new(user_id, 2, 3.0 + offset));
            if user_id % 2 == 0 {
                ratings.push(Rating::new(user_id, 3, 5.0 - offset));
            }
        }
        ratings
    }

    #[test]
    fn test_predict_before_fit() {
        let model = MovieSimilarityModel::new();
        assert!(!model.is_fitted());
        assert!(matches!(
            model.predict(&[PredictionRequest::new(1, 1)]),
            Err(SimilarityError::NotFitted)
        ));
        assert!(matches!(
            model.similarity(1, 2),
            Err(SimilarityError::NotFitted)
        ));
    }

    #[test]
    fn test_fit_then_predict() {
        let mut model = MovieSimilarityModel::new();
        model.fit(&create_test_ratings()).unwrap();
        assert!(model.is_fitted());

        let requests = vec![PredictionRequest::new(1, 3), PredictionRequest::new(2, 1)];
        let batch = model.predict(&requests).unwrap();
        assert_eq!(batch.estimates.len(), 2);
        assert!(batch.estimates.iter().all(|e| e.is_finite()));
    }

    #[test]
    fn test_fit_rejects_empty() {
        let mut model = MovieSimilarityModel::new();
        assert!(matches!(
            model.fit(&[]),
            Err(SimilarityError::EmptyTrainingSet)
        ));
    }

    #[test]
    fn test_failed_refit_leaves_model_unfitted() {
        let mut model = MovieSimilarityModel::new();
        model.fit(&create_test_ratings()).unwrap();

        let bad = vec![Rating::new(1, 1, f32::NAN)];
        assert!(matches!(
            model.fit(&bad),
            Err(SimilarityError::InvalidRating { user_id: 1, movie_id: 1, .. })
        ));
        assert!(!model.is_fitted());
    }

    #[test]
    fn test_set_k_neighbors() {
        let mut model = MovieSimilarityModel::new();
        model.set_k_neighbors(5).unwrap();
        assert_eq!(model.k_neighbors(), 5);
        assert!(model.set_k_neighbors(0).is_err());
        assert_eq!(model.k_neighbors(), 5);
    }

    #[test]
    fn test_with_config_validates() {
        let config = ModelConfig::new().with_k_neighbors(0);
        assert!(MovieSimilarityModel::with_config(config).is_err());
    }
}

//! Baseline-effects estimator: global mean plus damped user and movie biases.
//!
//! ## Model
//! - `mu`  = mean of all observed ratings
//! - `b_m` = sum over raters of `(r - mu)` / (`movie_reg` + number of raters)
//! - `b_u` = sum over rated movies of `(r - mu - b_m)` / (`user_reg` + number rated)
//! - baseline(u, m) = `mu + b_u + b_m`
//!
//! Unseen users and movies get a bias of 0, so an entirely unknown pair
//! falls back to the global mean.

use crate::error::{Result, SimilarityError};
use crate::traits::BaselineModel;
use crate::types::ResidualRating;
use data_loader::{MovieId, Rating, UserId};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone)]
struct FittedBiases {
    global_mean: f64,
    user_bias: HashMap<UserId, f64>,
    movie_bias: HashMap<MovieId, f64>,
}

/// Default `BaselineModel` implementation.
#[derive(Debug, Clone)]
pub struct BaselineEffectsModel {
    /// Damping for user biases; larger values pull sparse users toward 0
    user_reg: f64,
    /// Damping for movie biases
    movie_reg: f64,
    fitted: Option<FittedBiases>,
}

impl BaselineEffectsModel {
    pub fn new() -> Self {
        Self {
            user_reg: 10.0,
            movie_reg: 25.0,
            fitted: None,
        }
    }

    /// Configure user bias damping (default: 10.0)
    pub fn with_user_reg(mut self, user_reg: f64) -> Self {
        self.user_reg = user_reg;
        self
    }

    /// Configure movie bias damping (default: 25.0)
    pub fn with_movie_reg(mut self, movie_reg: f64) -> Self {
        self.movie_reg = movie_reg;
        self
    }

    pub fn global_mean(&self) -> Option<f64> {
        self.fitted.as_ref().map(|f| f.global_mean)
    }

    pub fn user_bias(&self, user_id: UserId) -> Option<f64> {
        self.fitted.as_ref()?.user_bias.get(&user_id).copied()
    }

    pub fn movie_bias(&self, movie_id: MovieId) -> Option<f64> {
        self.fitted.as_ref()?.movie_bias.get(&movie_id).copied()
    }

    fn fitted(&self) -> Result<&FittedBiases> {
        self.fitted.as_ref().ok_or(SimilarityError::NotFitted)
    }

    fn check_reg(param: &str, value: f64) -> Result<()> {
        if !(value.is_finite() && value >= 0.0) {
            return Err(SimilarityError::InvalidParameter {
                param: param.to_string(),
                value: value.to_string(),
                constraint: "must be finite and non-negative".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for BaselineEffectsModel {
    fn default() -> Self {
        Self::new()
    }
}

impl BaselineModel for BaselineEffectsModel {
    fn name(&self) -> &str {
        "BaselineEffectsModel"
    }

    fn fit(&mut self, ratings: &[Rating]) -> Result<()> {
        Self::check_reg("user_reg", self.user_reg)?;
        Self::check_reg("movie_reg", self.movie_reg)?;
        if ratings.is_empty() {
            return Err(SimilarityError::EmptyTrainingSet);
        }

        let mut total = 0.0;
        for rating in ratings {
            let value = rating.rating as f64;
            if !value.is_finite() {
                return Err(SimilarityError::InvalidRating {
                    user_id: rating.user_id,
                    movie_id: rating.movie_id,
                    value,
                });
            }
            total += value;
        }
        let global_mean = total / ratings.len() as f64;

        // Movie biases first, user biases on what the movie bias leaves over
        let mut movie_sums: HashMap<MovieId, (f64, u32)> = HashMap::new();
        for rating in ratings {
            let entry = movie_sums.entry(rating.movie_id).or_insert((0.0, 0));
            entry.0 += rating.rating as f64 - global_mean;
            entry.1 += 1;
        }
        let movie_bias: HashMap<MovieId, f64> = movie_sums
            .into_iter()
            .map(|(movie_id, (sum, count))| (movie_id, sum / (self.movie_reg + count as f64)))
            .collect();

        let mut user_sums: HashMap<UserId, (f64, u32)> = HashMap::new();
        for rating in ratings {
            let b_m = movie_bias.get(&rating.movie_id).copied().unwrap_or(0.0);
            let entry = user_sums.entry(rating.user_id).or_insert((0.0, 0));
            entry.0 += rating.rating as f64 - global_mean - b_m;
            entry.1 += 1;
        }
        let user_bias: HashMap<UserId, f64> = user_sums
            .into_iter()
            .map(|(user_id, (sum, count))| (user_id, sum / (self.user_reg + count as f64)))
            .collect();

        debug!(
            "Fitted baseline: mu = {:.4}, {} user biases, {} movie biases",
            global_mean,
            user_bias.len(),
            movie_bias.len()
        );

        self.fitted = Some(FittedBiases {
            global_mean,
            user_bias,
            movie_bias,
        });
        Ok(())
    }

    fn create_modified_ratings(&self, ratings: &[Rating]) -> Result<Vec<ResidualRating>> {
        // Fail before the first row if unfitted
        self.fitted()?;
        ratings
            .iter()
            .map(|rating| {
                let baseline = self.predict_baseline_rating(rating.user_id, rating.movie_id)?;
                Ok(ResidualRating::new(
                    rating.user_id,
                    rating.movie_id,
                    rating.rating as f64 - baseline,
                ))
            })
            .collect()
    }

    fn predict_baseline_rating(&self, user_id: UserId, movie_id: MovieId) -> Result<f64> {
        let fitted = self.fitted()?;
        let b_u = fitted.user_bias.get(&user_id).copied().unwrap_or(0.0);
        let b_m = fitted.movie_bias.get(&movie_id).copied().unwrap_or(0.0);
        Ok(fitted.global_mean + b_u + b_m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_ratings() -> Vec<Rating> {
        vec![
            Rating::new(1, 10, 5.0),
            Rating::new(1, 20, 4.0),
            Rating::new(2, 10, 3.0),
            Rating::new(2, 20, 2.0),
        ]
    }

    #[test]
    fn test_global_mean_without_damping() {
        let mut model = BaselineEffectsModel::new()
            .with_user_reg(0.0)
            .with_movie_reg(0.0);
        model.fit(&create_test_ratings()).unwrap();

        assert!((model.global_mean().unwrap() - 3.5).abs() < 1e-12);
        // Movie 10: mean 4.0 -> +0.5, movie 20: mean 3.0 -> -0.5
        assert!((model.movie_bias(10).unwrap() - 0.5).abs() < 1e-12);
        assert!((model.movie_bias(20).unwrap() + 0.5).abs() < 1e-12);
        // User 1 sits one point above the movie-adjusted mean
        assert!((model.user_bias(1).unwrap() - 1.0).abs() < 1e-12);
        assert!((model.user_bias(2).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_residuals_match_baseline() {
        let ratings = create_test_ratings();
        let mut model = BaselineEffectsModel::new();
        model.fit(&ratings).unwrap();

        let residuals = model.create_modified_ratings(&ratings).unwrap();
        assert_eq!(residuals.len(), ratings.len());
        for (residual, rating) in residuals.iter().zip(&ratings) {
            assert_eq!(residual.user_id, rating.user_id);
            assert_eq!(residual.movie_id, rating.movie_id);
            let baseline = model
                .predict_baseline_rating(rating.user_id, rating.movie_id)
                .unwrap();
            assert!((residual.residual + baseline - rating.rating as f64).abs() < 1e-9);
        }
    }

    #[test]
    fn test_unknown_ids_fall_back_to_mean() {
        let mut model = BaselineEffectsModel::new();
        model.fit(&create_test_ratings()).unwrap();

        let estimate = model.predict_baseline_rating(999, 999).unwrap();
        assert!((estimate - model.global_mean().unwrap()).abs() < 1e-12);
    }

    #[test]
    fn test_unfitted_errors() {
        let model = BaselineEffectsModel::new();
        assert!(matches!(
            model.predict_baseline_rating(1, 1),
            Err(SimilarityError::NotFitted)
        ));
        assert!(model.create_modified_ratings(&create_test_ratings()).is_err());
    }

    #[test]
    fn test_empty_fit_errors() {
        let mut model = BaselineEffectsModel::new();
        assert!(matches!(
            model.fit(&[]),
            Err(SimilarityError::EmptyTrainingSet)
        ));
    }

    #[test]
    fn test_negative_reg_rejected() {
        let mut model = BaselineEffectsModel::new().with_user_reg(-1.0);
        assert!(matches!(
            model.fit(&create_test_ratings()),
            Err(SimilarityError::InvalidParameter { .. })
        ));
    }
}

//! Core traits for the similarity model.
//!
//! The baseline-effects estimator is a collaborator: the model trains on
//! its residuals and adds its estimate back at prediction time. Anything
//! implementing `BaselineModel` can be plugged in.

use crate::error::Result;
use crate::types::ResidualRating;
use data_loader::{MovieId, Rating, UserId};

/// Global/user/movie bias estimator the similarity model builds on.
///
/// ## Contract
/// - `fit` is called exactly once, before the other two methods
/// - `create_modified_ratings` keeps row identity and order, replacing each
///   rating with `observed - baseline`
/// - `predict_baseline_rating` is pure and must not fail for ids seen in
///   training; what it returns for unseen ids is up to the implementation
pub trait BaselineModel: Send + Sync {
    /// Returns the name of this model (for logging/debugging)
    fn name(&self) -> &str;

    /// Train bias terms from raw ratings.
    fn fit(&mut self, ratings: &[Rating]) -> Result<()>;

    /// Map every observed rating to its residual against the baseline.
    fn create_modified_ratings(&self, ratings: &[Rating]) -> Result<Vec<ResidualRating>>;

    /// Baseline estimate for a single (user, movie) pair.
    fn predict_baseline_rating(&self, user_id: UserId, movie_id: MovieId) -> Result<f64>;
}

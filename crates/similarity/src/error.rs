//! Error types for the similarity crate.

use data_loader::{MovieId, UserId};
use thiserror::Error;

/// Errors raised while fitting or querying a similarity model.
///
/// Sparse-data cases (a pair with too few common raters, a request with no
/// positively similar neighbors) are not errors; they have defined
/// fallbacks and never show up here.
#[derive(Error, Debug)]
pub enum SimilarityError {
    /// `predict` or a lookup was called before `fit`
    #[error("Model has not been fitted")]
    NotFitted,

    /// `fit` was given no ratings at all
    #[error("Cannot fit on an empty ratings table")]
    EmptyTrainingSet,

    /// A rating or residual was NaN or infinite
    #[error("Invalid rating {value} for user {user_id}, movie {movie_id}")]
    InvalidRating {
        user_id: UserId,
        movie_id: MovieId,
        value: f64,
    },

    /// A tunable parameter was out of range
    #[error("Invalid value for {param}: {value} ({constraint})")]
    InvalidParameter {
        param: String,
        value: String,
        constraint: String,
    },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, SimilarityError>;

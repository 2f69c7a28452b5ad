//! # Similarity Crate
//!
//! Item-based collaborative filtering for movie rating prediction.
//!
//! Given historical (user, movie, rating) observations, the model estimates
//! the rating a user would give a movie they haven't rated: a baseline
//! estimate plus a similarity-weighted vote from the K movies most similar
//! to the target that the user already rated.
//!
//! ## Components
//!
//! - **traits**: `BaselineModel`, the bias estimator the model builds on
//! - **baseline**: `BaselineEffectsModel`, the default bias estimator
//! - **rating_index**: `RatingIndex`, residual ratings by movie and by user
//! - **engine**: `SimilarityEngine` and the `SimilarityTable` it produces
//! - **predictor**: top-K neighbor prediction and batch diagnostics
//! - **model**: `MovieSimilarityModel`, the `fit` / `predict` facade
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{PredictionRequest, RatingsTable};
//! use similarity::MovieSimilarityModel;
//!
//! let table = RatingsTable::load_from_file(path)?;
//! let mut model = MovieSimilarityModel::new();
//! model.fit(table.ratings())?;
//!
//! let batch = model.predict(&[PredictionRequest::new(1, 31)])?;
//! println!(
//!     "estimate {:.2}, baseline-only {:.1}%",
//!     batch.estimates[0],
//!     100.0 * batch.diagnostics.fallback_rate()
//! );
//! ```

pub mod baseline;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod predictor;
pub mod rating_index;
pub mod traits;
pub mod types;

pub use baseline::BaselineEffectsModel;
pub use config::{DEFAULT_K_NEIGHBORS, MIN_SUPPORT, ModelConfig, SHRINKAGE_ALPHA};
pub use engine::{SimilarityEngine, SimilarityTable};
pub use error::{Result, SimilarityError};
pub use model::MovieSimilarityModel;
pub use predictor::{Prediction, PredictionBatch, PredictionDiagnostics, Predictor};
pub use rating_index::{RaterColumn, RatingIndex};
pub use traits::BaselineModel;
pub use types::{MoviePair, Neighbor, ResidualRating, Similarity};

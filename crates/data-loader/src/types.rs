//! Core domain types for MovieLens rating tables.
//!
//! Only the rating observations matter to the predictor, so this module is
//! deliberately small: ids, a rating row, a prediction request row and the
//! owned table that holds them.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a user
pub type UserId = u32;

/// Unique identifier for a movie
pub type MovieId = u32;

// =============================================================================
// Rows
// =============================================================================

/// A single rating from a user for a movie
///
/// Small and `Copy`, so tables of these can be sliced and cloned cheaply.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// Observed rating, typically 0.5 - 5.0 in half steps
    pub rating: f32,
    /// Unix timestamp when the rating was made, if the source had one
    pub timestamp: Option<i64>,
}

impl Rating {
    pub fn new(user_id: UserId, movie_id: MovieId, rating: f32) -> Self {
        Self {
            user_id,
            movie_id,
            rating,
            timestamp: None,
        }
    }
}

/// A (user, movie) pair we want an estimate for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub user_id: UserId,
    pub movie_id: MovieId,
}

impl PredictionRequest {
    pub fn new(user_id: UserId, movie_id: MovieId) -> Self {
        Self { user_id, movie_id }
    }
}

impl From<&Rating> for PredictionRequest {
    fn from(rating: &Rating) -> Self {
        Self::new(rating.user_id, rating.movie_id)
    }
}

// =============================================================================
// RatingsTable
// =============================================================================

/// Owned table of rating observations.
///
/// Rows keep the order they were read in; nothing here reorders them except
/// `train_test_split`, which shuffles a copy.
#[derive(Debug, Clone, Default)]
pub struct RatingsTable {
    pub(crate) ratings: Vec<Rating>,
}

impl RatingsTable {
    /// Creates a new, empty table
    pub fn new() -> Self {
        Self {
            ratings: Vec::new(),
        }
    }

    pub fn from_ratings(ratings: Vec<Rating>) -> Self {
        Self { ratings }
    }

    pub fn push(&mut self, rating: Rating) {
        self.ratings.push(rating);
    }

    /// All rows as a slice
    pub fn ratings(&self) -> &[Rating] {
        &self.ratings
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    /// Rows converted to prediction requests, same order
    pub fn requests(&self) -> Vec<PredictionRequest> {
        self.ratings.iter().map(PredictionRequest::from).collect()
    }

    /// Get counts for debugging/validation: (users, movies, ratings)
    pub fn counts(&self) -> (usize, usize, usize) {
        let users: HashSet<UserId> = self.ratings.iter().map(|r| r.user_id).collect();
        let movies: HashSet<MovieId> = self.ratings.iter().map(|r| r.movie_id).collect();
        (users.len(), movies.len(), self.ratings.len())
    }

    pub fn into_ratings(self) -> Vec<Rating> {
        self.ratings
    }
}

impl From<Vec<Rating>> for RatingsTable {
    fn from(ratings: Vec<Rating>) -> Self {
        Self::from_ratings(ratings)
    }
}

//! Value types shared by the index, the similarity engine and the predictor.

use data_loader::{MovieId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An observed rating with the baseline estimate subtracted out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResidualRating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub residual: f64,
}

impl ResidualRating {
    pub fn new(user_id: UserId, movie_id: MovieId, residual: f64) -> Self {
        Self {
            user_id,
            movie_id,
            residual,
        }
    }
}

/// Unordered movie pair in canonical (low, high) order.
///
/// `MoviePair::new(a, b) == MoviePair::new(b, a)` for every `a`, `b`; both
/// insertion into and lookup from the similarity table go through `new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MoviePair {
    low: MovieId,
    high: MovieId,
}

impl MoviePair {
    pub fn new(a: MovieId, b: MovieId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn low(&self) -> MovieId {
        self.low
    }

    pub fn high(&self) -> MovieId {
        self.high
    }

    /// The member of the pair that isn't `movie_id`, if `movie_id` is in it
    pub fn other(&self, movie_id: MovieId) -> Option<MovieId> {
        if self.low == movie_id {
            Some(self.high)
        } else if self.high == movie_id {
            Some(self.low)
        } else {
            None
        }
    }
}

impl fmt::Display for MoviePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.low, self.high)
    }
}

/// Result of a similarity lookup.
///
/// `Unknown` means the pair was never computed (no common raters, or an id
/// that was never seen). It is not a low score and must never be used as
/// one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Similarity {
    Found(f64),
    Unknown,
}

impl Similarity {
    /// The score, if one was computed
    pub fn score(self) -> Option<f64> {
        match self {
            Similarity::Found(score) => Some(score),
            Similarity::Unknown => None,
        }
    }

    /// Only strictly positive, known similarities may vote in a prediction
    pub fn positive(self) -> Option<f64> {
        self.score().filter(|&score| score > 0.0)
    }

    pub fn is_unknown(self) -> bool {
        matches!(self, Similarity::Unknown)
    }
}

/// A movie the user rated, scored against the target movie.
///
/// Built per prediction and thrown away afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub movie_id: MovieId,
    pub similarity: f64,
    pub residual: f64,
}

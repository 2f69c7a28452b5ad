//! Similarity Engine - all-pairs movie similarity with shrinkage
//!
//! ## Algorithm
//! For every unordered pair (i, j) of distinct movies in the index:
//! 1. Intersect the two rater columns; `support` = number of common raters
//! 2. Walk the common raters and sum `(r_i - r_j)^2` over their residuals
//! 3. `support == 0`: nothing is stored, lookups report `Unknown`
//! 4. `support == 1`: stored as exactly 0
//! 5. otherwise: `support / (sum + SHRINKAGE_ALPHA)`
//!
//! The score is never negative and has no upper bound. It grows with
//! agreement and with support; `SHRINKAGE_ALPHA` keeps perfect agreement
//! finite and damps pairs with few common raters.
//!
//! ## Cost
//! O(M^2) pairs, each a merge walk over two rater columns. Pairs only read
//! the frozen `RatingIndex`, so rows of the pair triangle are spread over
//! the rayon pool when `parallel` is set and the per-worker maps are merged
//! at the end.

use crate::config::{MIN_SUPPORT, SHRINKAGE_ALPHA};
use crate::rating_index::{RaterColumn, RatingIndex};
use crate::types::{MoviePair, Similarity};
use data_loader::MovieId;
use rayon::prelude::*;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Sparse symmetric movie-to-movie similarity map.
///
/// Keys are canonical `MoviePair`s, so `get(a, b)` and `get(b, a)` always
/// agree. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityTable {
    scores: HashMap<MoviePair, f64>,
}

impl SimilarityTable {
    pub fn new() -> Self {
        Self {
            scores: HashMap::new(),
        }
    }

    /// Look up the similarity of two movies.
    ///
    /// `Unknown` when the pair was never computed: no common raters, an id
    /// that was never seen, or `a == b`.
    pub fn get(&self, movie_a: MovieId, movie_b: MovieId) -> Similarity {
        if movie_a == movie_b {
            return Similarity::Unknown;
        }
        match self.scores.get(&MoviePair::new(movie_a, movie_b)) {
            Some(&score) => Similarity::Found(score),
            None => Similarity::Unknown,
        }
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MoviePair, f64)> + '_ {
        self.scores.iter().map(|(&pair, &score)| (pair, score))
    }

    /// Movies with a strictly positive similarity to `movie_id`, highest
    /// first; equal scores are ordered by ascending movie id.
    pub fn most_similar(&self, movie_id: MovieId, limit: usize) -> Vec<(MovieId, f64)> {
        let mut neighbors: Vec<(MovieId, f64)> = self
            .scores
            .iter()
            .filter(|&(_, &score)| score > 0.0)
            .filter_map(|(pair, &score)| pair.other(movie_id).map(|other| (other, score)))
            .collect();

        neighbors.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        neighbors.truncate(limit);
        neighbors
    }
}

impl FromIterator<(MoviePair, f64)> for SimilarityTable {
    fn from_iter<I: IntoIterator<Item = (MoviePair, f64)>>(iter: I) -> Self {
        Self {
            scores: iter.into_iter().collect(),
        }
    }
}

/// Computes the shrunk similarity of every movie pair in a `RatingIndex`.
#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    /// Spread pair rows over the rayon pool
    parallel: bool,
}

impl SimilarityEngine {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    /// Configure parallel computation (default: true)
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Similarity of a single pair, computed directly from the index.
    pub fn calculate_similarity(
        &self,
        index: &RatingIndex,
        movie_a: MovieId,
        movie_b: MovieId,
    ) -> Similarity {
        if movie_a == movie_b {
            return Similarity::Unknown;
        }
        match (index.column(movie_a), index.column(movie_b)) {
            (Some(a), Some(b)) => match column_similarity(a, b) {
                Some(score) => Similarity::Found(score),
                None => Similarity::Unknown,
            },
            _ => Similarity::Unknown,
        }
    }

    /// Compute the full similarity table.
    ///
    /// The index must be completely built before this is called; it is only
    /// read from here on.
    #[instrument(skip_all, fields(movies = index.movie_count(), parallel = self.parallel))]
    pub fn compute_all(&self, index: &RatingIndex) -> SimilarityTable {
        let start = Instant::now();
        let movie_count = index.movie_count();
        let pair_count = movie_count * movie_count.saturating_sub(1) / 2;
        debug!("Computing similarities for {} movie pairs", pair_count);

        let scores: HashMap<MoviePair, f64> = if self.parallel {
            (0..movie_count)
                .into_par_iter()
                .fold(HashMap::new, |mut local, row| {
                    fill_row(index, row, &mut local);
                    local
                })
                .reduce(HashMap::new, |mut acc, mut local| {
                    if acc.len() < local.len() {
                        std::mem::swap(&mut acc, &mut local);
                    }
                    acc.extend(local);
                    acc
                })
        } else {
            let mut scores = HashMap::new();
            for row in 0..movie_count {
                fill_row(index, row, &mut scores);
            }
            scores
        };

        info!(
            "Computed {} similarities ({} pairs examined) in {:.2?}",
            scores.len(),
            pair_count,
            start.elapsed()
        );
        SimilarityTable { scores }
    }
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Pairs (row, j) for every j > row.
fn fill_row(index: &RatingIndex, row: usize, out: &mut HashMap<MoviePair, f64>) {
    let movie_ids = index.movie_ids();
    let columns = index.columns();
    let column = &columns[row];

    for (offset, other) in columns[row + 1..].iter().enumerate() {
        if let Some(score) = column_similarity(column, other) {
            let pair = MoviePair::new(movie_ids[row], movie_ids[row + 1 + offset]);
            out.insert(pair, score);
        }
    }
}

/// `None` when the columns share no rater.
fn column_similarity(a: &RaterColumn, b: &RaterColumn) -> Option<f64> {
    let mut support = 0usize;
    let mut squared_error = 0.0;
    a.for_each_common(b, |_, ra, rb| {
        let diff = ra - rb;
        squared_error += diff * diff;
        support += 1;
    });

    match support {
        0 => None,
        s if s < MIN_SUPPORT => Some(0.0),
        s => Some(s as f64 / (squared_error + SHRINKAGE_ALPHA)),
    }
}

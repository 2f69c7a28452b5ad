//! Bidirectional in-memory index of residual ratings.
//!
//! Built once from the residual table during `fit` and read-only after
//! that. The same residual is stored under both `movie -> user` and
//! `user -> movie`, so `ratings_by_movie[m][u] == ratings_by_user[u][m]`
//! holds for every observed pair.
//!
//! Each movie's raters are also kept as a sorted column with the residuals
//! laid out alongside, so intersecting two movies' rater sets is a single
//! merge walk that yields the paired residuals as it goes.

use crate::error::{Result, SimilarityError};
use crate::types::ResidualRating;
use data_loader::{MovieId, UserId};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Sorted rater set of one movie with the residual each rater gave.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RaterColumn {
    /// Ascending, unique
    users: Vec<UserId>,
    /// `residuals[i]` is what `users[i]` gave this movie
    residuals: Vec<f64>,
}

impl RaterColumn {
    fn from_ratings(ratings: &HashMap<UserId, f64>) -> Self {
        let mut pairs: Vec<(UserId, f64)> = ratings.iter().map(|(&u, &r)| (u, r)).collect();
        pairs.sort_unstable_by_key(|&(user_id, _)| user_id);
        let (users, residuals) = pairs.into_iter().unzip();
        Self { users, residuals }
    }

    pub fn users(&self) -> &[UserId] {
        &self.users
    }

    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Merge-walk against `other` and call `f(mine, theirs)` with the two
    /// residuals of every common rater, in ascending user order.
    pub fn for_each_common(&self, other: &RaterColumn, mut f: impl FnMut(UserId, f64, f64)) {
        let (a, b) = (&self.users, &other.users);
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].cmp(&b[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    f(a[i], self.residuals[i], other.residuals[j]);
                    i += 1;
                    j += 1;
                }
            }
        }
    }
}

/// Frozen snapshot of the training residuals.
#[derive(Debug, Clone, Default)]
pub struct RatingIndex {
    /// movie -> (user -> residual)
    ratings_by_movie: HashMap<MovieId, HashMap<UserId, f64>>,
    /// user -> (movie -> residual)
    ratings_by_user: HashMap<UserId, HashMap<MovieId, f64>>,
    /// Distinct movie ids, sorted ascending
    movie_ids: Vec<MovieId>,
    /// `raters_by_movie[i]` belongs to `movie_ids[i]`
    raters_by_movie: Vec<RaterColumn>,
    /// movie id -> position in `movie_ids`
    positions: HashMap<MovieId, usize>,
}

impl RatingIndex {
    /// Build the index from a residual table.
    ///
    /// One pass to fill both rating maps, then one pass per movie to
    /// materialize its sorted rater column. A non-finite residual aborts the
    /// build. If a (user, movie) pair appears twice the later row wins.
    pub fn build(residuals: &[ResidualRating]) -> Result<Self> {
        let mut ratings_by_movie: HashMap<MovieId, HashMap<UserId, f64>> = HashMap::new();
        let mut ratings_by_user: HashMap<UserId, HashMap<MovieId, f64>> = HashMap::new();
        let mut duplicates = 0usize;

        for row in residuals {
            if !row.residual.is_finite() {
                return Err(SimilarityError::InvalidRating {
                    user_id: row.user_id,
                    movie_id: row.movie_id,
                    value: row.residual,
                });
            }
            let previous = ratings_by_movie
                .entry(row.movie_id)
                .or_default()
                .insert(row.user_id, row.residual);
            if previous.is_some() {
                duplicates += 1;
            }
            ratings_by_user
                .entry(row.user_id)
                .or_default()
                .insert(row.movie_id, row.residual);
        }

        if duplicates > 0 {
            warn!(
                "{} duplicate (user, movie) ratings; kept the last of each",
                duplicates
            );
        }

        let mut movie_ids: Vec<MovieId> = ratings_by_movie.keys().copied().collect();
        movie_ids.sort_unstable();

        let raters_by_movie: Vec<RaterColumn> = movie_ids
            .iter()
            .map(|movie_id| {
                ratings_by_movie
                    .get(movie_id)
                    .map(RaterColumn::from_ratings)
                    .unwrap_or_default()
            })
            .collect();

        let positions: HashMap<MovieId, usize> = movie_ids
            .iter()
            .enumerate()
            .map(|(position, &movie_id)| (movie_id, position))
            .collect();

        debug!(
            "Built rating index: {} movies, {} users, {} ratings",
            movie_ids.len(),
            ratings_by_user.len(),
            residuals.len() - duplicates
        );

        Ok(Self {
            ratings_by_movie,
            ratings_by_user,
            movie_ids,
            raters_by_movie,
            positions,
        })
    }

    /// Distinct movie ids, ascending
    pub fn movie_ids(&self) -> &[MovieId] {
        &self.movie_ids
    }

    pub fn movie_count(&self) -> usize {
        self.movie_ids.len()
    }

    pub fn user_count(&self) -> usize {
        self.ratings_by_user.len()
    }

    pub fn rating_count(&self) -> usize {
        self.ratings_by_user.values().map(|m| m.len()).sum()
    }

    pub fn contains_movie(&self, movie_id: MovieId) -> bool {
        self.positions.contains_key(&movie_id)
    }

    pub fn contains_user(&self, user_id: UserId) -> bool {
        self.ratings_by_user.contains_key(&user_id)
    }

    /// Residual `user_id` gave `movie_id`, if they rated it
    pub fn residual(&self, user_id: UserId, movie_id: MovieId) -> Option<f64> {
        self.ratings_by_user.get(&user_id)?.get(&movie_id).copied()
    }

    /// All residuals a movie received, keyed by user
    pub fn movie_ratings(&self, movie_id: MovieId) -> Option<&HashMap<UserId, f64>> {
        self.ratings_by_movie.get(&movie_id)
    }

    /// All residuals a user gave, keyed by movie
    pub fn user_ratings(&self, user_id: UserId) -> Option<&HashMap<MovieId, f64>> {
        self.ratings_by_user.get(&user_id)
    }

    /// Rater column of `movie_id`
    pub fn column(&self, movie_id: MovieId) -> Option<&RaterColumn> {
        let position = *self.positions.get(&movie_id)?;
        self.raters_by_movie.get(position)
    }

    /// Rater columns in `movie_ids()` order
    pub fn columns(&self) -> &[RaterColumn] {
        &self.raters_by_movie
    }

    /// Users who rated `movie_id`, ascending; empty for an unknown movie
    pub fn raters(&self, movie_id: MovieId) -> &[UserId] {
        self.column(movie_id).map(RaterColumn::users).unwrap_or(&[])
    }

    /// Users who rated both movies, ascending
    pub fn common_raters(&self, movie_a: MovieId, movie_b: MovieId) -> Vec<UserId> {
        let mut common = Vec::new();
        if let (Some(a), Some(b)) = (self.column(movie_a), self.column(movie_b)) {
            a.for_each_common(b, |user_id, _, _| common.push(user_id));
        }
        common
    }

    /// Residuals `raters` gave `movie_id`, in the same order as `raters`.
    ///
    /// Users in `raters` who never rated the movie are skipped; callers
    /// normally pass the output of `common_raters`.
    pub fn common_ratings(&self, movie_id: MovieId, raters: &[UserId]) -> Vec<f64> {
        let Some(ratings) = self.ratings_by_movie.get(&movie_id) else {
            return Vec::new();
        };
        raters
            .iter()
            .filter_map(|user_id| ratings.get(user_id).copied())
            .collect()
    }
}

//! Loading, validation and splitting of `RatingsTable`s.

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::path::Path;
use tracing::info;

impl RatingsTable {
    /// Load a ratings file (`.csv` or `.dat`) and validate it.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading ratings from {:?}", path);

        let table = RatingsTable::from_ratings(parser::parse_ratings(path)?);
        table.validate()?;

        let (users, movies, ratings) = table.counts();
        info!(
            "Loaded {} ratings from {} users on {} movies",
            ratings, users, movies
        );
        Ok(table)
    }

    /// Validate data integrity
    ///
    /// The table must be non-empty and every rating must be a finite
    /// number. No fixed rating scale is assumed.
    pub fn validate(&self) -> Result<()> {
        if self.ratings.is_empty() {
            return Err(DataLoadError::ValidationError(
                "ratings table is empty".to_string(),
            ));
        }
        for rating in &self.ratings {
            if !rating.rating.is_finite() {
                return Err(DataLoadError::InvalidValue {
                    field: "rating".to_string(),
                    value: rating.rating.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Shuffle a copy of the rows with a seeded RNG and split it into
    /// (train, test), with `test_fraction` of the rows going to test.
    ///
    /// The same seed always yields the same split. Both halves are
    /// non-empty, so the table needs at least two rows.
    pub fn train_test_split(&self, test_fraction: f64, seed: u64) -> Result<(Self, Self)> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(DataLoadError::InvalidValue {
                field: "test_fraction".to_string(),
                value: test_fraction.to_string(),
            });
        }
        if self.ratings.len() < 2 {
            return Err(DataLoadError::ValidationError(format!(
                "need at least 2 ratings to split, got {}",
                self.ratings.len()
            )));
        }

        let mut rows = self.ratings.clone();
        let mut rng = StdRng::seed_from_u64(seed);
        rows.shuffle(&mut rng);

        let test_len = ((rows.len() as f64) * test_fraction).round() as usize;
        let test_len = test_len.clamp(1, rows.len() - 1);
        let train = rows.split_off(test_len);

        Ok((
            RatingsTable::from_ratings(train),
            RatingsTable::from_ratings(rows),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_table() -> RatingsTable {
        let mut table = RatingsTable::new();
        for user_id in 1..=10 {
            for movie_id in 1..=5 {
                table.push(Rating::new(user_id, movie_id, 3.5));
            }
        }
        table
    }

    #[test]
    fn test_validate_empty() {
        assert!(RatingsTable::new().validate().is_err());
    }

    #[test]
    fn test_validate_non_finite() {
        let table = RatingsTable::from_ratings(vec![Rating::new(1, 1, f32::INFINITY)]);
        assert!(matches!(
            table.validate(),
            Err(DataLoadError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_split_sizes() {
        let table = create_test_table();
        let (train, test) = table.train_test_split(0.2, 42).unwrap();

        assert_eq!(test.len(), 10);
        assert_eq!(train.len(), 40);
    }

    #[test]
    fn test_split_is_deterministic() {
        let table = create_test_table();
        let (train_a, test_a) = table.train_test_split(0.3, 7).unwrap();
        let (train_b, test_b) = table.train_test_split(0.3, 7).unwrap();

        assert_eq!(train_a.ratings(), train_b.ratings());
        assert_eq!(test_a.ratings(), test_b.ratings());
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        let table = create_test_table();
        assert!(table.train_test_split(0.0, 1).is_err());
        assert!(table.train_test_split(1.0, 1).is_err());
    }

    #[test]
    fn test_split_rejects_tiny_tables() {
        assert!(matches!(
            RatingsTable::new().train_test_split(0.2, 1),
            Err(DataLoadError::ValidationError(_))
        ));
        let single = RatingsTable::from_ratings(vec![Rating::new(1, 1, 4.0)]);
        assert!(matches!(
            single.train_test_split(0.2, 1),
            Err(DataLoadError::ValidationError(_))
        ));
    }

    #[test]
    fn test_split_two_rows_keeps_both_halves() {
        let table = RatingsTable::from_ratings(vec![Rating::new(1, 1, 4.0), Rating::new(2, 1, 3.0)]);
        let (train, test) = table.train_test_split(0.9, 3).unwrap();
        assert_eq!(train.len(), 1);
        assert_eq!(test.len(), 1);
    }

    #[test]
    fn test_load_dataset() {
        // Requires the ml-latest-small dataset at ../../data/ml-latest-small
        let path = Path::new("../../data/ml-latest-small/ratings.csv");

        if path.exists() {
            let table = RatingsTable::load_from_file(path).unwrap();
            assert!(!table.is_empty());
        }
    }
}

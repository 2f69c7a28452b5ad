//! Integration tests for the similarity model.
//!
//! These fit full models through the public API and check the properties
//! the predictions must hold: symmetry, the support rule, determinism,
//! fallback behavior, additivity and top-K monotonicity.

use data_loader::{MovieId, PredictionRequest, Rating, UserId};
use similarity::{
    BaselineModel, ModelConfig, MovieSimilarityModel, ResidualRating, Result, SHRINKAGE_ALPHA,
    Similarity,
};

/// Constant baseline so residuals are simply `rating - value`
#[derive(Debug, Clone)]
struct FixedBaseline {
    value: f64,
}

impl BaselineModel for FixedBaseline {
    fn name(&self) -> &str {
        "FixedBaseline"
    }

    fn fit(&mut self, _ratings: &[Rating]) -> Result<()> {
        Ok(())
    }

    fn create_modified_ratings(&self, ratings: &[Rating]) -> Result<Vec<ResidualRating>> {
        Ok(ratings
            .iter()
            .map(|r| ResidualRating::new(r.user_id, r.movie_id, r.rating as f64 - self.value))
            .collect())
    }

    fn predict_baseline_rating(&self, _user_id: UserId, _movie_id: MovieId) -> Result<f64> {
        Ok(self.value)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn fixed_model(k_neighbors: usize) -> MovieSimilarityModel<FixedBaseline> {
    MovieSimilarityModel::with_baseline(
        ModelConfig::new().with_k_neighbors(k_neighbors),
        FixedBaseline { value: 3.0 },
    )
    .unwrap()
}

/// 30 users over 12 movies with a deterministic, uneven rating pattern
fn create_synthetic_ratings() -> Vec<Rating> {
    let mut ratings = Vec::new();
    for user_id in 1..=30u32 {
        for movie_id in 1..=12u32 {
            if (user_id + movie_id * 2) % 4 == 0 {
                continue;
            }
            let steps = (user_id * 7 + movie_id * 13) % 9;
            ratings.push(Rating::new(user_id, movie_id, 1.0 + steps as f32 * 0.5));
        }
    }
    ratings
}

#[test]
fn test_scenario_identical_raters() {
    init_tracing();
    // Residuals against baseline 3.0: U1 -> 1.0, U2 -> -0.5, U3 -> 2.0 on both A and B
    let (a, b, c) = (1, 2, 3);
    let ratings = vec![
        Rating::new(1, a, 4.0),
        Rating::new(1, b, 4.0),
        Rating::new(2, a, 2.5),
        Rating::new(2, b, 2.5),
        Rating::new(3, a, 5.0),
        Rating::new(3, b, 5.0),
        Rating::new(4, c, 3.5),
    ];
    let mut model = fixed_model(40);
    model.fit(&ratings).unwrap();

    assert_eq!(model.similarity(a, b).unwrap(), Similarity::Found(0.75));
    assert_eq!(model.similarity(b, a).unwrap(), Similarity::Found(0.75));
    assert_eq!(model.similarity(a, c).unwrap(), Similarity::Unknown);
    assert_eq!(model.similarity(b, c).unwrap(), Similarity::Unknown);
    assert_eq!(3.0 / (0.0 + SHRINKAGE_ALPHA), 0.75);
}

#[test]
fn test_scenario_single_common_rater() {
    let ratings = vec![
        Rating::new(1, 10, 5.0),
        Rating::new(1, 20, 1.0),
        Rating::new(2, 10, 4.0),
        Rating::new(3, 20, 2.0),
    ];
    let mut model = fixed_model(40);
    model.fit(&ratings).unwrap();

    assert_eq!(model.similarity(10, 20).unwrap(), Similarity::Found(0.0));
}

#[test]
fn test_scenario_only_other_movie_has_no_relationship() {
    // User 9 rated only movie 30, which shares no rater with movie 10
    let ratings = vec![
        Rating::new(1, 10, 4.0),
        Rating::new(2, 10, 2.0),
        Rating::new(9, 30, 5.0),
    ];
    let mut model = fixed_model(40);
    model.fit(&ratings).unwrap();

    assert!(model.similarity(10, 30).unwrap().is_unknown());

    let batch = model.predict(&[PredictionRequest::new(9, 10)]).unwrap();
    assert_eq!(batch.estimates, vec![3.0]);
    assert_eq!(batch.diagnostics.fallback_count, 1);
}

#[test]
fn test_symmetry_and_support_rule() {
    let ratings = create_synthetic_ratings();
    let mut model = fixed_model(40);
    model.fit(&ratings).unwrap();
    let index = model.rating_index().unwrap();

    for &a in index.movie_ids() {
        for &b in index.movie_ids() {
            if a == b {
                continue;
            }
            let forward = model.similarity(a, b).unwrap();
            assert_eq!(forward, model.similarity(b, a).unwrap());

            let support = index.common_raters(a, b).len();
            match forward {
                Similarity::Found(score) => {
                    assert!(score >= 0.0);
                    if support <= 1 {
                        assert_eq!(score, 0.0);
                    } else {
                        assert!(score > 0.0);
                    }
                }
                Similarity::Unknown => assert_eq!(support, 0),
            }
        }
    }
}

#[test]
fn test_similarity_formula_on_fitted_model() {
    let ratings = create_synthetic_ratings();
    let mut model = fixed_model(40);
    model.fit(&ratings).unwrap();
    let index = model.rating_index().unwrap();

    let common = index.common_raters(1, 2);
    assert!(common.len() >= 2);
    let first = index.common_ratings(1, &common);
    let second = index.common_ratings(2, &common);
    let squared: f64 = first.iter().zip(&second).map(|(x, y)| (x - y).powi(2)).sum();
    let expected = common.len() as f64 / (squared + SHRINKAGE_ALPHA);

    let score = model.similarity(1, 2).unwrap().score().unwrap();
    assert!((score - expected).abs() < 1e-12);
}

#[test]
fn test_fit_is_deterministic() {
    let ratings = create_synthetic_ratings();
    let requests: Vec<PredictionRequest> = (1..=30)
        .flat_map(|u| (1..=12).map(move |m| PredictionRequest::new(u, m)))
        .collect();

    let mut first = fixed_model(5);
    first.fit(&ratings).unwrap();
    let mut second = fixed_model(5);
    second.fit(&ratings).unwrap();

    assert_eq!(
        first.similarity_table().unwrap(),
        second.similarity_table().unwrap()
    );
    assert_eq!(
        first.predict(&requests).unwrap(),
        second.predict(&requests).unwrap()
    );
}

#[test]
fn test_parallel_and_sequential_fit_agree() {
    let ratings = create_synthetic_ratings();
    let mut parallel = MovieSimilarityModel::with_baseline(
        ModelConfig::new().with_parallel(true),
        FixedBaseline { value: 3.0 },
    )
    .unwrap();
    let mut sequential = MovieSimilarityModel::with_baseline(
        ModelConfig::new().with_parallel(false),
        FixedBaseline { value: 3.0 },
    )
    .unwrap();
    parallel.fit(&ratings).unwrap();
    sequential.fit(&ratings).unwrap();

    assert_eq!(
        parallel.similarity_table().unwrap(),
        sequential.similarity_table().unwrap()
    );
}

#[test]
fn test_additivity() {
    let ratings = create_synthetic_ratings();
    let mut model = fixed_model(4);
    model.fit(&ratings).unwrap();
    let predictor = model.predictor().unwrap();

    for user_id in 1..=30 {
        for movie_id in 1..=12 {
            let prediction = predictor.predict_rating(user_id, movie_id).unwrap();
            let baseline = model
                .baseline()
                .predict_baseline_rating(user_id, movie_id)
                .unwrap();

            let neighbors = predictor.neighbors(user_id, movie_id);
            let expected = if neighbors.is_empty() {
                0.0
            } else {
                let weighted: f64 = neighbors.iter().map(|n| n.similarity * n.residual).sum();
                let total: f64 = neighbors.iter().map(|n| n.similarity).sum();
                weighted / total
            };

            assert!((prediction.rating - baseline - expected).abs() < 1e-9);
        }
    }
}

#[test]
fn test_fallback_equals_baseline() {
    let ratings = create_synthetic_ratings();
    let mut model = fixed_model(40);
    model.fit(&ratings).unwrap();

    // Unknown user has no rated movies at all
    let prediction = model.predict_rating(999, 1).unwrap();
    assert!(prediction.fell_back());
    assert_eq!(prediction.rating, 3.0);

    // Unknown movie has no similarities
    let prediction = model.predict_rating(1, 999).unwrap();
    assert!(prediction.fell_back());
    assert_eq!(prediction.rating, 3.0);
}

#[test]
fn test_top_k_monotonicity() {
    let ratings = create_synthetic_ratings();
    let mut model = fixed_model(1);
    model.fit(&ratings).unwrap();

    for (user_id, movie_id) in [(1, 3), (4, 9), (17, 12)] {
        let all = {
            model.set_k_neighbors(1000).unwrap();
            model.predictor().unwrap().neighbors(user_id, movie_id)
        };

        let mut previous: Vec<MovieId> = Vec::new();
        for k in 1..=all.len() + 3 {
            model.set_k_neighbors(k).unwrap();
            let neighbors = model.predictor().unwrap().neighbors(user_id, movie_id);
            let ids: Vec<MovieId> = neighbors.iter().map(|n| n.movie_id).collect();

            // Growing K only appends lower-or-equal ranked neighbors
            assert!(ids.starts_with(&previous));
            assert_eq!(ids.len(), k.min(all.len()));
            previous = ids;
        }

        model.set_k_neighbors(all.len().max(1)).unwrap();
        let converged = model.predict_rating(user_id, movie_id).unwrap();
        model.set_k_neighbors(1000).unwrap();
        let unbounded = model.predict_rating(user_id, movie_id).unwrap();
        assert_eq!(converged.rating, unbounded.rating);
    }
}

#[test]
fn test_batch_output_matches_request_order() {
    let ratings = create_synthetic_ratings();
    let mut model = fixed_model(10);
    model.fit(&ratings).unwrap();

    let requests = vec![
        PredictionRequest::new(5, 7),
        PredictionRequest::new(999, 1),
        PredictionRequest::new(2, 11),
    ];
    let batch = model.predict(&requests).unwrap();

    assert_eq!(batch.estimates.len(), requests.len());
    for (estimate, request) in batch.estimates.iter().zip(&requests) {
        let single = model
            .predict_rating(request.user_id, request.movie_id)
            .unwrap();
        assert_eq!(*estimate, single.rating);
    }
    assert!(batch.diagnostics.fallback_count >= 1);
}

#[test]
fn test_default_model_end_to_end() {
    let ratings = create_synthetic_ratings();
    let mut model = MovieSimilarityModel::new();
    model.fit(&ratings).unwrap();

    let requests: Vec<PredictionRequest> = ratings
        .iter()
        .take(20)
        .map(PredictionRequest::from)
        .collect();
    let batch = model.predict(&requests).unwrap();

    assert_eq!(batch.estimates.len(), 20);
    assert!(batch.estimates.iter().all(|e| e.is_finite()));
    assert_eq!(batch.diagnostics.total, 20);
}

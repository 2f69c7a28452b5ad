use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::{MovieId, RatingsTable, UserId};
use similarity::{ModelConfig, MovieSimilarityModel, PredictionBatch};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

/// ReelPredict - Movie rating prediction with item-based collaborative filtering
#[derive(Parser)]
#[command(name = "reel-predict")]
#[command(about = "Predict movie ratings from similar movies a user has rated", long_about = None)]
struct Cli {
    /// Path to a MovieLens ratings file (.csv or .dat)
    #[arg(short, long, default_value = "data/ml-latest-small/ratings.csv")]
    ratings: PathBuf,

    /// JSON file with model settings, e.g. {"k_neighbors": 40}
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of neighbors that vote in a prediction (overrides the config file)
    #[arg(short, long)]
    k_neighbors: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit on a random split of the ratings and score the held-out part
    Evaluate {
        /// Fraction of ratings held out for testing
        #[arg(long, default_value = "0.2")]
        test_fraction: f64,

        /// Seed for the train/test shuffle
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Predict the rating a user would give a movie
    Predict {
        #[arg(long)]
        user_id: UserId,

        #[arg(long)]
        movie_id: MovieId,

        /// Show the neighbors that voted
        #[arg(long)]
        explain: bool,
    },

    /// List the movies most similar to a movie
    Similar {
        #[arg(long)]
        movie_id: MovieId,

        /// Number of movies to list
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.k_neighbors)?;
    info!("Model config: {:?}", config);

    println!("Loading ratings from {}...", cli.ratings.display());
    let start = Instant::now();
    let table = RatingsTable::load_from_file(&cli.ratings).context("Failed to load ratings")?;
    println!("{} Loaded ratings in {:?}", "✓".green(), start.elapsed());

    match cli.command {
        Commands::Evaluate {
            test_fraction,
            seed,
        } => handle_evaluate(&table, config, test_fraction, seed)?,
        Commands::Predict {
            user_id,
            movie_id,
            explain,
        } => handle_predict(&table, config, user_id, movie_id, explain)?,
        Commands::Similar { movie_id, limit } => handle_similar(&table, config, movie_id, limit)?,
    }

    Ok(())
}

/// Defaults, then the config file, then the command-line override
fn load_config(path: Option<&Path>, k_neighbors: Option<usize>) -> Result<ModelConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str::<ModelConfig>(&raw)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        }
        None => ModelConfig::default(),
    };
    if let Some(k) = k_neighbors {
        config = config.with_k_neighbors(k);
    }
    config.validate().context("Invalid model configuration")?;
    Ok(config)
}

fn fit_model(table: &RatingsTable, config: ModelConfig) -> Result<MovieSimilarityModel> {
    let mut model = MovieSimilarityModel::with_config(config)?;
    let start = Instant::now();
    model.fit(table.ratings()).context("Failed to fit model")?;
    println!(
        "{} Fitted model on {} ratings in {:?}",
        "✓".green(),
        table.len(),
        start.elapsed()
    );
    Ok(model)
}

/// Handle the 'evaluate' command
fn handle_evaluate(
    table: &RatingsTable,
    config: ModelConfig,
    test_fraction: f64,
    seed: u64,
) -> Result<()> {
    let (train, test) = table
        .train_test_split(test_fraction, seed)
        .context("Failed to split ratings")?;
    println!(
        "Split into {} train / {} test ratings (seed {})",
        train.len(),
        test.len(),
        seed
    );

    let model = fit_model(&train, config)?;

    let start = Instant::now();
    let batch = model.predict(&test.requests())?;
    let elapsed = start.elapsed();

    let actual: Vec<f64> = test.ratings().iter().map(|r| r.rating as f64).collect();
    let (rmse, mae) = score(&batch, &actual);

    println!("{}", "Evaluation:".bold().blue());
    println!("{}k_neighbors: {}", "• ".green(), model.k_neighbors());
    println!("{}RMSE: {:.4}", "• ".green(), rmse);
    println!("{}MAE: {:.4}", "• ".green(), mae);
    println!(
        "{}Baseline-only predictions: {:.1}% ({} of {})",
        "• ".cyan(),
        100.0 * batch.diagnostics.fallback_rate(),
        batch.diagnostics.fallback_count,
        batch.diagnostics.total
    );
    println!(
        "{}Predicted {} ratings in {:?}",
        "• ".cyan(),
        batch.estimates.len(),
        elapsed
    );
    Ok(())
}

/// Root mean squared error and mean absolute error of a batch
fn score(batch: &PredictionBatch, actual: &[f64]) -> (f64, f64) {
    if actual.is_empty() {
        return (0.0, 0.0);
    }
    let mut squared = 0.0;
    let mut absolute = 0.0;
    for (estimate, truth) in batch.estimates.iter().zip(actual) {
        let err = estimate - truth;
        squared += err * err;
        absolute += err.abs();
    }
    let n = actual.len() as f64;
    ((squared / n).sqrt(), absolute / n)
}

/// Handle the 'predict' command
fn handle_predict(
    table: &RatingsTable,
    config: ModelConfig,
    user_id: UserId,
    movie_id: MovieId,
    explain: bool,
) -> Result<()> {
    let model = fit_model(table, config)?;
    let index = model.rating_index()?;
    if !index.contains_user(user_id) {
        println!(
            "{} user {} has no ratings; the estimate is baseline only",
            "!".yellow(),
            user_id
        );
    }

    let predictor = model.predictor()?;
    let prediction = predictor.predict_rating(user_id, movie_id)?;

    let header = format!("User {} / movie {}", user_id, movie_id);
    println!("{}", header.bold().blue());
    println!(
        "{}Predicted rating: {:.3}",
        "• ".green(),
        prediction.rating
    );
    println!("{}Baseline: {:.3}", "• ".cyan(), prediction.baseline);
    println!(
        "{}Neighbor residual: {:+.3}",
        "• ".cyan(),
        prediction.residual
    );
    println!(
        "{}Neighbors used: {}",
        "• ".cyan(),
        prediction.neighbors_used
    );

    if explain {
        for neighbor in predictor.neighbors(user_id, movie_id) {
            println!(
                "  - movie {} similarity {:.4} residual {:+.3}",
                neighbor.movie_id, neighbor.similarity, neighbor.residual
            );
        }
    }
    Ok(())
}

/// Handle the 'similar' command
fn handle_similar(
    table: &RatingsTable,
    config: ModelConfig,
    movie_id: MovieId,
    limit: usize,
) -> Result<()> {
    let model = fit_model(table, config)?;
    if !model.rating_index()?.contains_movie(movie_id) {
        return Err(anyhow!("Movie {} has no ratings", movie_id));
    }

    let header = format!("Movies most similar to {}:", movie_id);
    println!("{}", header.bold().blue());
    let neighbors = model.most_similar(movie_id, limit)?;
    if neighbors.is_empty() {
        println!("  (no movie shares at least two raters with it)");
    }
    for (rank, (other, similarity)) in neighbors.iter().enumerate() {
        let common = model.rating_index()?.common_raters(movie_id, *other).len();
        println!(
            "{}. movie {} similarity {:.4} ({} common raters)",
            (rank + 1).to_string().green(),
            other,
            similarity,
            common
        );
    }
    Ok(())
}

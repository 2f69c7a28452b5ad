//! # Data Loader Crate
//!
//! Loads MovieLens rating tables into memory for the similarity model.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (UserId, MovieId, Rating, PredictionRequest, RatingsTable)
//! - **parser**: Parse `ratings.csv` / `ratings.dat` files into Rust structs
//! - **table**: Load, validate and split rating tables
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::RatingsTable;
//! use std::path::Path;
//!
//! let table = RatingsTable::load_from_file(Path::new("data/ml-latest-small/ratings.csv"))?;
//! let (train, test) = table.train_test_split(0.2, 42)?;
//!
//! println!("{} train rows, {} test rows", train.len(), test.len());
//! ```

pub mod error;
pub mod parser;
pub mod table;
pub mod types;

pub use error::{DataLoadError, Result};
pub use parser::RatingsFormat;
pub use types::{MovieId, PredictionRequest, Rating, RatingsTable, UserId};

//! Parser for MovieLens rating files.
//!
//! Two layouts are supported:
//! - `ratings.csv` (ml-latest, ml-latest-small): `userId,movieId,rating,timestamp`
//!   with a header line
//! - `ratings.dat` (ml-1m, ml-10m): `userId::movieId::rating::timestamp`
//!
//! Every row must carry a user id, a movie id and a finite rating. A row
//! that doesn't is an error, never a silently skipped line.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// On-disk layout of a ratings file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingsFormat {
    /// Comma separated, first line is a header
    Csv,
    /// `::` separated, no header
    Dat,
}

impl RatingsFormat {
    /// Pick a format from the file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("csv") => Ok(RatingsFormat::Csv),
            Some("dat") => Ok(RatingsFormat::Dat),
            _ => Err(DataLoadError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }

    fn separator(self) -> &'static str {
        match self {
            RatingsFormat::Csv => ",",
            RatingsFormat::Dat => "::",
        }
    }

    fn has_header(self) -> bool {
        matches!(self, RatingsFormat::Csv)
    }
}

/// Read a file as ISO-8859-1 (Latin-1).
///
/// The older MovieLens dumps are Latin-1. Each byte maps directly to a
/// Unicode code point, so this never fails on odd bytes and is a no-op for
/// the ASCII the numeric rating columns use.
fn read_lines_latin1(path: &Path) -> Result<Vec<String>> {
    let mut file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    let content: String = bytes.iter().map(|&b| b as char).collect();

    Ok(content.lines().map(|s| s.to_string()).collect())
}

/// Parse a ratings file, choosing the layout from its extension
pub fn parse_ratings(path: &Path) -> Result<Vec<Rating>> {
    let format = RatingsFormat::from_path(path)?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let lines = read_lines_latin1(path)?;
    parse_rating_lines(&lines, format, &file_name)
}

/// Parse already-read lines in the given layout.
///
/// `file` is only used to label errors.
pub fn parse_rating_lines<S: AsRef<str>>(
    lines: &[S],
    format: RatingsFormat,
    file: &str,
) -> Result<Vec<Rating>> {
    let mut ratings = Vec::with_capacity(lines.len());
    let skip = if format.has_header() { 1 } else { 0 };

    for (idx, line) in lines.iter().enumerate().skip(skip) {
        let line_no = idx + 1;
        let line_trimmed = line.as_ref().trim();
        if line_trimmed.is_empty() {
            continue;
        }
        ratings.push(parse_rating_line(line_trimmed, format, file, line_no)?);
    }
    Ok(ratings)
}

fn parse_rating_line(
    line: &str,
    format: RatingsFormat,
    file: &str,
    line_no: usize,
) -> Result<Rating> {
    let fields: Vec<&str> = line.split(format.separator()).map(str::trim).collect();
    if fields.len() < 3 || fields.len() > 4 {
        return Err(DataLoadError::FieldCountMismatch {
            expected: 4,
            found: fields.len(),
            line: line_no,
        });
    }

    let parse_error = |reason: String| DataLoadError::ParseError {
        file: file.to_string(),
        line: line_no,
        reason,
    };

    let user_id: UserId = required(fields[0], "userId", &parse_error)?
        .parse()
        .map_err(|e| parse_error(format!("Invalid userId: {}", e)))?;
    let movie_id: MovieId = required(fields[1], "movieId", &parse_error)?
        .parse()
        .map_err(|e| parse_error(format!("Invalid movieId: {}", e)))?;
    let rating: f32 = required(fields[2], "rating", &parse_error)?
        .parse()
        .map_err(|e| parse_error(format!("Invalid rating: {}", e)))?;
    if !rating.is_finite() {
        return Err(parse_error(format!("Invalid rating: {}", rating)));
    }

    let timestamp = match fields.get(3) {
        Some(raw) if !raw.is_empty() => Some(
            raw.parse::<i64>()
                .map_err(|e| parse_error(format!("Invalid timestamp: {}", e)))?,
        ),
        _ => None,
    };

    Ok(Rating {
        user_id,
        movie_id,
        rating,
        timestamp,
    })
}

fn required<'a>(
    field: &'a str,
    name: &str,
    parse_error: &impl Fn(String) -> DataLoadError,
) -> Result<&'a str> {
    if field.is_empty() {
        Err(parse_error(format!("Missing {}", name)))
    } else {
        Ok(field)
    }
}

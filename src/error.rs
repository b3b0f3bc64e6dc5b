// Error taxonomy for the cleansing and reconciliation pipeline.
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required file or directory does not exist, or holds no input files
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input was readable but contained no usable rows
    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Missing column '{column}' in {file}")]
    MissingColumn { column: String, file: String },

    #[error("Found {count} null values in column '{column}'")]
    MissingValues { column: String, count: usize },

    #[error("Found {} unmapped club names: {}", .0.len(), .0.join(", "))]
    UnmappedClubs(Vec<String>),

    #[error("Duplicate match key in {source_name}: {season} {home_club} v {away_club}")]
    DuplicateKey {
        source_name: String,
        season: String,
        home_club: String,
        away_club: String,
    },

    #[error("Found discrepancies in the column {field}: see {rows} rows in {}", .report.display())]
    Discrepancy {
        field: String,
        rows: usize,
        report: PathBuf,
    },

    /// Consistency or reference-count check failed
    #[error("Validation failed: {0}")]
    Validation(String),
}

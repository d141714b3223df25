//! Error types for Traceline

use thiserror::Error;

/// Errors that can occur while loading or analyzing case data
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("File too large: {path} ({size_mb:.1} MB exceeds {limit_mb} MB limit)")]
    FileTooLarge {
        path: String,
        size_mb: f64,
        limit_mb: u64,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No valid rows in {0} export after filtering")]
    NoValidRows(String),

    #[error("Invalid collision time: {0}")]
    InvalidCollisionTime(String),

    #[error("No data loaded for analysis")]
    NoData,

    #[error("Analysis error: {0}")]
    Analysis(String),
}

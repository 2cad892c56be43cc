//! Error types for the batch pipeline.

use divergence_engine::DivergenceError;
use thiserror::Error;

/// Anything that can make a single file (or the batch setup) fail.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A coverage line without exactly six columns
    #[error("line {line}: expected 6 tab-separated columns, found {found}")]
    MalformedRow { line: u64, found: usize },

    /// The percentage/coverage column is not a number
    #[error("line {line}: expected a number in column 4, found '{value}'")]
    NonNumeric { line: u64, value: String },

    #[error("Divergence error: {0}")]
    Divergence(#[from] DivergenceError),

    /// File name does not follow `<context>_<sample>_<replicate>..._<chromosome>`
    #[error("Invalid file name '{0}': expected <context>_<sample>_<replicate>..._<chromosome>")]
    FileName(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Glob pattern error: {0}")]
    Pattern(#[from] glob::PatternError),

    /// A worker panicked while handling the file
    #[error("Worker panicked: {0}")]
    Worker(String),
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
